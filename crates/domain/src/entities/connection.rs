//! 连接句柄定义
//!
//! 连接是短暂的：归属于唯一一个会话，同一会话可同时持有多个连接（多标签页）。
//! 句柄包装连接专属的事件发送端，投递是尽力而为的。

use tokio::sync::mpsc;

use crate::entities::wire::ServerEvent;
use crate::value_objects::ConnectionId;

/// 指向单个存活连接的可克隆句柄
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            id: ConnectionId::generate(),
            sender,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// 向该连接投递一个事件。连接已关闭时返回 false，调用方不得因此中断
    /// 对其余连接的投递。
    pub fn deliver(&self, event: ServerEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}
