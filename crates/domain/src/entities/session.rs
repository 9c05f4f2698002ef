//! 会话实体定义
//!
//! 会话是可续期凭证与稳定身份的绑定：`session_id` 交还给客户端用于重连，
//! `user_id` 是消息寻址使用的稳定身份。会话在进程生命周期内不会被删除。

use serde::{Deserialize, Serialize};

use crate::value_objects::{SessionId, UserId, Username};

/// 一个已认证身份的会话记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// 可续期的会话令牌
    pub session_id: SessionId,
    /// 稳定的用户标识
    pub user_id: UserId,
    /// 用户名，会话存续期间不变
    pub username: Username,
    /// 该身份当前是否至少持有一个存活连接
    pub connected: bool,
}

impl Session {
    /// 创建新会话。新会话总是在首次成功认证时创建，此时连接已建立。
    pub fn new(session_id: SessionId, user_id: UserId, username: Username) -> Self {
        Self {
            session_id,
            user_id,
            username,
            connected: true,
        }
    }

    /// 身份从离线转为在线
    pub fn mark_connected(&mut self) {
        self.connected = true;
    }

    /// 身份的最后一个连接已断开
    pub fn mark_disconnected(&mut self) {
        self.connected = false;
    }
}
