//! 私聊消息实体定义
//!
//! 消息一经创建不可变，追加写入消息存储后不再修改或删除。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainResult;
use crate::value_objects::{MessageContent, UserId};

/// 一条已定向的私聊消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateMessage {
    /// 发送方用户标识
    pub from: UserId,
    /// 接收方用户标识
    pub to: UserId,
    /// 消息正文
    pub content: MessageContent,
    /// 服务端收到消息的时间，不出现在线路格式中
    pub sent_at: DateTime<Utc>,
}

impl PrivateMessage {
    /// 构造一条新消息并校验正文
    pub fn new(from: UserId, to: UserId, content: impl Into<String>) -> DomainResult<Self> {
        let content = MessageContent::new(content)?;
        Ok(Self {
            from,
            to,
            content,
            sent_at: Utc::now(),
        })
    }

    /// 该用户是否为消息的发送方或接收方
    pub fn involves(&self, user_id: UserId) -> bool {
        self.from == user_id || self.to == user_id
    }

    /// 消息是否属于 a 与 b 之间的对话
    pub fn is_between(&self, a: UserId, b: UserId) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }
}
