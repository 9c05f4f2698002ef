//! 事件通道线路格式
//!
//! 每个连接一条双向事件通道，每个事件是一帧 JSON 文本：
//! `{"event": "<名称>", "data": <负载>}`。字段名沿用客户端既有协议
//! （`userID` / `sessionID` 为驼峰形式）。

use serde::{Deserialize, Serialize};

use crate::entities::message::PrivateMessage;
use crate::entities::session::Session;
use crate::value_objects::{SessionId, UserId};

/// 认证握手负载。`session_id` 与 `username` 可同时出现：
/// 令牌有效时优先续期，失效时退回用户名注册。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthPayload {
    #[serde(rename = "sessionID", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// 客户端到服务端事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// 认证握手，必须是连接上的第一个事件
    #[serde(rename = "auth")]
    Auth(AuthPayload),
    /// 发送私聊消息
    #[serde(rename = "private message")]
    PrivateMessage { content: String, to: UserId },
}

/// 服务端到客户端事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// 新签发的会话凭证，仅在全新认证后下发一次
    #[serde(rename = "session")]
    Session {
        #[serde(rename = "sessionID")]
        session_id: SessionId,
        #[serde(rename = "userID")]
        user_id: UserId,
    },
    /// 初始花名册，认证成功后下发一次
    #[serde(rename = "users")]
    Users(Vec<PeerEntry>),
    /// 某个其他身份从离线转为在线
    #[serde(rename = "user connected")]
    UserConnected(PeerEntry),
    /// 某个其他身份的最后一个连接已断开
    #[serde(rename = "user disconnected")]
    UserDisconnected(UserId),
    /// 转发的私聊消息
    #[serde(rename = "private message")]
    PrivateMessage(MessageBody),
    /// 握手被拒绝
    #[serde(rename = "auth error")]
    AuthError(String),
}

impl ServerEvent {
    /// 握手拒绝事件的固定负载
    pub fn invalid_username() -> Self {
        Self::AuthError("invalid username".to_string())
    }
}

/// 消息在线路上的只读投影
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageBody {
    pub content: String,
    pub from: UserId,
    pub to: UserId,
}

impl From<&PrivateMessage> for MessageBody {
    fn from(message: &PrivateMessage) -> Self {
        Self {
            content: message.content.as_str().to_owned(),
            from: message.from,
            to: message.to,
        }
    }
}

/// 花名册条目：某个对端身份及与其的既往对话
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerEntry {
    #[serde(rename = "userID")]
    pub user_id: UserId,
    pub username: String,
    pub connected: bool,
    pub messages: Vec<MessageBody>,
}

impl PeerEntry {
    /// 不带历史的最小对端记录，用于上线广播
    pub fn summary(session: &Session) -> Self {
        Self {
            user_id: session.user_id,
            username: session.username.as_str().to_owned(),
            connected: session.connected,
            messages: Vec::new(),
        }
    }

    /// 携带与观察者的对话历史的完整条目
    pub fn with_history(session: &Session, messages: Vec<MessageBody>) -> Self {
        Self {
            user_id: session.user_id,
            username: session.username.as_str().to_owned(),
            connected: session.connected,
            messages,
        }
    }
}
