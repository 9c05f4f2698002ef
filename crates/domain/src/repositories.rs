//! 存储接口定义
//!
//! 会话存储与消息存储均为进程生命周期内的共享可变状态，
//! 所有操作必须可被多个连接并发调用。

use async_trait::async_trait;
use thiserror::Error;

use crate::entities::{PrivateMessage, Session};
use crate::value_objects::{SessionId, UserId};

/// 存储层错误。唯一的失败模式是资源耗尽，对该次操作而言是致命的。
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("存储资源耗尽: {message}")]
    Exhausted { message: String },
}

/// 存储层结果类型
pub type StoreResult<T> = Result<T, StoreError>;

/// 会话存储：按会话令牌索引，只增不删
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 按令牌查找会话，未知令牌返回 None（不是错误）
    async fn find_session(&self, session_id: &SessionId) -> StoreResult<Option<Session>>;

    /// 按令牌插入或更新会话
    async fn save_session(&self, session: Session) -> StoreResult<()>;

    /// 返回全部已知会话，顺序不作保证
    async fn find_all_sessions(&self) -> StoreResult<Vec<Session>>;
}

/// 消息存储：追加式日志，按参与者查询
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// 追加一条消息。中继引擎必须在任何投递之前等待本调用完成。
    async fn save_message(&self, message: PrivateMessage) -> StoreResult<()>;

    /// 返回该用户发出或收到的全部消息，按写入顺序排列
    async fn find_messages_for_user(&self, user_id: UserId) -> StoreResult<Vec<PrivateMessage>>;
}
