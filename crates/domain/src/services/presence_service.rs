//! 在线状态跟踪接口
//!
//! 按用户维护存活连接句柄的集合（不只是计数：投递必须到达同一身份的
//! 每个打开的连接）。每个身份的状态机：
//!
//! ```text
//! OFFLINE --register--> ONLINE(count=1)
//! ONLINE  --register--> ONLINE(count=n+1)
//! ONLINE  --unregister, count>1--> ONLINE(count=n-1)
//! ONLINE  --unregister, count=1--> OFFLINE
//! ```
//!
//! 只有 OFFLINE↔ONLINE 边沿触发在线状态广播，中间的多标签页
//! 注册/注销保持静默。

use async_trait::async_trait;

use crate::entities::ConnectionHandle;
use crate::value_objects::{ConnectionId, UserId};

/// 在线状态跟踪器
///
/// 0↔非 0 的判定必须在实现内部原子完成，调用方不得用过期的计数
/// 自行推导。任何实现都不允许跨 await 点持有锁。
#[async_trait]
pub trait PresenceTracker: Send + Sync {
    /// 记录一个新连接。当且仅当这是该身份 0→1 的转变（真正的"上线"）
    /// 时返回 true。
    async fn register(&self, user_id: UserId, handle: ConnectionHandle) -> bool;

    /// 移除一个连接。当且仅当这是该身份 1→0 的转变（真正的"下线"）
    /// 时返回 true。必须容忍同一身份的另一个连接并发注册。
    async fn unregister(&self, user_id: UserId, connection_id: ConnectionId) -> bool;

    /// 该身份当前全部存活连接的句柄快照，用于消息扇出
    async fn live_handles_for(&self, user_id: UserId) -> Vec<ConnectionHandle>;

    /// 除该身份之外所有存活连接的句柄快照，用于在线状态广播
    async fn handles_except_user(&self, user_id: UserId) -> Vec<ConnectionHandle>;
}
