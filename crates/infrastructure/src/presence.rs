//! 内存在线状态跟踪器

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use domain::{ConnectionHandle, ConnectionId, PresenceTracker, UserId};

/// 按用户维护存活连接句柄的内存跟踪器。
///
/// 0↔1 边沿的判定和句柄集合的修改发生在同一个写锁临界区内，
/// 因此断开与并发注册的竞争只会观察到实际存在过的状态。
/// 句柄快照在锁释放后返回，投递不在锁内进行。
#[derive(Default)]
pub struct InMemoryPresenceTracker {
    connections: RwLock<HashMap<UserId, HashMap<ConnectionId, ConnectionHandle>>>,
}

impl InMemoryPresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 某身份当前的连接数，仅测试与诊断使用
    pub async fn connection_count(&self, user_id: UserId) -> usize {
        let connections = self.connections.read().await;
        connections.get(&user_id).map_or(0, |handles| handles.len())
    }
}

#[async_trait]
impl PresenceTracker for InMemoryPresenceTracker {
    async fn register(&self, user_id: UserId, handle: ConnectionHandle) -> bool {
        let mut connections = self.connections.write().await;
        let handles = connections.entry(user_id).or_default();
        let was_offline = handles.is_empty();
        handles.insert(handle.id(), handle);

        debug!(user_id = %user_id, live = handles.len(), "连接已注册");
        was_offline
    }

    async fn unregister(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        let mut connections = self.connections.write().await;
        let Some(handles) = connections.get_mut(&user_id) else {
            return false;
        };

        handles.remove(&connection_id);
        let now_offline = handles.is_empty();
        if now_offline {
            connections.remove(&user_id);
        }

        debug!(user_id = %user_id, offline = now_offline, "连接已注销");
        now_offline
    }

    async fn live_handles_for(&self, user_id: UserId) -> Vec<ConnectionHandle> {
        let connections = self.connections.read().await;
        connections
            .get(&user_id)
            .map(|handles| handles.values().cloned().collect())
            .unwrap_or_default()
    }

    async fn handles_except_user(&self, user_id: UserId) -> Vec<ConnectionHandle> {
        let connections = self.connections.read().await;
        connections
            .iter()
            .filter(|(id, _)| **id != user_id)
            .flat_map(|(_, handles)| handles.values().cloned())
            .collect()
    }
}
