//! 内存会话存储

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use domain::{Session, SessionId, SessionStore, StoreResult};

/// 以会话令牌为键的内存会话存储。不提供删除操作，
/// 会话持续到进程退出。
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn find_session(&self, session_id: &SessionId) -> StoreResult<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).cloned())
    }

    async fn save_session(&self, session: Session) -> StoreResult<()> {
        let mut sessions = self.sessions.write().await;
        debug!(session_id = %session.session_id, user_id = %session.user_id, "保存会话");
        sessions.insert(session.session_id.clone(), session);
        Ok(())
    }

    async fn find_all_sessions(&self) -> StoreResult<Vec<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.values().cloned().collect())
    }
}
