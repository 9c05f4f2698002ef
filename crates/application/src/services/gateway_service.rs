//! 连接网关服务
//!
//! 负责认证握手（续期或新建会话）、连接登记、花名册组装，
//! 以及 OFFLINE↔ONLINE 边沿的在线状态广播。

use std::sync::Arc;

use data_encoding::HEXLOWER;
use rand::RngCore;
use tracing::{debug, info};

use domain::{
    AuthPayload, ConnectionHandle, ConnectionId, MessageBody, MessageStore, PeerEntry,
    PresenceTracker, ServerEvent, Session, SessionId, SessionStore, UserId, Username,
};

use crate::error::ApplicationError;

/// 认证握手的结果。`fresh` 为 true 表示会话是本次握手新建的，
/// 需要向客户端下发 `session` 事件。
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub session: Session,
    pub fresh: bool,
}

pub struct GatewayServiceDependencies {
    pub session_store: Arc<dyn SessionStore>,
    pub message_store: Arc<dyn MessageStore>,
    pub presence: Arc<dyn PresenceTracker>,
}

pub struct GatewayService {
    deps: GatewayServiceDependencies,
}

impl GatewayService {
    pub fn new(deps: GatewayServiceDependencies) -> Self {
        Self { deps }
    }

    /// 解析认证握手。
    ///
    /// 1. 负载携带已知的会话令牌 → 续期，绑定既有身份，不创建新记录；
    /// 2. 否则负载携带用户名 → 签发新令牌和新身份；
    /// 3. 否则拒绝。未知令牌按未命中处理，静默回退到用户名路径。
    pub async fn authenticate(&self, payload: AuthPayload) -> Result<AuthOutcome, ApplicationError> {
        if let Some(session_id) = &payload.session_id {
            if let Some(session) = self.deps.session_store.find_session(session_id).await? {
                debug!(user_id = %session.user_id, "会话续期成功");
                return Ok(AuthOutcome {
                    session,
                    fresh: false,
                });
            }
            debug!("会话令牌未命中，回退到用户名注册");
        }

        let username = payload.username.ok_or(ApplicationError::Authentication)?;
        let username =
            Username::parse(username).map_err(|_| ApplicationError::Authentication)?;

        let session = Session::new(mint_session_token(), UserId::generate(), username);
        self.deps.session_store.save_session(session.clone()).await?;

        info!(user_id = %session.user_id, username = %session.username, "新会话已创建");
        Ok(AuthOutcome {
            session,
            fresh: true,
        })
    }

    /// 登记一个新连接并组装初始花名册。
    ///
    /// 仅当这是该身份的第一个存活连接时，持久化 `connected = true`
    /// 并向其他身份的所有连接广播 `user connected`。
    pub async fn connect(
        &self,
        session: &Session,
        handle: ConnectionHandle,
    ) -> Result<Vec<PeerEntry>, ApplicationError> {
        let came_online = self.deps.presence.register(session.user_id, handle).await;

        let mut session = session.clone();
        if came_online {
            session.mark_connected();
            self.deps.session_store.save_session(session.clone()).await?;
        }

        let roster = self.roster_for(session.user_id).await?;

        if came_online {
            info!(user_id = %session.user_id, username = %session.username, "用户上线");
            self.broadcast_to_others(
                session.user_id,
                ServerEvent::UserConnected(PeerEntry::summary(&session)),
            )
            .await;
        }

        Ok(roster)
    }

    /// 注销一个连接。
    ///
    /// 空集判定由跟踪器在内部原子完成：即便同一身份的另一个连接
    /// 正在并发注册，也不会出现虚假的下线广播。
    pub async fn disconnect(
        &self,
        session: &Session,
        connection_id: ConnectionId,
    ) -> Result<(), ApplicationError> {
        let went_offline = self
            .deps
            .presence
            .unregister(session.user_id, connection_id)
            .await;

        if went_offline {
            let mut session = session.clone();
            session.mark_disconnected();
            self.deps.session_store.save_session(session.clone()).await?;

            info!(user_id = %session.user_id, username = %session.username, "用户下线");
            self.broadcast_to_others(
                session.user_id,
                ServerEvent::UserDisconnected(session.user_id),
            )
            .await;
        }

        Ok(())
    }

    /// 为观察者组装花名册：除其自身外的全部已知身份，
    /// 每个条目附带与观察者的既往对话。快照是一次时间点读取。
    pub async fn roster_for(&self, viewer: UserId) -> Result<Vec<PeerEntry>, ApplicationError> {
        let sessions = self.deps.session_store.find_all_sessions().await?;
        let history = self.deps.message_store.find_messages_for_user(viewer).await?;

        Ok(sessions
            .iter()
            .filter(|session| session.user_id != viewer)
            .map(|peer| {
                let messages = history
                    .iter()
                    .filter(|message| message.is_between(viewer, peer.user_id))
                    .map(MessageBody::from)
                    .collect();
                PeerEntry::with_history(peer, messages)
            })
            .collect())
    }

    async fn broadcast_to_others(&self, user_id: UserId, event: ServerEvent) {
        for handle in self.deps.presence.handles_except_user(user_id).await {
            if !handle.deliver(event.clone()) {
                debug!(connection_id = %handle.id(), "跳过已关闭的连接");
            }
        }
    }
}

/// 签发 128 位随机会话令牌（十六进制）
fn mint_session_token() -> SessionId {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    SessionId::new(HEXLOWER.encode(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use infrastructure::{InMemoryMessageStore, InMemoryPresenceTracker, InMemorySessionStore};
    use tokio::sync::mpsc;

    fn gateway() -> GatewayService {
        GatewayService::new(GatewayServiceDependencies {
            session_store: Arc::new(InMemorySessionStore::new()),
            message_store: Arc::new(InMemoryMessageStore::new()),
            presence: Arc::new(InMemoryPresenceTracker::new()),
        })
    }

    fn username_auth(name: &str) -> AuthPayload {
        AuthPayload {
            session_id: None,
            username: Some(name.to_string()),
        }
    }

    fn handle() -> (
        ConnectionHandle,
        mpsc::UnboundedReceiver<ServerEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionHandle::new(tx), rx)
    }

    #[tokio::test]
    async fn fresh_auth_creates_connected_session() {
        let gateway = gateway();
        let outcome = gateway.authenticate(username_auth("alice")).await.unwrap();

        assert!(outcome.fresh);
        assert!(outcome.session.connected);
        assert_eq!(outcome.session.username.as_str(), "alice");
    }

    #[tokio::test]
    async fn resume_returns_same_identity_without_new_record() {
        let gateway = gateway();
        let first = gateway.authenticate(username_auth("alice")).await.unwrap();

        let resumed = gateway
            .authenticate(AuthPayload {
                session_id: Some(first.session.session_id.clone()),
                username: None,
            })
            .await
            .unwrap();

        assert!(!resumed.fresh);
        assert_eq!(resumed.session.user_id, first.session.user_id);

        let sessions = gateway
            .deps
            .session_store
            .find_all_sessions()
            .await
            .unwrap();
        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test]
    async fn stale_token_falls_back_to_username() {
        let gateway = gateway();
        let outcome = gateway
            .authenticate(AuthPayload {
                session_id: Some(SessionId::new("long-gone")),
                username: Some("alice".to_string()),
            })
            .await
            .unwrap();

        assert!(outcome.fresh);
    }

    #[tokio::test]
    async fn handshake_without_credentials_is_rejected() {
        let gateway = gateway();

        let err = gateway.authenticate(AuthPayload::default()).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Authentication));

        let err = gateway.authenticate(username_auth("   ")).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Authentication));

        // 拒绝的握手不产生任何状态
        assert!(gateway
            .deps
            .session_store
            .find_all_sessions()
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn two_identities_see_each_other_in_roster() {
        let gateway = gateway();
        let alice = gateway.authenticate(username_auth("alice")).await.unwrap();
        let (alice_handle, mut alice_rx) = handle();
        let roster = gateway.connect(&alice.session, alice_handle).await.unwrap();
        assert!(roster.is_empty());

        let bob = gateway.authenticate(username_auth("bob")).await.unwrap();
        let (bob_handle, _bob_rx) = handle();
        let roster = gateway.connect(&bob.session, bob_handle).await.unwrap();

        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].user_id, alice.session.user_id);
        assert_eq!(roster[0].username, "alice");
        assert!(roster[0].connected);
        assert!(roster[0].messages.is_empty());

        // alice 收到 bob 的上线广播
        match alice_rx.recv().await.unwrap() {
            ServerEvent::UserConnected(peer) => {
                assert_eq!(peer.user_id, bob.session.user_id);
                assert!(peer.messages.is_empty());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn second_tab_is_silent_to_peers() {
        let gateway = gateway();
        let alice = gateway.authenticate(username_auth("alice")).await.unwrap();
        let (h1, _rx1) = handle();
        gateway.connect(&alice.session, h1).await.unwrap();

        let bob = gateway.authenticate(username_auth("bob")).await.unwrap();
        let (bob_handle, mut bob_rx) = handle();
        gateway.connect(&bob.session, bob_handle).await.unwrap();

        // alice 打开第二个标签页：bob 不应收到任何广播
        let (h2, _rx2) = handle();
        gateway.connect(&alice.session, h2).await.unwrap();

        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn only_last_disconnect_broadcasts_offline() {
        let gateway = gateway();
        let alice = gateway.authenticate(username_auth("alice")).await.unwrap();
        let (h1, _rx1) = handle();
        let (h2, _rx2) = handle();
        let h1_id = h1.id();
        let h2_id = h2.id();
        gateway.connect(&alice.session, h1).await.unwrap();
        gateway.connect(&alice.session, h2).await.unwrap();

        let bob = gateway.authenticate(username_auth("bob")).await.unwrap();
        let (bob_handle, mut bob_rx) = handle();
        gateway.connect(&bob.session, bob_handle).await.unwrap();

        gateway.disconnect(&alice.session, h1_id).await.unwrap();
        assert!(bob_rx.try_recv().is_err());

        gateway.disconnect(&alice.session, h2_id).await.unwrap();
        match bob_rx.recv().await.unwrap() {
            ServerEvent::UserDisconnected(user_id) => {
                assert_eq!(user_id, alice.session.user_id)
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(bob_rx.try_recv().is_err());

        // 会话仍在，但标记为离线
        let stored = gateway
            .deps
            .session_store
            .find_session(&alice.session.session_id)
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.connected);
    }
}
