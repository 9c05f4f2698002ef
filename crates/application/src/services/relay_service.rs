//! 消息中继服务
//!
//! 先持久化后投递：崩溃后续期的客户端不会看到一条从未入库的消息，
//! 也不会丢失一条已投递的消息。

use std::sync::Arc;

use tracing::{debug, warn};

use domain::{
    ConnectionId, DomainError, MessageBody, MessageStore, PresenceTracker, PrivateMessage,
    ServerEvent, SessionStore, UserId,
};

use crate::error::ApplicationError;

#[derive(Debug, Clone)]
pub struct SendMessageRequest {
    pub from: UserId,
    /// 发起发送的连接，不向其回显
    pub origin: ConnectionId,
    pub to: UserId,
    pub content: String,
}

pub struct RelayServiceDependencies {
    pub session_store: Arc<dyn SessionStore>,
    pub message_store: Arc<dyn MessageStore>,
    pub presence: Arc<dyn PresenceTracker>,
}

pub struct RelayService {
    deps: RelayServiceDependencies,
}

impl RelayService {
    pub fn new(deps: RelayServiceDependencies) -> Self {
        Self { deps }
    }

    /// 构造、持久化并扇出一条私聊消息。
    ///
    /// 投递目标是接收方的全部存活连接加上发送方除发起连接外的
    /// 全部存活连接（其余标签页的回显）。对单个句柄的投递失败
    /// 不会中断其余投递，也不回报给发送方。
    pub async fn send(&self, request: SendMessageRequest) -> Result<(), ApplicationError> {
        // 存储中的每条消息都必须指向已知身份
        let recipient_known = self
            .deps
            .session_store
            .find_all_sessions()
            .await?
            .iter()
            .any(|session| session.user_id == request.to);
        if !recipient_known {
            warn!(from = %request.from, to = %request.to, "接收方身份未知，拒绝转发");
            return Err(DomainError::invalid_argument("to", "unknown recipient").into());
        }

        let message = PrivateMessage::new(request.from, request.to, request.content)?;

        // 任何投递之前必须完成持久化
        if let Err(err) = self.deps.message_store.save_message(message.clone()).await {
            warn!(from = %request.from, to = %request.to, error = %err, "消息入库失败，放弃投递");
            return Err(err.into());
        }

        let event = ServerEvent::PrivateMessage(MessageBody::from(&message));

        let mut targets = self.deps.presence.live_handles_for(request.to).await;
        if request.from != request.to {
            targets.extend(self.deps.presence.live_handles_for(request.from).await);
        }

        let mut delivered = 0usize;
        for handle in targets {
            if handle.id() == request.origin {
                continue;
            }
            if handle.deliver(event.clone()) {
                delivered += 1;
            } else {
                debug!(connection_id = %handle.id(), "跳过已关闭的连接");
            }
        }

        debug!(from = %request.from, to = %request.to, delivered, "消息已转发");
        Ok(())
    }
}
