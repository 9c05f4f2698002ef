//! 内存消息存储

use async_trait::async_trait;
use tokio::sync::RwLock;

use domain::{MessageStore, PrivateMessage, StoreResult, UserId};

/// 追加式的内存消息日志。写入顺序即中继的接收顺序，
/// 这保证了按发送方的 FIFO（不要求全局全序）。
#[derive(Default)]
pub struct InMemoryMessageStore {
    messages: RwLock<Vec<PrivateMessage>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前日志长度，仅测试与诊断使用
    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn save_message(&self, message: PrivateMessage) -> StoreResult<()> {
        let mut messages = self.messages.write().await;
        messages.push(message);
        Ok(())
    }

    async fn find_messages_for_user(&self, user_id: UserId) -> StoreResult<Vec<PrivateMessage>> {
        let messages = self.messages.read().await;
        Ok(messages
            .iter()
            .filter(|message| message.involves(user_id))
            .cloned()
            .collect())
    }
}
