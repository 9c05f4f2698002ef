//! 基础设施层：领域接口的内存实现
//!
//! 所有状态都只存活于进程内（重启不保留，这是明确的设计边界）。

pub mod message_store;
pub mod presence;
pub mod session_store;

pub use message_store::InMemoryMessageStore;
pub use presence::InMemoryPresenceTracker;
pub use session_store::InMemorySessionStore;
