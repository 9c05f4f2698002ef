//! Web API 层
//!
//! 提供 HTTP 路由与 WebSocket 网关。认证在事件通道内完成，
//! 升级本身不携带凭证。

pub mod routes;
pub mod state;
pub mod websocket;

pub use routes::router;
pub use state::AppState;
