//! 核心实体定义

pub mod connection;
pub mod message;
pub mod session;
pub mod wire;

pub use connection::*;
pub use message::*;
pub use session::*;
pub use wire::*;
