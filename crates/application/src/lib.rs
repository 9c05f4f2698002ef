//! 应用层：连接网关与消息中继服务
//!
//! 共享存储和在线状态跟踪器以依赖注入的方式传入各服务，
//! 不存在进程级单例，核心逻辑可以脱离传输层单独测试。

pub mod error;
pub mod services;

pub use error::ApplicationError;
pub use services::*;
