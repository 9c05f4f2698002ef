//! 应用层服务

pub mod gateway_service;
pub mod relay_service;

pub use gateway_service::{AuthOutcome, GatewayService, GatewayServiceDependencies};
pub use relay_service::{RelayService, RelayServiceDependencies, SendMessageRequest};
