//! 私聊中继系统核心领域模型
//!
//! 包含会话、消息、连接等核心实体，以及存储接口和在线状态接口。

pub mod entities;
pub mod errors;
pub mod repositories;
pub mod services;
pub mod value_objects;

// 重新导出常用类型
pub use entities::*;
pub use errors::*;
pub use repositories::*;
pub use services::*;
pub use value_objects::*;
