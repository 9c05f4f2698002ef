//! 领域服务接口

pub mod presence_service;

pub use presence_service::*;
