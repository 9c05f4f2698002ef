//! 主应用程序入口
//!
//! 启动私聊中继的 Axum Web 服务。

use std::sync::Arc;

use application::{
    GatewayService, GatewayServiceDependencies, RelayService, RelayServiceDependencies,
};
use config::AppConfig;
use infrastructure::{InMemoryMessageStore, InMemoryPresenceTracker, InMemorySessionStore};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 读取环境变量配置
    let config = AppConfig::from_env();
    config.validate()?;

    // 进程生命周期内的共享状态，以依赖注入方式交给各服务
    let session_store = Arc::new(InMemorySessionStore::new());
    let message_store = Arc::new(InMemoryMessageStore::new());
    let presence = Arc::new(InMemoryPresenceTracker::new());

    let gateway = GatewayService::new(GatewayServiceDependencies {
        session_store: session_store.clone(),
        message_store: message_store.clone(),
        presence: presence.clone(),
    });

    let relay = RelayService::new(RelayServiceDependencies {
        session_store,
        message_store,
        presence,
    });

    let state = AppState::new(Arc::new(gateway), Arc::new(relay));

    // 启动 Web 服务器
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(config.server.bind_addr()).await?;

    tracing::info!("私聊中继服务器启动在 http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
