use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use application::{
    GatewayService, GatewayServiceDependencies, RelayService, RelayServiceDependencies,
};
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use infrastructure::{InMemoryMessageStore, InMemoryPresenceTracker, InMemorySessionStore};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{
    connect_async, tungstenite::Message as TungsteniteMessage, MaybeTlsStream, WebSocketStream,
};
use web_api::{router as build_router_fn, AppState};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 用内存组件搭建完整应用
pub fn build_router() -> Router {
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
    build_router_fn(state)
}

/// 在随机端口上启动一个服务器实例
pub async fn spawn_server() -> (SocketAddr, oneshot::Sender<()>) {
    let router = build_router();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    // allow server to start
    sleep(Duration::from_millis(100)).await;

    (addr, shutdown_tx)
}

/// 建立 WebSocket 连接并发送认证握手
pub async fn connect_with(addr: SocketAddr, auth: Value) -> WsClient {
    let (mut ws, _) = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("ws connect");

    let handshake = json!({"event": "auth", "data": auth}).to_string();
    ws.send(TungsteniteMessage::Text(handshake.into()))
        .await
        .expect("send auth");

    ws
}

/// 读取下一个服务端事件
pub async fn next_event(ws: &mut WsClient) -> Value {
    loop {
        let message = timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for event")
            .expect("connection ended while waiting for event")
            .expect("ws error");

        match message {
            TungsteniteMessage::Text(payload) => {
                return serde_json::from_str(&payload).expect("event json")
            }
            TungsteniteMessage::Ping(_) | TungsteniteMessage::Pong(_) => continue,
            other => panic!("unexpected message {other:?}"),
        }
    }
}

/// 断言连接在短窗口内没有收到任何事件
pub async fn assert_silent(ws: &mut WsClient) {
    let result = timeout(Duration::from_millis(300), ws.next()).await;
    assert!(result.is_err(), "expected silence, got {result:?}");
}
