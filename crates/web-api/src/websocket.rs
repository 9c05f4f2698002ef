//! WebSocket 网关
//!
//! 封装单个连接的完整生命周期：升级、认证握手、初始状态下发、
//! 事件循环和断开清理。

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use application::{RelayService, SendMessageRequest};
use domain::{ClientEvent, ConnectionHandle, ConnectionId, ServerEvent, Session, UserId};

use crate::state::AppState;

/// 处理 WebSocket 连接升级
pub async fn websocket_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| async move {
        if let Some(connection) = PrivateChatConnection::handshake(socket, state).await {
            connection.run().await;
        }
    })
}

/// WebSocket 写操作命令
///
/// 使用命令模式统一管理所有对 WebSocket sender 的写操作
#[derive(Debug)]
enum WsCommand {
    SendPong(Vec<u8>),
}

/// 一个完成了认证握手的连接
struct PrivateChatConnection {
    socket: WebSocket,
    state: AppState,
    session: Session,
    handle: ConnectionHandle,
    events: mpsc::UnboundedReceiver<ServerEvent>,
}

impl PrivateChatConnection {
    /// 执行认证握手并下发初始状态。
    ///
    /// 握手必须是连接上的第一个事件。流程：
    /// 1. 解析握手负载并交给网关服务（续期或新建会话）；
    /// 2. 失败时发送 `auth error` 并关闭，不产生任何状态；
    /// 3. 成功时登记连接，全新会话先下发 `session`，随后下发 `users`。
    async fn handshake(mut socket: WebSocket, state: AppState) -> Option<Self> {
        let text = read_first_text(&mut socket).await?;

        let payload = match serde_json::from_str::<ClientEvent>(&text) {
            Ok(ClientEvent::Auth(payload)) => payload,
            _ => {
                debug!("第一个事件不是认证握手，拒绝连接");
                reject(&mut socket).await;
                return None;
            }
        };

        let outcome = match state.gateway.authenticate(payload).await {
            Ok(outcome) => outcome,
            Err(err) => {
                debug!(error = %err, "握手被拒绝");
                reject(&mut socket).await;
                return None;
            }
        };
        let session = outcome.session;

        let (tx, events) = mpsc::unbounded_channel();
        let handle = ConnectionHandle::new(tx);

        // 连接登记；首连接会触发对其他用户的上线广播
        let roster = match state.gateway.connect(&session, handle.clone()).await {
            Ok(roster) => roster,
            Err(err) => {
                warn!(error = %err, user_id = %session.user_id, "连接登记失败");
                return None;
            }
        };

        if outcome.fresh
            && !send_event(
                &mut socket,
                &ServerEvent::Session {
                    session_id: session.session_id.clone(),
                    user_id: session.user_id,
                },
            )
            .await
        {
            state.gateway.disconnect(&session, handle.id()).await.ok();
            return None;
        }

        if !send_event(&mut socket, &ServerEvent::Users(roster)).await {
            state.gateway.disconnect(&session, handle.id()).await.ok();
            return None;
        }

        info!(
            user_id = %session.user_id,
            username = %session.username,
            connection_id = %handle.id(),
            "WebSocket 连接已建立"
        );

        Some(Self {
            socket,
            state,
            session,
            handle,
            events,
        })
    }

    /// 运行连接的主循环：一个发送任务串行化所有写操作，
    /// 一个接收任务处理客户端事件，任一结束即断开并清理。
    async fn run(self) {
        let (mut sender, mut incoming) = self.socket.split();
        let mut events = self.events;
        let origin = self.handle.id();
        let user_id = self.session.user_id;

        let (cmd_tx, mut cmd_rx) = mpsc::channel::<WsCommand>(32);

        // 发送任务：统一处理所有对 WebSocket sender 的写操作
        let send_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(cmd) = cmd_rx.recv() => match cmd {
                        WsCommand::SendPong(data) => {
                            if sender.send(WsMessage::Pong(data.into())).await.is_err() {
                                break;
                            }
                        }
                    },
                    maybe_event = events.recv() => {
                        let Some(event) = maybe_event else { break };
                        let payload = match serde_json::to_string(&event) {
                            Ok(json) => json,
                            Err(err) => {
                                warn!(error = %err, "failed to serialize websocket payload");
                                continue;
                            }
                        };
                        if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        // 接收任务：处理来自客户端的事件
        let relay = self.state.relay.clone();
        let recv_task = tokio::spawn(async move {
            while let Some(Ok(message)) = incoming.next().await {
                if handle_incoming(message, &relay, user_id, origin, &cmd_tx)
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });

        // 等待任意一个任务完成（连接断开）
        tokio::select! {
            _ = send_task => {}
            _ = recv_task => {}
        }

        // 断开清理；最后一个连接会触发对其他用户的下线广播
        if let Err(err) = self.state.gateway.disconnect(&self.session, origin).await {
            warn!(error = %err, user_id = %user_id, "断开清理失败");
        }

        info!(user_id = %user_id, connection_id = %origin, "WebSocket 连接已断开");
    }
}

/// 处理来自客户端的单个帧
async fn handle_incoming(
    message: WsMessage,
    relay: &RelayService,
    user_id: UserId,
    origin: ConnectionId,
    cmd_tx: &mpsc::Sender<WsCommand>,
) -> Result<(), ()> {
    match message {
        WsMessage::Close(_) => Err(()),
        WsMessage::Ping(data) => cmd_tx
            .send(WsCommand::SendPong(data.to_vec()))
            .await
            .map_err(|_| ()),
        WsMessage::Pong(_) => Ok(()),
        WsMessage::Text(text) => {
            match serde_json::from_str::<ClientEvent>(&text) {
                Ok(ClientEvent::PrivateMessage { content, to }) => {
                    // 失败不回报给发送方：入库失败即放弃投递
                    if let Err(err) = relay
                        .send(SendMessageRequest {
                            from: user_id,
                            origin,
                            to,
                            content,
                        })
                        .await
                    {
                        warn!(error = %err, from = %user_id, "消息转发失败");
                    }
                }
                Ok(ClientEvent::Auth(_)) => {
                    debug!("忽略认证后的重复握手事件");
                }
                Err(err) => {
                    debug!(error = %err, "无法解析的客户端事件");
                }
            }
            Ok(())
        }
        WsMessage::Binary(_) => {
            debug!("收到二进制帧，忽略");
            Ok(())
        }
    }
}

/// 读取握手用的第一帧文本。返回 None 表示没有等到可用的文本帧。
async fn read_first_text(socket: &mut WebSocket) -> Option<String> {
    while let Some(Ok(message)) = socket.recv().await {
        match message {
            WsMessage::Text(text) => return Some(text.to_string()),
            WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
            WsMessage::Close(_) | WsMessage::Binary(_) => return None,
        }
    }
    None
}

/// 发送握手拒绝并关闭连接
async fn reject(socket: &mut WebSocket) {
    send_event(socket, &ServerEvent::invalid_username()).await;
    let _ = socket.send(WsMessage::Close(None)).await;
}

/// 在握手阶段直接向 socket 写入一个事件
async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> bool {
    let payload = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(err) => {
            warn!(error = %err, "failed to serialize websocket payload");
            return false;
        }
    };
    socket.send(WsMessage::Text(payload.into())).await.is_ok()
}
