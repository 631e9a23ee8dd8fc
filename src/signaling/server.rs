use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tracing::{debug, error, info, warn};

use super::actor::RoomManagerHandle;
use super::connection::PeerHandle;
use super::messages::{ClientMessage, ServerMessage};
use super::types::{ConnId, OutboundMessage, PeerId, RoomCode};
use crate::config::Config;

pub const DEFAULT_SIGNALING_PORT: u16 = 8080;
const CLOSE_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
struct KeepAlive {
    ping_interval: Duration,
    pong_timeout: Duration,
}

pub struct SignalingServer {
    listener: TcpListener,
    handle: RoomManagerHandle,
    keep_alive: KeepAlive,
}

impl SignalingServer {
    /// Bind the listener and start the room manager
    pub async fn bind(config: &Config) -> std::io::Result<Self> {
        let listener = TcpListener::bind(&config.bind).await?;
        info!("Signaling server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            handle: RoomManagerHandle::spawn(config.queue_size.max(1)),
            keep_alive: KeepAlive {
                ping_interval: config.ping_interval(),
                pong_timeout: config.pong_timeout(),
            },
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn handle(&self) -> RoomManagerHandle {
        self.handle.clone()
    }

    pub async fn run(self) -> std::io::Result<()> {
        loop {
            let (stream, addr) = self.listener.accept().await?;
            let handle = self.handle.clone();
            let keep_alive = self.keep_alive;

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, handle, keep_alive).await {
                    error!("Connection error from {}: {}", addr, e);
                }
            });
        }
    }
}

/// Per-connection membership as seen by the transport task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnState {
    Unjoined,
    Joined,
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    handle: RoomManagerHandle,
    keep_alive: KeepAlive,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    let conn = ConnId::next();
    info!("WebSocket connection {} from {}", conn, addr);

    let (peer, mut rx) = PeerHandle::channel();
    let (ctrl_tx, mut ctrl_rx) = mpsc::unbounded_channel::<Message>();

    let mut state = ConnState::Unjoined;
    let mut ping_interval = tokio::time::interval(keep_alive.ping_interval);
    // the first tick fires immediately
    ping_interval.tick().await;
    let mut waiting_for_pong = false;
    let mut writer_done = false;
    let mut pong_deadline: Option<tokio::time::Instant> = None;

    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(msg) = rx.recv() => {
                    let ws_msg = match msg {
                        OutboundMessage::Text(text) => Message::Text(text),
                        OutboundMessage::Binary(data) => Message::Binary(data),
                        OutboundMessage::Close => {
                            let _ = ws_tx.send(Message::Close(None)).await;
                            break;
                        }
                    };
                    if ws_tx.send(ws_msg).await.is_err() {
                        break;
                    }
                }
                Some(ctrl_msg) = ctrl_rx.recv() => {
                    if ws_tx.send(ctrl_msg).await.is_err() {
                        break;
                    }
                }
                else => break,
            }
        }
    });

    loop {
        let pong_timeout = async {
            match pong_deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = &mut send_task => {
                debug!("Writer for {} stopped", conn);
                writer_done = true;
                break;
            }

            _ = ping_interval.tick() => {
                if waiting_for_pong {
                    warn!("No Pong received, disconnecting {}", addr);
                    break;
                }
                if ctrl_tx.send(Message::Ping(Bytes::new())).is_err() {
                    break;
                }
                waiting_for_pong = true;
                pong_deadline = Some(tokio::time::Instant::now() + keep_alive.pong_timeout);
                debug!("Ping sent to {}", addr);
            }

            _ = pong_timeout => {
                warn!("Pong timeout, disconnecting {}", addr);
                break;
            }

            msg = ws_rx.next() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                };

                match msg {
                    Message::Text(text) => {
                        handle_text_message(&text, &peer, &handle, conn, &mut state).await;
                    }
                    Message::Binary(data) => {
                        if state == ConnState::Joined {
                            handle.relay(conn, data).await;
                        }
                    }
                    Message::Pong(_) => {
                        waiting_for_pong = false;
                        pong_deadline = None;
                        debug!("Pong received from {}", addr);
                    }
                    Message::Close(_) => {
                        info!("Close received from {}", addr);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    if state == ConnState::Joined {
        handle.leave_room(conn).await;
    }

    // the transport owns the socket: flush a close frame, then stop the writer
    if !writer_done {
        peer.close();
        if tokio::time::timeout(CLOSE_GRACE, &mut send_task).await.is_err() {
            send_task.abort();
        }
    }
    info!("WebSocket disconnected: {} ({})", addr, conn);

    Ok(())
}

async fn handle_text_message(
    text: &str,
    peer: &PeerHandle,
    handle: &RoomManagerHandle,
    conn: ConnId,
    state: &mut ConnState,
) {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            warn!("Malformed message from {}: {}", conn, e);
            peer.send_message(&ServerMessage::Error {
                message: format!("Invalid message: {}", e),
            });
            return;
        }
    };

    match client_msg {
        ClientMessage::Join { room, user_id } => {
            join(peer, handle, conn, state, room, user_id, true).await;
        }

        ClientMessage::Create { room_code } => {
            let room = room_code.unwrap_or_else(RoomCode::generate);
            join(peer, handle, conn, state, room, None, false).await;
        }

        ClientMessage::Ready { room_code } => {
            handle.ready(conn, room_code).await;
        }

        ClientMessage::Leave => {
            if *state == ConnState::Joined {
                handle.leave_room(conn).await;
            }
            *state = ConnState::Unjoined;
        }

        signal => {
            if let Some((to, payload)) = signal.into_signal() {
                handle.signal(conn, to, payload).await;
            }
        }
    }
}

async fn join(
    peer: &PeerHandle,
    handle: &RoomManagerHandle,
    conn: ConnId,
    state: &mut ConnState,
    room: RoomCode,
    user_id: Option<PeerId>,
    announce: bool,
) {
    match handle
        .join_room(conn, peer.clone(), room, user_id, announce)
        .await
    {
        Ok(_) => *state = ConnState::Joined,
        Err(e) => {
            // a rejected re-join keeps the previous membership
            warn!("Join from {} rejected: {}", conn, e);
            peer.send_message(&ServerMessage::Error {
                message: e.to_string(),
            });
        }
    }
}
