use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Bytes;
use tracing::{debug, info};

use super::connection::PeerHandle;
use super::hub::Hub;
use super::messages::SignalPayload;
use super::types::{ConnId, PeerId, RoomCode, SignalingError};

/// Commands sent to the room manager actor
pub(crate) enum RoomCommand {
    Join {
        conn: ConnId,
        handle: PeerHandle,
        room: RoomCode,
        user_id: Option<PeerId>,
        announce: bool,
        reply: oneshot::Sender<Result<PeerId, SignalingError>>,
    },
    Ready {
        conn: ConnId,
        room: RoomCode,
    },
    Leave {
        conn: ConnId,
    },
    Signal {
        conn: ConnId,
        to: PeerId,
        payload: SignalPayload,
    },
    Relay {
        conn: ConnId,
        payload: Bytes,
    },
    Members {
        room: RoomCode,
        reply: oneshot::Sender<Option<Vec<PeerId>>>,
    },
    RoomCount {
        reply: oneshot::Sender<usize>,
    },
}

pub(crate) async fn room_manager_actor(mut rx: mpsc::Receiver<RoomCommand>) {
    let mut hub = Hub::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            RoomCommand::Join {
                conn,
                handle,
                room,
                user_id,
                announce,
                reply,
            } => {
                let _ = reply.send(hub.join(conn, handle, room, user_id, announce));
            }

            RoomCommand::Ready { conn, room } => {
                hub.ready(conn, &room);
            }

            RoomCommand::Leave { conn } => {
                if !hub.leave(conn) {
                    debug!("Leave from {} which is not in a room", conn);
                }
            }

            RoomCommand::Signal { conn, to, payload } => {
                hub.route_signal(conn, &to, payload);
            }

            RoomCommand::Relay { conn, payload } => {
                hub.relay(conn, payload);
            }

            RoomCommand::Members { room, reply } => {
                let _ = reply.send(hub.room_members(&room));
            }

            RoomCommand::RoomCount { reply } => {
                let _ = reply.send(hub.room_count());
            }
        }
    }

    info!("Room manager stopped");
}

/// Handle to communicate with the room manager actor
#[derive(Clone)]
pub struct RoomManagerHandle {
    pub(crate) tx: mpsc::Sender<RoomCommand>,
}

impl RoomManagerHandle {
    /// Spawn the actor on the current runtime
    pub fn spawn(queue_size: usize) -> Self {
        let (tx, rx) = mpsc::channel::<RoomCommand>(queue_size);
        tokio::spawn(room_manager_actor(rx));
        Self { tx }
    }

    async fn request<T>(
        &self,
        cmd: RoomCommand,
        reply_rx: oneshot::Receiver<T>,
    ) -> Result<T, SignalingError> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| SignalingError::Internal("actor channel closed".to_string()))?;
        reply_rx
            .await
            .map_err(|_| SignalingError::Internal("actor channel closed".to_string()))
    }

    /// Join (or create) a room. With `announce` unset the introduction is
    /// deferred until [`RoomManagerHandle::ready`].
    pub async fn join_room(
        &self,
        conn: ConnId,
        handle: PeerHandle,
        room: RoomCode,
        user_id: Option<PeerId>,
        announce: bool,
    ) -> Result<PeerId, SignalingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let cmd = RoomCommand::Join {
            conn,
            handle,
            room,
            user_id,
            announce,
            reply: reply_tx,
        };
        self.request(cmd, reply_rx).await?
    }

    pub async fn ready(&self, conn: ConnId, room: RoomCode) {
        let _ = self.tx.send(RoomCommand::Ready { conn, room }).await;
    }

    /// Leave the current room
    pub async fn leave_room(&self, conn: ConnId) {
        let _ = self.tx.send(RoomCommand::Leave { conn }).await;
    }

    pub async fn signal(&self, conn: ConnId, to: PeerId, payload: SignalPayload) {
        let _ = self.tx.send(RoomCommand::Signal { conn, to, payload }).await;
    }

    pub async fn relay(&self, conn: ConnId, payload: Bytes) {
        let _ = self.tx.send(RoomCommand::Relay { conn, payload }).await;
    }

    /// Sorted member ids of a room, `None` if it does not exist
    pub async fn room_members(&self, room: RoomCode) -> Result<Option<Vec<PeerId>>, SignalingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(
            RoomCommand::Members {
                room,
                reply: reply_tx,
            },
            reply_rx,
        )
        .await
    }

    pub async fn room_count(&self) -> Result<usize, SignalingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(RoomCommand::RoomCount { reply: reply_tx }, reply_rx)
            .await
    }
}
