use std::collections::HashMap;

use tracing::{debug, info, warn};

use super::connection::PeerHandle;
use super::messages::ServerMessage;
use super::registry::{Member, RoomRegistry};
use super::types::{ConnId, OutboundMessage, PeerId, RoomCode, SignalingError};

/// Where a joined connection currently lives
#[derive(Debug, Clone)]
pub(super) struct Session {
    pub room: RoomCode,
    pub peer_id: PeerId,
}

/// Room state plus the connection -> membership index.
///
/// Owned by a single task (see `room_manager_actor`); nothing in here
/// blocks or waits on a peer, every delivery is a queue push.
#[derive(Debug, Default)]
pub struct Hub {
    pub(super) registry: RoomRegistry,
    pub(super) sessions: HashMap<ConnId, Session>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `conn` in `room` under `user_id` (generated when absent).
    ///
    /// The joiner always gets a `joined` acknowledgement. With `announce`
    /// set it is introduced to the room straight away, otherwise it waits
    /// for [`Hub::ready`]. A connection that is already in another room
    /// leaves it first. A different connection holding the same id in the
    /// room loses its membership and is told so with an `error`; its socket
    /// is left to the transport.
    pub fn join(
        &mut self,
        conn: ConnId,
        handle: PeerHandle,
        room: RoomCode,
        user_id: Option<PeerId>,
        announce: bool,
    ) -> Result<PeerId, SignalingError> {
        room.validate()?;
        if let Some(id) = &user_id {
            id.validate()?;
        }

        if let Some(session) = self.sessions.get(&conn) {
            let same_id = user_id.as_ref().is_none_or(|id| *id == session.peer_id);
            if session.room == room && same_id {
                let peer_id = session.peer_id.clone();
                handle.send_message(&ServerMessage::Joined {
                    room,
                    user_id: peer_id.clone(),
                });
                if announce {
                    self.announce(conn);
                }
                return Ok(peer_id);
            }
            self.leave(conn);
        }

        let peer_id = user_id.unwrap_or_else(PeerId::generate);
        let member = Member {
            conn,
            handle: handle.clone(),
            announced: false,
        };

        if let Some(previous) = self.registry.get_or_create(&room).insert(peer_id.clone(), member) {
            // the displaced connection stays open and is back to unjoined
            self.sessions.remove(&previous.conn);
            previous.handle.send_message(&ServerMessage::Error {
                message: SignalingError::TakenOver(peer_id.clone()).to_string(),
            });
            info!(
                "Peer {} in room {} taken over by {}, {} is unjoined",
                peer_id, room, conn, previous.conn
            );
        }

        self.sessions.insert(
            conn,
            Session {
                room: room.clone(),
                peer_id: peer_id.clone(),
            },
        );
        info!("Peer {} joined room {}", peer_id, room);

        handle.send_message(&ServerMessage::Joined {
            room,
            user_id: peer_id.clone(),
        });
        if announce {
            self.announce(conn);
        }

        Ok(peer_id)
    }

    /// Introduce `conn` to its room if `room` is the room it is in
    pub fn ready(&mut self, conn: ConnId, room: &RoomCode) -> bool {
        match self.sessions.get(&conn) {
            Some(session) if session.room == *room => self.announce(conn),
            _ => {
                debug!("Ready for room {} from {} which is not in it", room, conn);
                false
            }
        }
    }

    /// Pairwise introduction between `conn` and every announced member of
    /// its room. Runs at most once per membership.
    pub fn announce(&mut self, conn: ConnId) -> bool {
        let Some(session) = self.sessions.get(&conn) else {
            return false;
        };
        let Some(room) = self.registry.get_mut(&session.room) else {
            return false;
        };

        let handle = match room.get_mut(&session.peer_id) {
            Some(me) if !me.announced => {
                me.announced = true;
                me.handle.clone()
            }
            _ => return false,
        };

        let joined = match OutboundMessage::encode(&ServerMessage::UserJoined {
            user_id: session.peer_id.clone(),
        }) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Failed to encode user-joined: {}", e);
                return false;
            }
        };

        for (uid, member) in room.others(&session.peer_id) {
            if !member.announced || !member.handle.is_open() {
                continue;
            }
            member.handle.send(joined.clone());
            handle.send_message(&ServerMessage::UserJoined {
                user_id: uid.clone(),
            });
        }

        true
    }

    /// Remove `conn` from its room, tell the remaining members and drop the
    /// room once empty. Returns false if `conn` was not in a room.
    pub fn leave(&mut self, conn: ConnId) -> bool {
        let Some(Session { room: code, peer_id }) = self.sessions.remove(&conn) else {
            return false;
        };

        if let Some(room) = self.registry.get_mut(&code) {
            let removed = match room.get(&peer_id) {
                Some(member) if member.conn == conn => room.remove(&peer_id),
                _ => None,
            };

            // members never introduced to the leaver have nothing to forget
            if removed.is_some_and(|m| m.announced) {
                match OutboundMessage::encode(&ServerMessage::UserLeft {
                    user_id: peer_id.clone(),
                }) {
                    Ok(msg) => {
                        for (_, other) in room.others(&peer_id) {
                            if other.announced {
                                other.handle.send(msg.clone());
                            }
                        }
                    }
                    Err(e) => warn!("Failed to encode user-left: {}", e),
                }
            }
        }

        info!("Peer {} left room {}", peer_id, code);
        if self.registry.remove_if_empty(&code) {
            info!("Room {} removed (empty)", code);
        }

        true
    }

    /// Sorted member ids of `code`, `None` if the room does not exist
    pub fn room_members(&self, code: &RoomCode) -> Option<Vec<PeerId>> {
        self.registry.get(code).map(|room| {
            let mut ids: Vec<PeerId> = room.peer_ids().cloned().collect();
            ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            ids
        })
    }

    pub fn room_count(&self) -> usize {
        self.registry.len()
    }

    /// Room and id `conn` is registered under
    #[cfg(test)]
    pub fn membership(&self, conn: ConnId) -> Option<(&RoomCode, &PeerId)> {
        self.sessions.get(&conn).map(|s| (&s.room, &s.peer_id))
    }
}
