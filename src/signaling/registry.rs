use std::collections::HashMap;

use super::connection::PeerHandle;
use super::types::{ConnId, OutboundMessage, PeerId, RoomCode};

#[derive(Debug, Clone)]
pub struct Member {
    pub conn: ConnId,
    pub handle: PeerHandle,
    /// Set once the member took part in the pairwise `user-joined` exchange
    pub announced: bool,
}

#[derive(Debug, Default)]
pub struct Room {
    members: HashMap<PeerId, Member>,
}

impl Room {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, id: &PeerId) -> Option<&Member> {
        self.members.get(id)
    }

    pub fn get_mut(&mut self, id: &PeerId) -> Option<&mut Member> {
        self.members.get_mut(id)
    }

    /// Insert or replace the member registered under `id`
    pub fn insert(&mut self, id: PeerId, member: Member) -> Option<Member> {
        self.members.insert(id, member)
    }

    pub fn remove(&mut self, id: &PeerId) -> Option<Member> {
        self.members.remove(id)
    }

    pub fn peer_ids(&self) -> impl Iterator<Item = &PeerId> {
        self.members.keys()
    }

    /// Every member except `id`
    pub fn others<'a>(&'a self, id: &'a PeerId) -> impl Iterator<Item = (&'a PeerId, &'a Member)> {
        self.members.iter().filter(move |(uid, _)| *uid != id)
    }

    /// Queue `msg` for every open member except `except`. Returns the number
    /// of members it was queued for.
    pub fn broadcast(&self, except: &PeerId, msg: &OutboundMessage) -> usize {
        self.others(except)
            .filter(|(_, m)| m.handle.send(msg.clone()))
            .count()
    }
}

/// Room code -> room. Rooms are created on first join and dropped as soon
/// as they become empty.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, code: &RoomCode) -> &mut Room {
        self.rooms.entry(code.clone()).or_default()
    }

    pub fn get(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn get_mut(&mut self, code: &RoomCode) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }

    pub fn remove(&mut self, code: &RoomCode) -> Option<Room> {
        self.rooms.remove(code)
    }

    /// Drop the room if nobody is left in it
    pub fn remove_if_empty(&mut self, code: &RoomCode) -> bool {
        if self.rooms.get(code).is_some_and(Room::is_empty) {
            return self.remove(code).is_some();
        }
        false
    }

    pub fn contains(&self, code: &RoomCode) -> bool {
        self.rooms.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
