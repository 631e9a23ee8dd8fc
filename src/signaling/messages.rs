use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{PeerId, RoomCode};

/// Messages sent from client to server
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Join (or create) a room and get introduced right away
    Join {
        #[serde(alias = "roomCode")]
        room: RoomCode,
        #[serde(rename = "userId", default)]
        user_id: Option<PeerId>,
    },

    /// Join (or create) a room; introduction waits for `ready`
    Create {
        #[serde(rename = "roomCode", default)]
        room_code: Option<RoomCode>,
    },

    /// Introduce the sender to everyone already in the room
    Ready {
        #[serde(rename = "roomCode")]
        room_code: RoomCode,
    },

    /// Leave the current room
    Leave,

    Offer { to: PeerId, offer: Value },

    Answer { to: PeerId, answer: Value },

    IceCandidate { to: PeerId, candidate: Value },
}

impl ClientMessage {
    /// Split a directed message into its recipient and payload
    pub fn into_signal(self) -> Option<(PeerId, SignalPayload)> {
        match self {
            ClientMessage::Offer { to, offer } => Some((to, SignalPayload::Offer(offer))),
            ClientMessage::Answer { to, answer } => Some((to, SignalPayload::Answer(answer))),
            ClientMessage::IceCandidate { to, candidate } => {
                Some((to, SignalPayload::IceCandidate(candidate)))
            }
            _ => None,
        }
    }
}

/// Connection setup payload relayed verbatim between two peers
#[derive(Debug, Clone, PartialEq)]
pub enum SignalPayload {
    Offer(Value),
    Answer(Value),
    IceCandidate(Value),
}

impl SignalPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            SignalPayload::Offer(_) => "offer",
            SignalPayload::Answer(_) => "answer",
            SignalPayload::IceCandidate(_) => "ice-candidate",
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Acknowledges a join with the identifier the server registered
    Joined {
        room: RoomCode,
        #[serde(rename = "userId")]
        user_id: PeerId,
    },

    /// A peer is present in the room
    UserJoined {
        #[serde(rename = "userId")]
        user_id: PeerId,
    },

    /// A peer left the room
    UserLeft {
        #[serde(rename = "userId")]
        user_id: PeerId,
    },

    Offer { from: PeerId, offer: Value },

    Answer { from: PeerId, answer: Value },

    IceCandidate { from: PeerId, candidate: Value },

    /// Error response
    Error { message: String },
}

impl ServerMessage {
    /// Rewrite a directed payload so the recipient knows who sent it
    pub fn signal(from: PeerId, payload: SignalPayload) -> Self {
        match payload {
            SignalPayload::Offer(offer) => ServerMessage::Offer { from, offer },
            SignalPayload::Answer(answer) => ServerMessage::Answer { from, answer },
            SignalPayload::IceCandidate(candidate) => ServerMessage::IceCandidate { from, candidate },
        }
    }
}
