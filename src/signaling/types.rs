use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_tungstenite::tungstenite::{Bytes, Utf8Bytes};

use super::messages::ServerMessage;

/// Signaling server errors
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("invalid room code: {0:?}")]
    InvalidRoomCode(String),

    #[error("invalid user id: {0:?}")]
    InvalidPeerId(String),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("user id {0} taken over by another connection")]
    TakenOver(PeerId),

    #[error("internal error: {0}")]
    Internal(String),
}

const ROOM_CODE_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ROOM_CODE_LEN: usize = 8;
const HEX_CHARS: &[u8] = b"0123456789abcdef";

/// Upper bound for client supplied room codes and user ids, in bytes.
pub const MAX_IDENT_LEN: usize = 64;

fn valid_ident(s: &str) -> bool {
    !s.is_empty() && s.len() <= MAX_IDENT_LEN
}

/// Room code: opaque client chosen (or server generated) string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let code = (0..ROOM_CODE_LEN)
            .map(|_| ROOM_CODE_CHARS[rng.random_range(0..ROOM_CODE_CHARS.len())] as char)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn validate(&self) -> Result<(), SignalingError> {
        if valid_ident(&self.0) {
            Ok(())
        } else {
            Err(SignalingError::InvalidRoomCode(self.0.clone()))
        }
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomCode {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Peer ID: client supplied, or "peer_" + 8 hex when generated
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn generate() -> Self {
        let value: u32 = rand::rng().random();

        let mut id = String::with_capacity(13);
        id.push_str("peer_");
        for i in 0..8 {
            let nibble = ((value >> (28 - i * 4)) & 0xF) as usize;
            id.push(HEX_CHARS[nibble] as char);
        }
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn validate(&self) -> Result<(), SignalingError> {
        if valid_ident(&self.0) {
            Ok(())
        } else {
            Err(SignalingError::InvalidPeerId(self.0.clone()))
        }
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Server side identity of one transport connection.
///
/// Never leaves the process; clients only ever see [`PeerId`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(u64);

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

impl ConnId {
    pub fn next() -> Self {
        Self(NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Outbound frame queued for a connection's writer task.
///
/// Text and binary payloads are reference counted, so fanning one message
/// out to a whole room only clones a pointer.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Text(Utf8Bytes),
    Binary(Bytes),
    Close,
}

impl OutboundMessage {
    /// Serialize a server message into a text frame
    pub fn encode(msg: &ServerMessage) -> Result<Self, SignalingError> {
        Ok(Self::from(serde_json::to_string(msg)?))
    }
}

impl From<String> for OutboundMessage {
    fn from(s: String) -> Self {
        Self::Text(Utf8Bytes::from(s))
    }
}

impl From<Bytes> for OutboundMessage {
    fn from(b: Bytes) -> Self {
        Self::Binary(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_code_generate_has_correct_length() {
        let code = RoomCode::generate();
        assert_eq!(code.as_str().len(), 8);
    }

    #[test]
    fn room_code_generate_uses_valid_chars() {
        let code = RoomCode::generate();
        let valid_chars: Vec<char> = "abcdefghijklmnopqrstuvwxyz0123456789".chars().collect();
        for c in code.as_str().chars() {
            assert!(valid_chars.contains(&c), "Invalid char: {}", c);
        }
    }

    #[test]
    fn peer_id_generate_has_correct_format() {
        let peer_id = PeerId::generate();
        assert!(peer_id.as_str().starts_with("peer_"));
        assert_eq!(peer_id.as_str().len(), 13);
        assert!(peer_id.as_str()[5..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn short_room_codes_are_kept_verbatim() {
        let code = RoomCode::from("abc");
        assert_eq!(code.as_str(), "abc");
        assert_eq!(format!("{}", code), "abc");
    }

    #[test]
    fn validate_rejects_empty_and_overlong() {
        assert!(RoomCode::from("").validate().is_err());
        assert!(PeerId::from("").validate().is_err());

        let long = "x".repeat(MAX_IDENT_LEN + 1);
        assert!(matches!(
            RoomCode::from(long.as_str()).validate(),
            Err(SignalingError::InvalidRoomCode(_))
        ));
        assert!(matches!(
            PeerId::from(long.as_str()).validate(),
            Err(SignalingError::InvalidPeerId(_))
        ));

        let max = "x".repeat(MAX_IDENT_LEN);
        assert!(RoomCode::from(max.as_str()).validate().is_ok());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&PeerId::from("alice")).unwrap();
        assert_eq!(json, "\"alice\"");

        let code: RoomCode = serde_json::from_str("\"room-1\"").unwrap();
        assert_eq!(code, RoomCode::from("room-1"));
    }

    #[test]
    fn conn_ids_are_unique() {
        let a = ConnId::next();
        let b = ConnId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn encode_produces_text_frame() {
        let msg = ServerMessage::UserLeft {
            user_id: PeerId::from("bob"),
        };
        match OutboundMessage::encode(&msg).unwrap() {
            OutboundMessage::Text(text) => {
                assert!(text.as_str().contains("user-left"));
                assert!(text.as_str().contains("bob"));
            }
            other => panic!("Expected text frame, got {:?}", other),
        }
    }
}
