//! WebSocket signaling relay: room membership, directed signals and media relay

mod actor;
mod connection;
mod hub;
mod messages;
mod registry;
mod router;
mod server;
mod types;

pub use actor::RoomManagerHandle;
pub use connection::PeerHandle;
pub use hub::Hub;
pub use messages::{ClientMessage, ServerMessage, SignalPayload};
pub use registry::{Member, Room, RoomRegistry};
pub use server::{DEFAULT_SIGNALING_PORT, SignalingServer};
pub use types::{ConnId, MAX_IDENT_LEN, OutboundMessage, PeerId, RoomCode, SignalingError};
