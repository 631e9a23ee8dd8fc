use tokio::sync::mpsc;
use tracing::warn;

use super::messages::ServerMessage;
use super::types::OutboundMessage;

/// Non-owning handle to one client's outbound channel.
///
/// The transport task owns the socket; once its writer stops the receiving
/// half is dropped and the handle reports closed.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl PeerHandle {
    pub fn new(tx: mpsc::UnboundedSender<OutboundMessage>) -> Self {
        Self { tx }
    }

    /// Create a handle together with the receiver a writer task drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue a frame. Returns false when the channel is already closed.
    pub fn send(&self, msg: OutboundMessage) -> bool {
        if !self.is_open() {
            return false;
        }
        self.tx.send(msg).is_ok()
    }

    pub fn send_message(&self, msg: &ServerMessage) -> bool {
        match OutboundMessage::encode(msg) {
            Ok(out) => self.send(out),
            Err(e) => {
                warn!("Dropping unencodable message: {}", e);
                false
            }
        }
    }

    /// Ask the writer task to send a close frame and stop
    pub fn close(&self) {
        let _ = self.tx.send(OutboundMessage::Close);
    }
}
