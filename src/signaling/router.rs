use tokio_tungstenite::tungstenite::Bytes;
use tracing::debug;

use super::hub::Hub;
use super::messages::{ServerMessage, SignalPayload};
use super::types::{ConnId, OutboundMessage, PeerId};

impl Hub {
    /// Deliver a directed signal to `to` inside the sender's room, tagged
    /// with the sender's id. Misses are dropped without telling the sender.
    pub fn route_signal(&self, conn: ConnId, to: &PeerId, payload: SignalPayload) -> bool {
        let Some(session) = self.sessions.get(&conn) else {
            debug!("{} from unjoined {} dropped", payload.kind(), conn);
            return false;
        };
        if session.peer_id == *to {
            return false;
        }

        let recipient = self
            .registry
            .get(&session.room)
            .and_then(|room| room.get(to))
            .filter(|member| member.handle.is_open());

        match recipient {
            Some(member) => {
                let kind = payload.kind();
                let delivered = member
                    .handle
                    .send_message(&ServerMessage::signal(session.peer_id.clone(), payload));
                debug!("{} {} -> {} in room {}", kind, session.peer_id, to, session.room);
                delivered
            }
            None => {
                debug!(
                    "{} from {} to unknown peer {} in room {} dropped",
                    payload.kind(),
                    session.peer_id,
                    to,
                    session.room
                );
                false
            }
        }
    }

    /// Forward an opaque binary frame to every other open member of the
    /// sender's room. Returns how many members it was queued for.
    pub fn relay(&self, conn: ConnId, payload: Bytes) -> usize {
        let Some(session) = self.sessions.get(&conn) else {
            return 0;
        };

        self.registry
            .get(&session.room)
            .map(|room| room.broadcast(&session.peer_id, &OutboundMessage::from(payload)))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::signaling::hub::tests::{Client, join};
    use crate::signaling::types::RoomCode;

    fn offer() -> SignalPayload {
        SignalPayload::Offer(json!({"sdp": "v=0", "type": "offer"}))
    }

    #[test]
    fn directed_signal_reaches_only_recipient() {
        let mut hub = Hub::new();
        let (mut a, mut b, mut c) = (Client::new(), Client::new(), Client::new());
        join(&mut hub, &a, "r", "a");
        join(&mut hub, &b, "r", "b");
        join(&mut hub, &c, "r", "c");
        a.drain();
        b.drain();
        c.drain();

        assert!(hub.route_signal(a.conn, &PeerId::from("b"), offer()));

        assert_eq!(
            b.drain(),
            vec![ServerMessage::Offer {
                from: PeerId::from("a"),
                offer: json!({"sdp": "v=0", "type": "offer"}),
            }]
        );
        assert!(a.drain().is_empty());
        assert!(c.drain().is_empty());
    }

    #[test]
    fn signal_does_not_cross_rooms() {
        let mut hub = Hub::new();
        let (a, mut b) = (Client::new(), Client::new());
        join(&mut hub, &a, "one", "a");
        join(&mut hub, &b, "two", "b");
        b.drain();

        assert!(!hub.route_signal(a.conn, &PeerId::from("b"), offer()));
        assert!(b.drain().is_empty());
    }

    #[test]
    fn signal_to_unknown_or_closed_peer_is_dropped() {
        let mut hub = Hub::new();
        let (mut a, b) = (Client::new(), Client::new());
        join(&mut hub, &a, "r", "a");
        join(&mut hub, &b, "r", "b");
        a.drain();

        assert!(!hub.route_signal(a.conn, &PeerId::from("ghost"), offer()));
        drop(b.rx);
        assert!(!hub.route_signal(a.conn, &PeerId::from("b"), offer()));
        assert!(a.drain().is_empty());
    }

    #[test]
    fn signal_from_unjoined_or_to_self_is_dropped() {
        let mut hub = Hub::new();
        let (mut a, stranger) = (Client::new(), Client::new());
        join(&mut hub, &a, "r", "a");
        a.drain();

        assert!(!hub.route_signal(stranger.conn, &PeerId::from("a"), offer()));
        assert!(!hub.route_signal(a.conn, &PeerId::from("a"), offer()));
        assert!(a.drain().is_empty());
    }

    #[test]
    fn relay_excludes_sender() {
        let mut hub = Hub::new();
        let (mut a, mut b, mut c) = (Client::new(), Client::new(), Client::new());
        join(&mut hub, &a, "r", "a");
        join(&mut hub, &b, "r", "b");
        join(&mut hub, &c, "r", "c");
        a.drain();
        b.drain();
        c.drain();

        let frame = Bytes::from_static(&[1, 2, 3, 4]);
        assert_eq!(hub.relay(a.conn, frame.clone()), 2);

        assert!(a.drain_raw().is_empty());
        assert_eq!(b.drain_raw(), vec![OutboundMessage::Binary(frame.clone())]);
        assert_eq!(c.drain_raw(), vec![OutboundMessage::Binary(frame)]);
    }

    #[test]
    fn relay_without_room_is_dropped() {
        let hub = Hub::new();
        let a = Client::new();
        assert_eq!(hub.relay(a.conn, Bytes::from_static(b"pcm")), 0);
    }

    #[test]
    fn relay_after_leave_is_dropped() {
        let mut hub = Hub::new();
        let (a, mut b) = (Client::new(), Client::new());
        join(&mut hub, &a, "r", "a");
        join(&mut hub, &b, "r", "b");
        hub.leave(a.conn);
        b.drain();

        assert_eq!(hub.relay(a.conn, Bytes::from_static(b"pcm")), 0);
        assert!(b.drain_raw().is_empty());
        assert!(hub.room_members(&RoomCode::from("r")).is_some());
    }
}
