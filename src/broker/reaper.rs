//! Shutdown teardown.
//!
//! Runs once, after the dispatcher loop has stopped. Closes the inbound
//! queue, discards requests that were queued but never dispatched, and
//! releases every room and member reply address in creation order.

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::protocol::Envelope;

use super::registry::RoomRegistry;

/// What the reaper released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Rooms released.
    pub rooms_released: usize,
    /// Member reply addresses released.
    pub members_released: usize,
    /// Queued requests dropped without being dispatched.
    pub pending_dropped: usize,
}

/// Release the inbound queue and every room-scoped channel.
pub fn reap(inbound: &mut mpsc::Receiver<Envelope>, registry: &mut RoomRegistry) -> ShutdownReport {
    let mut report = ShutdownReport::default();

    inbound.close();
    while let Ok(envelope) = inbound.try_recv() {
        debug!(
            tag = envelope.frame.tag,
            reply_to = %envelope.reply_to.id(),
            "Dropping undispatched request"
        );
        report.pending_dropped += 1;
    }

    for mut room in registry.drain() {
        let members = room.drain_members();
        debug!(
            room = room.name(),
            members = members.len(),
            "Releasing room"
        );
        report.members_released += members.len();
        report.rooms_released += 1;
    }

    info!(
        rooms = report.rooms_released,
        members = report.members_released,
        pending = report.pending_dropped,
        "Broker resources released"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Frame, ReplyChannel, Tag};

    #[tokio::test]
    async fn test_reap_releases_everything() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut registry = RoomRegistry::new(10, 20);

        let (a, mut a_outbox) = ReplyChannel::open(4);
        let (b, _b_outbox) = ReplyChannel::open(4);
        registry.find_or_create("General").unwrap().0.join("A", a.clone()).unwrap();
        registry.find_or_create("General").unwrap().0.join("B", b).unwrap();
        registry.find_or_create("Deportes").unwrap();

        tx.send(Envelope::new(Frame::new(Tag::ListRooms), a.clone()))
            .await
            .unwrap();
        tx.send(Envelope::new(Frame::new(Tag::ListRooms), a))
            .await
            .unwrap();

        let report = reap(&mut rx, &mut registry);

        assert_eq!(
            report,
            ShutdownReport {
                rooms_released: 2,
                members_released: 2,
                pending_dropped: 2,
            }
        );
        assert!(registry.is_empty());

        // Producers see the queue closed.
        assert!(tx
            .send(Envelope::new(Frame::new(Tag::ListRooms), ReplyChannel::open(1).0))
            .await
            .is_err());

        // Every address clone for A was held by the broker, so A's outbox ends.
        assert!(a_outbox.recv().await.is_none());
    }

    #[test]
    fn test_reap_empty() {
        let (_tx, mut rx) = mpsc::channel(1);
        let mut registry = RoomRegistry::new(10, 20);
        assert_eq!(reap(&mut rx, &mut registry), ShutdownReport::default());
    }
}
