//! Message fan-out.

use tracing::{debug, warn};

use crate::protocol::Notify;

use super::room::Room;

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Recipients whose outbox accepted the message.
    pub delivered: usize,
    /// Recipients whose delivery failed.
    pub failed: usize,
}

/// Deliver `text` from `sender` to every other member of `room`.
///
/// Each recipient is tried once. A failed delivery is logged and does not
/// stop delivery to the remaining members.
pub fn broadcast(room: &Room, sender: &str, text: &str) -> DeliveryReport {
    let notify = Notify::broadcast(sender, text, room.name());
    let mut report = DeliveryReport::default();

    for member in room.members().iter().filter(|m| m.name != sender) {
        match member.reply_to.deliver(notify.clone()) {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                warn!(
                    room = room.name(),
                    recipient = %member.name,
                    "Broadcast delivery failed: {}",
                    e
                );
                report.failed += 1;
            }
        }
    }

    debug!(
        room = room.name(),
        sender,
        delivered = report.delivered,
        failed = report.failed,
        "Broadcast complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Outbox, ReplyChannel};

    fn join(room: &mut Room, name: &str) -> Outbox {
        let (address, outbox) = ReplyChannel::open(4);
        room.join(name, address).unwrap();
        outbox
    }

    #[test]
    fn test_broadcast_excludes_sender() {
        let mut room = Room::new("R", 20);
        let mut a = join(&mut room, "A");
        let mut b = join(&mut room, "B");
        let mut c = join(&mut room, "C");

        let report = broadcast(&room, "B", "T");
        assert_eq!(
            report,
            DeliveryReport {
                delivered: 2,
                failed: 0
            }
        );

        let expected = Notify::broadcast("B", "T", "R");
        assert_eq!(a.drain(), vec![expected.clone()]);
        assert_eq!(c.drain(), vec![expected]);
        assert!(b.drain().is_empty());
    }

    #[test]
    fn test_broadcast_isolates_failures() {
        let mut room = Room::new("R", 20);
        let mut a = join(&mut room, "A");
        let dead = join(&mut room, "Dead");
        let mut c = join(&mut room, "C");
        drop(dead);

        let report = broadcast(&room, "A", "hello");
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
        assert!(a.drain().is_empty());
        assert_eq!(c.drain().len(), 1);
    }

    #[test]
    fn test_broadcast_full_outbox_drops_only_that_recipient() {
        let mut room = Room::new("R", 20);
        let (slow_address, mut slow) = ReplyChannel::open(1);
        room.join("Slow", slow_address.clone()).unwrap();
        let mut fast = join(&mut room, "Fast");
        slow_address.deliver(Notify::ok("backlog")).unwrap();

        let report = broadcast(&room, "Sender", "hi");
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(fast.drain().len(), 1);
        assert_eq!(slow.drain(), vec![Notify::ok("backlog")]);
    }

    #[test]
    fn test_broadcast_to_lone_sender() {
        let mut room = Room::new("R", 20);
        let mut a = join(&mut room, "A");

        let report = broadcast(&room, "A", "anyone?");
        assert_eq!(report, DeliveryReport::default());
        assert!(a.drain().is_empty());
    }
}
