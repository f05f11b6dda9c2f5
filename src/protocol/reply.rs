//! Private reply channels.
//!
//! Each requester owns one bounded channel. The sending half, a
//! [`ReplyAddress`], travels with every request so the broker can answer and
//! fan messages out to it. Delivery never waits: a full outbox drops the
//! notification and a closed one reports the address as unavailable.

use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::frame::Frame;
use super::message::Notify;

/// Error delivering a notification to a reply address.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The recipient is not draining its outbox fast enough.
    #[error("outbox {0} is full, notification dropped")]
    OutboxFull(Uuid),
    /// The recipient's channel is closed.
    #[error("reply channel {0} is unavailable")]
    ChannelUnavailable(Uuid),
}

/// Factory for private reply channels.
pub struct ReplyChannel;

impl ReplyChannel {
    /// Open a new reply channel holding at most `capacity` pending notifications.
    pub fn open(capacity: usize) -> (ReplyAddress, Outbox) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (ReplyAddress { id, tx }, Outbox { id, rx })
    }
}

/// Opaque handle to a requester's private channel.
#[derive(Debug, Clone)]
pub struct ReplyAddress {
    id: Uuid,
    tx: mpsc::Sender<Notify>,
}

impl ReplyAddress {
    /// Channel identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Deliver a notification without waiting.
    pub fn deliver(&self, notify: Notify) -> Result<(), DeliveryError> {
        self.tx.try_send(notify).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::OutboxFull(self.id),
            mpsc::error::TrySendError::Closed(_) => DeliveryError::ChannelUnavailable(self.id),
        })
    }

    /// Whether the receiving side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl PartialEq for ReplyAddress {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ReplyAddress {}

/// Receiving end of a private reply channel.
#[derive(Debug)]
pub struct Outbox {
    id: Uuid,
    rx: mpsc::Receiver<Notify>,
}

impl Outbox {
    /// Channel identifier, equal to the matching [`ReplyAddress::id`].
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the next notification.
    ///
    /// Returns `None` once every address clone has been dropped.
    pub async fn recv(&mut self) -> Option<Notify> {
        self.rx.recv().await
    }

    /// Take a notification if one is ready.
    pub fn try_recv(&mut self) -> Option<Notify> {
        self.rx.try_recv().ok()
    }

    /// Drain everything currently queued.
    pub fn drain(&mut self) -> Vec<Notify> {
        let mut notifies = Vec::new();
        while let Some(notify) = self.try_recv() {
            notifies.push(notify);
        }
        notifies
    }
}

/// A request frame paired with the address that should hear about it.
#[derive(Debug)]
pub struct Envelope {
    /// The request as received.
    pub frame: Frame,
    /// Where responses go.
    pub reply_to: ReplyAddress,
}

impl Envelope {
    /// Pair a frame with its reply address.
    pub fn new(frame: Frame, reply_to: ReplyAddress) -> Self {
        Self { frame, reply_to }
    }
}
