//! Room broker for salon.
//!
//! This module provides:
//! - A room registry with bounded, lazy room creation
//! - Per-room membership tables
//! - Broadcast fan-out with per-recipient failure isolation
//! - Append-only per-room history logs
//! - The serialized request dispatcher and its shutdown reaper

mod dispatcher;
mod error;
mod history;
mod reaper;
mod registry;
mod room;
mod router;

pub use dispatcher::Dispatcher;
pub use error::BrokerError;
pub use history::HistoryLog;
pub use reaper::ShutdownReport;
pub use registry::{RoomRegistry, RoomSummary};
pub use room::{validate_room_name, validate_user_name, Member, Room};
pub use router::{broadcast, DeliveryReport};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::BrokerConfig;
use crate::protocol::Envelope;
use crate::{Result, SalonError};

/// Entry point for starting a broker.
pub struct Broker;

impl Broker {
    /// Create the inbound queue and spawn the dispatcher.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &BrokerConfig) -> BrokerHandle {
        let (inbound, receiver) = mpsc::channel(config.inbound_capacity.max(1));
        let shutdown = CancellationToken::new();
        let dispatcher = Dispatcher::new(config);
        let task = tokio::spawn(dispatcher.run(receiver, shutdown.clone()));

        info!(
            max_rooms = config.max_rooms,
            max_members = config.max_members_per_room,
            history_dir = %config.history_dir,
            "Broker started"
        );

        BrokerHandle {
            inbound,
            shutdown,
            task,
        }
    }
}

/// Handle to a running broker.
pub struct BrokerHandle {
    inbound: mpsc::Sender<Envelope>,
    shutdown: CancellationToken,
    task: JoinHandle<ShutdownReport>,
}

impl BrokerHandle {
    /// A producer handle for the inbound queue.
    pub fn sender(&self) -> mpsc::Sender<Envelope> {
        self.inbound.clone()
    }

    /// Token cancelled when the broker shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Queue a request, waiting while the inbound queue is full.
    pub async fn submit(&self, envelope: Envelope) -> Result<()> {
        self.inbound
            .send(envelope)
            .await
            .map_err(|_| SalonError::Channel("broker inbound channel is closed".to_string()))
    }

    /// Stop the dispatcher and release every channel resource it owns.
    pub async fn shutdown(self) -> Result<ShutdownReport> {
        self.shutdown.cancel();
        drop(self.inbound);
        self.task
            .await
            .map_err(|e| SalonError::Channel(format!("dispatcher task failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Frame, Notify, ReplyChannel, Tag};

    fn test_config(dir: &std::path::Path) -> BrokerConfig {
        BrokerConfig {
            history_dir: dir.to_string_lossy().into_owned(),
            ..BrokerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_start_submit_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let broker = Broker::start(&test_config(dir.path()));
        let (address, mut outbox) = ReplyChannel::open(8);

        broker
            .submit(Envelope::new(
                Frame::new(Tag::Join).with_sender("ana").with_room("General"),
                address.clone(),
            ))
            .await
            .unwrap();
        assert_eq!(
            outbox.recv().await.unwrap(),
            Notify::ok("You joined room: General")
        );

        broker
            .submit(Envelope::new(Frame::new(Tag::ListRooms), address))
            .await
            .unwrap();
        assert_eq!(
            outbox.recv().await.unwrap(),
            Notify::ok("Rooms: General (1)")
        );

        let token = broker.shutdown_token();
        let report = broker.shutdown().await.unwrap();
        assert!(token.is_cancelled());
        assert_eq!(report.rooms_released, 1);
        assert_eq!(report.members_released, 1);

        // The broker held the last address clone.
        assert!(outbox.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_fails() {
        let dir = tempfile::tempdir().unwrap();
        let broker = Broker::start(&test_config(dir.path()));
        let sender = broker.sender();

        broker.shutdown().await.unwrap();

        let (address, _outbox) = ReplyChannel::open(1);
        assert!(sender
            .send(Envelope::new(Frame::new(Tag::ListRooms), address))
            .await
            .is_err());
    }
}
