//! Request dispatcher.
//!
//! The dispatcher owns every room and handles one request at a time. A
//! handler runs to completion before the next request is taken off the
//! inbound queue, so room and membership updates never interleave.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::BrokerConfig;
use crate::protocol::{Envelope, Notify, ReplyAddress, Request};

use super::error::BrokerError;
use super::history::HistoryLog;
use super::reaper::{self, ShutdownReport};
use super::registry::{RoomRegistry, RoomSummary};
use super::room::{validate_room_name, validate_user_name};
use super::router::{self, DeliveryReport};

/// Serialized request processor and owner of all room state.
pub struct Dispatcher {
    registry: RoomRegistry,
    history: HistoryLog,
}

impl Dispatcher {
    /// Create a dispatcher, creating any preset rooms.
    pub fn new(config: &BrokerConfig) -> Self {
        let mut dispatcher = Self {
            registry: RoomRegistry::new(config.max_rooms, config.max_members_per_room),
            history: HistoryLog::new(&config.history_dir),
        };

        for name in &config.preset_rooms {
            let created = validate_room_name(name)
                .and_then(|()| dispatcher.registry.find_or_create(name).map(|_| ()));
            if let Err(e) = created {
                warn!(room = %name, "Could not create preset room: {}", e);
            }
        }
        dispatcher
    }

    /// Get the room registry.
    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Get the history logger.
    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Process requests until `shutdown` fires or every producer is gone,
    /// then release all resources.
    pub async fn run(
        mut self,
        mut inbound: mpsc::Receiver<Envelope>,
        shutdown: CancellationToken,
    ) -> ShutdownReport {
        info!("Dispatcher started");

        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => {
                    info!("Dispatcher received shutdown signal");
                    break;
                }

                envelope = inbound.recv() => match envelope {
                    Some(envelope) => self.handle(envelope),
                    None => {
                        info!("Inbound channel closed, dispatcher stopping");
                        break;
                    }
                }
            }
        }

        reaper::reap(&mut inbound, &mut self.registry)
    }

    /// Decode and handle one request.
    ///
    /// Frames that are not requests are logged and dropped without a response.
    pub fn handle(&mut self, envelope: Envelope) {
        let Envelope { frame, reply_to } = envelope;

        let request = match Request::from_frame(frame) {
            Ok(request) => request,
            Err(e) => {
                warn!(reply_to = %reply_to.id(), "Dropping frame: {}", e);
                return;
            }
        };
        debug!(tag = %request.tag(), reply_to = %reply_to.id(), "Dispatching request");

        match request {
            Request::Join { user, room } => {
                let outcome = self.join(&user, &room, &reply_to);
                respond(&reply_to, outcome);
            }
            Request::Leave { user, room } => {
                let outcome = self.leave(&user, &room);
                respond(&reply_to, outcome);
            }
            Request::ListUsers { room } => {
                let outcome = self.list_users(&room).map(|users| format_users(&room, &users));
                respond(&reply_to, outcome);
            }
            Request::ListRooms => {
                let text = format_rooms(&self.list_rooms());
                respond(&reply_to, Ok(text));
            }
            Request::SendMessage { sender, room, text } => {
                if let Err(e) = self.send_message(&sender, &room, &text) {
                    respond(&reply_to, Err(e));
                }
            }
        }
    }

    /// Add `user` to `room`, creating the room on first reference.
    pub fn join(
        &mut self,
        user: &str,
        room: &str,
        reply_to: &ReplyAddress,
    ) -> Result<String, BrokerError> {
        validate_user_name(user)?;
        validate_room_name(room)?;

        let (target, created) = self.registry.find_or_create(room)?;
        if created {
            info!(room, "Room created");
        }
        target.join(user, reply_to.clone())?;

        info!(room, user, members = target.member_count(), "User joined room");
        Ok(format!("You joined room: {room}"))
    }

    /// Remove `user` from `room`.
    pub fn leave(&mut self, user: &str, room: &str) -> Result<String, BrokerError> {
        validate_user_name(user)?;
        validate_room_name(room)?;

        let target = self
            .registry
            .lookup_mut(room)
            .ok_or_else(|| BrokerError::UnknownRoom(room.to_string()))?;
        target.leave(user)?;

        info!(room, user, members = target.member_count(), "User left room");
        Ok(format!("You left room: {room}"))
    }

    /// Usernames in `room`, in arrival order.
    pub fn list_users(&self, room: &str) -> Result<Vec<String>, BrokerError> {
        validate_room_name(room)?;
        self.registry
            .lookup(room)
            .map(|r| r.usernames())
            .ok_or_else(|| BrokerError::UnknownRoom(room.to_string()))
    }

    /// Every room with its member count, in creation order.
    pub fn list_rooms(&self) -> Vec<RoomSummary> {
        self.registry.list()
    }

    /// Fan `text` out to the other members of `room`, then record it in the
    /// room's history.
    pub fn send_message(
        &mut self,
        sender: &str,
        room: &str,
        text: &str,
    ) -> Result<DeliveryReport, BrokerError> {
        let target = self
            .registry
            .lookup(room)
            .ok_or_else(|| BrokerError::UnknownRoom(room.to_string()))?;

        debug!(room, sender, "Message received");
        let report = router::broadcast(target, sender, text);

        if let Err(e) = self.history.append(room, sender, text) {
            error!(room, "Failed to write history: {}", e);
        }
        Ok(report)
    }
}

/// Send the single response for a request.
fn respond(reply_to: &ReplyAddress, outcome: Result<String, BrokerError>) {
    let notify = match outcome {
        Ok(text) => Notify::ok(text),
        Err(e) => {
            debug!(reply_to = %reply_to.id(), "Request failed: {}", e);
            Notify::error(e.to_string())
        }
    };

    if let Err(e) = reply_to.deliver(notify) {
        warn!("Response delivery failed: {}", e);
    }
}

fn format_users(room: &str, users: &[String]) -> String {
    if users.is_empty() {
        format!("No users in {room}")
    } else {
        format!("Users in {room}: {}", users.join(", "))
    }
}

fn format_rooms(rooms: &[RoomSummary]) -> String {
    if rooms.is_empty() {
        return "No rooms available".to_string();
    }
    let entries: Vec<String> = rooms
        .iter()
        .map(|r| format!("{} ({})", r.name, r.member_count))
        .collect();
    format!("Rooms: {}", entries.join(", "))
}
