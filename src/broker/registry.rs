//! Room registry.
//!
//! Rooms are looked up by name and listed in creation order. A room is
//! created the first time a join names it and is never removed while the
//! broker runs.

use std::collections::HashMap;

use super::error::BrokerError;
use super::room::Room;

/// Name and member count of a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    /// Room name.
    pub name: String,
    /// Number of members.
    pub member_count: usize,
}

/// Registry of all rooms.
#[derive(Debug)]
pub struct RoomRegistry {
    /// Rooms indexed by name.
    rooms: HashMap<String, Room>,
    /// Room names in creation order.
    order: Vec<String>,
    /// Maximum number of rooms.
    max_rooms: usize,
    /// Member capacity given to new rooms.
    max_members: usize,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new(max_rooms: usize, max_members: usize) -> Self {
        Self {
            rooms: HashMap::new(),
            order: Vec::new(),
            max_rooms,
            max_members,
        }
    }

    /// Get the number of rooms.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if no room exists yet.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Get the maximum number of rooms.
    pub fn max_rooms(&self) -> usize {
        self.max_rooms
    }

    /// Return the named room, creating it if there is still room for it.
    ///
    /// The returned flag is true when the room was created by this call.
    pub fn find_or_create(&mut self, name: &str) -> Result<(&mut Room, bool), BrokerError> {
        let created = if self.rooms.contains_key(name) {
            false
        } else {
            if self.order.len() >= self.max_rooms {
                return Err(BrokerError::RegistryFull {
                    room: name.to_string(),
                    max: self.max_rooms,
                });
            }
            self.rooms
                .insert(name.to_string(), Room::new(name, self.max_members));
            self.order.push(name.to_string());
            true
        };

        let room = self
            .rooms
            .get_mut(name)
            .ok_or_else(|| BrokerError::UnknownRoom(name.to_string()))?;
        Ok((room, created))
    }

    /// Get a room by name.
    pub fn lookup(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    /// Get a room by name for mutation.
    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Room> {
        self.rooms.get_mut(name)
    }

    /// Snapshot of every room in creation order.
    pub fn list(&self) -> Vec<RoomSummary> {
        self.order
            .iter()
            .filter_map(|name| self.rooms.get(name))
            .map(|room| RoomSummary {
                name: room.name().to_string(),
                member_count: room.member_count(),
            })
            .collect()
    }

    /// Remove every room, returning them in creation order.
    pub fn drain(&mut self) -> Vec<Room> {
        let order = std::mem::take(&mut self.order);
        let mut rooms = std::mem::take(&mut self.rooms);
        order
            .into_iter()
            .filter_map(|name| rooms.remove(&name))
            .collect()
    }
}
