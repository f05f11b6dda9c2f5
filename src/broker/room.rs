//! Rooms and their membership tables.
//!
//! A room keeps its members in arrival order. Usernames are unique within a
//! room and the member count never exceeds the room's capacity.

use crate::protocol::ReplyAddress;

use super::error::BrokerError;

/// A room member.
#[derive(Debug, Clone)]
pub struct Member {
    /// Username, unique within the room.
    pub name: String,
    /// Private channel of the member.
    pub reply_to: ReplyAddress,
}

impl Member {
    /// Create a new member.
    pub fn new(name: impl Into<String>, reply_to: ReplyAddress) -> Self {
        Self {
            name: name.into(),
            reply_to,
        }
    }
}

/// A chat room.
#[derive(Debug)]
pub struct Room {
    /// Room name.
    name: String,
    /// Members in arrival order.
    members: Vec<Member>,
    /// Maximum number of members.
    capacity: usize,
}

impl Room {
    /// Create an empty room.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            capacity,
        }
    }

    /// Get the room name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the member capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the number of members.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Get the members in arrival order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Check if a username is in the room.
    pub fn is_member(&self, user: &str) -> bool {
        self.members.iter().any(|m| m.name == user)
    }

    /// Add a member at the end of the table.
    pub fn join(&mut self, user: &str, reply_to: ReplyAddress) -> Result<(), BrokerError> {
        if self.is_member(user) {
            return Err(BrokerError::DuplicateMember {
                user: user.to_string(),
                room: self.name.clone(),
            });
        }
        if self.members.len() >= self.capacity {
            return Err(BrokerError::RoomFull {
                room: self.name.clone(),
                max: self.capacity,
            });
        }

        self.members.push(Member::new(user, reply_to));
        Ok(())
    }

    /// Remove a member, keeping the remaining members in order.
    pub fn leave(&mut self, user: &str) -> Result<Member, BrokerError> {
        let index = self
            .members
            .iter()
            .position(|m| m.name == user)
            .ok_or_else(|| BrokerError::UnknownMember {
                user: user.to_string(),
                room: self.name.clone(),
            })?;

        Ok(self.members.remove(index))
    }

    /// Snapshot of usernames in arrival order.
    pub fn usernames(&self) -> Vec<String> {
        self.members.iter().map(|m| m.name.clone()).collect()
    }

    /// Remove every member, returning them in arrival order.
    pub fn drain_members(&mut self) -> Vec<Member> {
        std::mem::take(&mut self.members)
    }
}

/// Check that a room name is present and usable as a history file stem.
pub fn validate_room_name(name: &str) -> Result<(), BrokerError> {
    if name.is_empty() {
        return Err(BrokerError::InvalidRequest("room name is empty".to_string()));
    }
    if name == "." || name == ".." {
        return Err(BrokerError::InvalidRequest(format!(
            "room name {name} is reserved"
        )));
    }
    if name
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_control())
    {
        return Err(BrokerError::InvalidRequest(format!(
            "room name {name:?} contains a path separator or control character"
        )));
    }
    Ok(())
}

/// Check that a username is present.
pub fn validate_user_name(name: &str) -> Result<(), BrokerError> {
    if name.is_empty() {
        return Err(BrokerError::InvalidRequest("username is empty".to_string()));
    }
    Ok(())
}
