//! Errors raised by room state operations.
//!
//! These are recovered locally by the dispatcher and reported back to the
//! requester as the text of an error notification.

use thiserror::Error;

/// Error from a registry or membership operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// No more rooms can be created.
    #[error("room limit reached ({max} rooms), cannot create {room}")]
    RegistryFull { room: String, max: usize },

    /// The room has no free member slots.
    #[error("room {room} is full ({max} members)")]
    RoomFull { room: String, max: usize },

    /// The username is already present in the room.
    #[error("{user} is already in room {room}")]
    DuplicateMember { user: String, room: String },

    /// The room does not exist.
    #[error("room {0} does not exist")]
    UnknownRoom(String),

    /// The username is not present in the room.
    #[error("{user} is not in room {room}")]
    UnknownMember { user: String, room: String },

    /// The request is missing a field or carries an unusable name.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl BrokerError {
    /// Whether this error is a capacity limit.
    pub fn is_capacity(&self) -> bool {
        matches!(
            self,
            BrokerError::RegistryFull { .. } | BrokerError::RoomFull { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = BrokerError::UnknownRoom("X".to_string());
        assert_eq!(err.to_string(), "room X does not exist");

        let err = BrokerError::DuplicateMember {
            user: "ana".to_string(),
            room: "General".to_string(),
        };
        assert_eq!(err.to_string(), "ana is already in room General");
    }

    #[test]
    fn test_is_capacity() {
        assert!(BrokerError::RegistryFull {
            room: "X".to_string(),
            max: 10
        }
        .is_capacity());
        assert!(BrokerError::RoomFull {
            room: "X".to_string(),
            max: 20
        }
        .is_capacity());
        assert!(!BrokerError::UnknownRoom("X".to_string()).is_capacity());
    }
}
