//! Typed requests and notifications carried by frames.

use super::frame::{Frame, Tag};
use crate::{Result, SalonError};

/// A decoded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Join (and lazily create) a room.
    Join { user: String, room: String },
    /// Leave a room.
    Leave { user: String, room: String },
    /// Send text to every other member of a room.
    SendMessage {
        sender: String,
        room: String,
        text: String,
    },
    /// List the members of a room.
    ListUsers { room: String },
    /// List all rooms with their member counts.
    ListRooms,
}

impl Request {
    /// The tag this request travels under.
    pub fn tag(&self) -> Tag {
        match self {
            Request::Join { .. } => Tag::Join,
            Request::Leave { .. } => Tag::Leave,
            Request::SendMessage { .. } => Tag::SendMessage,
            Request::ListUsers { .. } => Tag::ListUsers,
            Request::ListRooms => Tag::ListRooms,
        }
    }

    /// Decode a request frame.
    ///
    /// Notify tags and unknown values are not requests and yield a protocol error.
    pub fn from_frame(frame: Frame) -> Result<Self> {
        let Frame {
            tag,
            sender,
            text,
            room,
            ..
        } = frame;

        match Tag::from_u8(tag) {
            Some(Tag::Join) => Ok(Request::Join { user: sender, room }),
            Some(Tag::Leave) => Ok(Request::Leave { user: sender, room }),
            Some(Tag::SendMessage) => Ok(Request::SendMessage { sender, room, text }),
            Some(Tag::ListUsers) => Ok(Request::ListUsers { room }),
            Some(Tag::ListRooms) => Ok(Request::ListRooms),
            Some(other) => Err(SalonError::Protocol(format!(
                "tag {tag} ({other}) is not a request"
            ))),
            None => Err(SalonError::Protocol(format!("unrecognized tag {tag}"))),
        }
    }

    /// Encode the request as a frame.
    pub fn into_frame(self) -> Frame {
        let tag = self.tag();
        match self {
            Request::Join { user, room } | Request::Leave { user, room } => {
                Frame::new(tag).with_sender(user).with_room(room)
            }
            Request::SendMessage { sender, room, text } => Frame::new(tag)
                .with_sender(sender)
                .with_room(room)
                .with_text(text),
            Request::ListUsers { room } => Frame::new(tag).with_room(room),
            Request::ListRooms => Frame::new(tag),
        }
    }
}

/// A frame delivered to a single reply address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notify {
    /// Outcome of a request, addressed to the requester.
    Response { text: String, error: bool },
    /// A chat message from another member of a room.
    Broadcast {
        sender: String,
        text: String,
        room: String,
    },
}

impl Notify {
    /// Successful response.
    pub fn ok(text: impl Into<String>) -> Self {
        Notify::Response {
            text: text.into(),
            error: false,
        }
    }

    /// Failure response.
    pub fn error(text: impl Into<String>) -> Self {
        Notify::Response {
            text: text.into(),
            error: true,
        }
    }

    /// Chat broadcast.
    pub fn broadcast(
        sender: impl Into<String>,
        text: impl Into<String>,
        room: impl Into<String>,
    ) -> Self {
        Notify::Broadcast {
            sender: sender.into(),
            text: text.into(),
            room: room.into(),
        }
    }

    /// Whether this is a failure response.
    pub fn is_error(&self) -> bool {
        matches!(self, Notify::Response { error: true, .. })
    }

    /// The text carried by the notification.
    pub fn text(&self) -> &str {
        match self {
            Notify::Response { text, .. } | Notify::Broadcast { text, .. } => text,
        }
    }

    /// Encode as a wire frame.
    pub fn to_frame(&self) -> Frame {
        match self {
            Notify::Response { text, error } => {
                let mut frame = Frame::new(Tag::Response).with_text(text.as_str());
                frame.error = *error;
                frame
            }
            Notify::Broadcast { sender, text, room } => Frame::new(Tag::Broadcast)
                .with_sender(sender.as_str())
                .with_text(text.as_str())
                .with_room(room.as_str()),
        }
    }

    /// Decode a notify frame.
    pub fn from_frame(frame: Frame) -> Result<Self> {
        match frame.kind() {
            Some(Tag::Response) => Ok(Notify::Response {
                text: frame.text,
                error: frame.error,
            }),
            Some(Tag::Broadcast) => Ok(Notify::Broadcast {
                sender: frame.sender,
                text: frame.text,
                room: frame.room,
            }),
            _ => Err(SalonError::Protocol(format!(
                "tag {} is not a notification",
                frame.tag
            ))),
        }
    }
}

impl std::fmt::Display for Notify {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notify::Response { text, .. } => write!(f, "[server] {text}"),
            Notify::Broadcast { sender, text, .. } => write!(f, "{sender}: {text}"),
        }
    }
}
