//! Wire frames.
//!
//! Every frame is one JSON object on its own line. The numeric `tag` says
//! what the frame means. Request fields are bounded and clamped when a
//! session decodes them; notifications are not, since listings can run long.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Maximum length of a sender or room name, in bytes.
pub const MAX_NAME_LEN: usize = 50;

/// Maximum length of message text, in bytes.
pub const MAX_TEXT_LEN: usize = 256;

/// Longest request line a session accepts, escapes included.
pub const MAX_LINE_LEN: usize = 4096;

/// Frame tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Join a room.
    Join,
    /// Unicast response to a request.
    Response,
    /// Send a chat message to a room.
    SendMessage,
    /// Chat message fanned out to room members.
    Broadcast,
    /// Leave a room.
    Leave,
    /// List the members of a room.
    ListUsers,
    /// List all rooms.
    ListRooms,
}

impl Tag {
    /// Numeric value used on the wire.
    pub fn as_u8(&self) -> u8 {
        match self {
            Tag::Join => 1,
            Tag::Response => 2,
            Tag::SendMessage => 3,
            Tag::Broadcast => 4,
            Tag::Leave => 5,
            Tag::ListUsers => 6,
            Tag::ListRooms => 7,
        }
    }

    /// Decode a wire value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Tag::Join),
            2 => Some(Tag::Response),
            3 => Some(Tag::SendMessage),
            4 => Some(Tag::Broadcast),
            5 => Some(Tag::Leave),
            6 => Some(Tag::ListUsers),
            7 => Some(Tag::ListRooms),
            _ => None,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Join => "join",
            Tag::Response => "response",
            Tag::SendMessage => "send_message",
            Tag::Broadcast => "broadcast",
            Tag::Leave => "leave",
            Tag::ListUsers => "list_users",
            Tag::ListRooms => "list_rooms",
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A single wire frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Raw tag value. Unknown values survive decoding so the dispatcher can
    /// log and drop them.
    pub tag: u8,
    /// Sender name.
    #[serde(default)]
    pub sender: String,
    /// Message or response text.
    #[serde(default)]
    pub text: String,
    /// Room name.
    #[serde(default)]
    pub room: String,
    /// Set on responses that report a failure.
    #[serde(default, skip_serializing_if = "is_false")]
    pub error: bool,
}

impl Frame {
    /// Create an empty frame with the given tag.
    pub fn new(tag: Tag) -> Self {
        Self {
            tag: tag.as_u8(),
            ..Self::default()
        }
    }

    /// Set the sender.
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    /// Set the text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the room.
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = room.into();
        self
    }

    /// Decoded tag, if the raw value is known.
    pub fn kind(&self) -> Option<Tag> {
        Tag::from_u8(self.tag)
    }

    /// Decode one line into a frame as sent.
    pub fn decode_line(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line.trim_end())?)
    }

    /// Decode an inbound request line, clamping oversized fields.
    pub fn decode_request(line: &str) -> Result<Self> {
        let mut frame = Self::decode_line(line)?;
        frame.clamp();
        Ok(frame)
    }

    /// Encode the frame as one newline-terminated line.
    pub fn encode_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Truncate every string field to its wire limit.
    pub fn clamp(&mut self) {
        truncate_to(&mut self.sender, MAX_NAME_LEN);
        truncate_to(&mut self.room, MAX_NAME_LEN);
        truncate_to(&mut self.text, MAX_TEXT_LEN);
    }
}

/// Truncate `s` to at most `max` bytes without splitting a character.
pub fn truncate_to(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}
