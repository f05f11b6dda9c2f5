//! Wire protocol for salon.
//!
//! This module provides:
//! - Line-delimited JSON frames with bounded fields
//! - Typed requests and notifications
//! - Private reply channels and request envelopes

mod frame;
mod message;
mod reply;

pub use frame::{truncate_to, Frame, Tag, MAX_LINE_LEN, MAX_NAME_LEN, MAX_TEXT_LEN};
pub use message::{Notify, Request};
pub use reply::{DeliveryError, Envelope, Outbox, ReplyAddress, ReplyChannel};
