//! TCP front end.
//!
//! This module provides the listener on the broker's well-known address and
//! the per-connection sessions that carry requests in and notifications out.

mod listener;
mod session;

pub use listener::{BrokerServer, ConnectionPermit};
pub use session::Session;
