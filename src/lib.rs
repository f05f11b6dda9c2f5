//! salon - room-based chat message broker
//!
//! A single dispatcher owns every room, routes chat messages to the other
//! members of a room, keeps an append-only history per room, and answers
//! room and user listings.

pub mod broker;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod server;

pub use broker::{Broker, BrokerError, BrokerHandle, Dispatcher, HistoryLog, ShutdownReport};
pub use client::{BrokerClient, ClientError};
pub use config::Config;
pub use error::{Result, SalonError};
pub use protocol::{Envelope, Frame, Notify, ReplyAddress, ReplyChannel, Request, Tag};
pub use server::BrokerServer;
