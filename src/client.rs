//! Client library for salon.
//!
//! A [`BrokerClient`] is one requester: its TCP connection doubles as its
//! private reply channel. Requests that have a response wait for it, and
//! broadcasts that arrive in the meantime are buffered for [`next_notify`].
//!
//! The client only believes it is in a room once the broker has confirmed
//! the join, and only forgets the room once the broker has confirmed the
//! leave.
//!
//! [`next_notify`]: BrokerClient::next_notify

use std::collections::VecDeque;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

use crate::protocol::{Frame, Notify, Request};
use crate::SalonError;

/// Client-side error.
#[derive(Error, Debug)]
pub enum ClientError {
    /// I/O error on the connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The broker sent something that is not a notification.
    #[error("protocol error: {0}")]
    Protocol(#[from] SalonError),

    /// The broker closed the connection.
    #[error("connection closed by broker")]
    Disconnected,

    /// The operation needs a current room and there is none.
    #[error("not in a room")]
    NotInRoom,

    /// The broker answered with an error.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Result type alias for client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Connection to a broker.
pub struct BrokerClient {
    username: String,
    current_room: Option<String>,
    reader: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    pending: VecDeque<Notify>,
}

impl BrokerClient {
    /// Connect to the broker at `addr` as `username`.
    pub async fn connect(addr: impl ToSocketAddrs, username: impl Into<String>) -> ClientResult<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            username: username.into(),
            current_room: None,
            reader: BufReader::new(read_half).lines(),
            writer: write_half,
            pending: VecDeque::new(),
        })
    }

    /// Get the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Room confirmed by the last successful join, if any.
    pub fn current_room(&self) -> Option<&str> {
        self.current_room.as_deref()
    }

    /// Number of buffered notifications not yet taken.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    /// Join `room`, creating it if needed.
    pub async fn join(&mut self, room: &str) -> ClientResult<String> {
        let text = self
            .request(Request::Join {
                user: self.username.clone(),
                room: room.to_string(),
            })
            .await?;
        self.current_room = Some(room.to_string());
        Ok(text)
    }

    /// Leave the current room.
    pub async fn leave(&mut self) -> ClientResult<String> {
        let room = self.require_room()?;
        let text = self
            .request(Request::Leave {
                user: self.username.clone(),
                room,
            })
            .await?;
        self.current_room = None;
        Ok(text)
    }

    /// List the members of the current room.
    pub async fn list_users(&mut self) -> ClientResult<String> {
        let room = self.require_room()?;
        self.request(Request::ListUsers { room }).await
    }

    /// List every room.
    pub async fn list_rooms(&mut self) -> ClientResult<String> {
        self.request(Request::ListRooms).await
    }

    /// Send text to the current room. No response is expected on success.
    pub async fn send_message(&mut self, text: &str) -> ClientResult<()> {
        let room = self.require_room()?;
        let frame = Request::SendMessage {
            sender: self.username.clone(),
            room,
            text: text.to_string(),
        }
        .into_frame();
        self.send_frame(&frame).await
    }

    /// Write a raw frame.
    pub async fn send_frame(&mut self, frame: &Frame) -> ClientResult<()> {
        let line = frame.encode_line()?;
        self.writer.write_all(line.as_bytes()).await?;
        Ok(())
    }

    /// Next notification, buffered ones first.
    pub async fn next_notify(&mut self) -> ClientResult<Notify> {
        if let Some(notify) = self.pending.pop_front() {
            return Ok(notify);
        }
        self.read_notify().await
    }

    async fn request(&mut self, request: Request) -> ClientResult<String> {
        self.send_frame(&request.into_frame()).await?;
        match self.await_response().await? {
            Notify::Response { text, error: false } => Ok(text),
            Notify::Response { text, error: true } => Err(ClientError::Rejected(text)),
            Notify::Broadcast { .. } => Err(ClientError::Protocol(SalonError::Protocol(
                "expected a response".to_string(),
            ))),
        }
    }

    async fn await_response(&mut self) -> ClientResult<Notify> {
        loop {
            let notify = self.read_notify().await?;
            if matches!(notify, Notify::Response { .. }) {
                return Ok(notify);
            }
            debug!(user = %self.username, "Buffering broadcast while awaiting response");
            self.pending.push_back(notify);
        }
    }

    async fn read_notify(&mut self) -> ClientResult<Notify> {
        loop {
            let line = self
                .reader
                .next_line()
                .await?
                .ok_or(ClientError::Disconnected)?;
            if line.trim().is_empty() {
                continue;
            }
            let frame = Frame::decode_line(&line)?;
            return Ok(Notify::from_frame(frame)?);
        }
    }

    fn require_room(&self) -> ClientResult<String> {
        self.current_room.clone().ok_or(ClientError::NotInRoom)
    }
}
