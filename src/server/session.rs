//! Per-connection session.
//!
//! A session is one requester. It opens the requester's private reply
//! channel, forwards every decoded request frame to the broker stamped with
//! that channel's address, and writes whatever arrives on the channel back
//! to the socket.

use std::io;
use std::net::SocketAddr;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::{Envelope, Frame, Outbox, ReplyAddress, ReplyChannel, MAX_LINE_LEN};

/// Initial capacity of a session's read buffer.
const READ_BUFFER_SIZE: usize = 1024;

/// A connected requester.
pub struct Session {
    /// Unique session identifier.
    id: Uuid,
    /// The TCP stream for this connection.
    stream: TcpStream,
    /// Remote peer address.
    peer_addr: SocketAddr,
    /// Broker inbound queue.
    inbound: mpsc::Sender<Envelope>,
    /// Capacity of the private reply channel.
    outbox_capacity: usize,
    /// Cancelled when the server shuts down.
    shutdown: CancellationToken,
}

impl Session {
    /// Create a new session from a TCP stream.
    pub fn new(
        stream: TcpStream,
        peer_addr: SocketAddr,
        inbound: mpsc::Sender<Envelope>,
        outbox_capacity: usize,
        shutdown: CancellationToken,
    ) -> Self {
        let id = Uuid::new_v4();
        debug!("Created new session {} for {}", id, peer_addr);

        Self {
            id,
            stream,
            peer_addr,
            inbound,
            outbox_capacity,
            shutdown,
        }
    }

    /// Get the session ID.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get the peer address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Serve the connection until the peer disconnects or the server stops.
    pub async fn run(self) {
        let (reply_to, outbox) = ReplyChannel::open(self.outbox_capacity);
        info!(
            session = %self.id,
            peer = %self.peer_addr,
            reply_to = %reply_to.id(),
            "Session started"
        );

        let (read_half, write_half) = self.stream.into_split();
        let writer_token = self.shutdown.child_token();
        let writer = tokio::spawn(write_notifies(write_half, outbox, writer_token.clone()));

        read_requests(read_half, reply_to, &self.inbound, &self.shutdown).await;

        writer_token.cancel();
        if let Err(e) = writer.await {
            warn!(session = %self.id, "Writer task failed: {}", e);
        }
        info!(session = %self.id, peer = %self.peer_addr, "Session ended");
    }
}

/// Decode request lines and forward them to the broker.
///
/// Lines longer than [`MAX_LINE_LEN`] are discarded as they arrive, so a
/// peer that never sends a newline cannot grow the read buffer.
async fn read_requests(
    mut read_half: OwnedReadHalf,
    reply_to: ReplyAddress,
    inbound: &mpsc::Sender<Envelope>,
    shutdown: &CancellationToken,
) {
    let mut codec = LinesCodec::new_with_max_length(MAX_LINE_LEN);
    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);

    loop {
        match codec.decode(&mut buf) {
            Ok(Some(line)) => {
                if !forward_line(&line, &reply_to, inbound).await {
                    break;
                }
                continue;
            }
            Ok(None) => {}
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                warn!(
                    reply_to = %reply_to.id(),
                    "Skipping request line longer than {} bytes", MAX_LINE_LEN
                );
                continue;
            }
            Err(LinesCodecError::Io(e)) => {
                warn!(reply_to = %reply_to.id(), "Skipping undecodable line: {}", e);
                continue;
            }
        }

        let read = tokio::select! {
            () = shutdown.cancelled() => break,
            read = read_half.read_buf(&mut buf) => read,
        };

        match read {
            Ok(0) => {
                if let Ok(Some(line)) = codec.decode_eof(&mut buf) {
                    forward_line(&line, &reply_to, inbound).await;
                }
                debug!(reply_to = %reply_to.id(), "Peer closed connection");
                break;
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                warn!(reply_to = %reply_to.id(), "Read failed: {}", e);
                break;
            }
        }
    }
}

/// Forward one request line. Returns `false` once the broker is gone.
async fn forward_line(line: &str, reply_to: &ReplyAddress, inbound: &mpsc::Sender<Envelope>) -> bool {
    if line.trim().is_empty() {
        return true;
    }
    let frame = match Frame::decode_request(line) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(reply_to = %reply_to.id(), "Skipping malformed frame: {}", e);
            return true;
        }
    };
    if inbound
        .send(Envelope::new(frame, reply_to.clone()))
        .await
        .is_err()
    {
        warn!("Broker inbound channel closed");
        return false;
    }
    true
}

/// Write notifications from the outbox to the socket.
async fn write_notifies(
    mut write_half: OwnedWriteHalf,
    mut outbox: Outbox,
    shutdown: CancellationToken,
) {
    loop {
        let notify = tokio::select! {
            () = shutdown.cancelled() => break,
            notify = outbox.recv() => match notify {
                Some(notify) => notify,
                None => break,
            },
        };

        let line = match notify.to_frame().encode_line() {
            Ok(line) => line,
            Err(e) => {
                warn!(reply_to = %outbox.id(), "Failed to encode notification: {}", e);
                continue;
            }
        };
        if let Err(e) = write_half.write_all(line.as_bytes()).await {
            debug!(reply_to = %outbox.id(), "Write failed: {}", e);
            break;
        }
    }

    let _ = write_half.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Notify, Tag};
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    async fn connected_session(
        inbound: mpsc::Sender<Envelope>,
        shutdown: CancellationToken,
    ) -> (Session, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (stream, peer) = listener.accept().await.unwrap();
        (Session::new(stream, peer, inbound, 8, shutdown), client)
    }

    #[tokio::test]
    async fn test_session_forwards_frames_and_writes_replies() {
        let (tx, mut rx) = mpsc::channel(8);
        let token = CancellationToken::new();
        let (session, mut client) = connected_session(tx, token.clone()).await;
        let task = tokio::spawn(session.run());

        client
            .write_all(b"not json\n\n{\"tag\":1,\"sender\":\"ana\",\"room\":\"General\"}\n")
            .await
            .unwrap();

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.frame.kind(), Some(Tag::Join));
        assert_eq!(envelope.frame.sender, "ana");

        envelope.reply_to.deliver(Notify::ok("welcome")).unwrap();

        let mut lines = BufReader::new(&mut client).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let frame = Frame::decode_line(&line).unwrap();
        assert_eq!(frame.kind(), Some(Tag::Response));
        assert_eq!(frame.text, "welcome");

        token.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_session_closes_outbox_on_disconnect() {
        let (tx, mut rx) = mpsc::channel(8);
        let (session, mut client) = connected_session(tx, CancellationToken::new()).await;
        let task = tokio::spawn(session.run());

        client.write_all(b"{\"tag\":7}\n").await.unwrap();
        let envelope = rx.recv().await.unwrap();
        drop(client);
        task.await.unwrap();

        assert!(envelope.reply_to.is_closed());
    }

    #[tokio::test]
    async fn test_session_skips_oversized_line() {
        let (tx, mut rx) = mpsc::channel(8);
        let token = CancellationToken::new();
        let (session, mut client) = connected_session(tx, token.clone()).await;
        let task = tokio::spawn(session.run());

        let mut flood = "x".repeat(MAX_LINE_LEN * 4);
        flood.push('\n');
        client.write_all(flood.as_bytes()).await.unwrap();
        client
            .write_all(b"{\"tag\":1,\"sender\":\"ana\",\"room\":\"General\"}\n")
            .await
            .unwrap();

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.frame.kind(), Some(Tag::Join));
        assert_eq!(envelope.frame.room, "General");
        assert!(!envelope.reply_to.is_closed());

        token.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_session_clamps_request_fields() {
        let (tx, mut rx) = mpsc::channel(8);
        let token = CancellationToken::new();
        let (session, mut client) = connected_session(tx, token.clone()).await;
        let task = tokio::spawn(session.run());

        let mut line = serde_json::json!({
            "tag": 3,
            "sender": "ana",
            "room": "General",
            "text": "t".repeat(1000),
        })
        .to_string();
        line.push('\n');
        client.write_all(line.as_bytes()).await.unwrap();

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.frame.text.len(), crate::protocol::MAX_TEXT_LEN);

        token.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_session_stops_on_shutdown() {
        let (tx, _rx) = mpsc::channel(8);
        let token = CancellationToken::new();
        let (session, mut client) = connected_session(tx, token.clone()).await;
        let task = tokio::spawn(session.run());

        token.cancel();
        task.await.unwrap();

        let mut buf = Vec::new();
        let read = client.read_to_end(&mut buf).await.unwrap();
        assert_eq!(read, 0);
    }
}
