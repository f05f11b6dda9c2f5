//! Common test utilities for salon integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use salon::config::{BrokerConfig, ServerConfig};
use salon::{Broker, BrokerClient, BrokerHandle, BrokerServer, Notify, ShutdownReport};
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// How long a test waits for a notification before giving up.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// A broker plus TCP listener on an OS-assigned port.
pub struct TestServer {
    addr: SocketAddr,
    history_dir: TempDir,
    broker: Option<BrokerHandle>,
    listener: Option<JoinHandle<salon::Result<()>>>,
}

impl TestServer {
    /// Start a server with default limits.
    pub async fn new() -> Self {
        Self::with_config(BrokerConfig::default()).await
    }

    /// Start a server with custom broker limits. The history directory is
    /// always replaced by a fresh temporary one.
    pub async fn with_config(mut config: BrokerConfig) -> Self {
        let history_dir = tempfile::tempdir().unwrap();
        config.history_dir = history_dir.path().to_string_lossy().into_owned();

        let server_config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_connections: 32,
        };
        let server = BrokerServer::bind(&server_config).await.unwrap();
        let addr = server.local_addr().unwrap();

        let broker = Broker::start(&config);
        let listener = tokio::spawn(server.run(
            broker.sender(),
            config.outbox_capacity,
            broker.shutdown_token(),
        ));

        Self {
            addr,
            history_dir,
            broker: Some(broker),
            listener: Some(listener),
        }
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the history directory.
    pub fn history_dir(&self) -> &Path {
        self.history_dir.path()
    }

    /// Read a room's history lines.
    pub fn history(&self, room: &str) -> Vec<String> {
        salon::HistoryLog::new(self.history_dir())
            .read(room)
            .unwrap()
    }

    /// Connect a client.
    pub async fn connect(&self, username: &str) -> BrokerClient {
        BrokerClient::connect(self.addr, username).await.unwrap()
    }

    /// Stop the listener and the broker.
    pub async fn shutdown(&mut self) -> ShutdownReport {
        let broker = self.broker.take().unwrap();
        broker.shutdown_token().cancel();
        if let Some(listener) = self.listener.take() {
            listener.await.unwrap().unwrap();
        }
        broker.shutdown().await.unwrap()
    }
}

/// Wait for the next notification with a timeout.
pub async fn recv(client: &mut BrokerClient) -> Notify {
    tokio::time::timeout(RECV_TIMEOUT, client.next_notify())
        .await
        .expect("timed out waiting for notification")
        .unwrap()
}
