//! TCP listener for the broker's well-known address.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::protocol::Envelope;
use crate::{Result, SalonError};

use super::session::Session;

/// Server that accepts requester connections.
pub struct BrokerServer {
    listener: TcpListener,
    semaphore: Arc<Semaphore>,
    max_connections: usize,
}

impl BrokerServer {
    /// Bind the server to the configured address.
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;

        info!("Broker listening on {}", local_addr);

        Ok(Self {
            listener,
            semaphore: Arc::new(Semaphore::new(config.max_connections)),
            max_connections: config.max_connections,
        })
    }

    /// Get the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Get the maximum number of connections allowed.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Get the number of active connections.
    pub fn active_connections(&self) -> usize {
        self.max_connections - self.semaphore.available_permits()
    }

    /// Accept a new connection.
    ///
    /// Waits for a free connection slot before accepting.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit)> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| SalonError::Channel("connection semaphore closed".to_string()))?;

        let (stream, addr) = self.listener.accept().await?;
        debug!("Accepted connection from {}", addr);

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    /// Accept connections and run a session for each until `shutdown` fires.
    ///
    /// Every session forwards its requests into `inbound` and gets a private
    /// reply channel of `outbox_capacity` notifications. The listener is
    /// released when this returns.
    pub async fn run(
        self,
        inbound: mpsc::Sender<Envelope>,
        outbox_capacity: usize,
        shutdown: CancellationToken,
    ) -> Result<()> {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    info!("Listener shutting down");
                    break;
                }
                accepted = self.accept() => match accepted {
                    Ok((stream, addr, permit)) => {
                        let session = Session::new(
                            stream,
                            addr,
                            inbound.clone(),
                            outbox_capacity,
                            shutdown.child_token(),
                        );
                        tokio::spawn(async move {
                            session.run().await;
                            drop(permit);
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                }
            }
        }
        Ok(())
    }
}

/// A permit that represents an active connection slot.
///
/// When this permit is dropped, the connection slot is released.
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}
