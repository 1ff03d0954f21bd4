use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::codec::Framed;
use tracing::{debug, error, info, instrument, warn};

use crate::config::RpcConfig;
use crate::core::codec::PacketCodec;
use crate::core::packet::Packet;
use crate::error::Result;
use crate::protocol::dispatcher::Dispatcher;

/// A framed TCP connection carrying whole messages
pub struct Connection {
    framed: Framed<TcpStream, PacketCodec>,
    peer: SocketAddr,
}

impl Connection {
    pub fn from_stream(stream: TcpStream, codec: PacketCodec) -> Result<Self> {
        let peer = stream.peer_addr()?;
        Ok(Self {
            framed: Framed::new(stream, codec),
            peer,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Send one message
    pub async fn send(&mut self, payload: Vec<u8>) -> Result<()> {
        self.framed.send(Packet::new(payload)).await
    }

    /// Wait for the next message; `None` means the peer closed without sending one
    pub async fn receive(&mut self) -> Result<Option<Vec<u8>>> {
        match self.framed.next().await {
            Some(Ok(packet)) => Ok(Some(packet.payload)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    /// Flush pending writes and shut the connection down
    pub async fn close(mut self) -> Result<()> {
        SinkExt::close(&mut self.framed).await
    }
}

/// Open a connection to `address` (`host:port`)
#[instrument(skip(codec))]
pub async fn connect(address: &str, codec: PacketCodec) -> Result<Connection> {
    let stream = TcpStream::connect(address).await?;
    stream.set_nodelay(true)?;
    debug!("Connected");
    Connection::from_stream(stream, codec)
}

/// Server loop settings derived from [`RpcConfig`]
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub max_connections: usize,
    pub shutdown_timeout: Duration,
    pub request_timeout: Option<Duration>,
    pub max_payload_size: usize,
}

impl ServeOptions {
    pub fn from_config(config: &RpcConfig) -> Self {
        Self {
            max_connections: config.server.max_connections,
            shutdown_timeout: config.server.shutdown_timeout,
            request_timeout: config.server.request_timeout,
            max_payload_size: config.transport.max_payload_size,
        }
    }
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self::from_config(&RpcConfig::default())
    }
}

/// Bind the configured address and serve until CTRL+C
#[instrument(skip(config, dispatcher), fields(address = %config.server.address))]
pub async fn start_server(config: &RpcConfig, dispatcher: Arc<Dispatcher>) -> Result<()> {
    let listener = TcpListener::bind(&config.server.address).await?;

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received CTRL+C signal, shutting down");
            let _ = shutdown_tx.send(()).await;
        }
    });

    start_server_with_shutdown(
        listener,
        dispatcher,
        ServeOptions::from_config(config),
        shutdown_rx,
    )
    .await
}

/// Accept connections on `listener` until a shutdown signal arrives.
///
/// Each connection is served on its own task and carries exactly one
/// request. At most `max_connections` are served at once; further accepts
/// wait for a slot. Dropping every sender of `shutdown_rx` also stops the
/// server.
pub async fn start_server_with_shutdown(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    options: ServeOptions,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    let local_addr = listener.local_addr()?;
    info!(address = %local_addr, "Server listening");

    let slots = Arc::new(Semaphore::new(options.max_connections));
    let codec = PacketCodec::new(options.max_payload_size);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Shutting down server. Waiting for connections to close...");
                drain(&slots, options.max_connections, options.shutdown_timeout).await;
                dispatcher.metrics().log_metrics();
                info!("Server stopped");
                return Ok(());
            }

            accept_result = listener.accept() => {
                let (stream, peer) = match accept_result {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!(error = %e, "Error accepting connection");
                        dispatcher.metrics().connection_error();
                        continue;
                    }
                };

                let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
                    warn!("Connection limiter closed, stopping accept loop");
                    return Ok(());
                };

                debug!(peer = %peer, "Open connection");
                dispatcher.metrics().connection_established();

                let dispatcher = Arc::clone(&dispatcher);
                let request_timeout = options.request_timeout;
                tokio::spawn(async move {
                    match Connection::from_stream(stream, codec) {
                        Ok(conn) => {
                            dispatcher.serve_connection(conn, request_timeout).await;
                        }
                        Err(e) => {
                            error!(peer = %peer, error = %e, "Failed to set up connection");
                            dispatcher.metrics().connection_error();
                        }
                    }
                    dispatcher.metrics().connection_closed();
                    debug!(peer = %peer, "Close connection");
                    drop(permit);
                });
            }
        }
    }
}

/// Wait until every slot is free again or `limit` elapses
async fn drain(slots: &Semaphore, capacity: usize, limit: Duration) {
    let timeout = tokio::time::sleep(limit);
    tokio::pin!(timeout);

    loop {
        let active = capacity - slots.available_permits();
        if active == 0 {
            info!("All connections closed, shutting down");
            return;
        }

        tokio::select! {
            _ = &mut timeout => {
                warn!(active, "Shutdown timeout reached, forcing exit");
                return;
            }
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                debug!(active, "Waiting for connections to close");
            }
        }
    }
}
