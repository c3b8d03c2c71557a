//! TCP broadcast transport
//!
//! [`TcpRelayServer`] accepts a bounded number of clients and pushes every
//! relayed span to all of them. Bytes sent by a client are written to an
//! optional uplink ring buffer, from where they are forwarded to the
//! receiver.
//!
//! Socket I/O goes through the `futures-io` traits via
//! `tokio_util::compat`.
//!
//! # Example
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use gnss_relay::{config::BridgeConfig, relay::{Relay, tcp::TcpRelayServer}, ring_buffer::RingBuffer};
//! # async fn example() -> gnss_relay::Result<()> {
//! let config = BridgeConfig::default();
//! let server = TcpRelayServer::bind(("0.0.0.0", config.tcp_port), &config).await?;
//! let buffer = Arc::new(RingBuffer::new(config.relay_buffer_size));
//! let relay = Relay::new(buffer, config.flush).with_transport(server.sink());
//! tokio::spawn(server.serve());
//! # let _ = relay;
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::{AsyncReadExt, AsyncWriteExt};
use log::{debug, info, warn};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::broadcast;
use tokio_util::compat::{TokioAsyncReadCompatExt, TokioAsyncWriteCompatExt};

use crate::{
    Result, config::BridgeConfig, error::GnssRelayError, relay::Transport,
    ring_buffer::RingBuffer,
};

/// Relayed spans queued per client before it is considered lagging
const CLIENT_QUEUE_DEPTH: usize = 64;

/// Size of the read buffer for client uplink data
const UPLINK_READ_SIZE: usize = 512;

/// Accept loop and client registry of the TCP relay
#[derive(Debug)]
pub struct TcpRelayServer {
    listener: TcpListener,
    sender: broadcast::Sender<Arc<[u8]>>,
    clients: Arc<AtomicUsize>,
    max_clients: usize,
    chunk_size: usize,
    uplink: Option<Arc<RingBuffer>>,
}

impl TcpRelayServer {
    /// Binds the listening socket
    ///
    /// # Arguments
    /// * `addr` - address to listen on, e.g. `("0.0.0.0", 23)`
    /// * `config` - supplies the client limit and chunk size
    pub async fn bind<A: ToSocketAddrs>(addr: A, config: &BridgeConfig) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(GnssRelayError::IoError)?;
        let (sender, _) = broadcast::channel(CLIENT_QUEUE_DEPTH);

        if let Ok(local) = listener.local_addr() {
            info!("TCP relay listening on {}", local);
        }
        Ok(TcpRelayServer {
            listener,
            sender,
            clients: Arc::new(AtomicUsize::new(0)),
            max_clients: config.max_tcp_clients,
            chunk_size: config.tcp_chunk_size,
            uplink: None,
        })
    }

    /// Routes bytes received from clients into `uplink`
    pub fn with_uplink(mut self, uplink: Arc<RingBuffer>) -> Self {
        self.uplink = Some(uplink);
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(GnssRelayError::IoError)
    }

    /// Transport handle feeding every connected client
    pub fn sink(&self) -> TcpSink {
        TcpSink {
            sender: self.sender.clone(),
            chunk_size: self.chunk_size,
        }
    }

    /// Number of clients currently served
    pub fn client_count(&self) -> usize {
        self.clients.load(Ordering::Acquire)
    }

    /// Accepts clients until the listener fails
    pub async fn serve(self) -> Result<()> {
        loop {
            let (stream, peer) = self
                .listener
                .accept()
                .await
                .map_err(GnssRelayError::IoError)?;

            if self.clients.load(Ordering::Acquire) >= self.max_clients {
                warn!("no free slot for TCP client {}, refusing", peer);
                drop(stream);
                continue;
            }
            if let Err(err) = stream.set_nodelay(true) {
                debug!("TCP_NODELAY on {} failed: {}", peer, err);
            }

            let slot = self.clients.fetch_add(1, Ordering::AcqRel);
            info!("TCP client {} connected ({} of {})", peer, slot + 1, self.max_clients);

            // Subscribe before spawning so the sink reports ready at once
            let receiver = self.sender.subscribe();
            let clients = self.clients.clone();
            let uplink = self.uplink.clone();
            tokio::spawn(async move {
                serve_client(stream, peer, receiver, uplink).await;
                clients.fetch_sub(1, Ordering::AcqRel);
                info!("TCP client {} disconnected", peer);
            });
        }
    }
}

async fn serve_client(
    stream: TcpStream,
    peer: SocketAddr,
    mut receiver: broadcast::Receiver<Arc<[u8]>>,
    uplink: Option<Arc<RingBuffer>>,
) {
    let (read_half, write_half) = stream.into_split();
    let mut reader = read_half.compat();
    let mut writer = write_half.compat_write();

    let reading = Box::pin(async move {
        let mut buf = [0u8; UPLINK_READ_SIZE];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    debug!("TCP client {} sent {} bytes", peer, n);
                    if let Some(uplink) = &uplink {
                        uplink.write(&buf[..n]);
                    }
                }
                Err(err) => {
                    debug!("TCP client {} read failed: {}", peer, err);
                    break;
                }
            }
        }
    });

    let writing = Box::pin(async move {
        loop {
            match receiver.recv().await {
                Ok(span) => {
                    if let Err(err) = writer.write_all(&span).await {
                        warn!("TCP client {} send failed: {}", peer, err);
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("TCP client {} lagging, skipped {} spans", peer, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Whichever side ends first ends the client
    futures_util::future::select(reading, writing).await;
}

/// [`Transport`] that fans spans out to all TCP clients
#[derive(Debug, Clone)]
pub struct TcpSink {
    sender: broadcast::Sender<Arc<[u8]>>,
    chunk_size: usize,
}

impl TcpSink {
    /// Clients currently subscribed to relayed spans
    pub fn subscribers(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Transport for TcpSink {
    fn name(&self) -> &'static str {
        "tcp"
    }

    fn is_ready(&self) -> bool {
        self.sender.receiver_count() > 0
    }

    fn max_payload(&self) -> usize {
        self.chunk_size
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.sender
            .send(Arc::from(data))
            .map(|_| ())
            .map_err(|_| GnssRelayError::TransportError("no TCP client connected"))
    }
}
