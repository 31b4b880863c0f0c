use crate::cli::Protocol;
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub mod tcp_socket;
pub mod udp_socket;

pub use tcp_socket::TcpSocketTransport;
pub use udp_socket::UdpSocketTransport;

/// Failures a transport can report, either while being set up or mid-exchange
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to resolve {addr}: {source}")]
    Resolve { addr: String, source: io::Error },

    #[error("No usable address found for {0}")]
    Unresolved(String),

    #[error("Failed to connect to {addr}: {source}")]
    Connect { addr: String, source: io::Error },

    #[error("Failed to bind a local socket for {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    #[error("Send failed: {0}")]
    Send(#[source] io::Error),

    #[error("Receive failed: {0}")]
    Receive(#[source] io::Error),

    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error("Connection closed by peer")]
    Closed,
}

impl TransportError {
    /// Whether the error happened before any exchange could be attempted
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            TransportError::Resolve { .. }
                | TransportError::Unresolved(_)
                | TransportError::Connect { .. }
                | TransportError::Bind { .. }
        )
    }
}

/// Transport configuration shared by every worker of a run
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub stream_addr: String,
    pub datagram_addr: String,
    /// Size of the buffer one response is read into
    pub buffer_size: usize,
    /// Per-exchange wait for a datagram reply
    pub receive_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            stream_addr: crate::defaults::STREAM_ADDR.to_string(),
            datagram_addr: crate::defaults::DATAGRAM_ADDR.to_string(),
            buffer_size: crate::defaults::BUFFER_SIZE,
            receive_timeout: crate::defaults::RECEIVE_TIMEOUT,
        }
    }
}

/// One client's connection to an echo server
///
/// A transport is owned by exactly one worker and released when dropped, so
/// every exit path of the worker loop closes the underlying socket.
#[async_trait]
pub trait Transport: Send {
    /// Address of the echo server this transport talks to
    fn peer_addr(&self) -> SocketAddr;

    /// Which side of the comparison this transport measures
    fn protocol(&self) -> Protocol;

    /// Send one request payload, applying the protocol's framing
    async fn send(&mut self, payload: &str) -> Result<(), TransportError>;

    /// Wait for one response and return how many bytes arrived
    async fn receive(&mut self) -> Result<usize, TransportError>;

    /// Whether a failed receive leaves the transport unusable
    ///
    /// A broken TCP session cannot be reused, while a lost UDP datagram says
    /// nothing about the next one.
    fn receive_failure_is_fatal(&self) -> bool;
}

/// Transport factory for establishing per-worker connections
pub struct TransportFactory;

impl TransportFactory {
    /// Connect a new transport for the given protocol
    pub async fn connect(
        protocol: Protocol,
        config: &TransportConfig,
    ) -> Result<Box<dyn Transport>, TransportError> {
        match protocol {
            Protocol::Stream => Ok(Box::new(TcpSocketTransport::connect(config).await?)),
            Protocol::Datagram => Ok(Box::new(UdpSocketTransport::connect(config).await?)),
        }
    }
}
