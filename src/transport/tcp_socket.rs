use super::{Transport, TransportConfig, TransportError};
use crate::cli::Protocol;
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// TCP client session
///
/// Requests are framed as one newline-terminated line. A response is whatever
/// a single read returns: there is no length prefix and no reassembly, so an
/// echo split across several segments is measured at its first segment.
pub struct TcpSocketTransport {
    stream: TcpStream,
    peer: SocketAddr,
    buffer: Vec<u8>,
    frame: Vec<u8>,
}

impl TcpSocketTransport {
    /// Open a session to `config.stream_addr`
    pub async fn connect(config: &TransportConfig) -> Result<Self, TransportError> {
        let addr = &config.stream_addr;
        debug!("Starting TCP client connecting to: {}", addr);

        let stream = TcpStream::connect(addr.as_str())
            .await
            .map_err(|source| TransportError::Connect {
                addr: addr.clone(),
                source,
            })?;

        // Configure socket options for low latency
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY on connection to {}: {}", addr, e);
        }

        let peer = stream
            .peer_addr()
            .map_err(|source| TransportError::Connect {
                addr: addr.clone(),
                source,
            })?;

        debug!("TCP client connected to: {}", peer);
        Ok(Self {
            stream,
            peer,
            buffer: vec![0u8; config.buffer_size],
            frame: Vec::new(),
        })
    }
}

#[async_trait]
impl Transport for TcpSocketTransport {
    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    fn protocol(&self) -> Protocol {
        Protocol::Stream
    }

    async fn send(&mut self, payload: &str) -> Result<(), TransportError> {
        self.frame.clear();
        self.frame.extend_from_slice(payload.as_bytes());
        self.frame.push(b'\n');

        self.stream
            .write_all(&self.frame)
            .await
            .map_err(TransportError::Send)
    }

    async fn receive(&mut self) -> Result<usize, TransportError> {
        match self.stream.read(&mut self.buffer).await {
            Ok(0) => Err(TransportError::Closed),
            Ok(n) => Ok(n),
            Err(e) => Err(TransportError::Receive(e)),
        }
    }

    fn receive_failure_is_fatal(&self) -> bool {
        true
    }
}
