use super::{Transport, TransportConfig, TransportError};
use crate::cli::Protocol;
use async_trait::async_trait;
use socket2::{Domain, Protocol as SocketProtocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::timeout;
use tracing::debug;

/// UDP client socket connected to a single peer
///
/// Requests go out as one unframed datagram each; a response is one datagram
/// read into the fixed buffer, waited for at most `receive_timeout`.
pub struct UdpSocketTransport {
    socket: UdpSocket,
    peer: SocketAddr,
    buffer: Vec<u8>,
    receive_timeout: Duration,
}

impl UdpSocketTransport {
    /// Resolve `config.datagram_addr`, bind a local socket and connect it to the peer
    pub async fn connect(config: &TransportConfig) -> Result<Self, TransportError> {
        let addr = &config.datagram_addr;
        debug!("Starting UDP client for: {}", addr);

        let peer = Self::resolve(addr).await?;
        let socket = Self::bind_for(peer).map_err(|source| TransportError::Bind {
            addr: addr.clone(),
            source,
        })?;

        socket
            .connect(peer)
            .await
            .map_err(|source| TransportError::Connect {
                addr: addr.clone(),
                source,
            })?;

        debug!("UDP client bound to peer: {}", peer);
        Ok(Self {
            socket,
            peer,
            buffer: vec![0u8; config.buffer_size],
            receive_timeout: config.receive_timeout,
        })
    }

    /// Resolve the endpoint, preferring an IPv4 address when the name has several
    async fn resolve(addr: &str) -> Result<SocketAddr, TransportError> {
        let candidates: Vec<SocketAddr> = lookup_host(addr)
            .await
            .map_err(|source| TransportError::Resolve {
                addr: addr.to_string(),
                source,
            })?
            .collect();

        candidates
            .iter()
            .find(|candidate| candidate.is_ipv4())
            .or_else(|| candidates.first())
            .copied()
            .ok_or_else(|| TransportError::Unresolved(addr.to_string()))
    }

    /// Bind an ephemeral local port of the same address family as `peer`
    fn bind_for(peer: SocketAddr) -> io::Result<UdpSocket> {
        let socket = Socket::new(
            Domain::for_address(peer),
            Type::DGRAM,
            Some(SocketProtocol::UDP),
        )?;
        socket.set_nonblocking(true)?;

        let local: SocketAddr = if peer.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        socket.bind(&local.into())?;

        UdpSocket::from_std(socket.into())
    }
}

#[async_trait]
impl Transport for UdpSocketTransport {
    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    fn protocol(&self) -> Protocol {
        Protocol::Datagram
    }

    async fn send(&mut self, payload: &str) -> Result<(), TransportError> {
        self.socket
            .send(payload.as_bytes())
            .await
            .map(|_| ())
            .map_err(TransportError::Send)
    }

    async fn receive(&mut self) -> Result<usize, TransportError> {
        match timeout(self.receive_timeout, self.socket.recv(&mut self.buffer)).await {
            Ok(Ok(n)) => Ok(n),
            Ok(Err(e)) => Err(TransportError::Receive(e)),
            Err(_) => Err(TransportError::Timeout(self.receive_timeout)),
        }
    }

    fn receive_failure_is_fatal(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    /// UDP echo server; when `silent` is set it swallows every datagram
    async fn spawn_udp_server(silent: bool) -> SocketAddr {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buf = [0u8; 2048];
            while let Ok((n, from)) = socket.recv_from(&mut buf).await {
                if !silent {
                    let _ = socket.send_to(&buf[..n], from).await;
                }
            }
        });

        addr
    }

    fn config_for(addr: SocketAddr, receive_timeout: Duration) -> TransportConfig {
        TransportConfig {
            datagram_addr: addr.to_string(),
            receive_timeout,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_udp_exchange() {
        let addr = spawn_udp_server(false).await;
        let mut transport = UdpSocketTransport::connect(&config_for(addr, Duration::from_secs(1)))
            .await
            .unwrap();

        assert_eq!(transport.protocol(), Protocol::Datagram);
        assert_eq!(transport.peer_addr(), addr);
        assert!(!transport.receive_failure_is_fatal());

        transport.send("/echo test").await.unwrap();
        let received = transport.receive().await.unwrap();
        assert_eq!(&transport.buffer[..received], b"/echo test");
    }

    #[tokio::test]
    async fn test_udp_receive_times_out() {
        let addr = spawn_udp_server(true).await;
        let receive_timeout = Duration::from_millis(100);
        let mut transport = UdpSocketTransport::connect(&config_for(addr, receive_timeout))
            .await
            .unwrap();

        transport.send("Hello").await.unwrap();
        let start = Instant::now();
        match transport.receive().await {
            Err(TransportError::Timeout(waited)) => assert_eq!(waited, receive_timeout),
            other => panic!("expected a timeout, got {:?}", other),
        }
        assert!(start.elapsed() >= receive_timeout);

        // The socket stays usable after a lost datagram.
        transport.send("again").await.unwrap();
    }

    #[tokio::test]
    async fn test_udp_unresolvable_endpoint() {
        let config = TransportConfig {
            datagram_addr: "missing-port".to_string(),
            ..Default::default()
        };

        match UdpSocketTransport::connect(&config).await {
            Err(err) => assert!(err.is_setup_failure(), "unexpected error: {}", err),
            Ok(_) => panic!("an address without a port cannot be resolved"),
        }
    }
}
