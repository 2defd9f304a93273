//! Server mode implementation
//!
//! One process binds a TCP listener and a UDP socket on ephemeral ports,
//! advertises them over broadcast, and serves transfers for its lifetime.
//! Every accepted connection and every UDP request gets its own task; the
//! listening sockets are the only shared state.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, UdpSocket};
use tracing::{debug, error, info};

use crate::discover::{BROADCAST_INTERVAL, Broadcaster};
use crate::net;
use crate::protocol::{DISCOVERY_PORT, Offer, Request};
use crate::{tcp, udp};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port offers are broadcast to
    pub discovery_port: u16,
    pub broadcast_interval: Duration,
    /// Overrides the broadcast destination; tests point this at loopback
    pub broadcast_dest: Option<SocketAddr>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            discovery_port: DISCOVERY_PORT,
            broadcast_interval: BROADCAST_INTERVAL,
            broadcast_dest: None,
        }
    }
}

pub struct Server {
    config: ServerConfig,
    tcp_listener: TcpListener,
    udp_socket: Arc<UdpSocket>,
}

impl Server {
    /// Bind both transfer sockets. Ports are OS-assigned once here and
    /// advertised unchanged for the life of the process.
    pub async fn bind(config: ServerConfig) -> anyhow::Result<Self> {
        let tcp_listener = net::create_tcp_listener(0).await?;
        let udp_socket = Arc::new(net::create_udp_socket(0).await?);
        Ok(Self {
            config,
            tcp_listener,
            udp_socket,
        })
    }

    pub fn tcp_port(&self) -> u16 {
        self.tcp_listener
            .local_addr()
            .map(|a| a.port())
            .unwrap_or(0)
    }

    pub fn udp_port(&self) -> u16 {
        self.udp_socket.local_addr().map(|a| a.port()).unwrap_or(0)
    }

    pub fn offer(&self) -> Offer {
        Offer {
            udp_port: self.udp_port(),
            tcp_port: self.tcp_port(),
        }
    }

    /// Serve forever: broadcast offers, accept TCP transfers, answer UDP
    /// requests. Returns only on listener failure.
    pub async fn run(self) -> anyhow::Result<()> {
        let dest = self
            .config
            .broadcast_dest
            .unwrap_or_else(|| Broadcaster::broadcast_dest(self.config.discovery_port));
        let broadcaster = Broadcaster::new(self.offer(), dest, self.config.broadcast_interval);
        tokio::spawn(async move {
            if let Err(e) = broadcaster.run().await {
                error!("Broadcaster stopped: {:#}", e);
            }
        });

        let udp_socket = self.udp_socket.clone();
        tokio::spawn(async move {
            udp_request_loop(udp_socket).await;
        });

        info!(
            "Serving transfers (tcp {}, udp {})",
            self.tcp_port(),
            self.udp_port()
        );

        loop {
            let (stream, peer) = self.tcp_listener.accept().await?;
            debug!("TCP client connected: {}", peer);

            tokio::spawn(async move {
                if let Err(e) = tcp::serve_connection(stream).await {
                    error!("TCP client {} failed: {:#}", peer, e);
                }
            });
        }
    }
}

/// Receive Requests on the advertised UDP port and spawn a sender per
/// request. Malformed datagrams are dropped without a reply.
async fn udp_request_loop(socket: Arc<UdpSocket>) {
    let mut buf = [0u8; 64];

    loop {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                error!("UDP request receive failed: {}", e);
                continue;
            }
        };

        let Some(request) = Request::decode(&buf[..len]) else {
            debug!("Ignoring malformed datagram ({} bytes) from {}", len, peer);
            continue;
        };
        if request.file_size == 0 {
            debug!("Ignoring zero-size request from {}", peer);
            continue;
        }

        debug!(
            "UDP request from {}: {} bytes",
            peer, request.file_size
        );
        tokio::spawn(async move {
            if let Err(e) = udp::send_segments(peer, request.file_size).await {
                error!("UDP transfer to {} failed: {:#}", peer, e);
            }
        });
    }
}
