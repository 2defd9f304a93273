//! LAN discovery via UDP broadcast
//!
//! The server repeats its Offer on the well-known discovery port; clients
//! bind that port and take the first valid offer they hear. Datagrams that
//! fail to decode are skipped, never fatal.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::net;
use crate::protocol::Offer;

/// Default cadence between offer broadcasts
pub const BROADCAST_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct DiscoveredServer {
    pub ip: IpAddr,
    pub udp_port: u16,
    pub tcp_port: u16,
}

impl std::fmt::Display for DiscoveredServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (udp {}, tcp {})",
            self.ip, self.udp_port, self.tcp_port
        )
    }
}

impl DiscoveredServer {
    pub fn tcp_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.tcp_port)
    }

    pub fn udp_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.udp_port)
    }
}

/// Periodically broadcasts one server's Offer.
///
/// The destination is normally `255.255.255.255:<discovery port>`; tests
/// point it at loopback instead.
pub struct Broadcaster {
    offer: Offer,
    dest: SocketAddr,
    interval: Duration,
}

impl Broadcaster {
    pub fn new(offer: Offer, dest: SocketAddr, interval: Duration) -> Self {
        Self {
            offer,
            dest,
            interval,
        }
    }

    /// Broadcast destination for the given discovery port.
    pub fn broadcast_dest(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), port)
    }

    /// Send offers forever. Individual send failures are logged and the
    /// cadence continues; only socket creation can fail.
    pub async fn run(self) -> anyhow::Result<()> {
        let socket = net::create_broadcast_socket().await?;
        let packet = self.offer.encode();
        let mut ticker = tokio::time::interval(self.interval);

        info!(
            "Broadcasting offers to {} every {:?} (udp {}, tcp {})",
            self.dest, self.interval, self.offer.udp_port, self.offer.tcp_port
        );

        loop {
            ticker.tick().await;
            if let Err(e) = socket.send_to(&packet, self.dest).await {
                warn!("Offer broadcast failed: {}", e);
            }
        }
    }
}

/// Block on `socket` until a valid Offer arrives, returning the sender and
/// its advertised ports. Non-offer traffic on the port is skipped.
pub async fn wait_for_offer(socket: &UdpSocket) -> anyhow::Result<DiscoveredServer> {
    let mut buf = [0u8; 64];

    loop {
        let (len, peer) = socket.recv_from(&mut buf).await?;
        match Offer::decode(&buf[..len]) {
            Some(offer) => {
                info!("Received offer from {}", peer.ip());
                return Ok(DiscoveredServer {
                    ip: peer.ip(),
                    udp_port: offer.udp_port,
                    tcp_port: offer.tcp_port,
                });
            }
            None => {
                debug!("Ignoring malformed datagram ({} bytes) from {}", len, peer);
            }
        }
    }
}
