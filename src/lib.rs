//! spate - LAN throughput testing with zero-config discovery
//!
//! A server broadcasts its ephemeral TCP/UDP ports over UDP broadcast;
//! clients discover it and measure throughput with parallel TCP and UDP
//! transfers, reporting per-transfer duration, rate and (for UDP) the
//! fraction of segments that survived the trip.
//!
//! # Library Usage
//!
//! ```ignore
//! use spate::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Client::new(ClientConfig {
//!         file_size: 10_000_000,
//!         tcp_connections: 2,
//!         udp_connections: 2,
//!         ..Default::default()
//!     });
//!
//!     for result in client.run_once().await? {
//!         println!("{} #{}: {:.1} bps", result.protocol, result.id, result.throughput_bps);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`client`] - Client-side transfer orchestration
//! - [`serve`] - Server-side connection handling
//! - [`protocol`] - Wire message codec
//! - [`discover`] - Offer broadcast and discovery
//! - [`tcp`], [`udp`] - Transport implementations
//! - [`stats`] - Transfer results

pub mod client;
pub mod config;
pub mod discover;
pub mod net;
pub mod output;
pub mod protocol;
pub mod serve;
pub mod stats;
pub mod tcp;
pub mod udp;

pub use client::{Client, ClientConfig};
pub use discover::DiscoveredServer;
pub use protocol::Protocol;
pub use serve::{Server, ServerConfig};
pub use stats::TransferResult;
