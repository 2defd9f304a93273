//! Client mode implementation
//!
//! Drives one orchestration cycle against a discovered server: every
//! requested TCP and UDP transfer runs as its own task, results come back
//! over a channel, and the cycle ends only once every worker has been
//! joined. The binary wraps this in a listen → transfer → listen loop.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::discover::{self, DiscoveredServer};
use crate::net;
use crate::protocol::DISCOVERY_PORT;
use crate::stats::TransferResult;
use crate::{tcp, udp};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bytes requested per transfer
    pub file_size: u64,
    pub tcp_connections: u32,
    pub udp_connections: u32,
    /// Port offers are listened for on
    pub discovery_port: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            file_size: 1024 * 1024,
            tcp_connections: 1,
            udp_connections: 1,
            discovery_port: DISCOVERY_PORT,
        }
    }
}

pub struct Client {
    config: ClientConfig,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Listen for the next offer on the discovery port. The socket lives
    /// only for the listening phase; each cycle binds afresh.
    pub async fn discover(&self) -> anyhow::Result<DiscoveredServer> {
        let socket = net::create_discovery_listener(self.config.discovery_port).await?;
        info!("Listening for offers on port {}", self.config.discovery_port);
        discover::wait_for_offer(&socket).await
    }

    /// Run every configured transfer against `server` concurrently and
    /// return the per-worker results. Worker failures are logged and
    /// omitted; they never abort the cycle.
    pub async fn run_transfers(
        &self,
        server: &DiscoveredServer,
    ) -> anyhow::Result<Vec<TransferResult>> {
        if self.config.file_size == 0 {
            anyhow::bail!("file size must be positive");
        }

        let worker_count = (self.config.tcp_connections + self.config.udp_connections) as usize;
        let (tx, mut rx) = mpsc::channel(worker_count.max(1));
        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(worker_count);

        for id in 1..=self.config.tcp_connections {
            let tx = tx.clone();
            let addr = server.tcp_addr();
            let file_size = self.config.file_size;
            handles.push(tokio::spawn(async move {
                let _ = tx.send(tcp::measure(addr, file_size, id).await).await;
            }));
        }

        for id in 1..=self.config.udp_connections {
            let tx = tx.clone();
            let addr = server.udp_addr();
            let file_size = self.config.file_size;
            handles.push(tokio::spawn(async move {
                let _ = tx.send(udp::measure(addr, file_size, id).await).await;
            }));
        }
        drop(tx);

        let mut results = Vec::with_capacity(worker_count);
        while let Some(worker_result) = rx.recv().await {
            match worker_result {
                Ok(result) => results.push(result),
                Err(e) => error!("Transfer failed: {:#}", e),
            }
        }

        for handle in handles {
            let _ = handle.await;
        }

        info!(
            "Cycle complete: {} of {} transfers finished",
            results.len(),
            worker_count
        );
        Ok(results)
    }

    /// One full cycle: wait for an offer, run the transfers against it.
    pub async fn run_once(&self) -> anyhow::Result<Vec<TransferResult>> {
        let server = self.discover().await?;
        info!("Testing against {}", server);
        self.run_transfers(&server).await
    }
}
