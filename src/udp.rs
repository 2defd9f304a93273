//! UDP transfer engine
//!
//! The server answers each Request by firing the whole transfer as
//! back-to-back Payload datagrams with no pacing or retransmission; loss is
//! the quantity under measurement. The client collects segments into a
//! distinct-index set until the stream goes quiet, then derives throughput
//! and delivery success from what actually arrived.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use tracing::{debug, warn};

use crate::net;
use crate::protocol::{
    MAX_SEGMENT_SIZE, PayloadHeader, Protocol, Request, segment_len, total_segments,
};
use crate::stats::TransferResult;

/// Gap with no datagram that ends a transfer once data has been seen
pub const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(1);

/// Ceiling on waiting for the very first segment of a transfer
pub const FIRST_SEGMENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Serve one Request: segment `file_size` bytes and send every Payload
/// datagram back-to-back to `peer` from a fresh socket. Fire-and-forget;
/// a failed send is logged and the remaining segments still go out.
pub async fn send_segments(peer: SocketAddr, file_size: u64) -> anyhow::Result<u64> {
    let socket = net::create_udp_socket(0).await?;

    let total = total_segments(file_size);
    let mut datagram = vec![0u8; PayloadHeader::LEN + MAX_SEGMENT_SIZE];

    for index in 0..total {
        let header = PayloadHeader {
            total_segments: total,
            segment_index: index,
        };
        header.encode(&mut datagram);
        let len = PayloadHeader::LEN + segment_len(file_size, index);

        if let Err(e) = socket.send_to(&datagram[..len], peer).await {
            warn!("Payload send to {} failed: {}", peer, e);
        }
    }

    debug!("UDP transfer sent: {} segments to {}", total, peer);
    Ok(total)
}

/// Receiver-side accounting for one UDP transfer. Duplicate and reordered
/// segments are tolerated by keying on the segment index.
#[derive(Default)]
pub struct SegmentTracker {
    received: HashSet<u64>,
    bytes: u64,
    /// total_segments as declared by the sender's headers
    declared_total: Option<u64>,
}

impl SegmentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, header: &PayloadHeader, data_len: usize) {
        if self.received.insert(header.segment_index) {
            self.bytes += data_len as u64;
        }
        if self.declared_total.is_none() {
            self.declared_total = Some(header.total_segments);
        }
    }

    pub fn distinct(&self) -> u64 {
        self.received.len() as u64
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Delivery success against the sender-declared total, falling back to
    /// `expected` when no segment ever arrived.
    pub fn success_percent(&self, expected: u64) -> f64 {
        let total = self.declared_total.unwrap_or(expected);
        if total == 0 {
            return 0.0;
        }
        100.0 * self.distinct() as f64 / total as f64
    }
}

/// Run one measured UDP transfer: send the Request, then drain segments
/// until the inactivity timeout. The transfer never blocks forever: a peer
/// that stays silent trips the startup ceiling and yields an empty result.
pub async fn measure(server: SocketAddr, file_size: u64, id: u32) -> anyhow::Result<TransferResult> {
    if file_size == 0 {
        bail!("requested size must be positive");
    }

    let socket = net::create_udp_socket(0).await?;
    let request = Request { file_size };
    socket
        .send_to(&request.encode(), server)
        .await
        .with_context(|| format!("UDP request to {}", server))?;

    let start = Instant::now();
    let mut tracker = SegmentTracker::new();
    let mut buf = vec![0u8; PayloadHeader::LEN + MAX_SEGMENT_SIZE];

    loop {
        let wait = if tracker.distinct() == 0 {
            FIRST_SEGMENT_TIMEOUT
        } else {
            INACTIVITY_TIMEOUT
        };

        match tokio::time::timeout(wait, socket.recv_from(&mut buf)).await {
            Ok(Ok((len, _peer))) => match PayloadHeader::decode(&buf[..len]) {
                Some((header, data)) => tracker.record(&header, data.len()),
                None => debug!("UDP transfer #{}: ignoring malformed datagram", id),
            },
            Ok(Err(e)) => {
                warn!("UDP transfer #{}: receive error: {}", id, e);
            }
            Err(_) => break,
        }
    }
    let duration = start.elapsed();

    let success = tracker.success_percent(total_segments(file_size));
    debug!(
        "UDP transfer #{}: {} segments, {:.2}% delivered",
        id,
        tracker.distinct(),
        success
    );

    Ok(TransferResult::new(
        Protocol::Udp,
        id,
        tracker.bytes(),
        duration,
        success,
    ))
}
