//! Per-transfer results and human-readable formatting

use serde::Serialize;

use crate::protocol::Protocol;

/// Outcome of one finished transfer worker.
#[derive(Debug, Clone, Serialize)]
pub struct TransferResult {
    pub protocol: Protocol,
    /// 1-based worker number within its protocol, per orchestration cycle
    pub id: u32,
    pub bytes: u64,
    pub duration_ms: u64,
    /// Measured rate in bits per second
    pub throughput_bps: f64,
    /// 100 for TCP; distinct segments over declared total for UDP
    pub success_percent: f64,
}

impl TransferResult {
    pub fn new(
        protocol: Protocol,
        id: u32,
        bytes: u64,
        duration: std::time::Duration,
        success_percent: f64,
    ) -> Self {
        let secs = duration.as_secs_f64();
        let throughput_bps = if secs > 0.0 {
            bytes as f64 * 8.0 / secs
        } else {
            0.0
        };
        Self {
            protocol,
            id,
            bytes,
            duration_ms: duration.as_millis() as u64,
            throughput_bps,
            success_percent,
        }
    }
}

pub fn bytes_to_human(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

pub fn bps_to_human(bps: f64) -> String {
    if bps >= 1e9 {
        format!("{:.2} Gbps", bps / 1e9)
    } else if bps >= 1e6 {
        format!("{:.1} Mbps", bps / 1e6)
    } else if bps >= 1e3 {
        format!("{:.1} Kbps", bps / 1e3)
    } else {
        format!("{:.0} bps", bps)
    }
}
