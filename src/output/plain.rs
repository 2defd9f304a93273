//! Plain text output

use crate::protocol::Protocol;
use crate::stats::{TransferResult, bps_to_human, bytes_to_human};

pub fn output_plain(results: &[TransferResult]) -> String {
    let mut output = String::new();

    output.push_str("─".repeat(60).as_str());
    output.push('\n');
    output.push_str("  spate Transfer Results\n");
    output.push_str("─".repeat(60).as_str());
    output.push('\n');
    output.push('\n');

    for result in results {
        output.push_str(&format!(
            "  {} #{}: {} in {:.2}s @ {}",
            result.protocol,
            result.id,
            bytes_to_human(result.bytes),
            result.duration_ms as f64 / 1000.0,
            bps_to_human(result.throughput_bps),
        ));
        if result.protocol == Protocol::Udp {
            output.push_str(&format!("  ({:.2}% received)", result.success_percent));
        }
        output.push('\n');
    }

    if results.is_empty() {
        output.push_str("  No transfers completed.\n");
    } else {
        let total_bytes: u64 = results.iter().map(|r| r.bytes).sum();
        output.push('\n');
        output.push_str(&format!(
            "  Total: {} over {} transfer(s)\n",
            bytes_to_human(total_bytes),
            results.len()
        ));
    }

    output.push_str("─".repeat(60).as_str());
    output.push('\n');

    output
}
