//! CSV output

use crate::stats::TransferResult;

const HEADER: &str = "protocol,id,bytes,duration_ms,throughput_bps,success_percent";

pub fn output_csv(results: &[TransferResult]) -> String {
    let mut output = String::from(HEADER);
    output.push('\n');

    for result in results {
        output.push_str(&format!(
            "{},{},{},{},{:.0},{:.2}\n",
            result.protocol,
            result.id,
            result.bytes,
            result.duration_ms,
            result.throughput_bps,
            result.success_percent,
        ));
    }

    output
}
