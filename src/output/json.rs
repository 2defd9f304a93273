//! JSON output

use crate::stats::TransferResult;

pub fn output_json(results: &[TransferResult]) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Protocol;
    use std::time::Duration;

    #[test]
    fn test_json_fields() {
        let results = vec![TransferResult::new(
            Protocol::Tcp,
            2,
            10_000,
            Duration::from_millis(500),
            100.0,
        )];
        let json = output_json(&results).unwrap();
        assert!(json.contains("\"protocol\": \"tcp\""));
        assert!(json.contains("\"bytes\": 10000"));
        assert!(json.contains("\"duration_ms\": 500"));
    }
}
