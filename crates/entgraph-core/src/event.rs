//! The per-log event envelope handed to every handler.

use serde::{Deserialize, Serialize};

/// Envelope metadata for one decoded log, immutable to the engine.
///
/// The host guarantees envelopes arrive in canonical order, ascending
/// `(block_number, log_index)`, and that each log is delivered exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCtx {
    /// Contract address that emitted the log (`0x…`, lowercase).
    pub emitter: String,
    /// Transaction hash (`0x…`).
    pub tx_hash: String,
    /// Transaction sender (`0x…`).
    pub tx_from: String,
    /// Block number.
    pub block_number: u64,
    /// Unix timestamp of the block (seconds).
    pub block_timestamp: u64,
    /// Log index within the block.
    pub log_index: u32,
}

impl EventCtx {
    /// Canonical ordering key for this log.
    pub fn ordering(&self) -> (u64, u32) {
        (self.block_number, self.log_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(block: u64, log: u32) -> EventCtx {
        EventCtx {
            emitter: "0xaaa".into(),
            tx_hash: "0x1".into(),
            tx_from: "0xbbb".into(),
            block_number: block,
            block_timestamp: 1_700_000_000,
            log_index: log,
        }
    }

    #[test]
    fn ordering_is_block_then_log_index() {
        assert!(ctx(10, 5).ordering() < ctx(11, 0).ordering());
        assert!(ctx(10, 0).ordering() < ctx(10, 1).ordering());
    }
}
