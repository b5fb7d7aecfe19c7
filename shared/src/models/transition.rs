//! Append-only transition history
//!
//! Every committed state transition appends one record, hash-chained per
//! order so tampering or loss anywhere in the sequence is detectable.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hash value of the chain head before any transition exists
pub const GENESIS_HASH: &str = "GENESIS";

/// One audited state transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionRecord {
    /// Per-order sequence, starting at 1
    pub seq: u64,
    pub order_id: String,
    /// Server timestamp in milliseconds
    pub timestamp: i64,
    /// Acting identity (customer ref, staff ref, or "system")
    pub actor: String,
    /// Which state machine moved: "status", "payment_status", "refund_status"
    pub field: String,
    pub from_state: String,
    pub to_state: String,
    pub prev_hash: String,
    pub curr_hash: String,
}

impl TransitionRecord {
    /// Build a record chained onto `prev_hash`
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        seq: u64,
        order_id: impl Into<String>,
        timestamp: i64,
        actor: impl Into<String>,
        field: impl Into<String>,
        from_state: impl Into<String>,
        to_state: impl Into<String>,
        prev_hash: impl Into<String>,
    ) -> Self {
        let mut record = Self {
            seq,
            order_id: order_id.into(),
            timestamp,
            actor: actor.into(),
            field: field.into(),
            from_state: from_state.into(),
            to_state: to_state.into(),
            prev_hash: prev_hash.into(),
            curr_hash: String::new(),
        };
        record.curr_hash = record.compute_hash();
        record
    }

    /// Canonical hash over all fields except `curr_hash`
    pub fn compute_hash(&self) -> String {
        let canonical = format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            self.seq,
            self.order_id,
            self.timestamp,
            self.actor,
            self.field,
            self.from_state,
            self.to_state,
            self.prev_hash,
        );
        let digest = Sha256::digest(canonical.as_bytes());
        hex::encode(digest)
    }
}

/// Verify an order's full transition chain
///
/// Records must be in sequence order; returns false on any broken link,
/// recomputed-hash mismatch, or sequence gap.
pub fn verify_chain(records: &[TransitionRecord]) -> bool {
    let mut prev_hash = GENESIS_HASH.to_string();
    for (idx, record) in records.iter().enumerate() {
        if record.seq != (idx as u64) + 1 {
            return false;
        }
        if record.prev_hash != prev_hash {
            return false;
        }
        if record.curr_hash != record.compute_hash() {
            return false;
        }
        prev_hash = record.curr_hash.clone();
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_of(len: u64) -> Vec<TransitionRecord> {
        let mut records = Vec::new();
        let mut prev = GENESIS_HASH.to_string();
        for seq in 1..=len {
            let record = TransitionRecord::new(
                seq,
                "order-1",
                1_700_000_000_000 + seq as i64,
                "staff-1",
                "status",
                "PENDING",
                "PROCESSING",
                prev.clone(),
            );
            prev = record.curr_hash.clone();
            records.push(record);
        }
        records
    }

    #[test]
    fn test_valid_chain_verifies() {
        assert!(verify_chain(&chain_of(0)));
        assert!(verify_chain(&chain_of(1)));
        assert!(verify_chain(&chain_of(5)));
    }

    #[test]
    fn test_tampered_record_detected() {
        let mut records = chain_of(3);
        records[1].to_state = "CANCELLED".to_string();
        assert!(!verify_chain(&records));
    }

    #[test]
    fn test_broken_link_detected() {
        let mut records = chain_of(3);
        records[2].prev_hash = "bogus".to_string();
        assert!(!verify_chain(&records));
    }

    #[test]
    fn test_sequence_gap_detected() {
        let mut records = chain_of(3);
        records.remove(1);
        assert!(!verify_chain(&records));
    }

    #[test]
    fn test_hash_is_deterministic() {
        let a = TransitionRecord::new(
            1,
            "order-1",
            1_700_000_000_000,
            "c-1",
            "status",
            "PENDING",
            "CANCELLED",
            GENESIS_HASH,
        );
        let b = TransitionRecord::new(
            1,
            "order-1",
            1_700_000_000_000,
            "c-1",
            "status",
            "PENDING",
            "CANCELLED",
            GENESIS_HASH,
        );
        assert_eq!(a.curr_hash, b.curr_hash);
    }
}
