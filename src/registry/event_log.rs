// src/registry/event_log.rs
//! Append-only issuance event log.
//!
//! Every successful issuance appends exactly one event, in creation order.
//! The log is never reordered, rewritten, or compacted; positions are 1-based
//! and double as the token ids handed out by the registry. Reading the log is
//! the only way to enumerate all issued diplomas.

use crate::models::diploma::IssuanceEvent;

/// Strictly append-only, totally ordered sequence of issuance events.
pub struct EventLog {
    events: Vec<IssuanceEvent>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        EventLog { events: Vec::new() }
    }

    /// Position the next appended event will occupy (1-based).
    pub fn next_position(&self) -> u64 {
        self.events.len() as u64 + 1
    }

    /// Appends one event to the tail of the log.
    ///
    /// The caller assigns `sequence` before appending; the registry always
    /// uses `next_position`, so sequences are dense and strictly increasing.
    pub fn append(&mut self, event: IssuanceEvent) {
        self.events.push(event);
    }

    /// Returns every event at or after `position`, in log order.
    ///
    /// Positions before 1 are treated as 1 (read from genesis); positions
    /// past the tail yield an empty slice.
    pub fn read_from(&self, position: u64) -> &[IssuanceEvent] {
        let start = position.max(1) as usize - 1;
        if start >= self.events.len() {
            &[]
        } else {
            &self.events[start..]
        }
    }

    /// Number of events appended so far.
    pub fn len(&self) -> u64 {
        self.events.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers_core::types::{Address, H256};

    fn event(sequence: u64) -> IssuanceEvent {
        IssuanceEvent {
            diploma_id: format!("DIP-{:03}", sequence),
            graduate_wallet: Address::from_low_u64_be(0xA0 + sequence),
            ipfs_cid: format!("bafybeicid{}", sequence),
            file_hash: H256::from_low_u64_be(sequence),
            sequence,
        }
    }

    #[test]
    fn test_append_preserves_order() {
        let mut log = EventLog::new();
        for sequence in 1..=3 {
            assert_eq!(log.next_position(), sequence);
            log.append(event(sequence));
        }

        let all = log.read_from(1);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].sequence, 1);
        assert_eq!(all[2].sequence, 3);
    }

    #[test]
    fn test_read_from_tail_positions() {
        let mut log = EventLog::new();
        log.append(event(1));
        log.append(event(2));

        assert_eq!(log.read_from(2).len(), 1);
        assert_eq!(log.read_from(2)[0].diploma_id, "DIP-002");
        assert!(log.read_from(3).is_empty());
        assert!(log.read_from(99).is_empty());

        // position 0 reads from genesis
        assert_eq!(log.read_from(0).len(), 2);
    }

    #[test]
    fn test_empty_log() {
        let log = EventLog::new();
        assert_eq!(log.len(), 0);
        assert_eq!(log.next_position(), 1);
        assert!(log.read_from(1).is_empty());
    }
}
