// src/registry/indexer.rs
//! Read-model indexer over the issuance event log.
//!
//! The registry only exposes lookup-by-identifier, so "list every diploma"
//! is derived state: the indexer replays issuance events from a cursor and
//! folds them into an identifier-keyed projection. It is purely derived,
//! holds no authority, never writes back to the registry, and can be thrown
//! away and rebuilt from the log at any time.
//!
//! Refresh is idempotent: entries are keyed by diploma id and each id
//! appears in the log at most once, so replaying an event reduces to an
//! upsert. Partial tail reads compose without gaps or duplicates because the
//! cursor only advances past events that were actually applied.

use crate::models::diploma::IssuanceEvent;
use crate::registry::diploma_registry::DiplomaRegistry;
use ethers_core::types::{Address, H256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lightweight projection of one issued diploma.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IndexedDiploma {
    /// Identifier of the issued diploma
    pub diploma_id: String,

    /// Wallet the diploma was issued to
    pub graduate_wallet: Address,

    /// Content address of the pinned PDF
    pub ipfs_cid: String,

    /// SHA-256 digest of the PDF
    pub file_hash: H256,

    /// Log position the entry was folded from; preserves total order
    pub sequence: u64,
}

impl From<&IssuanceEvent> for IndexedDiploma {
    fn from(event: &IssuanceEvent) -> Self {
        IndexedDiploma {
            diploma_id: event.diploma_id.clone(),
            graduate_wallet: event.graduate_wallet,
            ipfs_cid: event.ipfs_cid.clone(),
            file_hash: event.file_hash,
            sequence: event.sequence,
        }
    }
}

/// Queryable in-memory index of all issued diplomas.
pub struct DiplomaIndexer {
    entries: HashMap<String, IndexedDiploma>,
    /// Next log position to pull on refresh (1-based)
    cursor: u64,
}

impl DiplomaIndexer {
    /// Creates an indexer that replays from genesis.
    pub fn new() -> Self {
        Self::from_checkpoint(1)
    }

    /// Creates an indexer that resumes from an earlier checkpoint position.
    pub fn from_checkpoint(position: u64) -> Self {
        DiplomaIndexer {
            entries: HashMap::new(),
            cursor: position.max(1),
        }
    }

    /// Next log position this indexer will pull.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Folds a batch of events into the index.
    ///
    /// Events before the cursor are replays and reduce to upserts of entries
    /// already present; the cursor advances to just past the highest sequence
    /// seen, so a later batch covering the remainder of a partial tail read
    /// continues without gaps.
    pub fn apply(&mut self, events: &[IssuanceEvent]) {
        for event in events {
            self.entries
                .insert(event.diploma_id.clone(), IndexedDiploma::from(event));
            if event.sequence >= self.cursor {
                self.cursor = event.sequence + 1;
            }
        }
    }

    /// Pulls and folds all registry events at or after the cursor.
    ///
    /// Safe to interleave with concurrent mints: a mint landing after the
    /// pull is simply picked up by the next refresh.
    pub fn refresh_from(&mut self, registry: &DiplomaRegistry) {
        let events = registry.events_from(self.cursor);
        if !events.is_empty() {
            log::debug!("indexer folding {} new issuance event(s)", events.len());
        }
        self.apply(&events);
    }

    /// Looks up one projection by diploma id.
    pub fn get(&self, diploma_id: &str) -> Option<&IndexedDiploma> {
        self.entries.get(diploma_id)
    }

    /// All indexed diplomas, newest first (display order).
    pub fn newest_first(&self) -> Vec<IndexedDiploma> {
        let mut all: Vec<IndexedDiploma> = self.entries.values().cloned().collect();
        all.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        all
    }

    /// Number of distinct diplomas indexed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been indexed yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
