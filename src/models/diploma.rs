// src/models/diploma.rs
//! Diploma data model implementation.
//!
//! Defines the core structures stored by the diploma registry:
//! - `DiplomaRecord`: the authoritative credential record, keyed by diploma id
//! - `DiplomaAttributes`: free-form descriptive fields carried alongside a record
//! - `IssuanceEvent`: one append-only log entry per successful issuance
//!
//! Addresses and digests use the Ethereum-compatible fixed-width types
//! (`Address`, `H256`) so that wallets and 32-byte SHA-256 digests serialize
//! as `0x`-prefixed hex strings in JSON.

use ethers_core::types::{Address, H256};
use serde::{Deserialize, Serialize};

/// Descriptive fields attached to a diploma at issuance time.
///
/// These are free-form strings chosen by the issuing institution. They are
/// stored verbatim (no normalization, no format validation) and are immutable
/// once the diploma is issued.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DiplomaAttributes {
    /// Full name of the graduate
    /// Example: "Alice"
    pub student_name: String,

    /// Academic program completed
    /// Example: "Blockchain Engineering"
    pub program: String,

    /// Graduation date as written by the institution
    /// Example: "2024-10-01"
    pub graduation_date: String,

    /// Name of the issuing institution
    /// Example: "Universidad Web3"
    pub institution_name: String,
}

/// An issued diploma credential.
///
/// A record is created exactly once, by the institution admin, and is never
/// updated or deleted afterwards. The `diploma_id` is the natural key; the
/// token id assigned at issuance is a secondary, derived reference.
///
/// # Fields
/// - `diploma_id`: authority-chosen unique identifier
/// - `graduate_wallet`: wallet address of the credential holder
/// - `file_hash`: SHA-256 digest of the canonical PDF
/// - `ipfs_cid`: content address of the pinned PDF
/// - `attributes`: descriptive fields, stored verbatim
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DiplomaRecord {
    /// Unique identifier chosen by the issuing institution
    /// Example: "DIP-001-2024"
    pub diploma_id: String,

    /// Wallet address of the graduate holding this diploma
    pub graduate_wallet: Address,

    /// SHA-256 digest of the diploma PDF, fixed 32 bytes
    pub file_hash: H256,

    /// IPFS content identifier of the pinned PDF
    /// Example: "bafybeigdyrszipfsplaceholder"
    pub ipfs_cid: String,

    /// Descriptive fields recorded at issuance
    pub attributes: DiplomaAttributes,
}

/// Append-only log entry emitted once per successful issuance.
///
/// Events are totally ordered by `sequence` (1-based, equal to the token id
/// assigned to the diploma). Replaying the event log is the only way to
/// enumerate every issued diploma; the registry lookup API is keyed by
/// diploma id only.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IssuanceEvent {
    /// Identifier of the issued diploma
    pub diploma_id: String,

    /// Wallet the diploma was issued to
    pub graduate_wallet: Address,

    /// Content address of the pinned PDF
    pub ipfs_cid: String,

    /// SHA-256 digest of the PDF
    pub file_hash: H256,

    /// Position in the event log, starting at 1
    pub sequence: u64,
}
