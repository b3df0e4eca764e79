// src/registry/diploma_registry.rs
//! Authoritative diploma registry state machine.
//!
//! The registry is the single source of truth for issued diplomas. It
//! enforces the two invariants everything else relies on:
//! - only the current institution admin can mint
//! - a diploma id is minted at most once, and never overwritten
//!
//! Every accepted mint stores the record verbatim, assigns the next token id,
//! records the token-id-to-diploma-id mapping, and appends exactly one
//! issuance event. Rejected operations leave no trace: creation is
//! all-or-nothing.
//!
//! State transitions are serialized through a single write lock, so two
//! concurrent mints for the same diploma id resolve to exactly one success
//! and one `DuplicateIdentifier` rejection. Lookups take the read lock and
//! run with unbounded parallelism.

use crate::models::diploma::{DiplomaAttributes, DiplomaRecord, IssuanceEvent};
use crate::registry::event_log::EventLog;
use ethers_core::types::{Address, H256};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use thiserror::Error;

/// Role a caller must hold for a gated operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Deployer-level role, allowed to rotate the institution admin
    Owner,
    /// The single address allowed to mint diplomas
    InstitutionAdmin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => write!(f, "owner"),
            Role::InstitutionAdmin => write!(f, "institution admin"),
        }
    }
}

/// Errors returned by registry operations.
///
/// Every variant is a rejected precondition: the operation had no effect on
/// registry state. None of these are retried internally; `Unauthorized` is
/// recoverable only by calling with the right address, and
/// `DuplicateIdentifier` is permanent for that diploma id.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Caller does not hold the role the operation requires.
    #[error("unauthorized: caller 0x{caller:x} is not the {required}")]
    Unauthorized { caller: Address, required: Role },

    /// The diploma id has already been minted.
    #[error("diploma already minted: {0}")]
    DuplicateIdentifier(String),

    /// No diploma was ever minted under this token id.
    #[error("unknown token id: {0}")]
    UnknownToken(u64),
}

/// Current privileged addresses, owned by the registry.
///
/// Mutated only through the gated operations below; never reachable as
/// ambient global state. Rotating the admin does not touch issued records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorityConfig {
    /// Address allowed to rotate the institution admin
    pub owner: Address,
    /// Address allowed to mint diplomas
    pub institution_admin: Address,
}

struct RegistryInner {
    authority: AuthorityConfig,
    diplomas: HashMap<String, DiplomaRecord>,
    token_to_id: HashMap<u64, String>,
    log: EventLog,
}

/// Thread-safe diploma registry.
///
/// Wraps all authoritative state behind one `RwLock`: mints and authority
/// changes serialize through the write lock, reads share the read lock.
pub struct DiplomaRegistry {
    inner: RwLock<RegistryInner>,
}

impl DiplomaRegistry {
    /// Creates a registry with the given owner and initial institution admin.
    ///
    /// # Arguments
    /// * `owner` - Address allowed to rotate the institution admin
    /// * `institution_admin` - Initial minting authority
    pub fn new(owner: Address, institution_admin: Address) -> Self {
        DiplomaRegistry {
            inner: RwLock::new(RegistryInner {
                authority: AuthorityConfig {
                    owner,
                    institution_admin,
                },
                diplomas: HashMap::new(),
                token_to_id: HashMap::new(),
                log: EventLog::new(),
            }),
        }
    }

    /// Mints a new diploma.
    ///
    /// # Arguments
    /// * `caller` - Address submitting the mint; must be the institution admin
    /// * `to` - Wallet the diploma is issued to
    /// * `diploma_id` - Unique identifier chosen by the institution
    /// * `ipfs_cid` - Content address of the pinned PDF
    /// * `file_hash` - SHA-256 digest of the PDF
    /// * `attributes` - Descriptive fields, stored verbatim
    ///
    /// # Returns
    /// The token id assigned to the diploma (1-based, equal to the event
    /// sequence position).
    ///
    /// # Errors
    /// - `Unauthorized` if `caller` is not the current institution admin
    /// - `DuplicateIdentifier` if `diploma_id` was already minted; the
    ///   existing record is left unchanged
    pub fn mint_diploma(
        &self,
        caller: Address,
        to: Address,
        diploma_id: &str,
        ipfs_cid: &str,
        file_hash: H256,
        attributes: DiplomaAttributes,
    ) -> Result<u64, RegistryError> {
        let mut inner = self.inner.write().unwrap();

        if caller != inner.authority.institution_admin {
            return Err(RegistryError::Unauthorized {
                caller,
                required: Role::InstitutionAdmin,
            });
        }
        if inner.diplomas.contains_key(diploma_id) {
            return Err(RegistryError::DuplicateIdentifier(diploma_id.to_string()));
        }

        let token_id = inner.log.next_position();
        inner.diplomas.insert(
            diploma_id.to_string(),
            DiplomaRecord {
                diploma_id: diploma_id.to_string(),
                graduate_wallet: to,
                file_hash,
                ipfs_cid: ipfs_cid.to_string(),
                attributes,
            },
        );
        inner.token_to_id.insert(token_id, diploma_id.to_string());
        inner.log.append(IssuanceEvent {
            diploma_id: diploma_id.to_string(),
            graduate_wallet: to,
            ipfs_cid: ipfs_cid.to_string(),
            file_hash,
            sequence: token_id,
        });

        log::info!(
            "minted diploma {} as token {} for 0x{:x}",
            diploma_id,
            token_id,
            to
        );
        Ok(token_id)
    }

    /// Looks up a diploma by its identifier.
    ///
    /// # Returns
    /// - `Some(record)` with the full stored record if the id was minted
    /// - `None` if the id was never minted; absence is a normal result, not
    ///   an error, and is never represented by a zero-valued record
    pub fn diploma_by_id(&self, diploma_id: &str) -> Option<DiplomaRecord> {
        self.inner.read().unwrap().diplomas.get(diploma_id).cloned()
    }

    /// Resolves a token id to its diploma identifier.
    pub fn diploma_id_by_token(&self, token_id: u64) -> Option<String> {
        self.inner
            .read()
            .unwrap()
            .token_to_id
            .get(&token_id)
            .cloned()
    }

    /// Returns the external reference URI for a token id.
    ///
    /// # Returns
    /// `ipfs://<cid>` for the diploma the token refers to.
    ///
    /// # Errors
    /// `UnknownToken` if no diploma was minted under this token id.
    pub fn token_uri(&self, token_id: u64) -> Result<String, RegistryError> {
        let inner = self.inner.read().unwrap();
        let diploma_id = inner
            .token_to_id
            .get(&token_id)
            .ok_or(RegistryError::UnknownToken(token_id))?;
        let record = &inner.diplomas[diploma_id];
        Ok(format!("ipfs://{}", record.ipfs_cid))
    }

    /// Replaces the institution admin.
    ///
    /// Only the owner may call this. Already-issued diplomas are unaffected;
    /// only future mints are gated on the new admin.
    ///
    /// # Errors
    /// `Unauthorized` if `caller` is not the current owner.
    pub fn set_institution_admin(
        &self,
        caller: Address,
        new_admin: Address,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().unwrap();
        if caller != inner.authority.owner {
            return Err(RegistryError::Unauthorized {
                caller,
                required: Role::Owner,
            });
        }
        log::info!(
            "institution admin rotated from 0x{:x} to 0x{:x}",
            inner.authority.institution_admin,
            new_admin
        );
        inner.authority.institution_admin = new_admin;
        Ok(())
    }

    /// Transfers the owner role to a new address.
    ///
    /// # Errors
    /// `Unauthorized` if `caller` is not the current owner.
    pub fn transfer_ownership(
        &self,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().unwrap();
        if caller != inner.authority.owner {
            return Err(RegistryError::Unauthorized {
                caller,
                required: Role::Owner,
            });
        }
        inner.authority.owner = new_owner;
        Ok(())
    }

    /// Current owner address.
    pub fn owner(&self) -> Address {
        self.inner.read().unwrap().authority.owner
    }

    /// Current institution admin address.
    pub fn institution_admin(&self) -> Address {
        self.inner.read().unwrap().authority.institution_admin
    }

    /// Total number of diplomas issued so far.
    pub fn total_issued(&self) -> u64 {
        self.inner.read().unwrap().log.len()
    }

    /// Returns all issuance events at or after `position`, in log order.
    ///
    /// This is the enumeration channel: the registry's lookup API is keyed
    /// by diploma id, so listing every diploma means replaying these events.
    pub fn events_from(&self, position: u64) -> Vec<IssuanceEvent> {
        self.inner.read().unwrap().log.read_from(position).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn attributes(student: &str, program: &str) -> DiplomaAttributes {
        DiplomaAttributes {
            student_name: student.to_string(),
            program: program.to_string(),
            graduation_date: "2024-10-01".to_string(),
            institution_name: "Universidad Web3".to_string(),
        }
    }

    fn registry() -> DiplomaRegistry {
        // owner = 0x1, admin = 0xA
        DiplomaRegistry::new(addr(0x1), addr(0xA))
    }

    #[test]
    fn test_sets_institution_admin_on_construction() {
        let registry = registry();
        assert_eq!(registry.institution_admin(), addr(0xA));
        assert_eq!(registry.owner(), addr(0x1));
        assert_eq!(registry.total_issued(), 0);
    }

    #[test]
    fn test_admin_mint_stores_diploma_and_emits_event() {
        let registry = registry();
        let file_hash = H256::from_slice(&[0x11; 32]);

        let token_id = registry
            .mint_diploma(
                addr(0xA),
                addr(0xB),
                "DIP-001",
                "bafybeigdyrszipfsplaceholder",
                file_hash,
                attributes("Alice", "Blockchain Engineering"),
            )
            .unwrap();
        assert_eq!(token_id, 1);

        let stored = registry.diploma_by_id("DIP-001").unwrap();
        assert_eq!(stored.graduate_wallet, addr(0xB));
        assert_eq!(stored.ipfs_cid, "bafybeigdyrszipfsplaceholder");
        assert_eq!(stored.file_hash, file_hash);
        assert_eq!(stored.attributes.student_name, "Alice");

        let events = registry.events_from(1);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].diploma_id, "DIP-001");
        assert_eq!(events[0].graduate_wallet, addr(0xB));
        assert_eq!(events[0].file_hash, file_hash);
        assert_eq!(events[0].sequence, 1);

        assert_eq!(
            registry.token_uri(1).unwrap(),
            "ipfs://bafybeigdyrszipfsplaceholder"
        );
    }

    #[test]
    fn test_non_admin_mint_is_rejected_without_state_change() {
        let registry = registry();

        let err = registry
            .mint_diploma(
                addr(0xBAD),
                addr(0xB),
                "DIP-002",
                "bafybeihash",
                H256::from_slice(&[0x22; 32]),
                attributes("Bob", "Security"),
            )
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Unauthorized {
                caller: addr(0xBAD),
                required: Role::InstitutionAdmin,
            }
        );

        // no record, no event
        assert!(registry.diploma_by_id("DIP-002").is_none());
        assert!(registry.events_from(1).is_empty());
        assert_eq!(registry.total_issued(), 0);
    }

    #[test]
    fn test_duplicate_mint_is_rejected_and_first_record_kept() {
        let registry = registry();
        let first_hash = H256::from_slice(&[0x33; 32]);

        registry
            .mint_diploma(
                addr(0xA),
                addr(0xB),
                "DIP-003",
                "bafybeicid",
                first_hash,
                attributes("Carol", "AI"),
            )
            .unwrap();

        let err = registry
            .mint_diploma(
                addr(0xA),
                addr(0xC),
                "DIP-003",
                "bafybeicid2",
                H256::from_slice(&[0x44; 32]),
                attributes("Carol", "AI"),
            )
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateIdentifier("DIP-003".to_string()));

        // the first record survives untouched
        let stored = registry.diploma_by_id("DIP-003").unwrap();
        assert_eq!(stored.graduate_wallet, addr(0xB));
        assert_eq!(stored.ipfs_cid, "bafybeicid");
        assert_eq!(stored.file_hash, first_hash);

        // and the log still has exactly one event
        assert_eq!(registry.events_from(1).len(), 1);
    }

    #[test]
    fn test_records_are_immutable_across_unrelated_mints() {
        let registry = registry();
        registry
            .mint_diploma(
                addr(0xA),
                addr(0xB),
                "DIP-010",
                "bafyfirst",
                H256::from_slice(&[0x55; 32]),
                attributes("Dan", "Math"),
            )
            .unwrap();
        let before = registry.diploma_by_id("DIP-010").unwrap();

        for n in 0..5u64 {
            registry
                .mint_diploma(
                    addr(0xA),
                    addr(0xC0 + n),
                    &format!("DIP-01{}", n + 1),
                    &format!("bafy{}", n),
                    H256::from_low_u64_be(n),
                    attributes("Other", "Other"),
                )
                .unwrap();
        }

        assert_eq!(registry.diploma_by_id("DIP-010").unwrap(), before);
    }

    #[test]
    fn test_token_ids_are_sequential_and_mapped() {
        let registry = registry();
        for n in 1..=3u64 {
            let token_id = registry
                .mint_diploma(
                    addr(0xA),
                    addr(0xB),
                    &format!("DIP-{:03}", n),
                    "bafycid",
                    H256::from_low_u64_be(n),
                    attributes("Eve", "Physics"),
                )
                .unwrap();
            assert_eq!(token_id, n);
        }

        assert_eq!(registry.diploma_id_by_token(2).unwrap(), "DIP-002");
        assert!(registry.diploma_id_by_token(4).is_none());
        assert_eq!(
            registry.token_uri(99).unwrap_err(),
            RegistryError::UnknownToken(99)
        );
    }

    #[test]
    fn test_owner_rotates_admin_and_old_admin_loses_mint() {
        let registry = registry();

        let err = registry
            .set_institution_admin(addr(0xBAD), addr(0xD))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Unauthorized {
                caller: addr(0xBAD),
                required: Role::Owner,
            }
        );

        registry
            .mint_diploma(
                addr(0xA),
                addr(0xB),
                "DIP-020",
                "bafyold",
                H256::from_slice(&[0x66; 32]),
                attributes("Frank", "History"),
            )
            .unwrap();

        registry.set_institution_admin(addr(0x1), addr(0xD)).unwrap();
        assert_eq!(registry.institution_admin(), addr(0xD));

        // record issued under the old admin is unaffected
        assert!(registry.diploma_by_id("DIP-020").is_some());

        // old admin can no longer mint, new admin can
        assert!(matches!(
            registry.mint_diploma(
                addr(0xA),
                addr(0xB),
                "DIP-021",
                "bafynew",
                H256::from_slice(&[0x77; 32]),
                attributes("Grace", "Law"),
            ),
            Err(RegistryError::Unauthorized { .. })
        ));
        assert!(registry
            .mint_diploma(
                addr(0xD),
                addr(0xB),
                "DIP-021",
                "bafynew",
                H256::from_slice(&[0x77; 32]),
                attributes("Grace", "Law"),
            )
            .is_ok());
    }

    #[test]
    fn test_ownership_transfer_gates_admin_rotation() {
        let registry = registry();
        registry.transfer_ownership(addr(0x1), addr(0x2)).unwrap();
        assert_eq!(registry.owner(), addr(0x2));

        // previous owner lost the role
        assert!(registry.set_institution_admin(addr(0x1), addr(0xE)).is_err());
        assert!(registry.set_institution_admin(addr(0x2), addr(0xE)).is_ok());

        // non-owner cannot transfer
        assert!(registry.transfer_ownership(addr(0x1), addr(0x3)).is_err());
    }
}
