// src/services/issuer.rs
//! Diploma issuance service.
//!
//! Orchestrates the full issuance flow on behalf of the institution:
//! digest the document, pin it to IPFS, then submit the mint to the
//! registry. The registry alone decides acceptance; this service adds no
//! authority of its own and performs no retries.

use crate::models::diploma::DiplomaAttributes;
use crate::registry::diploma_registry::{DiplomaRegistry, RegistryError};
use crate::storage::ipfs_client::{IpfsStorage, PinMetadata, StorageError};
use crate::utils::crypto::hash_document;
use ethers_core::types::{Address, H256};
use std::sync::Arc;
use thiserror::Error;

/// Failure of an issuance attempt.
///
/// Keeps registry-logic rejections distinct from storage failures so the
/// caller can tell "my request was invalid" from "the service is
/// unavailable": only the latter is worth retrying, with the same document
/// bytes (pinning identical bytes twice is harmless).
#[derive(Debug, Error)]
pub enum IssueError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result of a successful issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedDiploma {
    /// Token id assigned by the registry
    pub token_id: u64,
    /// Content address of the pinned PDF
    pub ipfs_cid: String,
    /// SHA-256 digest committed on-registry
    pub file_hash: H256,
}

/// Service that carries a document from upload to issued diploma.
pub struct DiplomaIssuer {
    registry: Arc<DiplomaRegistry>,
    ipfs_storage: IpfsStorage,
}

impl DiplomaIssuer {
    /// Constructs a new DiplomaIssuer.
    ///
    /// # Arguments
    /// * `registry` - Shared handle to the diploma registry
    /// * `ipfs_storage` - Pinning gateway for diploma documents
    pub fn new(registry: Arc<DiplomaRegistry>, ipfs_storage: IpfsStorage) -> Self {
        DiplomaIssuer {
            registry,
            ipfs_storage,
        }
    }

    /// Issues a diploma from raw document bytes.
    ///
    /// # Arguments
    /// * `caller` - Address submitting the issuance; gated by the registry
    /// * `to` - Wallet the diploma is issued to
    /// * `diploma_id` - Unique identifier chosen by the institution
    /// * `attributes` - Descriptive fields stored with the record
    /// * `document` - Raw PDF bytes
    ///
    /// # Process Flow
    /// 1. Compute the SHA-256 digest of `document`
    /// 2. Pin `document` to IPFS, obtaining its CID
    /// 3. Mint on the registry with `{diploma_id, to, cid, digest}`
    ///
    /// A document pinned for a mint that is then rejected stays pinned; the
    /// registry remains the single arbiter of which CIDs are credentialed.
    ///
    /// # Errors
    /// - `IssueError::Storage` if pinning fails
    /// - `IssueError::Registry` if the registry rejects the mint
    pub async fn issue(
        &self,
        caller: Address,
        to: Address,
        diploma_id: &str,
        attributes: DiplomaAttributes,
        document: &[u8],
    ) -> Result<IssuedDiploma, IssueError> {
        let file_hash = hash_document(document);

        let metadata = PinMetadata {
            name: format!("{}.pdf", diploma_id),
            diploma_id: diploma_id.to_string(),
            student_name: attributes.student_name.clone(),
            program: attributes.program.clone(),
        };
        let ipfs_cid = self.ipfs_storage.store_document(document, &metadata).await?;

        let token_id = self.registry.mint_diploma(
            caller,
            to,
            diploma_id,
            &ipfs_cid,
            file_hash,
            attributes,
        )?;

        Ok(IssuedDiploma {
            token_id,
            ipfs_cid,
            file_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers_core::types::Address;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn attributes() -> DiplomaAttributes {
        DiplomaAttributes {
            student_name: "Alice".to_string(),
            program: "Blockchain Engineering".to_string(),
            graduation_date: "2024-10-01".to_string(),
            institution_name: "Universidad Web3".to_string(),
        }
    }

    // Storage failures must surface before the registry is touched; an empty
    // document is the one storage rejection we can trigger without a node.
    #[tokio::test]
    async fn test_storage_rejection_leaves_registry_untouched() {
        let registry = Arc::new(DiplomaRegistry::new(addr(0x1), addr(0xA)));
        let issuer = DiplomaIssuer::new(registry.clone(), IpfsStorage::new());

        let err = issuer
            .issue(addr(0xA), addr(0xB), "DIP-001", attributes(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, IssueError::Storage(_)));
        assert!(registry.diploma_by_id("DIP-001").is_none());
        assert_eq!(registry.total_issued(), 0);
    }
}
