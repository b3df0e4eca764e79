// src/services/verifier.rs
//! Diploma verification service.
//!
//! Decides whether a candidate document matches the digest committed for a
//! diploma id. The protocol is stateless and side-effect-free: it reads the
//! registry, recomputes the candidate's digest, and compares the two values
//! byte for byte. It can be invoked any number of times without affecting
//! the registry.

use crate::registry::diploma_registry::DiplomaRegistry;
use crate::utils::crypto::hash_document;
use serde::Serialize;
use std::sync::Arc;

/// Outcome of verifying a candidate document against the registry.
///
/// `NotFound` and `Tampered` are normal negative results, not errors.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// The candidate's digest matches the committed digest exactly
    Authentic,
    /// A diploma exists under this id but the digests differ
    Tampered,
    /// No diploma was ever issued under this id
    NotFound,
}

/// Verifier backed by the authoritative registry.
pub struct Verifier {
    registry: Arc<DiplomaRegistry>,
}

impl Verifier {
    /// Constructs a new Verifier.
    ///
    /// # Arguments
    /// * `registry` - Shared handle to the diploma registry
    pub fn new(registry: Arc<DiplomaRegistry>) -> Self {
        Verifier { registry }
    }

    /// Verifies a candidate document against the stored diploma digest.
    ///
    /// # Arguments
    /// * `diploma_id` - Identifier to look up
    /// * `candidate` - Raw bytes of the document being checked
    ///
    /// # Process Flow
    /// 1. Lookup by diploma id; absence is `NotFound`
    /// 2. Recompute SHA-256 over the candidate bytes
    /// 3. Exact 32-byte equality against the committed digest
    pub fn verify_document(&self, diploma_id: &str, candidate: &[u8]) -> VerificationOutcome {
        match self.registry.diploma_by_id(diploma_id) {
            None => VerificationOutcome::NotFound,
            Some(record) => {
                if hash_document(candidate) == record.file_hash {
                    VerificationOutcome::Authentic
                } else {
                    VerificationOutcome::Tampered
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::diploma::DiplomaAttributes;
    use ethers_core::types::Address;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn verifier_with_issued(document: &[u8]) -> Verifier {
        let registry = Arc::new(DiplomaRegistry::new(addr(0x1), addr(0xA)));
        registry
            .mint_diploma(
                addr(0xA),
                addr(0xB),
                "DIP-001",
                "bafybeicid",
                hash_document(document),
                DiplomaAttributes {
                    student_name: "Alice".to_string(),
                    program: "Blockchain Engineering".to_string(),
                    graduation_date: "2024-10-01".to_string(),
                    institution_name: "Universidad Web3".to_string(),
                },
            )
            .unwrap();
        Verifier::new(registry)
    }

    #[test]
    fn test_original_document_is_authentic() {
        let document = b"original diploma pdf";
        let verifier = verifier_with_issued(document);
        assert_eq!(
            verifier.verify_document("DIP-001", document),
            VerificationOutcome::Authentic
        );
    }

    #[test]
    fn test_modified_document_is_tampered() {
        let document = b"original diploma pdf";
        let verifier = verifier_with_issued(document);
        assert_eq!(
            verifier.verify_document("DIP-001", b"original diploma pdf."),
            VerificationOutcome::Tampered
        );
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let verifier = verifier_with_issued(b"original diploma pdf");
        assert_eq!(
            verifier.verify_document("DIP-999", b"anything"),
            VerificationOutcome::NotFound
        );
    }

    #[test]
    fn test_verification_has_no_side_effects() {
        let document = b"original diploma pdf";
        let verifier = verifier_with_issued(document);
        for _ in 0..10 {
            verifier.verify_document("DIP-001", document);
            verifier.verify_document("DIP-999", document);
        }
        assert_eq!(
            verifier.verify_document("DIP-001", document),
            VerificationOutcome::Authentic
        );
    }
}
