// src/utils/crypto.rs
//! Document hashing for the diploma registry.
//!
//! Uses SHA-256 as the content-identity function for diploma PDFs: the same
//! digest is committed on issuance and recomputed at verification time.

use ethers_core::types::H256;
use sha2::{Digest, Sha256};

/// Computes the SHA-256 digest of a document's bytes.
///
/// # Arguments
/// * `data` - Raw document bytes to hash
///
/// # Returns
/// Fixed-size 32-byte digest as an `H256`.
///
/// # Properties
/// - Deterministic: identical bytes always produce an identical digest
/// - Collision-resistant: any single-bit change produces a different digest
///   with overwhelming probability
/// - Keyless: this is a content-identity function, not a MAC
pub fn hash_document(data: &[u8]) -> H256 {
    let digest = Sha256::digest(data);
    H256::from_slice(&digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_hash_is_deterministic() {
        let document = b"diploma pdf bytes";
        assert_eq!(hash_document(document), hash_document(document));
    }

    #[test]
    fn test_known_sha256_vector() {
        // SHA-256 of the empty input
        assert_eq!(
            format!("{:x}", hash_document(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_single_byte_flip_changes_digest() {
        let mut rng = rand::thread_rng();
        let original: Vec<u8> = (0..4096).map(|_| rng.gen()).collect();

        let mut tampered = original.clone();
        let position = rng.gen_range(0..tampered.len());
        tampered[position] ^= 0x01;

        assert_ne!(hash_document(&original), hash_document(&tampered));
    }
}
