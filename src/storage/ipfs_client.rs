// src/storage/ipfs_client.rs
//! IPFS pinning gateway for diploma documents.
//!
//! Thin wrapper over the IPFS HTTP API used to:
//! - pin diploma PDFs and return their content address (CID)
//! - fetch a pinned document back by CID
//!
//! The store is treated as an opaque pinning service: content addressing
//! makes retried stores of identical bytes idempotent, and every failure
//! surfaces as a typed [`StorageError`] rather than silently corrupting.
//! Descriptive attributes accompany each pin for operator-side traceability.

use bytes::BytesMut;
use futures::TryStreamExt;
use ipfs_api_backend_hyper::{IpfsApi, IpfsClient, TryFromUri};
use std::io::Cursor;
use std::sync::Arc;
use thiserror::Error;

/// Failures raised by the pinning gateway.
///
/// Distinguishes a rejected request (invalid input, not retryable) from an
/// unreachable or failing storage provider (retryable by the caller with
/// backoff). Registry-logic failures never come through this type.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The document itself was refused before reaching the provider.
    #[error("document rejected: {0}")]
    Rejected(String),

    /// The storage provider failed or could not be reached.
    #[error("pinning service unavailable: {0}")]
    Unavailable(String),
}

/// Descriptive attributes recorded alongside a pinned document.
#[derive(Debug, Clone)]
pub struct PinMetadata {
    /// Display name for the pinned file
    /// Example: "DIP-001.pdf"
    pub name: String,

    /// Diploma identifier the document belongs to
    pub diploma_id: String,

    /// Graduate name as given on the upload form
    pub student_name: String,

    /// Academic program as given on the upload form
    pub program: String,
}

/// Thread-safe IPFS client wrapper with convenience methods.
#[derive(Clone)]
pub struct IpfsStorage {
    /// Shared IPFS client instance (thread-safe via Arc)
    client: Arc<IpfsClient>,
}

impl IpfsStorage {
    /// Creates a client connected to the default local IPFS node
    /// (`http://localhost:5001`).
    pub fn new() -> Self {
        IpfsStorage {
            client: Arc::new(IpfsClient::default()),
        }
    }

    /// Creates a client for an explicit IPFS API endpoint.
    ///
    /// # Arguments
    /// * `api_url` - Base URL of the IPFS HTTP API
    ///
    /// # Errors
    /// `StorageError::Unavailable` if the URL cannot be parsed.
    pub fn with_api_url(api_url: &str) -> Result<Self, StorageError> {
        let client = IpfsClient::from_str(api_url)
            .map_err(|e| StorageError::Unavailable(format!("invalid IPFS API URL: {}", e)))?;
        Ok(IpfsStorage {
            client: Arc::new(client),
        })
    }

    /// Pins a document and returns its content address.
    ///
    /// # Arguments
    /// * `data` - Raw document bytes to pin
    /// * `metadata` - Descriptive attributes for traceability
    ///
    /// # Returns
    /// The CID of the pinned document.
    ///
    /// # Errors
    /// - `Rejected` for an empty document (the gateway fails closed rather
    ///   than pinning a zero-byte file)
    /// - `Unavailable` if the IPFS node cannot be reached or errors out
    pub async fn store_document(
        &self,
        data: &[u8],
        metadata: &PinMetadata,
    ) -> Result<String, StorageError> {
        if data.is_empty() {
            return Err(StorageError::Rejected("empty document".to_string()));
        }

        log::debug!(
            "pinning {} ({} bytes) for diploma {} / {} / {}",
            metadata.name,
            data.len(),
            metadata.diploma_id,
            metadata.student_name,
            metadata.program
        );

        let reader = Cursor::new(data.to_vec());
        let response = self
            .client
            .add(reader)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(response.hash)
    }

    /// Retrieves a pinned document by its CID.
    ///
    /// # Arguments
    /// * `cid` - Content address returned by a previous store
    ///
    /// # Returns
    /// The full document bytes.
    ///
    /// # Errors
    /// `Unavailable` if the node cannot be reached or the content cannot be
    /// streamed back.
    pub async fn retrieve_document(&self, cid: &str) -> Result<Vec<u8>, StorageError> {
        let data = self
            .client
            .cat(cid)
            .try_fold(BytesMut::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_document_is_rejected_before_pinning() {
        let storage = IpfsStorage::new();
        let metadata = PinMetadata {
            name: "empty.pdf".to_string(),
            diploma_id: "DIP-000".to_string(),
            student_name: "Nobody".to_string(),
            program: "None".to_string(),
        };

        let err = storage.store_document(&[], &metadata).await.unwrap_err();
        assert!(matches!(err, StorageError::Rejected(_)));
    }

    #[test]
    fn test_invalid_api_url_fails_closed() {
        assert!(IpfsStorage::with_api_url("not a url").is_err());
    }
}
