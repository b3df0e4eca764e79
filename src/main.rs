// src/main.rs

//! # Diploma Registry Service - Main Entry Point
//!
//! This module serves as the main entry point for the diploma registry
//! service. It initializes all core components and starts the API server.
//!
//! ## Architecture Overview
//! 1. **Registry Layer**: `DiplomaRegistry` state machine with its append-only
//!    issuance event log
//! 2. **Services Layer**: Issuance orchestration, verification, and API
//!    endpoints
//! 3. **Storage Layer**: IPFS for content-addressed document storage
//!
//! ## Environment Variables Required
//! - `DIPLOMA_OWNER_ADDRESS`: Owner address (may rotate the admin)
//! - `DIPLOMA_ADMIN_ADDRESS`: Institution admin address (may mint)
//! - `DIPLOMA_BIND_ADDR`: (Optional) API bind address (default: 127.0.0.1:4000)
//! - `DIPLOMA_IPFS_API_URL`: (Optional) IPFS API URL (default: http://localhost:5001)
//! - `DIPLOMA_MAX_UPLOAD_BYTES`: (Optional) Upload size cap (default: 15 MiB)

use crate::registry::diploma_registry::DiplomaRegistry;
use crate::services::api_server::ApiServer;
use crate::services::issuer::DiplomaIssuer;
use crate::services::verifier::Verifier;
use crate::settings::Settings;
use crate::storage::ipfs_client::IpfsStorage;
use anyhow::Context;
use dotenv::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;

// Module declarations (organized by functional domain)
mod models; // Data structures
mod registry; // Authoritative state machine, event log, indexer
mod services; // Business logic and API
mod settings; // Environment-backed configuration
mod storage; // IPFS storage layer
mod utils; // Helper functions

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::init();

    let settings = Settings::from_env()
        .context("failed to load settings - DIPLOMA_OWNER_ADDRESS and DIPLOMA_ADMIN_ADDRESS must be set")?;

    // Authoritative registry with its initial authority configuration
    let registry = Arc::new(DiplomaRegistry::new(
        settings.owner_address,
        settings.admin_address,
    ));

    let ipfs_storage = IpfsStorage::with_api_url(&settings.ipfs_api_url)
        .context("failed to initialize IPFS client - check DIPLOMA_IPFS_API_URL")?;

    let issuer = DiplomaIssuer::new(registry.clone(), ipfs_storage.clone());
    let verifier = Verifier::new(registry.clone());

    let api_server = ApiServer::new(registry, issuer, verifier, ipfs_storage, settings.clone());

    let addr: SocketAddr = settings
        .bind_addr
        .parse()
        .context("invalid DIPLOMA_BIND_ADDR")?;
    log::info!(
        "owner 0x{:x}, institution admin 0x{:x}",
        settings.owner_address,
        settings.admin_address
    );
    api_server.run(addr).await
}
