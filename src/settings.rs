// src/settings.rs
//! Runtime configuration for the diploma registry service.
//!
//! Settings are layered: built-in defaults first, then `DIPLOMA_*`
//! environment variables (typically provided via a `.env` file). The two
//! privileged addresses have no default and must be supplied.

use ethers_core::types::Address;
use serde::Deserialize;

/// Process-wide configuration, loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Socket address the API server binds to
    pub bind_addr: String,

    /// Owner address, allowed to rotate the institution admin
    /// (`DIPLOMA_OWNER_ADDRESS`, `0x`-prefixed)
    pub owner_address: Address,

    /// Initial institution admin address, allowed to mint
    /// (`DIPLOMA_ADMIN_ADDRESS`, `0x`-prefixed)
    pub admin_address: Address,

    /// Base URL of the IPFS HTTP API used for pinning
    pub ipfs_api_url: String,

    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: u64,

    /// The single MIME type the upload gateway accepts
    pub accepted_mime: String,
}

impl Settings {
    /// Loads settings from defaults overlaid with `DIPLOMA_*` environment
    /// variables.
    ///
    /// # Errors
    /// Returns a `ConfigError` if a required variable is missing or a value
    /// cannot be deserialized (e.g. a malformed address).
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("bind_addr", "127.0.0.1:4000")?
            .set_default("ipfs_api_url", "http://localhost:5001")?
            .set_default("max_upload_bytes", 15 * 1024 * 1024_i64)?
            .set_default("accepted_mime", "application/pdf")?
            .add_source(config::Environment::with_prefix("DIPLOMA"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_defaults_and_overrides() {
        std::env::set_var(
            "DIPLOMA_OWNER_ADDRESS",
            "0x0000000000000000000000000000000000000001",
        );
        std::env::set_var(
            "DIPLOMA_ADMIN_ADDRESS",
            "0x000000000000000000000000000000000000000a",
        );
        std::env::set_var("DIPLOMA_MAX_UPLOAD_BYTES", "1048576");

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.bind_addr, "127.0.0.1:4000");
        assert_eq!(settings.accepted_mime, "application/pdf");
        assert_eq!(settings.max_upload_bytes, 1_048_576);
        assert_eq!(settings.owner_address, Address::from_low_u64_be(0x1));
        assert_eq!(settings.admin_address, Address::from_low_u64_be(0xA));

        // the privileged addresses have no default
        std::env::remove_var("DIPLOMA_OWNER_ADDRESS");
        assert!(Settings::from_env().is_err());

        std::env::remove_var("DIPLOMA_ADMIN_ADDRESS");
        std::env::remove_var("DIPLOMA_MAX_UPLOAD_BYTES");
    }
}
