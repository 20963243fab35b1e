//! Per-request transform configuration

use serde::{Deserialize, Serialize};

use glaze_core::key::ChaosKey;

/// What a single image request wants from the crypto stages
///
/// Both flags default to off, so an unconfigured request passes through
/// every stage untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    /// Scramble the payload on its way through the encrypt stage
    pub should_encrypt: bool,
    /// Restore the payload on its way through the decrypt stage
    pub should_decrypt: bool,
    /// Key material for either direction
    pub crypto_key: Option<ChaosKey>,
}

impl ImageRequest {
    /// Request that scrambles with `key`.
    pub fn encrypting(key: ChaosKey) -> Self {
        Self {
            should_encrypt: true,
            should_decrypt: false,
            crypto_key: Some(key),
        }
    }

    /// Request that restores with `key`.
    pub fn decrypting(key: ChaosKey) -> Self {
        Self {
            should_encrypt: false,
            should_decrypt: true,
            crypto_key: Some(key),
        }
    }
}
