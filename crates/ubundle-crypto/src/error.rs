//! Error types for cryptographic operations

use thiserror::Error;

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key is not valid hex or was rejected by the block cipher
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Invalid key size
    #[error("Invalid key size: expected {expected}, got {actual}")]
    InvalidKeySize {
        /// Expected key size in bytes
        expected: usize,
        /// Actual key size in bytes
        actual: usize,
    },

    /// Unwrapped signature block does not contain the expected magic
    #[error("Invalid signature: expected {expected:?} but found {found:?}")]
    InvalidSignature {
        /// Magic string the unwrapped block must contain
        expected: &'static str,
        /// Text actually recovered from the block
        found: String,
    },

    /// Decode tables have not been derived yet
    #[error("Cipher has no key; call set_key first")]
    CipherNotInitialized,
}

impl CryptoError {
    /// Whether this error means the supplied key itself is unusable
    pub fn is_key_error(&self) -> bool {
        matches!(self, Self::InvalidKey(_) | Self::InvalidKeySize { .. })
    }
}
