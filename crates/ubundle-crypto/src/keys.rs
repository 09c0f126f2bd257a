//! UnityCN key handling
//!
//! Keys are distributed per game as 32-character hex strings.

use std::fmt;

use crate::error::CryptoError;

/// A 16-byte UnityCN key
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct UnityCnKey([u8; 16]);

impl UnityCnKey {
    /// Create a key from raw bytes
    pub fn new(key: [u8; 16]) -> Self {
        Self(key)
    }

    /// Parse key from hex string
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let hex = hex.trim();
        let bytes =
            hex::decode(hex).map_err(|e| CryptoError::InvalidKey(format!("invalid hex: {e}")))?;

        if bytes.len() != 16 {
            return Err(CryptoError::InvalidKeySize {
                expected: 16,
                actual: bytes.len(),
            });
        }

        let mut key = [0u8; 16];
        key.copy_from_slice(&bytes);
        Ok(Self(key))
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl fmt::Display for UnityCnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// Keys end up in logs through Debug; keep them out.
impl fmt::Debug for UnityCnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UnityCnKey(..)")
    }
}
