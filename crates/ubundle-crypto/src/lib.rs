//! Cryptographic operations for UnityFS asset bundles
//!
//! This crate implements the UnityCN cipher that regional engine builds use to
//! protect the compressed blocks of an asset bundle.
//!
//! # Components
//!
//! - **Key handling**: [`UnityCnKey`] parses the 16-byte hex keys distributed
//!   per game
//! - **Cipher**: [`UnityCnCipher`] reads the embedded key material, derives the
//!   decode tables from a key and decrypts (or encrypts) LZ4 blocks in place
//!
//! # Examples
//!
//! ```
//! use ubundle_crypto::{CryptoError, UnityCnCipher};
//! use binrw::BinRead;
//! use std::io::Cursor;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let built = UnityCnCipher::create(
//!     "00112233445566778899AABBCCDDEEFF",
//!     [0x7C, 0x2E, 0x05, 0xB9, 0x14, 0xD3, 0x6F, 0xA8, 0, 0, 0, 0, 0, 0, 0, 0],
//!     [0x01; 16],
//!     [0x02; 16],
//! )?;
//! let mut bytes = Cursor::new(Vec::new());
//! binrw::BinWrite::write_be(&built, &mut bytes)?;
//! bytes.set_position(0);
//!
//! let mut cipher = UnityCnCipher::read_be(&mut bytes)?;
//! assert!(matches!(
//!     cipher.set_key("FFEEDDCCBBAA99887766554433221100"),
//!     Err(CryptoError::InvalidSignature { .. })
//! ));
//! cipher.set_key("00112233445566778899AABBCCDDEEFF")?;
//! assert!(cipher.is_ready());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod keys;
mod tokens;
pub mod unity_cn;

pub use error::CryptoError;

// Re-export commonly used types
pub use keys::UnityCnKey;
pub use unity_cn::{
    CipherState, DecodeTables, UNITY_CN_HEADER_SIZE, UNITY_CN_MAGIC, UnityCnCipher, UnityCnHeader,
};
