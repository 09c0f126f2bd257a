//! UnityCN block cipher for encrypted UnityFS bundles
//!
//! Bundles built for the Chinese regional engine can carry an extra 0x46-byte
//! block after the bundle header. It holds two AES-protected 16-byte values:
//!
//! - **signature**: unwraps to the fixed magic `#$unity3dchina!@`, used to
//!   verify the key
//! - **info**: unwraps to 32 nibbles forming the `index` and `sub` decode
//!   tables
//!
//! AES-128 in ECB mode is only used to unwrap those two values. Payload blocks
//! are protected by a nibble substitution applied to the control bytes of the
//! LZ4 sequences (see [`crate::tokens`]).
//!
//! ## Usage
//!
//! ```rust
//! use ubundle_crypto::unity_cn::UnityCnCipher;
//!
//! let key = "00112233445566778899AABBCCDDEEFF";
//! let info = [0x7C, 0x2E, 0x05, 0xB9, 0x14, 0xD3, 0x6F, 0xA8, 1, 2, 3, 4, 5, 6, 7, 8];
//! let cipher = UnityCnCipher::create(key, info, [0x11; 16], [0x22; 16])
//!     .expect("cipher creation should succeed in test");
//!
//! let plaintext = vec![0x40, b'd', b'a', b't', b'a'];
//! let mut block = plaintext.clone();
//! cipher.encrypt_block(&mut block, 0).expect("encrypt should succeed in test");
//! cipher.decrypt_block(&mut block, 0).expect("decrypt should succeed in test");
//! assert_eq!(block, plaintext);
//! ```

use aes::Aes128;
use binrw::io::{Read, Seek, Write};
use binrw::{BinRead, BinResult, BinWrite};
use cipher::{BlockEncrypt, KeyInit};

use crate::error::CryptoError;
use crate::keys::UnityCnKey;
use crate::tokens::walk_tokens;

/// Magic recovered from the signature block with the right key
pub const UNITY_CN_MAGIC: &str = "#$unity3dchina!@";

/// Size of the cipher block as stored after the bundle header
pub const UNITY_CN_HEADER_SIZE: usize = 0x46;

/// Raw cipher block as stored in the bundle
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct UnityCnHeader {
    /// Unused by the cipher, kept for round-tripping
    pub value: u32,
    /// Protected info data
    pub info_bytes: [u8; 16],
    /// Key material used to unwrap `info_bytes`
    #[brw(pad_after = 1)]
    pub info_key: [u8; 16],
    /// Protected signature data
    pub signature_bytes: [u8; 16],
    /// Key material used to unwrap `signature_bytes`
    #[brw(pad_after = 1)]
    pub signature_key: [u8; 16],
}

/// Decode tables derived from the unwrapped info block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeTables {
    index: [u8; 16],
    sub: [u8; 16],
}

impl DecodeTables {
    /// Build tables from the 16 unwrapped info bytes.
    ///
    /// The bytes split into 32 nibbles, high nibble first. The first 16 form
    /// `index`; the last 16 are transposed as a 4x4 matrix into `sub`.
    pub fn from_info(info: &[u8; 16]) -> Self {
        let mut nibbles = [0u8; 32];
        for (i, byte) in info.iter().enumerate() {
            nibbles[i * 2] = byte >> 4;
            nibbles[i * 2 + 1] = byte & 0x0F;
        }

        let mut index = [0u8; 16];
        index.copy_from_slice(&nibbles[..16]);

        let mut sub = [0u8; 16];
        for (i, &nibble) in nibbles[16..].iter().enumerate() {
            sub[(i % 4) * 4 + i / 4] = nibble;
        }

        Self { index, sub }
    }

    /// Substitution table applied to each nibble
    pub fn index(&self) -> &[u8; 16] {
        &self.index
    }

    /// Bias table, indexed by slices of the byte index
    pub fn sub(&self) -> &[u8; 16] {
        &self.sub
    }

    /// Sum of four `sub` entries selected by two-bit slices of `index`
    fn bias(&self, index: u32) -> u8 {
        let low = index as u8;
        self.sub[usize::from((low >> 2) & 3) + 4]
            .wrapping_add(self.sub[usize::from(low & 3)])
            .wrapping_add(self.sub[usize::from((low >> 4) & 3) + 8])
            .wrapping_add(self.sub[usize::from(low >> 6) + 12])
    }

    /// Decrypt one control byte
    fn decrypt_byte(&self, value: u8, index: u32) -> u8 {
        let bias = self.bias(index);
        let low = self.index[usize::from(value & 0x0F)].wrapping_sub(bias) & 0x0F;
        let high = self.index[usize::from(value >> 4)].wrapping_sub(bias) & 0x0F;
        (high << 4) | low
    }

    /// Inverse of the `index` table, `None` unless it is a permutation
    fn inverse_index(&self) -> Option<[u8; 16]> {
        let mut inverse = [0xFFu8; 16];
        for (position, &value) in self.index.iter().enumerate() {
            let slot = inverse.get_mut(usize::from(value))?;
            if *slot != 0xFF {
                return None;
            }
            *slot = position as u8;
        }
        Some(inverse)
    }

    fn encrypt_byte(&self, inverse: &[u8; 16], value: u8, index: u32) -> u8 {
        let bias = self.bias(index);
        let low = inverse[usize::from((value & 0x0F).wrapping_add(bias) & 0x0F)];
        let high = inverse[usize::from((value >> 4).wrapping_add(bias) & 0x0F)];
        (high << 4) | low
    }
}

/// Lifecycle of the decode tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CipherState {
    /// No key has been applied, or the last key was rejected
    #[default]
    Uninitialized,
    /// Tables derived, blocks can be decrypted
    KeyDerived(DecodeTables),
}

/// UnityCN cipher for one bundle
#[derive(Debug, Clone)]
pub struct UnityCnCipher {
    header: UnityCnHeader,
    state: CipherState,
}

impl BinRead for UnityCnCipher {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let header = UnityCnHeader::read_options(reader, endian, ())?;
        Ok(Self::from_header(header))
    }
}

impl BinWrite for UnityCnCipher {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        self.header.write_options(writer, endian, ())
    }
}

impl UnityCnCipher {
    /// Wrap a raw cipher block; no key applied yet
    pub fn from_header(header: UnityCnHeader) -> Self {
        Self {
            header,
            state: CipherState::Uninitialized,
        }
    }

    /// Build the cipher block protecting `info` under `key`.
    ///
    /// `info_key` and `signature_key` are the embedded key material; any
    /// values work. The returned cipher is ready for use.
    pub fn create(
        key: &str,
        info: [u8; 16],
        info_key: [u8; 16],
        signature_key: [u8; 16],
    ) -> Result<Self, CryptoError> {
        let aes = block_cipher(&UnityCnKey::from_hex(key)?)?;

        let mut magic = [0u8; 16];
        magic.copy_from_slice(UNITY_CN_MAGIC.as_bytes());

        let header = UnityCnHeader {
            value: 0,
            info_bytes: unwrap_block(&aes, &info_key, &info),
            info_key,
            signature_bytes: unwrap_block(&aes, &signature_key, &magic),
            signature_key,
        };

        Ok(Self {
            header,
            state: CipherState::KeyDerived(DecodeTables::from_info(&info)),
        })
    }

    /// Raw cipher block
    pub fn header(&self) -> &UnityCnHeader {
        &self.header
    }

    /// Current state
    pub fn state(&self) -> CipherState {
        self.state
    }

    /// Whether decode tables are available
    pub fn is_ready(&self) -> bool {
        matches!(self.state, CipherState::KeyDerived(_))
    }

    /// Derived decode tables, if a key has been applied
    pub fn tables(&self) -> Option<&DecodeTables> {
        match &self.state {
            CipherState::KeyDerived(tables) => Some(tables),
            CipherState::Uninitialized => None,
        }
    }

    /// Apply a hex key and derive the decode tables.
    ///
    /// Fails with [`CryptoError::InvalidKey`] / [`CryptoError::InvalidKeySize`]
    /// for unusable keys and [`CryptoError::InvalidSignature`] when the key
    /// does not unwrap the signature block. On failure the cipher is left
    /// uninitialized; the embedded material is never modified, so another key
    /// can be tried.
    pub fn set_key(&mut self, key: &str) -> Result<(), CryptoError> {
        self.state = CipherState::Uninitialized;

        let aes = block_cipher(&UnityCnKey::from_hex(key)?)?;

        let signature = unwrap_block(
            &aes,
            &self.header.signature_key,
            &self.header.signature_bytes,
        );
        if signature != UNITY_CN_MAGIC.as_bytes() {
            return Err(CryptoError::InvalidSignature {
                expected: UNITY_CN_MAGIC,
                found: String::from_utf8_lossy(&signature).into_owned(),
            });
        }

        let info = unwrap_block(&aes, &self.header.info_key, &self.header.info_bytes);
        self.state = CipherState::KeyDerived(DecodeTables::from_info(&info));
        Ok(())
    }

    /// Decrypt one compressed block in place.
    ///
    /// `index` seeds the token counter. Blocks of a bundle must be decrypted
    /// in their stored order with the seed the producer used; any other seed
    /// silently produces garbage.
    pub fn decrypt_block(&self, data: &mut [u8], index: usize) -> Result<(), CryptoError> {
        let tables = self.tables().ok_or(CryptoError::CipherNotInitialized)?;
        walk_tokens(data, index, |byte, byte_index| {
            *byte = tables.decrypt_byte(*byte, byte_index);
            *byte
        });
        Ok(())
    }

    /// Encrypt one compressed block in place, the inverse of
    /// [`decrypt_block`](Self::decrypt_block).
    ///
    /// Requires the `index` table to be a permutation of 0..16.
    pub fn encrypt_block(&self, data: &mut [u8], index: usize) -> Result<(), CryptoError> {
        let tables = self.tables().ok_or(CryptoError::CipherNotInitialized)?;
        let inverse = tables.inverse_index().ok_or_else(|| {
            CryptoError::InvalidKey("index table is not a permutation".to_string())
        })?;
        walk_tokens(data, index, |byte, byte_index| {
            let plain = *byte;
            *byte = tables.encrypt_byte(&inverse, plain, byte_index);
            plain
        });
        Ok(())
    }
}

fn block_cipher(key: &UnityCnKey) -> Result<Aes128, CryptoError> {
    Aes128::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(format!("AES rejected key: {e}")))
}

/// XOR `data` with the AES-ECB encryption of `key`
fn unwrap_block(aes: &Aes128, key: &[u8; 16], data: &[u8; 16]) -> [u8; 16] {
    let mut block = aes::Block::clone_from_slice(key);
    aes.encrypt_block(&mut block);

    let mut out = *data;
    for (byte, mask) in out.iter_mut().zip(block.iter()) {
        *byte ^= mask;
    }
    out
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use binrw::io::Cursor;
    use pretty_assertions::assert_eq;

    fn key() -> &'static str {
        "00112233445566778899AABBCCDDEEFF"
    }

    fn info() -> [u8; 16] {
        [
            0x7C, 0x2E, 0x05, 0xB9, 0x14, 0xD3, 0x6F, 0xA8, 0x31, 0x4B, 0x92, 0x07, 0xE5, 0x68,
            0x2D, 0xC0,
        ]
    }

    fn cipher() -> UnityCnCipher {
        UnityCnCipher::create(key(), info(), [0x5A; 16], [0xC3; 16])
            .expect("Test operation should succeed")
    }

    #[test]
    fn test_tables_from_info() {
        let tables = DecodeTables::from_info(&info());
        assert_eq!(
            tables.index(),
            &[7, 12, 2, 14, 0, 5, 11, 9, 1, 4, 13, 3, 6, 15, 10, 8]
        );
        // scratch 3,1,4,B,9,2,0,7,E,5,6,8,2,D,C,0 transposed
        assert_eq!(
            tables.sub(),
            &[3, 9, 14, 2, 1, 2, 5, 13, 4, 0, 6, 12, 11, 7, 8, 0]
        );
    }

    #[test]
    fn test_bias_slices() {
        let tables = DecodeTables {
            index: [0; 16],
            sub: [0, 1, 2, 3, 0, 4, 8, 12, 0, 16, 32, 48, 0, 64, 128, 192],
        };
        // each two-bit slice selects one quadrant entry
        assert_eq!(tables.bias(0b00_00_00_00), 0);
        assert_eq!(tables.bias(0b00_00_00_11), 3);
        assert_eq!(tables.bias(0b00_00_10_00), 8);
        assert_eq!(tables.bias(0b00_01_00_00), 16);
        assert_eq!(tables.bias(0b11_00_00_00), 192);
        // only the low byte matters
        assert_eq!(tables.bias(0x1_00), 0);
    }

    #[test]
    fn test_header_round_trip() {
        let original = cipher();
        let mut buffer = Cursor::new(Vec::new());
        original
            .write_be(&mut buffer)
            .expect("Test operation should succeed");
        assert_eq!(buffer.get_ref().len(), UNITY_CN_HEADER_SIZE);

        buffer.set_position(0);
        let mut read = UnityCnCipher::read_be(&mut buffer).expect("Test operation should succeed");
        assert_eq!(read.header(), original.header());
        assert!(!read.is_ready());

        read.set_key(key()).expect("Test operation should succeed");
        assert_eq!(read.tables(), original.tables());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let mut cipher = UnityCnCipher::from_header(cipher().header().clone());
        let result = cipher.set_key("FFEEDDCCBBAA99887766554433221100");
        assert!(matches!(result, Err(CryptoError::InvalidSignature { .. })));
        assert_eq!(cipher.state(), CipherState::Uninitialized);

        // material untouched, the right key still works
        cipher.set_key(key()).expect("Test operation should succeed");
        assert!(cipher.is_ready());
    }

    #[test]
    fn test_non_hex_key_leaves_cipher_unusable() {
        let mut cipher = UnityCnCipher::from_header(cipher().header().clone());
        let result = cipher.set_key("this is not a hex key");
        assert!(result.as_ref().is_err_and(CryptoError::is_key_error));

        let mut block = vec![0x10, 0x00];
        assert!(matches!(
            cipher.decrypt_block(&mut block, 0),
            Err(CryptoError::CipherNotInitialized)
        ));
        assert_eq!(block, vec![0x10, 0x00]);
    }

    /// 324-byte block decrypted at seed 3 with the tables of `info()`.
    /// Covers an extended literal length (0xFF, 0x03), an extended match
    /// length (0xFF, 0x07), a single-byte literal extension and a trailing
    /// literal run.
    const GOLDEN_CIPHERTEXT: &str = concat!(
        "82BBEAD44136945E873109CC7AF8F5169134F2C73F3E5C68F06AABAEC2179462",
        "0477DF146F1F077F264D93BB6FFD37252FAAA90E27E44426F19760A7B8156C41",
        "BAE8D0C87F5A84A0D7C070E4958B82590C0D91164D0AF5EF1F06E2A6BB4989D0",
        "4CB2ED88294185D7D06297DFA2FA4FCA6133A2746908E5DAB18F2B4281096328",
        "F1AB2EEC252A823D4A0900434FA2158F64F6D2C333348C01E10B3314C3AF7361",
        "E0AD8C8B2B6FF2E97D8FA4A954DC4CC14E2D1C9963E86379E550F1B439933092",
        "538FFFFFF3684DF4A1CA7AA969FF6D7757B0758FB17AE15DF7385EBA9B0B13D4",
        "80297EDD356B0C76EE947BDA4662F0CBB757D73CD5447EC34D9A71BDA170933E",
        "A15401C0A8D2A6879CC59ED5A3604CD3A6FA3A3A4DBB5B86E3DD220371D79EB3",
        "C4214E2256031B29EAECE6813E06F3943EE333DC32384E590F88F9A7B600FB5B",
        "72951F7E",
    );

    const GOLDEN_PLAINTEXT: &str = concat!(
        "F0FF03D44136945E873109CC7AF8F5169134F2C73F3E5C68F06AABAEC2179462",
        "0477DF146F1F077F264D93BB6FFD37252FAAA90E27E44426F19760A7B8156C41",
        "BAE8D0C87F5A84A0D7C070E4958B82590C0D91164D0AF5EF1F06E2A6BB4989D0",
        "4CB2ED88294185D7D06297DFA2FA4FCA6133A2746908E5DAB18F2B4281096328",
        "F1AB2EEC252A823D4A0900434FA2158F64F6D2C333348C01E10B3314C3AF7361",
        "E0AD8C8B2B6FF2E97D8FA4A954DC4CC14E2D1C9963E86379E550F1B439933092",
        "538FFFFFF3684DF4A1CA7AA969FF6D7757B0758FB17AE15DF7385EBA9B0B13D4",
        "80297EDD356B0C76EE947BDA4662F0CBB757D73CD5447EC34D9A71BDA170933E",
        "A15401C0A8D2A6879CC59ED5A3604CD3A6FA3A3A10001F860400FF07F20A9EB3",
        "C4214E2256031B29EAECE6813E06F3943EE333DC32384E210122F9A70800505B",
        "72951F7E",
    );

    #[test]
    fn test_decrypt_golden_block() {
        let cipher = cipher();
        let mut block = hex::decode(GOLDEN_CIPHERTEXT).expect("Test operation should succeed");
        let plaintext = hex::decode(GOLDEN_PLAINTEXT).expect("Test operation should succeed");
        assert_eq!(block.len(), 324);

        cipher
            .decrypt_block(&mut block, 3)
            .expect("Test operation should succeed");
        assert_eq!(block, plaintext);
    }

    #[test]
    fn test_encrypt_golden_block() {
        let cipher = cipher();
        let mut block = hex::decode(GOLDEN_PLAINTEXT).expect("Test operation should succeed");
        cipher
            .encrypt_block(&mut block, 3)
            .expect("Test operation should succeed");
        assert_eq!(hex::encode_upper(&block), GOLDEN_CIPHERTEXT.to_string());
    }

    #[test]
    fn test_round_trip_lz4_like_block() {
        let cipher = cipher();
        // literals, extended literal length, match offset, extended match length
        let mut plaintext = vec![0xF4, 0x03];
        plaintext.extend(b"abcdefghijklmnopqr");
        plaintext.extend([0x12, 0x00, 0x2F, b'z', 0x04, 0x00, 0xFF, 0x07]);
        plaintext.extend([0x50, b'l', b'a', b's', b't', b'!']);

        for seed in [0, 1, 77, 4096] {
            let mut block = plaintext.clone();
            cipher
                .encrypt_block(&mut block, seed)
                .expect("Test operation should succeed");
            assert_ne!(block, plaintext);
            // literals are left as-is
            assert_eq!(&block[2..20], &plaintext[2..20]);

            cipher
                .decrypt_block(&mut block, seed)
                .expect("Test operation should succeed");
            assert_eq!(block, plaintext);
        }
    }

    #[test]
    fn test_wrong_seed_does_not_round_trip() {
        let cipher = cipher();
        let plaintext = vec![0x12, b'a', 0x05, 0x00, 0x10, b'b', 0x01, 0x00, 0x20, b'c', b'd'];
        let mut block = plaintext.clone();
        cipher
            .encrypt_block(&mut block, 3)
            .expect("Test operation should succeed");
        cipher
            .decrypt_block(&mut block, 4)
            .expect("Test operation should succeed");
        assert_ne!(block, plaintext);
    }

    #[test]
    fn test_encrypt_requires_permutation() {
        let info = [0u8; 16];
        let cipher = UnityCnCipher::create(key(), info, [1; 16], [2; 16])
            .expect("Test operation should succeed");
        let mut block = vec![0x10, 0x00];
        assert!(matches!(
            cipher.encrypt_block(&mut block, 0),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_magic_length() {
        assert_eq!(UNITY_CN_MAGIC.len(), 16);
    }
}
