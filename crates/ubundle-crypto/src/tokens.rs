//! Token walk over an LZ4-style block
//!
//! UnityCN only transforms the control bytes of each LZ4 sequence: the token,
//! the literal-length continuation bytes, the two match-offset bytes and the
//! match-length continuation bytes. Literal runs are left untouched. Which
//! bytes are control bytes depends on the plaintext values, so decryption and
//! encryption share this walker and differ only in the byte transform.
//!
//! The token counter is seeded by the caller and advances once per token.
//! Inside a token the byte index restarts at the token counter and advances
//! once per transformed byte.

/// Where the walker is inside the current sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenState {
    /// Next byte is a sequence token
    Token,
    /// Reading 0xFF continuation bytes of the literal length
    ReadLiteralLength { length: usize, match_nibble: u8 },
    /// Literal bytes, skipped as-is
    SkipLiterals { length: usize, match_nibble: u8 },
    /// Two little-endian match-offset bytes
    ReadMatchOffset { remaining: u8, match_nibble: u8 },
    /// Reading 0xFF continuation bytes of the match length
    ReadMatchLength,
    /// Sequence complete
    EndOfToken,
}

struct TokenWalker<'a, F> {
    data: &'a mut [u8],
    offset: usize,
    token: u32,
    index: u32,
    transform: F,
}

impl<F> TokenWalker<'_, F>
where
    F: FnMut(&mut u8, u32) -> u8,
{
    /// Transform the byte at the cursor, returning its plaintext value.
    /// `None` once the cursor has run off the end of the block.
    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.data.get_mut(self.offset)?;
        let value = (self.transform)(byte, self.index);
        self.offset += 1;
        self.index = self.index.wrapping_add(1);
        Some(value)
    }

    fn run(mut self) {
        let mut state = TokenState::Token;
        loop {
            state = match state {
                TokenState::Token => {
                    self.index = self.token;
                    let Some(value) = self.next_byte() else {
                        break;
                    };
                    let length = usize::from(value >> 4);
                    let match_nibble = value & 0x0F;
                    if length == 0x0F {
                        TokenState::ReadLiteralLength {
                            length,
                            match_nibble,
                        }
                    } else {
                        TokenState::SkipLiterals {
                            length,
                            match_nibble,
                        }
                    }
                }
                TokenState::ReadLiteralLength {
                    length,
                    match_nibble,
                } => {
                    let Some(value) = self.next_byte() else {
                        break;
                    };
                    let length = length + usize::from(value);
                    if value == 0xFF {
                        TokenState::ReadLiteralLength {
                            length,
                            match_nibble,
                        }
                    } else {
                        TokenState::SkipLiterals {
                            length,
                            match_nibble,
                        }
                    }
                }
                TokenState::SkipLiterals {
                    length,
                    match_nibble,
                } => {
                    self.offset = self.offset.saturating_add(length);
                    if self.offset >= self.data.len() {
                        break;
                    }
                    TokenState::ReadMatchOffset {
                        remaining: 2,
                        match_nibble,
                    }
                }
                TokenState::ReadMatchOffset {
                    remaining,
                    match_nibble,
                } => {
                    if self.next_byte().is_none() {
                        break;
                    }
                    if remaining > 1 {
                        TokenState::ReadMatchOffset {
                            remaining: remaining - 1,
                            match_nibble,
                        }
                    } else if match_nibble == 0x0F {
                        TokenState::ReadMatchLength
                    } else {
                        TokenState::EndOfToken
                    }
                }
                TokenState::ReadMatchLength => {
                    let Some(value) = self.next_byte() else {
                        break;
                    };
                    if value == 0xFF {
                        TokenState::ReadMatchLength
                    } else {
                        TokenState::EndOfToken
                    }
                }
                TokenState::EndOfToken => {
                    self.token = self.token.wrapping_add(1);
                    TokenState::Token
                }
            };
        }
    }
}

/// Walk every control byte of `data`, calling `transform(byte, index)` on it.
///
/// `transform` rewrites the byte in place and returns the plaintext value the
/// walker should interpret (the new value when decrypting, the old one when
/// encrypting).
pub(crate) fn walk_tokens<F>(data: &mut [u8], seed: usize, transform: F)
where
    F: FnMut(&mut u8, u32) -> u8,
{
    TokenWalker {
        data,
        offset: 0,
        token: seed as u32,
        index: seed as u32,
        transform,
    }
    .run();
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Identity walk, recording (position, index) of every visited byte
    fn visited(data: &[u8], seed: usize) -> Vec<(usize, u32)> {
        let mut copy = data.to_vec();
        let base = copy.as_ptr() as usize;
        let mut seen = Vec::new();
        walk_tokens(&mut copy, seed, |byte, index| {
            seen.push((byte as *const u8 as usize - base, index));
            *byte
        });
        seen
    }

    #[test]
    fn test_simple_sequences() {
        // token 0x12: one literal, match nibble 2
        // token 0x30: three literals, end of block
        let data = [0x12, b'a', 0x05, 0x00, 0x30, b'x', b'y', b'z'];
        assert_eq!(visited(&data, 0), vec![(0, 0), (2, 1), (3, 2), (4, 1)]);
    }

    #[test]
    fn test_seed_offsets_token_counter() {
        let data = [0x12, b'a', 0x05, 0x00, 0x30, b'x', b'y', b'z'];
        assert_eq!(
            visited(&data, 40),
            vec![(0, 40), (2, 41), (3, 42), (4, 41)]
        );
    }

    #[test]
    fn test_literal_length_continuation() {
        // 15 + 255 + 2 = 272 literal bytes follow the length bytes
        let mut data = vec![0xF0, 0xFF, 0x02];
        data.extend(std::iter::repeat_n(0xAA, 272));
        data.extend([0x01, 0x00]);

        let seen = visited(&data, 0);
        assert_eq!(seen[..3], [(0, 0), (1, 1), (2, 2)]);
        // match offset bytes after the literal run
        assert_eq!(seen[3..], [(275, 3), (276, 4)]);
    }

    #[test]
    fn test_match_length_continuation_absorbed() {
        // token 0x0F: no literals, extended match length 0xFF then 0x03
        let data = [0x0F, 0x01, 0x00, 0xFF, 0x03, 0x10, b'q'];
        assert_eq!(
            visited(&data, 7),
            vec![(0, 7), (1, 8), (2, 9), (3, 10), (4, 11), (5, 8)]
        );
    }

    #[test]
    fn test_truncated_block_stops_cleanly() {
        // match offset would run past the end
        let data = [0x10, b'a', 0x05];
        assert_eq!(visited(&data, 0), vec![(0, 0), (2, 1)]);

        // literal length continuation never terminates inside the block
        let data = [0xF0, 0xFF, 0xFF];
        assert_eq!(visited(&data, 0), vec![(0, 0), (1, 1), (2, 2)]);

        assert!(visited(&[], 3).is_empty());
    }
}
