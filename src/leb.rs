//! ULEB128: 7 payload bits per byte, continuation bit in the high bit.
//! DEX caps every uleb128 value at 32 bits, so a valid encoding is 1..=5
//! bytes and the 5th byte may carry at most 4 payload bits.

use crate::error::{DexError, Result};
use crate::source::ByteSource;

/// Decodes one ULEB128 value at `offset`, returning the value and the number
/// of bytes consumed (1..=5). A 5th byte that still has its continuation bit
/// set, or whose payload overflows 32 bits, is [`DexError::MalformedVarint`].
pub fn decode_uleb128(source: &ByteSource, offset: usize) -> Result<(u32, usize)> {
    let mut value: u32 = 0;
    for i in 0..5 {
        let byte = source.read_u8(offset + i)?;
        let more = byte & 0x80 != 0;
        let payload = u32::from(byte & 0x7F);
        if i == 4 && (more || payload > 0x0F) {
            return Err(DexError::MalformedVarint { offset });
        }
        value |= payload << (7 * i);
        if !more {
            return Ok((value, i + 1));
        }
    }
    Err(DexError::MalformedVarint { offset })
}

/// Decodes at `*ix` and advances the cursor past the consumed bytes.
pub fn read_uleb128(source: &ByteSource, ix: &mut usize) -> Result<u32> {
    let (value, size) = decode_uleb128(source, *ix)?;
    *ix += size;
    Ok(value)
}

/// Minimal-length ULEB128 encoding of `value`.
pub fn encode_uleb128(value: u32) -> Vec<u8> {
    let mut result = Vec::new();
    let mut remaining = value;

    loop {
        let mut byte = (remaining & 0x7F) as u8;
        remaining >>= 7;
        if remaining != 0 {
            byte |= 0x80;
        }
        result.push(byte);
        if remaining == 0 {
            break;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Result<(u32, usize)> {
        decode_uleb128(&ByteSource::new(bytes.to_vec()), 0)
    }

    #[test]
    fn test_encode_uleb128() {
        let cases = vec![
            (0, vec![0x00]),
            (1, vec![0x01]),
            (127, vec![0x7F]),
            (128, vec![0x80, 0x01]),
            (16256, vec![0x80, 0x7F]),
            (624485, vec![0xE5, 0x8E, 0x26]),
            (u32::MAX, vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]),
        ];

        for (value, expected) in cases {
            assert_eq!(encode_uleb128(value), expected);
        }
    }

    #[test]
    fn test_decode_uleb128() {
        let cases = vec![
            (vec![0x00], 0),
            (vec![0x01], 1),
            (vec![0x7F], 127),
            (vec![0x80, 0x01], 128),
            (vec![0x80, 0x7F], 16256),
            (vec![0xE5, 0x8E, 0x26], 624485),
            (vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F], u32::MAX),
        ];

        for (encoded, expected) in cases {
            let (value, size) = decode(&encoded).unwrap();
            assert_eq!(value, expected);
            assert_eq!(size, encoded.len());
        }
    }

    #[test]
    fn round_trips_are_minimal() {
        for value in [
            0u32,
            1,
            0x7F,
            0x80,
            0x3FFF,
            0x4000,
            0x001F_FFFF,
            0x0020_0000,
            0x0FFF_FFFF,
            0x1000_0000,
            u32::MAX - 1,
            u32::MAX,
        ] {
            let encoded = encode_uleb128(value);
            assert!((1..=5).contains(&encoded.len()));
            let (decoded, size) = decode(&encoded).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(size, encoded.len());
        }
    }

    #[test]
    fn fifth_byte_must_terminate_within_32_bits() {
        // Continuation bit still set on the 5th byte.
        assert!(matches!(
            decode(&[0x80, 0x80, 0x80, 0x80, 0x80]),
            Err(DexError::MalformedVarint { offset: 0 })
        ));
        // 5th-byte payload bits past bit 31.
        assert!(decode(&[0xFF, 0xFF, 0xFF, 0xFF, 0x7F]).is_err());
        // Truncated run.
        assert!(decode(&[0x80]).is_err());
    }
}
