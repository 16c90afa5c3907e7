use crate::error::{DexError, Result};

pub const ENDIAN_CONSTANT: u32 = 0x12345678;
pub const REVERSE_ENDIAN_CONSTANT: u32 = 0x78563412;

/// Integer byte order of a DEX file, taken from the header's endian tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// An immutable, randomly addressable view over the file's bytes.
///
/// Every read is bounds-checked and fails with [`DexError::OutOfBounds`]
/// rather than touching memory past the buffer; this is the single chokepoint
/// between attacker-controlled offsets and memory. Reads are pure: there is
/// no cursor state, so concurrent read-only use is safe.
#[derive(Debug)]
pub struct ByteSource {
    data: Vec<u8>,
    endian: Endian,
}

impl ByteSource {
    /// Wraps a byte buffer, probing the endian tag at offset 0x28 when the
    /// buffer is large enough to hold one. Buffers too short for a header
    /// default to little endian; header validation rejects them later.
    pub fn new(data: Vec<u8>) -> ByteSource {
        let endian = if data.len() >= 0x2C {
            let tag = u32::from_le_bytes([data[0x28], data[0x29], data[0x2A], data[0x2B]]);
            if tag == REVERSE_ENDIAN_CONSTANT {
                Endian::Big
            } else {
                Endian::Little
            }
        } else {
            Endian::Little
        };
        ByteSource { data, endian }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// The whole underlying buffer, for hosts that render raw bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn check(&self, offset: usize, len: usize) -> Result<()> {
        let end = offset
            .checked_add(len)
            .ok_or_else(|| DexError::out_of_bounds(offset, len, self.data.len()))?;
        if end > self.data.len() {
            return Err(DexError::out_of_bounds(offset, len, self.data.len()));
        }
        Ok(())
    }

    pub fn read_bytes(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.check(offset, len)?;
        Ok(&self.data[offset..offset + len])
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8> {
        self.check(offset, 1)?;
        Ok(self.data[offset])
    }

    pub fn read_u16(&self, offset: usize) -> Result<u16> {
        self.check(offset, 2)?;
        let raw = [self.data[offset], self.data[offset + 1]];
        Ok(match self.endian {
            Endian::Little => u16::from_le_bytes(raw),
            Endian::Big => u16::from_be_bytes(raw),
        })
    }

    pub fn read_u32(&self, offset: usize) -> Result<u32> {
        self.check(offset, 4)?;
        let raw = [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ];
        Ok(match self.endian {
            Endian::Little => u32::from_le_bytes(raw),
            Endian::Big => u32::from_be_bytes(raw),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_bounds_checked() {
        let source = ByteSource::new(vec![1, 2, 3, 4]);
        assert_eq!(source.read_u32(0).unwrap(), 0x04030201);
        assert!(matches!(
            source.read_u32(1),
            Err(DexError::OutOfBounds { offset: 1, len: 4, size: 4 })
        ));
        assert!(source.read_u8(4).is_err());
        assert!(source.read_bytes(0, 5).is_err());
        assert!(source.read_bytes(usize::MAX, 2).is_err());
    }

    #[test]
    fn endian_probe_switches_multibyte_reads() {
        let mut data = vec![0u8; 0x30];
        data[0x28..0x2C].copy_from_slice(&REVERSE_ENDIAN_CONSTANT.to_le_bytes());
        data[0] = 0x12;
        data[1] = 0x34;
        let source = ByteSource::new(data);
        assert_eq!(source.endian(), Endian::Big);
        assert_eq!(source.read_u16(0).unwrap(), 0x1234);

        let source = ByteSource::new(vec![0x12, 0x34]);
        assert_eq!(source.endian(), Endian::Little);
        assert_eq!(source.read_u16(0).unwrap(), 0x3412);
    }
}
