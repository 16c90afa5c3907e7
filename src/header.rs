use serde::Serialize;

use crate::error::{DexError, Result};
use crate::source::{ByteSource, Endian, ENDIAN_CONSTANT, REVERSE_ENDIAN_CONSTANT};

/// Fixed size of the DEX header layout.
pub const HEADER_SIZE: usize = 0x70;

/// Decoded `header_item`: the fixed 0x70-byte layout at the start of every
/// DEX file, giving the location and size of each index table.
#[derive(Debug, Clone, Serialize)]
pub struct Header {
    pub magic: [u8; 8],
    pub checksum: u32,
    pub signature: [u8; 20],
    pub file_size: u32,
    pub header_size: u32,
    pub endian_tag: u32,
    pub link_size: u32,
    pub link_off: u32,
    pub map_off: u32,
    pub string_ids_size: u32,
    pub string_ids_off: u32,
    pub type_ids_size: u32,
    pub type_ids_off: u32,
    pub proto_ids_size: u32,
    pub proto_ids_off: u32,
    pub field_ids_size: u32,
    pub field_ids_off: u32,
    pub method_ids_size: u32,
    pub method_ids_off: u32,
    pub class_defs_size: u32,
    pub class_defs_off: u32,
    pub data_size: u32,
    pub data_off: u32,
}

fn is_magic_valid(magic: &[u8]) -> bool {
    magic[0..4] == [0x64, 0x65, 0x78, 0x0A]
        && magic[4..7].iter().all(u8::is_ascii_digit)
        && magic[7] == 0x00
}

impl Header {
    /// Parses and validates the header. Failures here are fatal: no engine
    /// is constructed over a buffer whose header lies about its tables.
    pub fn read(source: &ByteSource) -> Result<Header> {
        if source.len() < HEADER_SIZE {
            return Err(DexError::NotADexFile(format!(
                "{} bytes is shorter than a dex header",
                source.len()
            )));
        }
        let magic_bytes = source.read_bytes(0, 8)?;
        if !is_magic_valid(magic_bytes) {
            return Err(DexError::NotADexFile(format!(
                "bad magic {:02x?}",
                magic_bytes
            )));
        }
        let mut magic = [0u8; 8];
        magic.copy_from_slice(magic_bytes);
        let mut signature = [0u8; 20];
        signature.copy_from_slice(source.read_bytes(0x0C, 20)?);

        let endian_tag = match source.endian() {
            // The probe in ByteSource only switched to big endian for the
            // reverse constant; anything else left as little endian must
            // still match the forward constant exactly.
            Endian::Big => REVERSE_ENDIAN_CONSTANT,
            Endian::Little => {
                let tag = source.read_u32(0x28)?;
                if tag != ENDIAN_CONSTANT {
                    return Err(DexError::Header(format!(
                        "endian tag {:#010x} is neither {:#010x} nor {:#010x}",
                        tag, ENDIAN_CONSTANT, REVERSE_ENDIAN_CONSTANT
                    )));
                }
                tag
            }
        };

        let header = Header {
            magic,
            checksum: source.read_u32(0x08)?,
            signature,
            file_size: source.read_u32(0x20)?,
            header_size: source.read_u32(0x24)?,
            endian_tag,
            link_size: source.read_u32(0x2C)?,
            link_off: source.read_u32(0x30)?,
            map_off: source.read_u32(0x34)?,
            string_ids_size: source.read_u32(0x38)?,
            string_ids_off: source.read_u32(0x3C)?,
            type_ids_size: source.read_u32(0x40)?,
            type_ids_off: source.read_u32(0x44)?,
            proto_ids_size: source.read_u32(0x48)?,
            proto_ids_off: source.read_u32(0x4C)?,
            field_ids_size: source.read_u32(0x50)?,
            field_ids_off: source.read_u32(0x54)?,
            method_ids_size: source.read_u32(0x58)?,
            method_ids_off: source.read_u32(0x5C)?,
            class_defs_size: source.read_u32(0x60)?,
            class_defs_off: source.read_u32(0x64)?,
            data_size: source.read_u32(0x68)?,
            data_off: source.read_u32(0x6C)?,
        };
        header.validate(source)?;
        Ok(header)
    }

    /// Checks that every announced table lies inside the actual buffer, so
    /// later per-table parsing can trust the extents it iterates over.
    fn validate(&self, source: &ByteSource) -> Result<()> {
        if self.header_size as usize != HEADER_SIZE {
            return Err(DexError::Header(format!(
                "header_size is {:#x}, expected {:#x}",
                self.header_size, HEADER_SIZE
            )));
        }
        let tables: [(&str, u32, u32, u64); 6] = [
            ("string_ids", self.string_ids_size, self.string_ids_off, 4),
            ("type_ids", self.type_ids_size, self.type_ids_off, 4),
            ("proto_ids", self.proto_ids_size, self.proto_ids_off, 12),
            ("field_ids", self.field_ids_size, self.field_ids_off, 8),
            ("method_ids", self.method_ids_size, self.method_ids_off, 8),
            ("class_defs", self.class_defs_size, self.class_defs_off, 32),
        ];
        let buffer_len = source.len() as u64;
        for (name, size, off, stride) in tables {
            if off == 0 {
                continue;
            }
            let end = u64::from(off) + u64::from(size) * stride;
            if u64::from(off) >= buffer_len || end > buffer_len {
                return Err(DexError::Header(format!(
                    "{} table ({} entries at {:#010x}) runs past the {} byte buffer",
                    name, size, off, buffer_len
                )));
            }
        }
        if self.map_off != 0 && u64::from(self.map_off) >= buffer_len {
            return Err(DexError::Header(format!(
                "map_off {:#010x} is past the {} byte buffer",
                self.map_off, buffer_len
            )));
        }
        Ok(())
    }

    /// Numeric DEX version from the magic, e.g. 35, 38, 39.
    pub fn dex_version(&self) -> u32 {
        u32::from(self.magic[4] - b'0') * 100
            + u32::from(self.magic[5] - b'0') * 10
            + u32::from(self.magic[6] - b'0')
    }

    pub fn is_little_endian(&self) -> bool {
        self.endian_tag == ENDIAN_CONSTANT
    }
}
