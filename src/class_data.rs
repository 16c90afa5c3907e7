//! The `class_data_item` and its delta-encoded member lists, plus the
//! `code_item` bodies the method records point at.

use serde::Serialize;

use crate::error::Result;
use crate::leb::read_uleb128;
use crate::source::ByteSource;

/// One field record from a class-data member list. `field_idx` is absolute:
/// the running sum of the raw deltas within this record's own list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedFieldItem {
    pub field_idx: u32,
    pub access_flags: u32,
}

/// One method record from a class-data member list. `code_off == 0` means
/// the method is abstract or native and carries no body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedMethodItem {
    pub method_idx: u32,
    pub access_flags: u32,
    pub code_off: u32,
    pub code: Option<CodeItem>,
}

/// A `code_item` body: the fixed 16-byte header plus the raw instruction
/// payload, captured verbatim. The engine does not interpret opcodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeItem {
    pub registers_size: u16,
    pub ins_size: u16,
    pub outs_size: u16,
    pub tries_size: u16,
    pub debug_info_off: u32,
    /// Declared instruction size in 16-bit code units.
    pub insns_size: u32,
    /// Exactly `2 * insns_size` bytes.
    pub instructions: Vec<u8>,
}

impl CodeItem {
    pub fn read(source: &ByteSource, offset: usize) -> Result<CodeItem> {
        let registers_size = source.read_u16(offset)?;
        let ins_size = source.read_u16(offset + 2)?;
        let outs_size = source.read_u16(offset + 4)?;
        let tries_size = source.read_u16(offset + 6)?;
        let debug_info_off = source.read_u32(offset + 8)?;
        let insns_size = source.read_u32(offset + 12)?;
        let instructions = source
            .read_bytes(offset + 16, insns_size as usize * 2)?
            .to_vec();
        Ok(CodeItem {
            registers_size,
            ins_size,
            outs_size,
            tries_size,
            debug_info_off,
            insns_size,
            instructions,
        })
    }

    pub fn instruction_byte_count(&self) -> usize {
        self.instructions.len()
    }
}

/// A decoded `class_data_item`: the four member lists of one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassDataItem {
    pub static_fields: Vec<EncodedFieldItem>,
    pub instance_fields: Vec<EncodedFieldItem>,
    pub direct_methods: Vec<EncodedMethodItem>,
    pub virtual_methods: Vec<EncodedMethodItem>,
}

impl ClassDataItem {
    /// Reads the item at `offset`: four ULEB128 counts in fixed order, then
    /// that many delta-encoded records per list. The running index sum
    /// resets at the start of each list.
    pub fn read(source: &ByteSource, offset: usize) -> Result<ClassDataItem> {
        let mut ix = offset;
        let static_field_size = read_uleb128(source, &mut ix)?;
        let instance_field_size = read_uleb128(source, &mut ix)?;
        let direct_method_size = read_uleb128(source, &mut ix)?;
        let virtual_method_size = read_uleb128(source, &mut ix)?;

        let static_fields = read_field_list(source, &mut ix, static_field_size)?;
        let instance_fields = read_field_list(source, &mut ix, instance_field_size)?;
        let direct_methods = read_method_list(source, &mut ix, direct_method_size)?;
        let virtual_methods = read_method_list(source, &mut ix, virtual_method_size)?;

        Ok(ClassDataItem {
            static_fields,
            instance_fields,
            direct_methods,
            virtual_methods,
        })
    }
}

fn read_field_list(
    source: &ByteSource,
    ix: &mut usize,
    count: u32,
) -> Result<Vec<EncodedFieldItem>> {
    let mut fields = vec![];
    let mut field_idx = 0u32;
    for _ in 0..count {
        field_idx = field_idx.wrapping_add(read_uleb128(source, ix)?);
        let access_flags = read_uleb128(source, ix)?;
        fields.push(EncodedFieldItem {
            field_idx,
            access_flags,
        });
    }
    Ok(fields)
}

fn read_method_list(
    source: &ByteSource,
    ix: &mut usize,
    count: u32,
) -> Result<Vec<EncodedMethodItem>> {
    let mut methods = vec![];
    let mut method_idx = 0u32;
    for _ in 0..count {
        method_idx = method_idx.wrapping_add(read_uleb128(source, ix)?);
        let access_flags = read_uleb128(source, ix)?;
        let code_off = read_uleb128(source, ix)?;
        let code = if code_off > 0 {
            Some(CodeItem::read(source, code_off as usize)?)
        } else {
            None
        };
        methods.push(EncodedMethodItem {
            method_idx,
            access_flags,
            code_off,
            code,
        });
    }
    Ok(methods)
}
