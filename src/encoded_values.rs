//! The `encoded_value` / `encoded_array` / `encoded_annotation` formats used
//! by class static initializers and annotations.
//!
//! Each value starts with one tag byte: the low 5 bits select the variant,
//! the high 3 bits are a length-minus-one argument. Decoding is a strict
//! left-to-right scan; every variant advances the cursor by exactly what it
//! consumed.

use log::warn;
use serde::Serialize;

use crate::error::Result;
use crate::leb::read_uleb128;
use crate::source::ByteSource;

pub const VALUE_BYTE: u8 = 0x00;
pub const VALUE_SHORT: u8 = 0x02;
pub const VALUE_CHAR: u8 = 0x03;
pub const VALUE_INT: u8 = 0x04;
pub const VALUE_LONG: u8 = 0x06;
pub const VALUE_FLOAT: u8 = 0x10;
pub const VALUE_DOUBLE: u8 = 0x11;
pub const VALUE_METHOD_TYPE: u8 = 0x15;
pub const VALUE_METHOD_HANDLE: u8 = 0x16;
pub const VALUE_STRING: u8 = 0x17;
pub const VALUE_TYPE: u8 = 0x18;
pub const VALUE_FIELD: u8 = 0x19;
pub const VALUE_METHOD: u8 = 0x1A;
pub const VALUE_ENUM: u8 = 0x1B;
pub const VALUE_ARRAY: u8 = 0x1C;
pub const VALUE_ANNOTATION: u8 = 0x1D;
pub const VALUE_NULL: u8 = 0x1E;
pub const VALUE_BOOLEAN: u8 = 0x1F;

/// A decoded `encoded_value`.
///
/// Integer-like variants hold the raw little-endian byte accumulation
/// without sign extension; callers interpret the bits per variant. The
/// index-carrying variants (`String`, `Type`, `Field`, `Method`, `Enum`,
/// `MethodType`, `MethodHandle`) are left unresolved here and looked up
/// through the engine's tables when rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EncodedValue {
    Byte(u8),
    Short(u16),
    Char(u16),
    Int(u32),
    Long(u64),
    Float(f32),
    Double(f64),
    MethodType(u32),
    MethodHandle(u32),
    String(u32),
    Type(u32),
    Field(u32),
    Method(u32),
    Enum(u32),
    Array(Vec<EncodedValue>),
    Annotation(EncodedAnnotation),
    Null,
    Boolean(bool),
}

impl EncodedValue {
    /// Reads one value at `*ix`, advancing the cursor.
    pub fn read(source: &ByteSource, ix: &mut usize) -> Result<EncodedValue> {
        let tag = source.read_u8(*ix)?;
        *ix += 1;
        let value_arg = tag >> 5;
        let value_type = tag & 0x1F;
        let size = value_arg as usize + 1;

        Ok(match value_type {
            VALUE_BYTE => EncodedValue::Byte(read_uint(source, ix, size)? as u8),
            VALUE_SHORT => EncodedValue::Short(read_uint(source, ix, size)? as u16),
            VALUE_CHAR => EncodedValue::Char(read_uint(source, ix, size)? as u16),
            VALUE_INT => EncodedValue::Int(read_uint(source, ix, size)? as u32),
            VALUE_LONG => EncodedValue::Long(read_uint(source, ix, size)?),
            VALUE_FLOAT => {
                EncodedValue::Float(f32::from_bits(read_uint(source, ix, size)? as u32))
            }
            VALUE_DOUBLE => EncodedValue::Double(f64::from_bits(read_uint(source, ix, size)?)),
            VALUE_METHOD_TYPE => EncodedValue::MethodType(read_uint(source, ix, size)? as u32),
            VALUE_METHOD_HANDLE => {
                EncodedValue::MethodHandle(read_uint(source, ix, size)? as u32)
            }
            VALUE_STRING => EncodedValue::String(read_uint(source, ix, size)? as u32),
            VALUE_TYPE => EncodedValue::Type(read_uint(source, ix, size)? as u32),
            VALUE_FIELD => EncodedValue::Field(read_uint(source, ix, size)? as u32),
            VALUE_METHOD => EncodedValue::Method(read_uint(source, ix, size)? as u32),
            VALUE_ENUM => EncodedValue::Enum(read_uint(source, ix, size)? as u32),
            VALUE_ARRAY => EncodedValue::Array(read_encoded_array(source, ix)?),
            VALUE_ANNOTATION => EncodedValue::Annotation(EncodedAnnotation::read(source, ix)?),
            VALUE_BOOLEAN => EncodedValue::Boolean(value_arg != 0),
            VALUE_NULL => EncodedValue::Null,
            other => {
                warn!("unknown encoded value type {:#04x}, treating as null", other);
                EncodedValue::Null
            }
        })
    }
}

/// Accumulates `size` little-endian bytes into an unsigned integer.
fn read_uint(source: &ByteSource, ix: &mut usize, size: usize) -> Result<u64> {
    let mut value = 0u64;
    for i in 0..size {
        value |= u64::from(source.read_u8(*ix)?) << (8 * i);
        *ix += 1;
    }
    Ok(value)
}

/// Reads an `encoded_array`: ULEB128 count followed by that many values.
pub fn read_encoded_array(source: &ByteSource, ix: &mut usize) -> Result<Vec<EncodedValue>> {
    let size = read_uleb128(source, ix)? as usize;
    let mut values = vec![];
    for _ in 0..size {
        values.push(EncodedValue::read(source, ix)?);
    }
    Ok(values)
}

/// A decoded `encoded_annotation`: a type plus named element values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedAnnotation {
    pub type_idx: u32,
    pub elements: Vec<AnnotationElement>,
}

impl EncodedAnnotation {
    pub fn read(source: &ByteSource, ix: &mut usize) -> Result<EncodedAnnotation> {
        let type_idx = read_uleb128(source, ix)?;
        let size = read_uleb128(source, ix)? as usize;
        let mut elements = vec![];
        for _ in 0..size {
            elements.push(AnnotationElement::read(source, ix)?);
        }
        Ok(EncodedAnnotation { type_idx, elements })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationElement {
    pub name_idx: u32,
    pub value: EncodedValue,
}

impl AnnotationElement {
    pub fn read(source: &ByteSource, ix: &mut usize) -> Result<AnnotationElement> {
        let name_idx = read_uleb128(source, ix)?;
        let value = EncodedValue::read(source, ix)?;
        Ok(AnnotationElement { name_idx, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_one(bytes: &[u8]) -> (EncodedValue, usize) {
        let source = ByteSource::new(bytes.to_vec());
        let mut ix = 0;
        let value = EncodedValue::read(&source, &mut ix).expect("decode failed");
        (value, ix)
    }

    #[test]
    fn test_encoded_value_byte() {
        let (value, consumed) = read_one(&[0x00, 0x7F]);
        assert_eq!(value, EncodedValue::Byte(0x7F));
        assert_eq!(consumed, 2);
    }

    #[test]
    fn test_encoded_value_int() {
        // value_arg 3 -> 4 bytes, little endian.
        let (value, consumed) = read_one(&[0x64, 0x78, 0x56, 0x34, 0x12]);
        assert_eq!(value, EncodedValue::Int(0x12345678));
        assert_eq!(consumed, 5);
    }

    #[test]
    fn short_bytes_are_not_sign_extended() {
        // 0xFF in a single byte stays 0x00FF; the caller interprets signs.
        let (value, _) = read_one(&[0x02, 0xFF]);
        assert_eq!(value, EncodedValue::Short(0x00FF));
    }

    #[test]
    fn test_encoded_value_float_bits() {
        // 1.0f == 0x3F800000, all four bytes present.
        let (value, consumed) = read_one(&[0x70, 0x00, 0x00, 0x80, 0x3F]);
        assert_eq!(value, EncodedValue::Float(1.0));
        assert_eq!(consumed, 5);
    }

    #[test]
    fn test_encoded_value_null_and_boolean() {
        assert_eq!(read_one(&[0x1E]).0, EncodedValue::Null);
        assert_eq!(read_one(&[0x1F]).0, EncodedValue::Boolean(false));
        assert_eq!(read_one(&[0x1F | (1 << 5)]).0, EncodedValue::Boolean(true));
    }

    #[test]
    fn unknown_tags_decode_as_null() {
        let (value, consumed) = read_one(&[0x05]);
        assert_eq!(value, EncodedValue::Null);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn test_encoded_array_nested() {
        // count=2: Int(1) (1 byte), nested array [Boolean(true)]
        let bytes = [0x02, 0x04, 0x01, 0x1C, 0x01, 0x3F];
        let source = ByteSource::new(bytes.to_vec());
        let mut ix = 0;
        let values = read_encoded_array(&source, &mut ix).unwrap();
        assert_eq!(ix, bytes.len());
        assert_eq!(
            values,
            vec![
                EncodedValue::Int(1),
                EncodedValue::Array(vec![EncodedValue::Boolean(true)]),
            ]
        );
    }

    #[test]
    fn test_encoded_annotation() {
        // type_idx=3, size=1, element name_idx=2 value Boolean(true)
        let bytes = [0x1D, 0x03, 0x01, 0x02, 0x3F];
        let (value, consumed) = read_one(&bytes);
        assert_eq!(consumed, bytes.len());
        match value {
            EncodedValue::Annotation(annotation) => {
                assert_eq!(annotation.type_idx, 3);
                assert_eq!(annotation.elements.len(), 1);
                assert_eq!(annotation.elements[0].name_idx, 2);
                assert_eq!(annotation.elements[0].value, EncodedValue::Boolean(true));
            }
            other => panic!("unexpected variant {:?}", other),
        }
    }

    #[test]
    fn truncated_values_error_out() {
        let source = ByteSource::new(vec![0x24, 0x01]); // declares 2 bytes, has 1
        let mut ix = 0;
        assert!(EncodedValue::read(&source, &mut ix).is_err());
    }
}
