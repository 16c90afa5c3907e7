//! Structural layout of the annotations directory.
//!
//! The directory and its per-member lists are decoded faithfully; nested
//! annotation values are carried as [`EncodedValue`]s without deep
//! resolution - enough for a host to walk the structure.

use serde::Serialize;

use crate::encoded_values::EncodedAnnotation;
use crate::error::Result;
use crate::source::ByteSource;

/// `annotation_item`: a visibility byte followed by the encoded annotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationItem {
    /// 0x00 = build, 0x01 = runtime, 0x02 = system
    pub visibility: u8,
    pub annotation: EncodedAnnotation,
}

impl AnnotationItem {
    pub fn read(source: &ByteSource, ix: &mut usize) -> Result<AnnotationItem> {
        let visibility = source.read_u8(*ix)?;
        *ix += 1;
        let annotation = EncodedAnnotation::read(source, ix)?;
        Ok(AnnotationItem {
            visibility,
            annotation,
        })
    }
}

/// `annotation_set_item`: file offsets to `annotation_item`s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationSetItem {
    pub entries: Vec<u32>,
}

impl AnnotationSetItem {
    pub fn read(source: &ByteSource, offset: usize) -> Result<AnnotationSetItem> {
        let size = source.read_u32(offset)? as usize;
        let mut entries = vec![];
        for i in 0..size {
            entries.push(source.read_u32(offset + 4 + i * 4)?);
        }
        Ok(AnnotationSetItem { entries })
    }
}

/// An index into `field_ids` paired with an `annotation_set_item` offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldAnnotations {
    pub field_idx: u32,
    pub annotations_off: u32,
}

/// An index into `method_ids` paired with an `annotation_set_item` offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodAnnotations {
    pub method_idx: u32,
    pub annotations_off: u32,
}

/// An index into `method_ids` paired with an `annotation_set_ref_list`
/// offset holding one set per parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterAnnotations {
    pub method_idx: u32,
    pub annotations_off: u32,
}

/// `annotations_directory_item` for one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationsDirectoryItem {
    /// Offset to the class-level `annotation_set_item`, or 0 if none.
    pub class_annotations_off: u32,
    pub field_annotations: Vec<FieldAnnotations>,
    pub method_annotations: Vec<MethodAnnotations>,
    pub parameter_annotations: Vec<ParameterAnnotations>,
}

impl AnnotationsDirectoryItem {
    pub fn read(source: &ByteSource, offset: usize) -> Result<AnnotationsDirectoryItem> {
        let class_annotations_off = source.read_u32(offset)?;
        let fields_size = source.read_u32(offset + 4)? as usize;
        let methods_size = source.read_u32(offset + 8)? as usize;
        let parameters_size = source.read_u32(offset + 12)? as usize;

        let mut cursor = offset + 16;
        let mut field_annotations = vec![];
        for _ in 0..fields_size {
            field_annotations.push(FieldAnnotations {
                field_idx: source.read_u32(cursor)?,
                annotations_off: source.read_u32(cursor + 4)?,
            });
            cursor += 8;
        }
        let mut method_annotations = vec![];
        for _ in 0..methods_size {
            method_annotations.push(MethodAnnotations {
                method_idx: source.read_u32(cursor)?,
                annotations_off: source.read_u32(cursor + 4)?,
            });
            cursor += 8;
        }
        let mut parameter_annotations = vec![];
        for _ in 0..parameters_size {
            parameter_annotations.push(ParameterAnnotations {
                method_idx: source.read_u32(cursor)?,
                annotations_off: source.read_u32(cursor + 4)?,
            });
            cursor += 8;
        }

        Ok(AnnotationsDirectoryItem {
            class_annotations_off,
            field_annotations,
            method_annotations,
            parameter_annotations,
        })
    }
}
