//! Typed records for the six index tables and the map list, each carrying
//! both its raw indices and the display text resolved from them.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;

/// One entry of `string_ids`: the declared ULEB128 length and the text
/// decoded from exactly that many bytes. `declared_len` counts the bytes
/// that were sliced, not the decoded characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StringItem {
    pub declared_len: u32,
    pub text: String,
}

/// Decodes Java modified-UTF-8, falling back to lossy UTF-8 for byte runs
/// cesu8 rejects. Never fails: a mangled string yields replacement
/// characters rather than aborting the table.
pub(crate) fn decode_mutf8(bytes: &[u8]) -> String {
    match cesu8::from_java_cesu8(bytes) {
        Ok(text) => text.into_owned(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// One entry of `type_ids`, with the raw descriptor and its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeItem {
    pub descriptor_idx: u32,
    pub descriptor: String,
    pub display: String,
}

/// One entry of `proto_ids`. `parameters_off == 0` means the empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtoItem {
    pub shorty_idx: u32,
    pub return_type_idx: u32,
    pub parameters_off: u32,
    pub parameter_type_idxs: Vec<u16>,
    /// `"<ReturnType> (<arg1,arg2,...>)"`
    pub display: String,
}

/// One entry of `field_ids`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldItem {
    pub class_idx: u16,
    pub type_idx: u16,
    pub name_idx: u32,
    /// `"<FieldType> <ClassType>.<name>"`
    pub display: String,
}

/// One entry of `method_ids`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodItem {
    pub class_idx: u16,
    pub proto_idx: u16,
    pub name_idx: u32,
    /// `"<ReturnType> <ClassType>.<name>(<Args>)"`
    pub display: String,
}

/// One entry of `class_defs`.
///
/// Unlike the index tables, the optional fields here use `0` as "absent",
/// not the `0xFFFFFFFF` sentinel. That asymmetry is the format's own and is
/// preserved as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassDefItem {
    pub class_idx: u32,
    pub access_flags: u32,
    pub superclass_idx: u32,
    pub interfaces_off: u32,
    pub source_file_idx: u32,
    pub annotations_off: u32,
    pub class_data_off: u32,
    pub static_values_off: u32,
    /// `"<flags> <Class> [extends S ][implements I1,I2 ][from file]"`
    pub declaration: String,
}

/// One entry of the map list: purely descriptive section metadata, not
/// validated against the tables it describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapItem {
    pub item_type: u16,
    pub name: &'static str,
    pub size: u32,
    pub offset: u32,
}

static MAP_TYPE_NAMES: Lazy<HashMap<u16, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (0x0000, "type_header_item"),
        (0x0001, "type_string_id_item"),
        (0x0002, "type_type_id_item"),
        (0x0003, "type_proto_id_item"),
        (0x0004, "type_field_id_item"),
        (0x0005, "type_method_id_item"),
        (0x0006, "type_class_def_item"),
        (0x0007, "type_call_site_id_item"),
        (0x0008, "type_method_handle_item"),
        (0x1000, "type_map_list"),
        (0x1001, "type_type_list"),
        (0x1002, "type_annotation_set_ref_list"),
        (0x1003, "type_annotation_set_item"),
        (0x2000, "type_class_data_item"),
        (0x2001, "type_code_item"),
        (0x2002, "type_string_data_item"),
        (0x2003, "type_debug_info_item"),
        (0x2004, "type_annotation_item"),
        (0x2005, "type_encoded_array_item"),
        (0x2006, "type_annotations_directory_item"),
    ])
});

/// Name for a map section type code, or `None` for codes outside the table.
pub fn map_type_name(code: u16) -> Option<&'static str> {
    MAP_TYPE_NAMES.get(&code).copied()
}
