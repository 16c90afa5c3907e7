//! The decoding engine: owns the byte source, the eagerly parsed header and
//! the lazily parsed section tables, and resolves cross-table indices into
//! display text.

use std::fs;
use std::path::Path;

use log::{error, info, warn};

use crate::annotations::AnnotationsDirectoryItem;
use crate::class_data::ClassDataItem;
use crate::descriptor::resolve_descriptor;
use crate::encoded_values::{read_encoded_array, EncodedValue};
use crate::error::{DexError, Result};
use crate::flags::{describe_flags, FlagKind};
use crate::header::Header;
use crate::items::{
    decode_mutf8, map_type_name, ClassDefItem, FieldItem, MapItem, MethodItem, ProtoItem,
    StringItem, TypeItem,
};
use crate::leb::decode_uleb128;
use crate::source::ByteSource;
use crate::table::SectionTable;

/// The index tables' own "no value" marker. Note that `class_def_item`'s
/// optional fields use `0` instead; the two conventions are not unified.
pub const NO_INDEX: u32 = 0xFFFF_FFFF;

/// Callback receiving a completion fraction in `[0, 1]` while a section
/// table is being parsed: once per element in index order, then a final
/// `1.0`.
pub type ProgressFn = Box<dyn Fn(f64)>;

/// A decoded DEX file.
///
/// The header is parsed eagerly at [`open`](DexFile::open); every section
/// table is parsed on first demand and cached for the engine's lifetime.
/// Lookups degrade gracefully: a malformed entry or out-of-range index is
/// logged and replaced with a placeholder, so one corrupt record never
/// aborts analysis of the rest of the file.
///
/// The engine is single-threaded by design (the lazy caches take no locks),
/// which also makes it `!Sync`; share it across threads by finishing the
/// loads first or by giving each thread its own instance.
pub struct DexFile {
    source: ByteSource,
    header: Header,
    strings: SectionTable<StringItem>,
    types: SectionTable<TypeItem>,
    protos: SectionTable<ProtoItem>,
    fields: SectionTable<FieldItem>,
    methods: SectionTable<MethodItem>,
    class_defs: SectionTable<ClassDefItem>,
    map_list: SectionTable<MapItem>,
    progress: Option<ProgressFn>,
}

impl DexFile {
    /// Opens a raw DEX byte buffer. Fails with [`DexError::NotADexFile`]
    /// when the magic does not match, or [`DexError::Header`] when the
    /// header's table extents lie outside the buffer.
    pub fn open(data: Vec<u8>) -> Result<DexFile> {
        let source = ByteSource::new(data);
        let header = Header::read(&source)?;
        Ok(DexFile {
            source,
            header,
            strings: SectionTable::new("string_ids"),
            types: SectionTable::new("type_ids"),
            protos: SectionTable::new("proto_ids"),
            fields: SectionTable::new("field_ids"),
            methods: SectionTable::new("method_ids"),
            class_defs: SectionTable::new("class_defs"),
            map_list: SectionTable::new("map_list"),
            progress: None,
        })
    }

    /// Opens the DEX file at `path`.
    pub fn open_file<P: AsRef<Path>>(path: P) -> Result<DexFile> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DexError::FileNotFound(path.to_path_buf()));
        }
        DexFile::open(fs::read(path)?)
    }

    /// Registers a progress callback. Register before the first bulk query;
    /// already-cached tables will not report again.
    pub fn set_progress(&mut self, callback: impl Fn(f64) + 'static) {
        self.progress = Some(Box::new(callback));
    }

    fn report(&self, fraction: f64) {
        if let Some(callback) = &self.progress {
            callback(fraction);
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The raw file bytes, for hosts that render a hex view.
    pub fn bytes(&self) -> &[u8] {
        self.source.bytes()
    }

    pub fn string_count(&self) -> u32 {
        self.header.string_ids_size
    }

    pub fn type_count(&self) -> u32 {
        self.header.type_ids_size
    }

    pub fn proto_count(&self) -> u32 {
        self.header.proto_ids_size
    }

    pub fn field_count(&self) -> u32 {
        self.header.field_ids_size
    }

    pub fn method_count(&self) -> u32 {
        self.header.method_ids_size
    }

    pub fn class_def_count(&self) -> u32 {
        self.header.class_defs_size
    }

    /* Whole-table accessors; each parses its section on first use. */

    pub fn strings(&self) -> &[StringItem] {
        self.strings.load(|| self.parse_strings())
    }

    pub fn types(&self) -> &[TypeItem] {
        self.types.load(|| self.parse_types())
    }

    pub fn protos(&self) -> &[ProtoItem] {
        self.protos.load(|| self.parse_protos())
    }

    pub fn fields(&self) -> &[FieldItem] {
        self.fields.load(|| self.parse_fields())
    }

    pub fn methods(&self) -> &[MethodItem] {
        self.methods.load(|| self.parse_methods())
    }

    pub fn class_defs(&self) -> &[ClassDefItem] {
        self.class_defs.load(|| self.parse_class_defs())
    }

    pub fn map_entries(&self) -> &[MapItem] {
        self.map_list.load(|| self.parse_map())
    }

    /* Index resolution with the placeholder policy. */

    /// Text of string `index`. The `NO_INDEX` sentinel is the format's own
    /// "no value" and resolves to entry 0; any other out-of-range index is
    /// logged and yields the placeholder `" "`.
    pub fn get_string(&self, index: u32) -> String {
        let table = self.strings();
        if index == NO_INDEX {
            info!("string lookup with NO_INDEX, resolving to entry 0");
            return table
                .first()
                .map(|item| item.text.clone())
                .unwrap_or_default();
        }
        match table.get(index as usize) {
            Some(item) => item.text.clone(),
            None => {
                error!(
                    "{}",
                    DexError::index_out_of_range(self.strings.label(), index, table.len())
                );
                String::from(" ")
            }
        }
    }

    /// Display name of type `index`, with the same sentinel rule as
    /// [`get_string`](Self::get_string); out-of-range yields `""`.
    pub fn get_type(&self, index: u32) -> String {
        let table = self.types();
        if index == NO_INDEX {
            info!("type lookup with NO_INDEX, resolving to entry 0");
            return table
                .first()
                .map(|item| item.display.clone())
                .unwrap_or_default();
        }
        match table.get(index as usize) {
            Some(item) => item.display.clone(),
            None => {
                error!(
                    "{}",
                    DexError::index_out_of_range(self.types.label(), index, table.len())
                );
                String::new()
            }
        }
    }

    /// Resolved signature text of prototype `index`; absent or out-of-range
    /// prototypes yield the placeholder `" "`.
    pub fn get_proto(&self, index: u32) -> String {
        let table = self.protos();
        if index == NO_INDEX {
            info!("proto lookup with NO_INDEX");
            return String::from(" ");
        }
        match table.get(index as usize) {
            Some(item) => item.display.clone(),
            None => {
                error!(
                    "{}",
                    DexError::index_out_of_range(self.protos.label(), index, table.len())
                );
                String::from(" ")
            }
        }
    }

    pub fn get_field(&self, index: u32) -> Option<&FieldItem> {
        self.lookup(self.fields(), self.fields.label(), index)
    }

    pub fn get_method(&self, index: u32) -> Option<&MethodItem> {
        self.lookup(self.methods(), self.methods.label(), index)
    }

    pub fn get_class_def(&self, index: u32) -> Option<&ClassDefItem> {
        self.lookup(self.class_defs(), self.class_defs.label(), index)
    }

    fn lookup<'a, T>(&self, table: &'a [T], label: &'static str, index: u32) -> Option<&'a T> {
        if index == NO_INDEX {
            return None;
        }
        let entry = table.get(index as usize);
        if entry.is_none() {
            error!(
                "{}",
                DexError::index_out_of_range(label, index, table.len())
            );
        }
        entry
    }

    /* Offset-based queries into the data section. */

    /// Decodes the `class_data_item` at `offset` (a `class_data_off` taken
    /// from a class definition).
    pub fn class_data(&self, offset: u32) -> Result<ClassDataItem> {
        ClassDataItem::read(&self.source, offset as usize)
    }

    /// Decodes the `encoded_array` of static initializer values at `offset`.
    pub fn static_values(&self, offset: u32) -> Result<Vec<EncodedValue>> {
        let mut ix = offset as usize;
        read_encoded_array(&self.source, &mut ix)
    }

    /// Decodes the `annotations_directory_item` at `offset`. Structural
    /// only; nested annotation values stay unresolved.
    pub fn annotations_directory(&self, offset: u32) -> Result<AnnotationsDirectoryItem> {
        AnnotationsDirectoryItem::read(&self.source, offset as usize)
    }

    /// Renders an encoded value for display, resolving string indices
    /// through the strings table.
    pub fn render_value(&self, value: &EncodedValue) -> String {
        match value {
            EncodedValue::Byte(x) => format!("{}", x),
            EncodedValue::Short(x) => format!("{}", x),
            EncodedValue::Char(x) => format!("{}", x),
            EncodedValue::Int(x) => format!("{}", x),
            EncodedValue::Long(x) => format!("{}", x),
            EncodedValue::Float(x) => format!("{}", x),
            EncodedValue::Double(x) => format!("{}", x),
            EncodedValue::MethodType(x) => format!("proto@{}", x),
            EncodedValue::MethodHandle(x) => format!("handle@{}", x),
            EncodedValue::String(index) => format!("\"{}\"", self.get_string(*index)),
            EncodedValue::Type(index) => self.get_type(*index),
            EncodedValue::Field(index) => format!("field@{}", index),
            EncodedValue::Method(index) => format!("method@{}", index),
            EncodedValue::Enum(index) => format!("enum@{}", index),
            EncodedValue::Array(values) => {
                let inner: Vec<String> =
                    values.iter().map(|value| self.render_value(value)).collect();
                format!("{{ {} }}", inner.join(", "))
            }
            EncodedValue::Annotation(annotation) => {
                format!("annotation@type:{}", annotation.type_idx)
            }
            EncodedValue::Null => String::from("null"),
            EncodedValue::Boolean(x) => format!("{}", x),
        }
    }

    /* Per-section parsers, each run exactly once by its SectionTable. */

    fn parse_strings(&self) -> Vec<StringItem> {
        let count = self.header.string_ids_size as usize;
        let base = self.header.string_ids_off as usize;
        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let entry = self.read_string_item(base + i * 4).unwrap_or_else(|err| {
                warn!("string {} unreadable: {}", i, err);
                StringItem {
                    declared_len: 0,
                    text: String::new(),
                }
            });
            entries.push(entry);
            self.report(i as f64 / count as f64);
        }
        self.report(1.0);
        entries
    }

    fn read_string_item(&self, id_offset: usize) -> Result<StringItem> {
        let data_off = self.source.read_u32(id_offset)? as usize;
        let (declared_len, len_size) = decode_uleb128(&self.source, data_off)?;
        let raw = self
            .source
            .read_bytes(data_off + len_size, declared_len as usize)?;
        Ok(StringItem {
            declared_len,
            text: decode_mutf8(raw),
        })
    }

    fn parse_types(&self) -> Vec<TypeItem> {
        let count = self.header.type_ids_size as usize;
        let base = self.header.type_ids_off as usize;
        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let descriptor_idx = self.source.read_u32(base + i * 4).unwrap_or(NO_INDEX);
            let descriptor = self.get_string(descriptor_idx);
            let display = resolve_descriptor(&descriptor).unwrap_or_else(|err| {
                error!("type {}: {}", i, err);
                String::new()
            });
            entries.push(TypeItem {
                descriptor_idx,
                descriptor,
                display,
            });
            self.report(i as f64 / count as f64);
        }
        self.report(1.0);
        entries
    }

    fn parse_protos(&self) -> Vec<ProtoItem> {
        let count = self.header.proto_ids_size as usize;
        let base = self.header.proto_ids_off as usize;
        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let record = base + i * 12;
            let shorty_idx = self.source.read_u32(record).unwrap_or(NO_INDEX);
            let return_type_idx = self.source.read_u32(record + 4).unwrap_or(NO_INDEX);
            let parameters_off = self.source.read_u32(record + 8).unwrap_or(0);
            let parameter_type_idxs = if parameters_off == 0 {
                vec![]
            } else {
                self.read_type_list(parameters_off as usize)
                    .unwrap_or_else(|err| {
                        warn!("proto {} parameter list unreadable: {}", i, err);
                        vec![]
                    })
            };
            let parameter_names: Vec<String> = parameter_type_idxs
                .iter()
                .map(|idx| self.get_type(u32::from(*idx)))
                .collect();
            let display = format!(
                "{} ({})",
                self.get_type(return_type_idx),
                parameter_names.join(",")
            );
            entries.push(ProtoItem {
                shorty_idx,
                return_type_idx,
                parameters_off,
                parameter_type_idxs,
                display,
            });
            self.report(i as f64 / count as f64);
        }
        self.report(1.0);
        entries
    }

    /// Reads a `type_list`: `(count: u32, [u16; count])`. Shared by proto
    /// parameter lists and class interface lists.
    fn read_type_list(&self, offset: usize) -> Result<Vec<u16>> {
        let count = self.source.read_u32(offset)? as usize;
        let mut indices = vec![];
        for i in 0..count {
            indices.push(self.source.read_u16(offset + 4 + i * 2)?);
        }
        Ok(indices)
    }

    fn parse_fields(&self) -> Vec<FieldItem> {
        let count = self.header.field_ids_size as usize;
        let base = self.header.field_ids_off as usize;
        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let record = base + i * 8;
            let class_idx = self.source.read_u16(record).unwrap_or(u16::MAX);
            let type_idx = self.source.read_u16(record + 2).unwrap_or(u16::MAX);
            let name_idx = self.source.read_u32(record + 4).unwrap_or(NO_INDEX);
            let display = format!(
                "{} {}.{}",
                self.get_type(u32::from(type_idx)),
                self.get_type(u32::from(class_idx)),
                self.get_string(name_idx)
            );
            entries.push(FieldItem {
                class_idx,
                type_idx,
                name_idx,
                display,
            });
            self.report(i as f64 / count as f64);
        }
        self.report(1.0);
        entries
    }

    fn parse_methods(&self) -> Vec<MethodItem> {
        let count = self.header.method_ids_size as usize;
        let base = self.header.method_ids_off as usize;
        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let record = base + i * 8;
            let class_idx = self.source.read_u16(record).unwrap_or(u16::MAX);
            let proto_idx = self.source.read_u16(record + 2).unwrap_or(u16::MAX);
            let name_idx = self.source.read_u32(record + 4).unwrap_or(NO_INDEX);
            let class_name = self.get_type(u32::from(class_idx));
            let name = self.get_string(name_idx);
            let proto_text = self.get_proto(u32::from(proto_idx));
            // The proto text is "<ReturnType> (<args>)"; splice class and
            // name in at its first space.
            let display = match proto_text.find(' ') {
                Some(split) => format!(
                    "{} {}.{}{}",
                    &proto_text[..split],
                    class_name,
                    name,
                    &proto_text[split + 1..]
                ),
                None => {
                    error!(
                        "method {}: {}",
                        i,
                        DexError::MalformedProtoText(proto_text.clone())
                    );
                    format!("{} {}.{}", proto_text, class_name, name)
                }
            };
            entries.push(MethodItem {
                class_idx,
                proto_idx,
                name_idx,
                display,
            });
            self.report(i as f64 / count as f64);
        }
        self.report(1.0);
        entries
    }

    fn parse_class_defs(&self) -> Vec<ClassDefItem> {
        let count = self.header.class_defs_size as usize;
        let base = self.header.class_defs_off as usize;
        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let record = base + i * 32;
            let read = |offset: usize| self.source.read_u32(record + offset).unwrap_or(0);
            let class_idx = read(0);
            let access_flags = read(4);
            let superclass_idx = read(8);
            let interfaces_off = read(12);
            let source_file_idx = read(16);
            let annotations_off = read(20);
            let class_data_off = read(24);
            let static_values_off = read(28);
            let declaration = self.build_declaration(
                class_idx,
                access_flags,
                superclass_idx,
                interfaces_off,
                source_file_idx,
            );
            entries.push(ClassDefItem {
                class_idx,
                access_flags,
                superclass_idx,
                interfaces_off,
                source_file_idx,
                annotations_off,
                class_data_off,
                static_values_off,
                declaration,
            });
            self.report(i as f64 / count as f64);
        }
        self.report(1.0);
        entries
    }

    /// Joins the fragments of a class declaration, each followed by a single
    /// space when present. Superclass, interfaces and source file all use
    /// `0` as their "absent" marker, unlike the index tables' sentinel.
    fn build_declaration(
        &self,
        class_idx: u32,
        access_flags: u32,
        superclass_idx: u32,
        interfaces_off: u32,
        source_file_idx: u32,
    ) -> String {
        let mut declaration = String::new();
        let flags = describe_flags(access_flags, FlagKind::Class);
        if !flags.is_empty() {
            declaration.push_str(&flags);
            declaration.push(' ');
        }
        let class_name = self.get_type(class_idx);
        if !class_name.is_empty() {
            declaration.push_str(&class_name);
            declaration.push(' ');
        }
        if superclass_idx != 0 {
            declaration.push_str("extends ");
            declaration.push_str(&self.get_type(superclass_idx));
            declaration.push(' ');
        }
        if interfaces_off != 0 {
            let interfaces = self
                .read_type_list(interfaces_off as usize)
                .unwrap_or_else(|err| {
                    warn!("interface list unreadable: {}", err);
                    vec![]
                });
            if !interfaces.is_empty() {
                let names: Vec<String> = interfaces
                    .iter()
                    .map(|idx| self.get_type(u32::from(*idx)))
                    .collect();
                declaration.push_str("implements ");
                declaration.push_str(&names.join(","));
                declaration.push(' ');
            }
        }
        if source_file_idx != 0 {
            declaration.push_str("from ");
            declaration.push_str(&self.get_string(source_file_idx));
        }
        declaration
    }

    fn parse_map(&self) -> Vec<MapItem> {
        let offset = self.header.map_off as usize;
        if offset == 0 {
            warn!("map_off is zero, no map list");
            return vec![];
        }
        let count = match self.source.read_u32(offset) {
            Ok(count) => count as usize,
            Err(err) => {
                error!("map list unreadable: {}", err);
                return vec![];
            }
        };
        let mut entries = vec![];
        for i in 0..count {
            let record = offset + 4 + i * 12;
            let parsed = (|| -> Result<MapItem> {
                let item_type = self.source.read_u16(record)?;
                let size = self.source.read_u32(record + 4)?;
                let item_offset = self.source.read_u32(record + 8)?;
                let name = map_type_name(item_type).unwrap_or_else(|| {
                    error!("{}", DexError::UnknownMapType(item_type));
                    "error"
                });
                Ok(MapItem {
                    item_type,
                    name,
                    size,
                    offset: item_offset,
                })
            })();
            match parsed {
                Ok(entry) => entries.push(entry),
                Err(err) => {
                    error!("map entry {} unreadable: {}", i, err);
                    break;
                }
            }
            self.report(i as f64 / count as f64);
        }
        self.report(1.0);
        entries
    }
}

impl std::fmt::Debug for DexFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DexFile")
            .field("header", &self.header)
            .field("len", &self.source.len())
            .finish()
    }
}
