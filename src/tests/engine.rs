use std::cell::RefCell;
use std::rc::Rc;

use super::builder::{ClassSpec, DexBuilder, ProtoSpec};
use crate::dex_file::{DexFile, NO_INDEX};
use crate::encoded_values::EncodedValue;
use crate::leb::encode_uleb128;

fn open(builder: &DexBuilder) -> DexFile {
    DexFile::open(builder.build()).expect("synthetic dex should open")
}

/// One string, one type, one public class with no superclass.
fn minimal_builder() -> DexBuilder {
    let mut builder = DexBuilder::with_strings(&["Ljava/lang/Object;"]);
    builder.type_descriptor_idxs = vec![0];
    builder.class_defs = vec![ClassSpec {
        class_idx: 0,
        access_flags: 0x1,
        ..ClassSpec::default()
    }];
    builder
}

#[test]
fn end_to_end_minimal_class() {
    let dex = open(&minimal_builder());
    assert_eq!(dex.class_def_count(), 1);
    let class = dex.get_class_def(0).expect("class def missing");
    assert_eq!(class.declaration, "public java.lang.Object ");
    assert_eq!(class.superclass_idx, 0);
    assert!(!class.declaration.contains("extends"));
}

#[test]
fn superclass_produces_one_extends_clause() {
    let mut builder = DexBuilder::with_strings(&["Lcom/example/Foo;", "Ljava/lang/Object;"]);
    builder.type_descriptor_idxs = vec![0, 1];
    builder.class_defs = vec![ClassSpec {
        class_idx: 0,
        access_flags: 0x11, // public final
        superclass_idx: 1,
        ..ClassSpec::default()
    }];
    let dex = open(&builder);
    let declaration = &dex.get_class_def(0).unwrap().declaration;
    assert_eq!(
        declaration,
        "public final com.example.Foo extends java.lang.Object "
    );
    assert_eq!(declaration.matches("extends").count(), 1);
}

#[test]
fn interfaces_and_source_file_join_the_declaration() {
    let mut builder = DexBuilder::with_strings(&[
        "Lcom/example/Foo;",
        "Ljava/lang/Runnable;",
        "Ljava/io/Closeable;",
        "Foo.java",
    ]);
    builder.type_descriptor_idxs = vec![0, 1, 2];
    builder.class_defs = vec![ClassSpec {
        class_idx: 0,
        access_flags: 0x1,
        interfaces: vec![1, 2],
        source_file_idx: 3,
        ..ClassSpec::default()
    }];
    let dex = open(&builder);
    assert_eq!(
        dex.get_class_def(0).unwrap().declaration,
        "public com.example.Foo implements java.lang.Runnable,java.io.Closeable from Foo.java"
    );
}

#[test]
fn string_lookups_are_cached_and_degrade_gracefully() {
    let dex = open(&minimal_builder());
    let first = dex.get_string(0);
    assert_eq!(first, "Ljava/lang/Object;");
    // Cache idempotence: same value on every call.
    assert_eq!(dex.get_string(0), first);
    // The declared byte length is the slice length that was decoded.
    let item = &dex.strings()[0];
    assert_eq!(item.declared_len as usize, item.text.len());
    // Out of range logs and yields the placeholder, never panics.
    assert_eq!(dex.get_string(7), " ");
    // The sentinel is "absent", resolved to entry 0.
    assert_eq!(dex.get_string(NO_INDEX), first);
}

#[test]
fn type_lookups_follow_the_same_policy() {
    let dex = open(&minimal_builder());
    assert_eq!(dex.get_type(0), "java.lang.Object");
    assert_eq!(dex.get_type(9), "");
    assert_eq!(dex.get_type(NO_INDEX), "java.lang.Object");
}

/// Strings, types, protos, fields and methods cross-referencing each other.
fn rich_builder() -> DexBuilder {
    let mut builder = DexBuilder::with_strings(&[
        "I",
        "Ljava/lang/Object;",
        "Lcom/example/Foo;",
        "LI",
        "toString",
        "value",
    ]);
    builder.type_descriptor_idxs = vec![0, 1, 2];
    builder.protos = vec![ProtoSpec {
        shorty_idx: 3,
        return_type_idx: 1,
        params: vec![0],
    }];
    builder.fields = vec![(2, 0, 5)];
    builder.methods = vec![(2, 0, 4)];
    builder
}

#[test]
fn proto_field_and_method_texts_resolve() {
    let dex = open(&rich_builder());
    assert_eq!(dex.get_proto(0), "java.lang.Object (int)");
    assert_eq!(
        dex.get_field(0).unwrap().display,
        "int com.example.Foo.value"
    );
    assert_eq!(
        dex.get_method(0).unwrap().display,
        "java.lang.Object com.example.Foo.toString(int)"
    );
}

#[test]
fn empty_parameter_list_renders_as_unit() {
    let mut builder = DexBuilder::with_strings(&["V", "Lcom/example/Foo;", "run", "VV"]);
    builder.type_descriptor_idxs = vec![0, 1];
    builder.protos = vec![ProtoSpec {
        shorty_idx: 3,
        return_type_idx: 0,
        params: vec![],
    }];
    builder.methods = vec![(1, 0, 2)];
    let dex = open(&builder);
    assert_eq!(dex.get_proto(0), "void ()");
    assert_eq!(
        dex.get_method(0).unwrap().display,
        "void com.example.Foo.run()"
    );
}

#[test]
fn progress_reports_once_per_element_then_completion() {
    let mut builder = DexBuilder::with_strings(&["A", "B", "C"]);
    builder.strings = vec!["LA;".into(), "LB;".into(), "LC;".into()];
    let mut dex = DexFile::open(builder.build()).unwrap();
    let fractions: Rc<RefCell<Vec<f64>>> = Rc::new(RefCell::new(vec![]));
    let sink = Rc::clone(&fractions);
    dex.set_progress(move |fraction| sink.borrow_mut().push(fraction));

    let count = dex.strings().len();
    assert_eq!(count, 3);
    let seen = fractions.borrow();
    // N elements + the final completion call.
    assert_eq!(seen.len(), count + 1);
    assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(*seen.last().unwrap(), 1.0);

    // A second load is a cached no-op: no further reports.
    drop(seen);
    let before = fractions.borrow().len();
    let _ = dex.strings();
    assert_eq!(fractions.borrow().len(), before);
}

#[test]
fn map_entries_resolve_names_and_tolerate_unknown_codes() {
    let mut builder = minimal_builder();
    builder.extra_map_entries = vec![(0x3333, 0, 0)];
    let dex = open(&builder);
    let entries = dex.map_entries();
    assert_eq!(entries[0].name, "type_header_item");
    assert_eq!(entries[1].name, "type_string_id_item");
    assert_eq!(entries[1].size, 1);
    let unknown = entries.last().unwrap();
    assert_eq!(unknown.item_type, 0x3333);
    assert_eq!(unknown.name, "error");
}

#[test]
fn class_data_and_static_values_queries() {
    let mut class_data = vec![];
    for count in [1u32, 0, 0, 0] {
        class_data.extend(encode_uleb128(count));
    }
    class_data.extend(encode_uleb128(2)); // field_idx delta
    class_data.extend(encode_uleb128(0x9)); // public static

    // encoded_array: [Int(3), Boolean(true), String(0)]
    let static_values = vec![0x03, 0x04, 0x03, 0x1F | (1 << 5), 0x17, 0x00];

    let mut builder = minimal_builder();
    builder.class_defs[0].class_data_blob = Some(class_data);
    builder.class_defs[0].static_values_blob = Some(static_values);
    let dex = open(&builder);

    let class = dex.get_class_def(0).unwrap().clone();
    assert_ne!(class.class_data_off, 0);
    let data = dex.class_data(class.class_data_off).unwrap();
    assert_eq!(data.static_fields.len(), 1);
    assert_eq!(data.static_fields[0].field_idx, 2);

    assert_ne!(class.static_values_off, 0);
    let values = dex.static_values(class.static_values_off).unwrap();
    assert_eq!(
        values,
        vec![
            EncodedValue::Int(3),
            EncodedValue::Boolean(true),
            EncodedValue::String(0),
        ]
    );
    assert_eq!(dex.render_value(&values[0]), "3");
    assert_eq!(dex.render_value(&values[2]), "\"Ljava/lang/Object;\"");
}

#[test]
fn open_rejects_non_dex_buffers() {
    assert!(DexFile::open(vec![0u8; 4]).is_err());
    assert!(DexFile::open(b"PK\x03\x04 definitely not a dex".to_vec()).is_err());
}

#[test]
fn open_file_reports_missing_paths() {
    let err = DexFile::open_file("/no/such/classes.dex").unwrap_err();
    assert!(matches!(err, crate::error::DexError::FileNotFound(_)));
}
