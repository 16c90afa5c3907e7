use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::builder::{ClassSpec, DexBuilder};
use crate::container::DexContainer;
use crate::error::DexError;

fn synthetic_dex() -> Vec<u8> {
    let mut builder = DexBuilder::with_strings(&["Ljava/lang/Object;"]);
    builder.type_descriptor_idxs = vec![0];
    builder.class_defs = vec![ClassSpec {
        class_idx: 0,
        access_flags: 0x1,
        ..ClassSpec::default()
    }];
    builder.build()
}

fn zip_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[test]
fn collects_dex_entries_by_name() {
    let dex = synthetic_dex();
    let apk = zip_with(&[
        ("classes.dex", dex.as_slice()),
        ("classes2.dex", dex.as_slice()),
        ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n"),
    ]);
    let container = DexContainer::open_bytes(&apk, false).unwrap();
    assert!(container.is_multidex());
    assert_eq!(container.dex_names(), vec!["classes.dex", "classes2.dex"]);
    assert!(container.get("classes.dex").is_some());
    assert!(container.get("META-INF/MANIFEST.MF").is_none());

    let parsed = container.parse("classes.dex").unwrap();
    assert_eq!(parsed.class_def_count(), 1);
    assert!(matches!(
        container.parse("missing.dex"),
        Err(DexError::NotAnApk(_))
    ));
}

#[test]
fn deep_scan_finds_renamed_dex_blobs() {
    let dex = synthetic_dex();
    let apk = zip_with(&[
        ("assets/payload.bin", dex.as_slice()),
        ("assets/notes.txt", b"not a dex"),
    ]);

    let shallow = DexContainer::open_bytes(&apk, false).unwrap();
    assert!(shallow.dex_names().is_empty());
    assert!(!shallow.is_multidex());

    let deep = DexContainer::open_bytes(&apk, true).unwrap();
    assert_eq!(deep.dex_names(), vec!["assets/payload.bin"]);
    deep.parse("assets/payload.bin").unwrap();
}

#[test]
fn rejects_non_zip_buffers() {
    assert!(matches!(
        DexContainer::open_bytes(b"not an archive", false),
        Err(DexError::NotAnApk(_))
    ));
}
