//! Thin APK/ZIP wrapper: pulls named byte blobs out of an archive so each
//! contained DEX can be handed to [`DexFile::open`] on its own. Multi-dex
//! iteration lives here, not in the engine.

use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use log::warn;
use zip::ZipArchive;

use crate::dex_file::DexFile;
use crate::error::{DexError, Result};

const DEX_MAGIC_PREFIX: [u8; 4] = [0x64, 0x65, 0x78, 0x0A];

/// The DEX entries of one APK/ZIP archive, keyed by entry name.
#[derive(Debug)]
pub struct DexContainer {
    entries: BTreeMap<String, Vec<u8>>,
}

impl DexContainer {
    /// Opens an archive from a byte buffer. With `deep_scan` off, entries
    /// whose name ends in `.dex` are collected; with it on, every entry
    /// whose first bytes match the DEX magic is, whatever its name.
    pub fn open_bytes(data: &[u8], deep_scan: bool) -> Result<DexContainer> {
        let mut archive = ZipArchive::new(Cursor::new(data))
            .map_err(|err| DexError::NotAnApk(err.to_string()))?;
        let mut entries = BTreeMap::new();
        for i in 0..archive.len() {
            let mut file = match archive.by_index(i) {
                Ok(file) => file,
                Err(err) => {
                    warn!("archive entry {} unreadable: {}", i, err);
                    continue;
                }
            };
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            if !deep_scan && !name.ends_with(".dex") {
                continue;
            }
            let mut bytes = Vec::new();
            if let Err(err) = file.read_to_end(&mut bytes) {
                warn!("archive entry {} unreadable: {}", name, err);
                continue;
            }
            if deep_scan && (bytes.len() < 8 || bytes[0..4] != DEX_MAGIC_PREFIX) {
                continue;
            }
            entries.insert(name, bytes);
        }
        Ok(DexContainer { entries })
    }

    /// Opens the archive at `path`.
    pub fn open_file<P: AsRef<Path>>(path: P, deep_scan: bool) -> Result<DexContainer> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DexError::FileNotFound(path.to_path_buf()));
        }
        DexContainer::open_bytes(&fs::read(path)?, deep_scan)
    }

    /// More than one contained DEX.
    pub fn is_multidex(&self) -> bool {
        self.entries.len() > 1
    }

    pub fn dex_names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Raw bytes of the named entry.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Builds an engine over the named entry.
    pub fn parse(&self, name: &str) -> Result<DexFile> {
        let bytes = self
            .entries
            .get(name)
            .ok_or_else(|| DexError::NotAnApk(format!("no entry named {:?}", name)))?;
        DexFile::open(bytes.clone())
    }
}
