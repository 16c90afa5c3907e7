use std::path::PathBuf;
use std::result::Result as StdResult;
use std::{fmt, io};

/// Dex parser result type.
pub type Result<T> = StdResult<T, DexError>;

/// Errors produced while opening or decoding a DEX file.
///
/// Only the structural variants (`NotADexFile`, `FileNotFound`, `Unreadable`,
/// `Header`, header-time `OutOfBounds`) abort construction of a
/// [`DexFile`](crate::DexFile). Everything else is recovered per entry: the
/// offending entry is logged and replaced with a placeholder so one corrupt
/// record does not abort analysis of the rest of the file.
#[derive(Debug)]
pub enum DexError {
    /// The buffer does not start with the DEX magic.
    NotADexFile(String),
    /// The given path does not point at a file.
    FileNotFound(PathBuf),
    /// The file exists but could not be read.
    Unreadable(io::Error),
    /// Structural header mismatch (bad endian tag, table extent past EOF, ...).
    Header(String),
    /// A read past the end of the buffer.
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },
    /// A ULEB128 run that does not terminate within 5 bytes or overflows 32 bits.
    MalformedVarint { offset: usize },
    /// A type descriptor that is neither an array, an object nor a known primitive.
    UnknownPrimitive(String),
    /// A map-list section type code outside the known set.
    UnknownMapType(u16),
    /// A cross-reference index at or past the end of its table.
    IndexOutOfRange {
        table: &'static str,
        index: u32,
        size: usize,
    },
    /// A resolved prototype text with no space to splice a method name into.
    MalformedProtoText(String),
    /// The container is not a readable ZIP/APK archive.
    NotAnApk(String),
}

impl DexError {
    pub(crate) fn out_of_bounds(offset: usize, len: usize, size: usize) -> DexError {
        DexError::OutOfBounds { offset, len, size }
    }

    pub(crate) fn index_out_of_range(table: &'static str, index: u32, size: usize) -> DexError {
        DexError::IndexOutOfRange { table, index, size }
    }
}

impl fmt::Display for DexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DexError::NotADexFile(detail) => {
                write!(f, "not a dex file: {}", detail)
            }
            DexError::FileNotFound(path) => {
                write!(f, "file not found: {}", path.display())
            }
            DexError::Unreadable(err) => write!(f, "unreadable file: {}", err),
            DexError::Header(detail) => write!(f, "invalid dex header: {}", detail),
            DexError::OutOfBounds { offset, len, size } => write!(
                f,
                "read of {} bytes at {:#010x} exceeds the {} byte buffer",
                len, offset, size
            ),
            DexError::MalformedVarint { offset } => {
                write!(f, "malformed uleb128 value at {:#010x}", offset)
            }
            DexError::UnknownPrimitive(descriptor) => {
                write!(f, "unknown type descriptor {:?}", descriptor)
            }
            DexError::UnknownMapType(code) => {
                write!(f, "unknown map section type {:#06x}", code)
            }
            DexError::IndexOutOfRange { table, index, size } => write!(
                f,
                "index {} out of range for {} ({} entries)",
                index, table, size
            ),
            DexError::MalformedProtoText(text) => {
                write!(f, "prototype text {:?} has no return type separator", text)
            }
            DexError::NotAnApk(detail) => write!(f, "not an apk archive: {}", detail),
        }
    }
}

impl std::error::Error for DexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DexError::Unreadable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DexError {
    fn from(err: io::Error) -> DexError {
        DexError::Unreadable(err)
    }
}
