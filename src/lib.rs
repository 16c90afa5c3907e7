//! # dexlens
//!
//! A library for decoding Android DEX (Dalvik Executable) files: the fixed
//! header, the six cross-referencing index tables (strings, types,
//! prototypes, fields, methods, class definitions), the section map, and
//! the variable-length structures hanging off them (class data, code
//! bodies, static initializer values, annotations).
//!
//! The engine parses the header eagerly and every other section on first
//! demand, resolving indices into human-readable signatures. Adversarial
//! input is tolerated: all reads are bounds-checked, and a malformed entry
//! is logged and replaced with a placeholder instead of aborting the file.
//!
//! ```no_run
//! use dexlens::DexFile;
//!
//! let dex = DexFile::open_file("classes.dex").unwrap();
//! for class in dex.class_defs() {
//!     println!("{}", class.declaration);
//! }
//! ```
//!
//! Disassembling the instruction payload of method bodies is out of scope:
//! [`class_data::CodeItem`] captures the raw bytes verbatim.

pub mod annotations;
pub mod class_data;
pub mod container;
pub mod descriptor;
pub mod dex_file;
pub mod encoded_values;
pub mod error;
pub mod flags;
pub mod header;
pub mod items;
pub mod leb;
pub mod source;
mod table;
#[cfg(test)]
mod tests;

pub use container::DexContainer;
pub use dex_file::{DexFile, NO_INDEX};
pub use error::{DexError, Result};
pub use header::Header;
