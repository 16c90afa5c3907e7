//! One-shot lazy cache behind every index table.

use once_cell::unsync::OnceCell;

/// A section parsed at most once, the first time it (or something depending
/// on it) is requested. The only state transition is Unloaded -> Loaded and
/// it is irreversible; entries are immutable afterwards.
///
/// The cell is the unsync flavor: the engine is single-threaded (see the
/// crate docs), so no initialization lock is taken.
#[derive(Debug)]
pub(crate) struct SectionTable<T> {
    label: &'static str,
    entries: OnceCell<Vec<T>>,
}

impl<T> SectionTable<T> {
    pub fn new(label: &'static str) -> SectionTable<T> {
        SectionTable {
            label,
            entries: OnceCell::new(),
        }
    }

    /// Table name used in diagnostics.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Returns the parsed entries, running `parse` on the first call only.
    /// Subsequent calls are no-ops that return the cached slice.
    pub fn load(&self, parse: impl FnOnce() -> Vec<T>) -> &[T] {
        self.entries.get_or_init(parse)
    }
}
