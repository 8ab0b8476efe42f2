//! Source-file location tracking for diagnostics.
//!
//! Corresponds to the scoped file-location thread-through used while
//! visiting: each pass keeps a "current location" that is pushed on
//! entry to a node and restored on exit, so synthesized nodes inherit
//! a reasonable origin without every constructor taking a location.

use std::rc::Rc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileLocation {
    pub filename: Option<Rc<String>>,
    pub line_num: i32,
}

impl FileLocation {
    pub fn new(filename: Rc<String>, line_num: i32) -> Self {
        FileLocation { filename: Some(filename), line_num: line_num.max(-1) }
    }

    pub fn unknown() -> Self {
        FileLocation { filename: None, line_num: -1 }
    }

    /// Short filename (no directory components) for diagnostic prefixes.
    pub fn short_filename(&self) -> &str {
        match &self.filename {
            Some(name) => name.rsplit('/').next().unwrap_or(name),
            None => "<unknown>",
        }
    }
}

impl std::fmt::Display for FileLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.short_filename(), self.line_num)
    }
}

/// RAII-style scoped location: an earlier `FileLocation` is restored when
/// this guard drops, mirroring `ScopedFileLocation` in the original passes.
pub struct ScopedFileLocation<'a> {
    slot: &'a mut FileLocation,
    previous: FileLocation,
}

impl<'a> ScopedFileLocation<'a> {
    pub fn new(slot: &'a mut FileLocation, new_location: FileLocation) -> Self {
        let previous = std::mem::replace(slot, new_location);
        ScopedFileLocation { slot, previous }
    }
}

impl<'a> Drop for ScopedFileLocation<'a> {
    fn drop(&mut self) {
        std::mem::swap(self.slot, &mut self.previous);
    }
}
