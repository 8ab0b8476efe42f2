//! Diagnostics sink.
//!
//! Every error is emitted immediately with a `file:line` prefix and
//! accumulates in a counter local to the pass that raised it; passes
//! keep going after an error so later problems in the same unit are
//! still reported. Between passes the driver consults the counters
//! and aborts before handing the AST to an emitter.

use std::cell::RefCell;
use std::fmt;

use crate::file_location::FileLocation;

#[derive(Debug, Clone, thiserror::Error)]
#[error("{location}: {message}")]
pub struct Diagnostic {
    pub location: FileLocation,
    pub message: String,
}

impl Diagnostic {
    pub fn new(location: FileLocation, message: impl Into<String>) -> Self {
        Diagnostic { location, message: message.into() }
    }
}

/// Accumulates diagnostics for a single pass. `None means this subtree is
/// invalid` is the calling convention every visitor follows: a `None`
/// propagates upward as "skip this subtree", it never panics or unwinds.
#[derive(Default)]
pub struct Diagnostics {
    errors: RefCell<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn error(&self, location: FileLocation, message: impl Into<String>) {
        let diag = Diagnostic::new(location, message);
        eprintln!("{diag}");
        self.errors.borrow_mut().push(diag);
    }

    pub fn num_errors(&self) -> usize {
        self.errors.borrow().len()
    }

    pub fn errors(&self) -> Vec<Diagnostic> {
        self.errors.borrow().clone()
    }

    pub fn merge(&self, other: &Diagnostics) {
        self.errors.borrow_mut().extend(other.errors.borrow().iter().cloned());
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics").field("num_errors", &self.num_errors()).finish()
    }
}

/// Fatal, whole-compilation errors raised by the driver rather than a pass
/// (named class/method not found, unsupported dump mode, ...). These map
/// directly onto the CLI exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("{0} parse error(s)")]
    ParseErrors(usize),
    #[error("{0} semantic error(s)")]
    SemanticErrors(usize),
    #[error("class \"{0}\" not found")]
    ClassNotFound(String),
    #[error("\"{0}\" is not a class type")]
    NotAClass(String),
    #[error("method \"{0}\" not found on class \"{1}\"")]
    MethodNotFound(String, String),
    #[error("unsupported dump mode")]
    UnsupportedDumpMode,
}

impl CompileError {
    /// Maps a failure onto the exit codes documented for the driver shells.
    pub fn exit_code(&self) -> i32 {
        match self {
            CompileError::ParseErrors(_) => 1,
            CompileError::SemanticErrors(_) => 2,
            CompileError::ClassNotFound(_) => 3,
            CompileError::NotAClass(_) => 3,
            CompileError::MethodNotFound(_, _) => 4,
            CompileError::UnsupportedDumpMode => 4,
        }
    }
}
