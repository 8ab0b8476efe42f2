//! Compile-time configuration shared by every pass and by the CLI driver.
//!
//! Mirrors the teacher's habit of collecting CLI-derived settings into one
//! plain struct that gets threaded through rather than read back out of
//! global flags at each call site.

use std::path::PathBuf;

/// Which artifact a compilation produces: the default is a host object,
/// `-v` switches it to shader IR instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpMode {
    Native,
    ShaderIr,
}

impl DumpMode {
    pub fn name(self) -> &'static str {
        match self {
            DumpMode::Native => "native",
            DumpMode::ShaderIr => "shader-ir",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompilerConfig {
    pub input_files: Vec<PathBuf>,
    /// `-o`: object (or, with `-v`, shader IR) output path.
    pub output_file: Option<PathBuf>,
    /// `-h`: host-bindings header output path; meaningful only to emitters
    /// that generate one, ignored otherwise.
    pub host_header_file: Option<PathBuf>,
    /// `-I`, repeatable.
    pub include_dirs: Vec<PathBuf>,
    /// `-c`
    pub class_name: Option<String>,
    /// `-m`
    pub method_name: Option<String>,
    /// `-v`: emit shader IR instead of a host object.
    pub emit_shader_ir: bool,
    /// `-d`: dump the chosen artifact for inspection instead of writing it
    /// to `output_file`.
    pub dump_ir: bool,
    /// `-s`: dump the final symbol table.
    pub dump_symbol_table: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            input_files: Vec::new(),
            output_file: None,
            host_header_file: None,
            include_dirs: Vec::new(),
            class_name: None,
            method_name: None,
            emit_shader_ir: false,
            dump_ir: false,
            dump_symbol_table: false,
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn dump_mode(&self) -> DumpMode {
        if self.emit_shader_ir {
            DumpMode::ShaderIr
        } else {
            DumpMode::Native
        }
    }
}
