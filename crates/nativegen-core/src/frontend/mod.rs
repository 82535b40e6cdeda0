//! Source frontends.
//!
//! A frontend turns source text into the declaration model in two steps, so
//! that names can be resolved against every type of the module:
//!
//! 1. [`Frontend::parse`] each file and register its
//!    [`Frontend::declared_types`] in the module's [`SymbolTable`]
//! 2. [`Frontend::lower`] each parsed file against the complete table
//!
//! The generator itself only depends on this trait and the model types.
//!
//! ## Extensibility
//!
//! ```no_run
//! use nativegen_core::frontend::Frontend;
//! use nativegen_core::{CompilationUnit, Result, SymbolTable};
//! use std::path::Path;
//!
//! struct PrebuiltFrontend;
//!
//! impl Frontend for PrebuiltFrontend {
//!     type Parsed = CompilationUnit;
//!
//!     fn parse(&self, path: &Path, _source: &str) -> Result<CompilationUnit> {
//!         Ok(CompilationUnit::new(path, None))
//!     }
//!
//!     fn declared_types(&self, _parsed: &CompilationUnit) -> Vec<String> {
//!         Vec::new()
//!     }
//!
//!     fn lower(&self, parsed: Self::Parsed, _symbols: &SymbolTable) -> Result<CompilationUnit> {
//!         Ok(parsed)
//!     }
//! }
//! ```

mod lexer;
mod parser;
mod resolve;

use crate::error::Result;
use crate::model::CompilationUnit;
use crate::symbols::SymbolTable;
use std::path::Path;

pub use parser::ParsedUnit;
pub use resolve::CRITICAL_NATIVE;

/// Capability interface over a source ecosystem
pub trait Frontend {
    /// Per-file syntax kept between the two passes
    type Parsed;

    /// Parses one source file
    fn parse(&self, path: &Path, source: &str) -> Result<Self::Parsed>;

    /// Binary names of every type the file declares, nested ones included
    fn declared_types(&self, parsed: &Self::Parsed) -> Vec<String>;

    /// Resolves names and produces the declaration model
    fn lower(&self, parsed: Self::Parsed, symbols: &SymbolTable) -> Result<CompilationUnit>;
}

/// Frontend for Java source files
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaFrontend;

impl JavaFrontend {
    /// Creates a new Java frontend
    pub fn new() -> Self {
        Self
    }
}

impl Frontend for JavaFrontend {
    type Parsed = ParsedUnit;

    fn parse(&self, path: &Path, source: &str) -> Result<ParsedUnit> {
        parser::parse(path, source)
    }

    fn declared_types(&self, parsed: &ParsedUnit) -> Vec<String> {
        parsed.binary_names()
    }

    fn lower(&self, parsed: ParsedUnit, symbols: &SymbolTable) -> Result<CompilationUnit> {
        resolve::lower(&parsed, symbols)
    }
}
