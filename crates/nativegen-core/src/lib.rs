//! # nativegen-core
//!
//! A library for generating JNI native-binding headers from annotated Java sources.
//!
//! This crate provides the core functionality for:
//! - Parsing Java source files into a small declaration model
//! - Finding types carrying the binding marker (`@GenerateNativeHeaders("name")`)
//! - Emitting per-type prototype and registration-table headers
//! - Aggregating a module-wide bootstrap header and a logging header
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`frontend`]: Source parsing and name resolution
//! - [`scanner`] and [`resolver`]: Marked type discovery
//! - [`descriptor`] and [`symbols`]: JNI type mapping and C name encoding
//! - [`emitter`] and [`aggregate`]: Header generation
//! - [`sink`]: Artifact output
//! - [`task`]: The per-module generation pipeline
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use nativegen_core::{DirectorySink, GenerationTask, GeneratorConfig, SourceFile};
//!
//! let sources = vec![SourceFile::read("src/main/java/com/example/Foo.java")?];
//!
//! let config = GeneratorConfig::new().module_name("example");
//! let mut task = GenerationTask::new(config);
//! let report = task.run(&sources, &mut DirectorySink::new("build/generated/jni"))?;
//!
//! println!("{} native methods registered", report.registration_entries);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! The library provides several traits for customization:
//!
//! - [`Frontend`]: Plug in another source ecosystem
//! - [`ArtifactSink`]: Customize where generated headers go
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod aggregate;
pub mod config;
pub mod descriptor;
pub mod emitter;
pub mod error;
pub mod frontend;
pub mod model;
pub mod registry;
pub mod resolver;
pub mod scanner;
pub mod sink;
pub mod symbols;
pub mod task;

// Re-export primary types for convenience
pub use aggregate::{ModuleHeaders, RegistrationAggregator};
pub use config::GeneratorConfig;
pub use emitter::{Emission, HeaderEmitter};
pub use error::{Error, Result};
pub use frontend::{Frontend, JavaFrontend};
pub use model::{
    CompilationUnit, GeneratedArtifact, MethodDeclaration, RegistrationEntry, TypeDeclaration, TypeRef,
};
pub use resolver::DEFAULT_MARKER;
pub use sink::{ArtifactSink, DigestSink, DirectorySink, MemorySink, NullSink};
pub use symbols::SymbolTable;
pub use task::{GenerationReport, GenerationTask, ModuleOutput, SourceFile, TaskState};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
