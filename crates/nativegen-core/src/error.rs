//! Error types for the nativegen-core library.
//!
//! Every failure is fatal to the module generation task that raised it.
//! Variants carry the file, type and method needed to locate the defect.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for nativegen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all nativegen operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The compilation unit could not be parsed or its symbols resolved
    #[error("{}:{line}:{column}: {message}", path.display())]
    Compilation {
        /// Source file that failed to compile
        path: PathBuf,
        /// 1-based line of the offending token
        line: usize,
        /// 1-based column of the offending token
        column: usize,
        /// Description of the problem
        message: String,
    },

    /// The binding marker is present but its output-name is missing, empty or repeated
    #[error("{}: invalid binding marker on '{type_name}': {reason}", path.display())]
    MissingAnnotationValue {
        /// Source file declaring the type
        path: PathBuf,
        /// Binary name of the marked type
        type_name: String,
        /// What is wrong with the marker
        reason: String,
    },

    /// Two marked types of one module claim the same output-name
    #[error(
        "duplicate output name '{name}': claimed by '{first_type}' ({}) and '{second_type}' ({})",
        first_path.display(),
        second_path.display()
    )]
    DuplicateOutputName {
        /// The contested output-name
        name: String,
        /// Type that claimed the name first
        first_type: String,
        /// File declaring the first type
        first_path: PathBuf,
        /// Type that claimed the name second
        second_type: String,
        /// File declaring the second type
        second_path: PathBuf,
    },

    /// A type reference has no native descriptor
    #[error("unsupported type '{type_ref}' in {type_name}.{member}: {reason}")]
    UnsupportedTypeKind {
        /// Binary name of the declaring type
        type_name: String,
        /// Method or field using the type
        member: String,
        /// The offending type as written
        type_ref: String,
        /// Why the type cannot be mapped
        reason: String,
    },

    /// Two native methods of one type share name and descriptor
    #[error("duplicate native method {type_name}.{method}{descriptor}")]
    DuplicateNativeMethod {
        /// Binary name of the declaring type
        type_name: String,
        /// Method name
        method: String,
        /// Method descriptor
        descriptor: String,
    },

    /// Two generated C symbols would have the same name
    #[error("generated symbol '{symbol}' for {type_name} collides with an existing symbol")]
    SymbolCollision {
        /// Binary name of the type whose symbol collides
        type_name: String,
        /// The colliding symbol
        symbol: String,
    },

    /// The `registerNatives` hook has the wrong shape
    #[error("invalid registerNatives hook in {type_name}: {reason}")]
    InvalidRegistrationHook {
        /// Binary name of the declaring type
        type_name: String,
        /// What is wrong with the hook
        reason: String,
    },

    /// An output-name would escape the output directory
    #[error("path traversal detected: '{path}' would escape output directory")]
    PathTraversal {
        /// The suspicious path
        path: PathBuf,
    },

    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write output file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to create output directory
    #[error("failed to create directory '{path}': {source}")]
    DirectoryCreate {
        /// Path to the directory that failed to create
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to remove a stale output directory
    #[error("failed to remove directory '{path}': {source}")]
    DirectoryRemove {
        /// Path to the directory that failed to be removed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Creates a new compilation error
    pub fn compilation(
        path: impl Into<PathBuf>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::Compilation {
            path: path.into(),
            line,
            column,
            message: message.into(),
        }
    }

    /// Creates a new missing annotation value error
    pub fn missing_annotation_value(
        path: impl Into<PathBuf>,
        type_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MissingAnnotationValue {
            path: path.into(),
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new unsupported type error
    pub fn unsupported_type(
        type_name: impl Into<String>,
        member: impl Into<String>,
        type_ref: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnsupportedTypeKind {
            type_name: type_name.into(),
            member: member.into(),
            type_ref: type_ref.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new symbol collision error
    pub fn symbol_collision(type_name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self::SymbolCollision {
            type_name: type_name.into(),
            symbol: symbol.into(),
        }
    }

    /// Creates a new registration hook error
    pub fn invalid_registration_hook(
        type_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidRegistrationHook {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new directory creation error
    pub fn directory_create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            source,
        }
    }

    /// Creates a new directory removal error
    pub fn directory_remove(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryRemove {
            path: path.into(),
            source,
        }
    }

    /// Creates a new path traversal error
    pub fn path_traversal(path: impl Into<PathBuf>) -> Self {
        Self::PathTraversal { path: path.into() }
    }

    /// Creates a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true for failures of the output directory or file system
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::FileRead { .. }
                | Self::FileWrite { .. }
                | Self::DirectoryCreate { .. }
                | Self::DirectoryRemove { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::path_traversal("../escape");
        assert!(err.to_string().contains("path traversal"));
        assert!(err.to_string().contains("../escape"));
    }

    #[test]
    fn test_compilation_error_locates_source() {
        let err = Error::compilation("src/A.java", 3, 14, "expected ';'");
        assert_eq!(err.to_string(), "src/A.java:3:14: expected ';'");
    }

    #[test]
    fn test_unsupported_type_names_method() {
        let err = Error::unsupported_type("com.example.Foo", "bar", "T", "type variable");
        let msg = err.to_string();
        assert!(msg.contains("com.example.Foo.bar"));
        assert!(msg.contains("'T'"));
    }

    #[test]
    fn test_is_io() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert!(Error::file_write("out/ts_a.h", io).is_io());
        assert!(!Error::internal("test").is_io());
    }
}
