//! Generator configuration.

use crate::error::{Error, Result};
use crate::resolver::DEFAULT_MARKER;

/// Default prefix of every generated file and module-level C symbol
pub const DEFAULT_PREFIX: &str = "ts_";

/// Default log tag when no module name is given
pub const DEFAULT_MODULE_NAME: &str = "native";

/// Configuration for one module generation task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Marker annotation, simple or fully qualified
    pub marker: String,
    /// Prefix of generated file names (`ts_` gives `ts_foo.h`)
    pub prefix: String,
    /// Module name, used as the log tag
    pub module_name: String,
    /// Comment block placed at the top of every declarations header
    pub license_header: Option<String>,
    /// Extra binary names to treat as resolvable, e.g. classpath types
    pub known_types: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            module_name: DEFAULT_MODULE_NAME.to_string(),
            license_header: None,
            known_types: Vec::new(),
        }
    }
}

impl GeneratorConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the marker annotation name
    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Sets the file name prefix
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the module name
    pub fn module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = name.into();
        self
    }

    /// Sets the license header comment
    pub fn license_header(mut self, header: impl Into<String>) -> Self {
        self.license_header = Some(header.into());
        self
    }

    /// Adds an extra known type by binary name
    pub fn known_type(mut self, binary_name: impl Into<String>) -> Self {
        self.known_types.push(binary_name.into());
        self
    }

    /// Adds several extra known types
    pub fn known_types<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_types.extend(names.into_iter().map(Into::into));
        self
    }

    /// Checks that the prefix and marker can be used as configured
    pub fn validate(&self) -> Result<()> {
        if !self.prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::path_traversal(&self.prefix));
        }
        if self.marker.is_empty() || self.marker.split('.').any(str::is_empty) {
            return Err(Error::internal(format!(
                "invalid marker annotation name '{}'",
                self.marker
            )));
        }
        Ok(())
    }

    /// Prefix of module-level C identifiers (`ts_` gives `TS_`)
    pub(crate) fn macro_prefix(&self) -> String {
        self.prefix.to_ascii_uppercase()
    }
}
