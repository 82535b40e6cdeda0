//! Module-scoped symbol table.
//!
//! The table is built once per generation task from every source file of
//! the module (plus `java.lang` and any extra names from the config) and
//! passed explicitly to the frontend and the emitter.

use std::collections::BTreeMap;
use tracing::trace;

/// `java.lang` types that resolve without an import, with their superclass
const JAVA_LANG: &[(&str, Option<&str>)] = &[
    ("Object", None),
    ("String", Some("Object")),
    ("Class", Some("Object")),
    ("CharSequence", None),
    ("Number", Some("Object")),
    ("Boolean", Some("Object")),
    ("Byte", Some("Number")),
    ("Character", Some("Object")),
    ("Short", Some("Number")),
    ("Integer", Some("Number")),
    ("Long", Some("Number")),
    ("Float", Some("Number")),
    ("Double", Some("Number")),
    ("Void", Some("Object")),
    ("Enum", Some("Object")),
    ("Record", Some("Object")),
    ("Thread", Some("Object")),
    ("Runnable", None),
    ("Iterable", None),
    ("Comparable", None),
    ("Cloneable", None),
    ("AutoCloseable", None),
    ("StringBuilder", Some("Object")),
    ("System", Some("Object")),
    ("Math", Some("Object")),
    ("Override", None),
    ("Deprecated", None),
    ("SuppressWarnings", None),
    ("FunctionalInterface", None),
    ("SafeVarargs", None),
    ("Throwable", Some("Object")),
    ("Exception", Some("Throwable")),
    ("Error", Some("Throwable")),
    ("RuntimeException", Some("Exception")),
    ("IllegalArgumentException", Some("RuntimeException")),
    ("IllegalStateException", Some("RuntimeException")),
    ("NullPointerException", Some("RuntimeException")),
    ("IndexOutOfBoundsException", Some("RuntimeException")),
    ("ArrayIndexOutOfBoundsException", Some("IndexOutOfBoundsException")),
    ("UnsupportedOperationException", Some("RuntimeException")),
    ("ClassCastException", Some("RuntimeException")),
    ("ArithmeticException", Some("RuntimeException")),
    ("InterruptedException", Some("Exception")),
    ("CloneNotSupportedException", Some("Exception")),
    ("OutOfMemoryError", Some("Error")),
    ("StackOverflowError", Some("Error")),
    ("AssertionError", Some("Error")),
];

/// Common library types that resolve through imports, with their superclass
const JDK_COMMON: &[(&str, Option<&str>)] = &[
    ("java.util.Collection", None),
    ("java.util.List", None),
    ("java.util.Set", None),
    ("java.util.Map", None),
    ("java.util.Map$Entry", None),
    ("java.util.Iterator", None),
    ("java.util.ArrayList", Some("java.lang.Object")),
    ("java.util.HashMap", Some("java.lang.Object")),
    ("java.util.HashSet", Some("java.lang.Object")),
    ("java.util.Objects", Some("java.lang.Object")),
    ("java.util.Optional", Some("java.lang.Object")),
    ("java.io.File", Some("java.lang.Object")),
    ("java.io.Closeable", None),
    ("java.io.InputStream", Some("java.lang.Object")),
    ("java.io.OutputStream", Some("java.lang.Object")),
    ("java.io.IOException", Some("java.lang.Exception")),
    ("java.io.UncheckedIOException", Some("java.lang.RuntimeException")),
    ("java.nio.Buffer", Some("java.lang.Object")),
    ("java.nio.ByteBuffer", Some("java.nio.Buffer")),
    ("java.nio.CharBuffer", Some("java.nio.Buffer")),
];

/// Binary name of `java.lang.String`
pub const STRING: &str = "java.lang.String";
/// Binary name of `java.lang.Class`
pub const CLASS: &str = "java.lang.Class";
/// Binary name of `java.lang.Throwable`
pub const THROWABLE: &str = "java.lang.Throwable";

/// Known types of one module, keyed by binary name
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    /// binary name -> superclass binary name
    types: BTreeMap<String, Option<String>>,
    /// qualified source name -> binary name
    qualified: BTreeMap<String, String>,
}

impl SymbolTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table pre-populated with the implicitly imported `java.lang`
    /// types and a handful of common `java.util` / `java.io` / `java.nio` types
    pub fn with_java_lang() -> Self {
        let mut table = Self::new();
        for (name, superclass) in JAVA_LANG {
            let binary = format!("java.lang.{name}");
            table.declare(&binary);
            table.set_superclass(&binary, superclass.map(|s| format!("java.lang.{s}")));
        }
        for (binary, superclass) in JDK_COMMON {
            table.declare(binary);
            table.set_superclass(binary, superclass.map(str::to_string));
        }
        table
    }

    /// Registers a type by binary name (`pkg.Outer$Inner`)
    pub fn declare(&mut self, binary_name: &str) {
        trace!("Declaring type {}", binary_name);
        self.types.entry(binary_name.to_string()).or_insert(None);
        self.qualified
            .insert(binary_name.replace('$', "."), binary_name.to_string());
    }

    /// Records the superclass of a declared type
    pub fn set_superclass(&mut self, binary_name: &str, superclass: Option<String>) {
        if let Some(slot) = self.types.get_mut(binary_name) {
            *slot = superclass;
        }
    }

    /// Returns true if the binary name is known
    pub fn contains(&self, binary_name: &str) -> bool {
        self.types.contains_key(binary_name)
    }

    /// Maps a qualified source name (`pkg.Outer.Inner`) to its binary name
    pub fn lookup_qualified(&self, qualified: &str) -> Option<&str> {
        self.qualified.get(qualified).map(String::as_str)
    }

    /// Finds a top-level type `simple` declared in `package`
    pub fn package_member(&self, package: Option<&str>, simple: &str) -> Option<&str> {
        let binary = match package {
            Some(pkg) => format!("{pkg}.{simple}"),
            None => simple.to_string(),
        };
        self.types.get_key_value(&binary).map(|(k, _)| k.as_str())
    }

    /// Finds an implicitly imported `java.lang` type
    pub fn java_lang(&self, simple: &str) -> Option<&str> {
        self.package_member(Some("java.lang"), simple)
    }

    /// Superclass of a declared type, if recorded
    pub fn superclass(&self, binary_name: &str) -> Option<&str> {
        self.types.get(binary_name).and_then(|s| s.as_deref())
    }

    /// Returns true if `binary_name` is `ancestor` or extends it
    pub fn is_subclass_of(&self, binary_name: &str, ancestor: &str) -> bool {
        let mut current = Some(binary_name);
        // Bounded walk; a malformed cycle must not hang the generator.
        for _ in 0..=self.types.len() {
            let Some(name) = current else {
                return false;
            };
            if name == ancestor {
                return true;
            }
            current = self.types.get(name).and_then(|s| s.as_deref());
        }
        false
    }

    /// Number of known types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if no types are known
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
