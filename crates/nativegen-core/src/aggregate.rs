//! Module-wide headers.
//!
//! After every marked type of a module has been emitted, two headers are
//! produced once per module:
//!
//! - `ts__onload.h`: includes every `ts_N_sigs.h` and declares one
//!   sentinel-terminated table with a [`RegistrationEntry`] per cached native
//!   method, in scan order, plus `ts_register_natives(JNIEnv *)`, which a
//!   `JNI_OnLoad` routine calls to bind everything in one pass
//! - `ts__log.h`: leveled logging macros, `__android_log_print` on Android
//!   and `printf` elsewhere

use crate::config::GeneratorConfig;
use crate::emitter::text;
use crate::emitter::Emission;
use crate::error::{Error, Result};
use crate::model::{GeneratedArtifact, RegistrationEntry};
use std::collections::BTreeMap;
use std::fmt::{self, Write};
use tracing::debug;

/// The two module-level headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHeaders {
    /// `ts__onload.h`
    pub bootstrap: GeneratedArtifact,
    /// `ts__log.h`
    pub log: GeneratedArtifact,
}

/// Builds the module-level headers from every emission of one run
#[derive(Debug, Clone, Copy)]
pub struct RegistrationAggregator<'a> {
    config: &'a GeneratorConfig,
}

impl<'a> RegistrationAggregator<'a> {
    /// Creates an aggregator for one module
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self { config }
    }

    /// File name of the bootstrap header
    pub fn bootstrap_file_name(&self) -> String {
        format!("{}_onload.h", self.config.prefix)
    }

    /// File name of the logging header
    pub fn log_file_name(&self) -> String {
        format!("{}_log.h", self.config.prefix)
    }

    /// Aggregates the emissions, in scan order, into the module headers
    pub fn aggregate(&self, emissions: &[Emission]) -> Result<ModuleHeaders> {
        check_symbols(emissions)?;
        let entries: Vec<&RegistrationEntry> = emissions.iter().flat_map(|e| &e.entries).collect();
        debug!(
            "Aggregating {} registration entries from {} types",
            entries.len(),
            emissions.len()
        );

        let bootstrap = text::render(|out| self.write_bootstrap(out, emissions, &entries))?;
        let log = text::render(|out| self.write_log(out))?;
        Ok(ModuleHeaders {
            bootstrap: GeneratedArtifact::new(self.bootstrap_file_name(), bootstrap),
            log: GeneratedArtifact::new(self.log_file_name(), log),
        })
    }

    fn write_bootstrap(
        &self,
        out: &mut String,
        emissions: &[Emission],
        entries: &[&RegistrationEntry],
    ) -> fmt::Result {
        let prefix = &self.config.prefix;
        let macro_prefix = self.config.macro_prefix();
        let entry_type = format!("{prefix}registration_entry");
        let table = format!("{macro_prefix}REGISTRATION_ENTRIES");
        let count = format!("{macro_prefix}REGISTRATION_ENTRY_COUNT");

        text::file_top(out, self.config.license_header.as_deref())?;
        text::guard_begin(out, &text::guard_name(prefix, "ONLOAD"))?;
        writeln!(out)?;
        for emission in emissions {
            writeln!(out, "#include \"{}\"", emission.signatures.file_name)?;
        }
        writeln!(out)?;

        writeln!(out, "typedef struct {entry_type} {{")?;
        writeln!(out, "    const char *class_name;")?;
        writeln!(out, "    const char *method_name;")?;
        writeln!(out, "    const char *signature;")?;
        writeln!(out, "    JNINativeMethod *method;")?;
        writeln!(out, "}} {entry_type};")?;
        writeln!(out)?;

        writeln!(out, "static {entry_type} {table}[] = {{")?;
        for entry in entries {
            writeln!(
                out,
                "    {{\"{}\", \"{}\", \"{}\", &{}[{}__ARR_IDX]}},",
                text::escape_c_string(&entry.class_name),
                text::escape_c_string(&entry.method),
                text::escape_c_string(&entry.descriptor),
                entry.table,
                entry.symbol
            )?;
        }
        writeln!(out, "    {{nullptr, nullptr, nullptr, nullptr}}")?;
        writeln!(out, "}};")?;
        writeln!(out)?;
        writeln!(out, "#define {count} {}", entries.len())?;
        writeln!(out)?;

        // Slots never set through SET_JNI_METHOD fall back to exported-symbol lookup.
        writeln!(out, "static inline jint {prefix}register_natives(JNIEnv *env) {{")?;
        writeln!(out, "    for (jint i = 0; i < {count}; i++) {{")?;
        writeln!(out, "        const {entry_type} *entry = &{table}[i];")?;
        writeln!(out, "        if (entry->method->fnPtr == nullptr) {{")?;
        writeln!(out, "            continue;")?;
        writeln!(out, "        }}")?;
        writeln!(out, "        jclass clazz = env->FindClass(entry->class_name);")?;
        writeln!(out, "        if (clazz == nullptr) {{")?;
        writeln!(out, "            return JNI_ERR;")?;
        writeln!(out, "        }}")?;
        writeln!(out, "        jint result = env->RegisterNatives(clazz, entry->method, 1);")?;
        writeln!(out, "        env->DeleteLocalRef(clazz);")?;
        writeln!(out, "        if (result != JNI_OK) {{")?;
        writeln!(out, "            return result;")?;
        writeln!(out, "        }}")?;
        writeln!(out, "    }}")?;
        writeln!(out, "    return JNI_OK;")?;
        writeln!(out, "}}")?;
        writeln!(out)?;
        text::guard_end(out)
    }

    fn write_log(&self, out: &mut String) -> fmt::Result {
        let guard = text::guard_name(&self.config.prefix, "LOG");
        writeln!(out, "{}", text::BANNER)?;
        if let Some(license) = self.config.license_header.as_deref() {
            text::write_license(out, license)?;
        }
        writeln!(out)?;
        writeln!(out, "#ifndef {guard}")?;
        writeln!(out, "#define {guard}")?;
        writeln!(out)?;
        writeln!(
            out,
            "#define LOG_TAG \"{}\"",
            text::escape_c_string(&self.config.module_name)
        )?;
        writeln!(out)?;
        writeln!(out, "#ifdef ANDROID")?;
        writeln!(out, "#include <android/log.h>")?;
        writeln!(out)?;
        for (name, level) in LEVELS {
            writeln!(
                out,
                "#define LOG{name}(TAG, ...) __android_log_print(ANDROID_LOG_{level}, TAG, __VA_ARGS__)"
            )?;
        }
        writeln!(out)?;
        writeln!(out, "#else")?;
        writeln!(out, "#include <cstdio>")?;
        writeln!(out)?;
        for (name, level) in LEVELS {
            let label = if level == "WARN" { "WARNING" } else { level };
            writeln!(
                out,
                "#define LOG{name}(TAG, ...) printf(\"[%s] {label}: \", TAG); printf(__VA_ARGS__); printf(\"\\n\")"
            )?;
        }
        writeln!(out)?;
        writeln!(out, "#endif // ANDROID")?;
        writeln!(out)?;
        writeln!(out, "#endif // {guard}")
    }
}

/// Macro suffix and platform level of each logging macro
const LEVELS: [(&str, &str); 5] = [
    ("E", "ERROR"),
    ("W", "WARN"),
    ("D", "DEBUG"),
    ("I", "INFO"),
    ("V", "VERBOSE"),
];

/// Every sigs header is included into the bootstrap, so symbols must be
/// unique across the whole module
fn check_symbols(emissions: &[Emission]) -> Result<()> {
    let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
    for emission in emissions {
        for symbol in &emission.symbols {
            if let Some(first) = owners.insert(symbol.as_str(), emission.binary_name.as_str()) {
                debug!("{} already defined by {}", symbol, first);
                return Err(Error::symbol_collision(&emission.binary_name, symbol));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn emission(binary: &str, output: &str, methods: &[&str]) -> Emission {
        let simple = binary.rsplit(['.', '$']).next().unwrap_or(binary);
        let table = format!("{simple}_METHODS");
        let entries: Vec<_> = methods
            .iter()
            .map(|m| RegistrationEntry {
                class_name: binary.replace('.', "/"),
                method: m.to_string(),
                descriptor: "()V".into(),
                symbol: format!("{simple}_{m}"),
                table: table.clone(),
            })
            .collect();
        let mut symbols = vec![table, format!("{simple}_METHOD_COUNT")];
        symbols.extend(entries.iter().map(|e| e.symbol.clone()));
        Emission {
            output_name: output.into(),
            binary_name: binary.into(),
            declarations: GeneratedArtifact::new(format!("ts_{output}.h"), ""),
            signatures: GeneratedArtifact::new(format!("ts_{output}_sigs.h"), ""),
            entries,
            symbols,
        }
    }

    #[test]
    fn test_bootstrap_lists_entries_in_scan_order() {
        let config = GeneratorConfig::default();
        let headers = RegistrationAggregator::new(&config)
            .aggregate(&[
                emission("com.example.Foo", "foo", &["bar", "baz"]),
                emission("com.example.Outer$Inner", "inner", &[]),
                emission("com.example.Last", "last", &["run"]),
            ])
            .unwrap();

        let text = headers.bootstrap.contents;
        assert_eq!(headers.bootstrap.file_name, "ts__onload.h");
        assert!(text.contains(
            "#include \"ts_foo_sigs.h\"\n#include \"ts_inner_sigs.h\"\n#include \"ts_last_sigs.h\"\n"
        ));
        assert!(text.contains(
            "static ts_registration_entry TS_REGISTRATION_ENTRIES[] = {
    {\"com/example/Foo\", \"bar\", \"()V\", &Foo_METHODS[Foo_bar__ARR_IDX]},
    {\"com/example/Foo\", \"baz\", \"()V\", &Foo_METHODS[Foo_baz__ARR_IDX]},
    {\"com/example/Last\", \"run\", \"()V\", &Last_METHODS[Last_run__ARR_IDX]},
    {nullptr, nullptr, nullptr, nullptr}
};"
        ));
        assert!(text.contains("#define TS_REGISTRATION_ENTRY_COUNT 3\n"));
        assert!(text.contains("static inline jint ts_register_natives(JNIEnv *env) {"));
        assert!(text.contains("#ifndef _INCLUDED_TS__ONLOAD\n"));
    }

    #[test]
    fn test_empty_module() {
        let config = GeneratorConfig::default();
        let headers = RegistrationAggregator::new(&config).aggregate(&[]).unwrap();
        assert!(headers
            .bootstrap
            .contents
            .contains("[] = {\n    {nullptr, nullptr, nullptr, nullptr}\n};\n\n#define TS_REGISTRATION_ENTRY_COUNT 0\n"));
    }

    #[test]
    fn test_log_header() {
        let config = GeneratorConfig::default().module_name("android-tree-sitter");
        let log = RegistrationAggregator::new(&config).aggregate(&[]).unwrap().log;

        assert_eq!(log.file_name, "ts__log.h");
        assert!(log.contents.contains("#define LOG_TAG \"android-tree-sitter\"\n"));
        assert!(log.contents.contains(
            "#define LOGE(TAG, ...) __android_log_print(ANDROID_LOG_ERROR, TAG, __VA_ARGS__)\n"
        ));
        assert!(log.contents.contains(
            "#define LOGW(TAG, ...) printf(\"[%s] WARNING: \", TAG); printf(__VA_ARGS__); printf(\"\\n\")\n"
        ));
        assert!(!log.contents.contains("jni.h"));
    }

    #[test]
    fn test_log_header_is_independent_of_types() {
        let config = GeneratorConfig::default();
        let aggregator = RegistrationAggregator::new(&config);
        let empty = aggregator.aggregate(&[]).unwrap().log;
        let full = aggregator
            .aggregate(&[emission("p.Foo", "foo", &["a"])])
            .unwrap()
            .log;
        assert_eq!(empty, full);
    }

    #[test]
    fn test_module_wide_symbol_collision() {
        let config = GeneratorConfig::default();
        let err = RegistrationAggregator::new(&config)
            .aggregate(&[
                emission("a.Foo", "a_foo", &["run"]),
                emission("b.Foo", "b_foo", &[]),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::SymbolCollision { ref type_name, ref symbol } if type_name == "b.Foo" && symbol == "Foo_METHODS"));
    }
}
