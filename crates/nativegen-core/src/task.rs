//! Module generation task.
//!
//! One task processes every source file of one module, synchronously:
//!
//! ```text
//! Idle -> Scanning -> Emitting -> Aggregating -> Writing -> Done
//!            \            \             \           \
//!             +------------+-------------+-----------+--> Failed
//! ```
//!
//! Any error moves the task to `Failed` and nothing reaches the sink, so a
//! module never ends up with a partial registration table. Tasks of
//! different modules share no state and may run in parallel.

use crate::aggregate::{ModuleHeaders, RegistrationAggregator};
use crate::config::GeneratorConfig;
use crate::emitter::{Emission, HeaderEmitter, ModuleConstants};
use crate::error::{Error, Result};
use crate::frontend::{Frontend, JavaFrontend, CRITICAL_NATIVE};
use crate::model::{CompilationUnit, GeneratedArtifact, TypeId, TypeRef};
use crate::registry::OutputRegistry;
use crate::scanner::{self, MarkedType};
use crate::sink::ArtifactSink;
use crate::symbols::SymbolTable;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

/// Lifecycle state of a [`GenerationTask`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Created, not yet run
    Idle,
    /// Parsing sources and scanning for marked types
    Scanning,
    /// Emitting per-type headers
    Emitting,
    /// Building the module-level headers
    Aggregating,
    /// Handing artifacts to the sink
    Writing,
    /// Finished successfully
    Done,
    /// Aborted by an error
    Failed,
}

/// One source file of the module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path used in diagnostics
    pub path: PathBuf,
    /// Full source text
    pub text: String,
}

impl SourceFile {
    /// Creates a source file from text already in memory
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Reads a source file from disk
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        Ok(Self::new(path, text))
    }
}

/// Everything generated for one module, in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleOutput {
    /// Per-type results in scan order
    pub emissions: Vec<Emission>,
    /// Bootstrap and logging headers
    pub headers: ModuleHeaders,
    /// Type declarations visited across all files
    pub types_visited: usize,
}

impl ModuleOutput {
    /// All artifacts: each type's two headers in scan order, then the module headers
    pub fn artifacts(&self) -> Vec<GeneratedArtifact> {
        self.emissions
            .iter()
            .flat_map(|e| [e.declarations.clone(), e.signatures.clone()])
            .chain([self.headers.bootstrap.clone(), self.headers.log.clone()])
            .collect()
    }

    /// Registration entries across all types
    pub fn registration_entries(&self) -> usize {
        self.emissions.iter().map(|e| e.entries.len()).sum()
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// Type declarations visited
    pub types_visited: usize,
    /// Types carrying the marker
    pub marked_types: usize,
    /// Native methods in the bootstrap table
    pub registration_entries: usize,
    /// Files handed to the sink
    pub artifacts_written: usize,
}

/// Generates the native headers of one module
#[derive(Debug)]
pub struct GenerationTask<F: Frontend = JavaFrontend> {
    config: GeneratorConfig,
    frontend: F,
    state: TaskState,
}

impl GenerationTask<JavaFrontend> {
    /// Creates a task for Java sources
    pub fn new(config: GeneratorConfig) -> Self {
        Self::with_frontend(config, JavaFrontend::new())
    }
}

impl<F: Frontend> GenerationTask<F> {
    /// Creates a task using a custom frontend
    pub fn with_frontend(config: GeneratorConfig, frontend: F) -> Self {
        Self {
            config,
            frontend,
            state: TaskState::Idle,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// The task's configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generates every artifact in memory, without writing anything
    ///
    /// Files are processed in the given order; pass them sorted for
    /// reproducible output.
    pub fn generate(&mut self, sources: &[SourceFile]) -> Result<ModuleOutput> {
        let output = self.guarded(|task| task.generate_inner(sources))?;
        self.transition(TaskState::Done);
        Ok(output)
    }

    /// Generates every artifact and writes them to `sink` in one batch
    pub fn run(&mut self, sources: &[SourceFile], sink: &mut dyn ArtifactSink) -> Result<GenerationReport> {
        let report = self.guarded(|task| {
            let output = task.generate_inner(sources)?;
            task.transition(TaskState::Writing);
            let artifacts_written = sink.write_all(&output.artifacts())?;
            Ok(GenerationReport {
                types_visited: output.types_visited,
                marked_types: output.emissions.len(),
                registration_entries: output.registration_entries(),
                artifacts_written,
            })
        })?;
        self.transition(TaskState::Done);
        info!(
            "Generated {} artifacts for {} marked types ({} native methods)",
            report.artifacts_written, report.marked_types, report.registration_entries
        );
        Ok(report)
    }

    fn guarded<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.state != TaskState::Idle {
            return Err(Error::internal(format!(
                "generation task cannot run from state {:?}",
                self.state
            )));
        }
        let result = f(self);
        if let Err(e) = &result {
            debug!("Generation failed in state {:?}: {}", self.state, e);
            self.state = TaskState::Failed;
        }
        result
    }

    fn transition(&mut self, next: TaskState) {
        trace!("Task state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn generate_inner(&mut self, sources: &[SourceFile]) -> Result<ModuleOutput> {
        let config = self.config.clone();
        config.validate()?;
        self.transition(TaskState::Scanning);

        let (units, symbols) = self.load(sources)?;
        let aggregator = RegistrationAggregator::new(&config);

        let mut registry = OutputRegistry::new();
        let module_owner = format!("module '{}'", config.module_name);
        for file_name in [aggregator.bootstrap_file_name(), aggregator.log_file_name()] {
            registry.claim_file(&file_name, &module_owner, Path::new(&file_name))?;
        }

        let mut marked: Vec<(&CompilationUnit, MarkedType)> = Vec::new();
        let mut types_visited = 0;
        for unit in &units {
            let mut scan = scanner::scan(unit, &config.marker);
            for item in scan.by_ref() {
                let item = item?;
                let binary_name = &unit.get(item.id).binary_name;
                registry.claim(&item.output_name, binary_name, unit.path())?;
                for suffix in [".h", "_sigs.h"] {
                    let file_name = format!("{}{}{}", config.prefix, item.output_name, suffix);
                    registry.claim_file(&file_name, binary_name, unit.path())?;
                }
                marked.push((unit, item));
            }
            types_visited += scan.visited();
        }
        debug!(
            "Scanned {} types in {} files, {} marked",
            types_visited,
            units.len(),
            marked.len()
        );

        self.transition(TaskState::Emitting);
        let constants = module_constants(&units);
        let emitter = HeaderEmitter::new(&config, &symbols).with_module_constants(&constants);
        let emissions = marked
            .iter()
            .map(|(unit, item)| emitter.emit(unit, item))
            .collect::<Result<Vec<_>>>()?;

        self.transition(TaskState::Aggregating);
        let headers = aggregator.aggregate(&emissions)?;

        Ok(ModuleOutput {
            emissions,
            headers,
            types_visited,
        })
    }

    /// Parses every file, builds the module symbol table and lowers the units
    fn load(&self, sources: &[SourceFile]) -> Result<(Vec<CompilationUnit>, SymbolTable)> {
        let mut symbols = SymbolTable::with_java_lang();
        symbols.declare(CRITICAL_NATIVE);
        if self.config.marker.contains('.') {
            symbols.declare(&self.config.marker);
        }
        for name in &self.config.known_types {
            symbols.declare(name);
        }

        let mut parsed = Vec::with_capacity(sources.len());
        for source in sources {
            trace!("Parsing {}", source.path.display());
            let unit = self.frontend.parse(&source.path, &source.text)?;
            for name in self.frontend.declared_types(&unit) {
                symbols.declare(&name);
            }
            parsed.push(unit);
        }

        let units = parsed
            .into_iter()
            .map(|p| self.frontend.lower(p, &symbols))
            .collect::<Result<Vec<_>>>()?;

        for unit in &units {
            for idx in 0..unit.len() {
                let decl = unit.get(TypeId(idx));
                if let Some(TypeRef::Object(superclass)) = &decl.superclass {
                    symbols.set_superclass(&decl.binary_name, Some(superclass.clone()));
                }
            }
        }
        Ok((units, symbols))
    }
}

/// Constants of every type in the module, keyed by binary name
fn module_constants(units: &[CompilationUnit]) -> ModuleConstants {
    let mut constants = ModuleConstants::new();
    for unit in units {
        for idx in 0..unit.len() {
            let decl = unit.get(TypeId(idx));
            if !decl.constants.is_empty() {
                constants.insert(decl.binary_name.clone(), decl.constants.clone());
            }
        }
    }
    constants
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{DirectorySink, MemorySink};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const FOO: &str = r#"
        package com.example;

        @GenerateNativeHeaders("foo")
        public class Foo {
            public static native boolean bar(int value);
            public void notNative() {}
        }
    "#;

    const OUTER: &str = r#"
        package com.example;

        public class Outer {
            @GenerateNativeHeaders("inner")
            public static class Inner {
                public int plain() { return 1; }
            }
        }
    "#;

    fn scenario() -> Vec<SourceFile> {
        vec![SourceFile::new("A.java", FOO), SourceFile::new("B.java", OUTER)]
    }

    fn generate(sources: &[SourceFile]) -> Result<ModuleOutput> {
        GenerationTask::new(GeneratorConfig::new().module_name("demo")).generate(sources)
    }

    #[test]
    fn test_end_to_end_scenario() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("jni");
        let mut task = GenerationTask::new(GeneratorConfig::new().module_name("demo"));
        let report = task.run(&scenario(), &mut DirectorySink::new(&out)).unwrap();

        assert_eq!(task.state(), TaskState::Done);
        assert_eq!(
            report,
            GenerationReport {
                types_visited: 3,
                marked_types: 2,
                registration_entries: 1,
                artifacts_written: 6,
            }
        );

        let mut files: Vec<_> = fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        assert_eq!(
            files,
            vec!["ts__log.h", "ts__onload.h", "ts_foo.h", "ts_foo_sigs.h", "ts_inner.h", "ts_inner_sigs.h"]
        );

        let read = |name: &str| fs::read_to_string(out.join(name)).unwrap();
        assert_eq!(read("ts_foo.h").matches("JNIEXPORT").count(), 1);
        assert!(read("ts_foo.h").contains("JNIEXPORT jboolean JNICALL Java_com_example_Foo_bar\n"));
        assert_eq!(read("ts_foo_sigs.h").matches("static JNINativeMethod Foo_bar =").count(), 1);
        assert!(!read("ts_inner.h").contains("JNIEXPORT"));
        assert!(read("ts_inner_sigs.h").contains("static JNINativeMethod *Outer_Inner_METHODS = nullptr;"));

        let onload = read("ts__onload.h");
        assert!(onload.contains("#define TS_REGISTRATION_ENTRY_COUNT 1\n"));
        assert!(onload.contains("{\"com/example/Foo\", \"bar\", \"(I)Z\", &Foo_METHODS[Foo_bar__ARR_IDX]},"));
        assert!(read("ts__log.h").contains("#define LOG_TAG \"demo\""));
    }

    #[test]
    fn test_nested_types_emitted_before_parent() {
        let source = SourceFile::new(
            "Outer.java",
            r#"
            @GenerateNativeHeaders("outer")
            class Outer {
                native void a();
                @GenerateNativeHeaders("inner") static class Inner { native void b(); }
            }
            "#,
        );
        let output = generate(&[source]).unwrap();
        let names: Vec<_> = output.emissions.iter().map(|e| e.output_name.as_str()).collect();
        assert_eq!(names, vec!["inner", "outer"]);
        assert!(!output.emissions[1].declarations.contents.contains("_b"));
    }

    #[test]
    fn test_generation_is_idempotent() {
        let first = generate(&scenario()).unwrap();
        let second = generate(&scenario()).unwrap();
        assert_eq!(first.artifacts(), second.artifacts());

        let temp = TempDir::new().unwrap();
        let out = temp.path().join("jni");
        let mut first_sink = DirectorySink::new(&out);
        GenerationTask::new(GeneratorConfig::new()).run(&scenario(), &mut first_sink).unwrap();
        let before = fs::read(out.join("ts_foo_sigs.h")).unwrap();
        GenerationTask::new(GeneratorConfig::new()).run(&scenario(), &mut first_sink).unwrap();
        assert_eq!(before, fs::read(out.join("ts_foo_sigs.h")).unwrap());
    }

    #[test]
    fn test_duplicate_output_name_fails_then_succeeds_when_renamed() {
        let other = |name: &str| {
            SourceFile::new(
                "C.java",
                format!("package com.example; @GenerateNativeHeaders(\"{name}\") class Other {{ native void x(); }}"),
            )
        };
        let mut sources = scenario();
        sources.push(other("foo"));

        let temp = TempDir::new().unwrap();
        let out = temp.path().join("jni");
        let mut task = GenerationTask::new(GeneratorConfig::new());
        let err = task.run(&sources, &mut DirectorySink::new(&out)).unwrap_err();
        assert!(
            matches!(err, Error::DuplicateOutputName { ref name, ref first_type, ref second_type, .. }
                if name == "foo" && first_type == "com.example.Foo" && second_type == "com.example.Other"),
            "{err}"
        );
        assert_eq!(task.state(), TaskState::Failed);
        assert!(!out.exists());

        sources[2] = other("other");
        assert_eq!(generate(&sources).unwrap().emissions.len(), 3);
    }

    #[test]
    fn test_output_name_cannot_shadow_module_headers() {
        let source = SourceFile::new("X.java", "@GenerateNativeHeaders(\"_onload\") class X {}");
        assert!(matches!(
            generate(&[source]),
            Err(Error::DuplicateOutputName { .. })
        ));
    }

    #[test]
    fn test_unsupported_generic_parameter() {
        let source = SourceFile::new(
            "G.java",
            "@GenerateNativeHeaders(\"g\") class G<T> { native void put(T value); }",
        );
        let err = generate(&[source]).unwrap_err();
        assert!(
            matches!(err, Error::UnsupportedTypeKind { ref type_name, ref member, .. }
                if type_name == "G" && member == "put"),
            "{err}"
        );
    }

    #[test]
    fn test_compilation_error_aborts_module() {
        let mut sources = scenario();
        sources.push(SourceFile::new("Broken.java", "class Broken { native void x( }"));
        let mut sink = MemorySink::new();
        let mut task = GenerationTask::new(GeneratorConfig::new());

        let err = task.run(&sources, &mut sink).unwrap_err();
        assert!(matches!(err, Error::Compilation { ref path, .. } if path == Path::new("Broken.java")));
        assert!(sink.artifacts.is_empty());
        assert_eq!(task.state(), TaskState::Failed);
    }

    #[test]
    fn test_task_runs_once() {
        let mut task = GenerationTask::new(GeneratorConfig::new());
        task.generate(&scenario()).unwrap();
        assert!(matches!(task.generate(&scenario()), Err(Error::Internal(_))));
        assert_eq!(task.state(), TaskState::Done);
    }

    #[test]
    fn test_module_throwable_maps_to_jthrowable() {
        let sources = [
            SourceFile::new(
                "p/Failure.java",
                "package p; public class Failure extends IllegalStateException {}",
            ),
            SourceFile::new(
                "p/Api.java",
                "package p; @GenerateNativeHeaders(\"api\") class Api { static native void raise(Failure f, String why); }",
            ),
        ];
        let output = generate(&sources).unwrap();
        assert!(output.emissions[0]
            .declarations
            .contents
            .contains("(JNIEnv *env, jclass clazz, jthrowable f, jstring why);"));
    }

    #[test]
    fn test_inherited_constants_outermost_first() {
        let sources = [
            SourceFile::new("p/Base.java", "package p; class Base { static final int LEVEL = 1; }"),
            SourceFile::new(
                "p/Middle.java",
                "package p; class Middle extends Base { static final long SIZE = 2L; }",
            ),
            SourceFile::new(
                "p/Leaf.java",
                "package p; @GenerateNativeHeaders(\"leaf\") class Leaf extends Middle { static final boolean ON = true; }",
            ),
        ];
        let output = generate(&sources).unwrap();
        let decls = &output.emissions[0].declarations.contents;
        let level = decls.find("#define p_Leaf_LEVEL 1L").unwrap();
        let size = decls.find("#define p_Leaf_SIZE 2LL").unwrap();
        let on = decls.find("#define p_Leaf_ON 1L").unwrap();
        assert!(level < size && size < on, "{decls}");
    }

    #[test]
    fn test_qualified_marker_and_critical_native() {
        let source = SourceFile::new(
            "app/Fast.java",
            r#"
            package app;
            import dalvik.annotation.optimization.CriticalNative;
            import com.acme.GenerateNativeHeaders;

            @GenerateNativeHeaders("fast")
            class Fast {
                @CriticalNative static native int add(int a, int b);
            }
            "#,
        );
        let config = GeneratorConfig::new().marker("com.acme.GenerateNativeHeaders");
        let output = GenerationTask::new(config).generate(&[source]).unwrap();
        assert!(output.emissions[0]
            .declarations
            .contents
            .contains("JNICALL Java_app_Fast_add\n  (jint a, jint b);"));

        let other = SourceFile::new("Plain.java", "@GenerateNativeHeaders(\"plain\") class Plain {}");
        let config = GeneratorConfig::new().marker("com.acme.GenerateNativeHeaders");
        let output = GenerationTask::new(config).generate(&[other]).unwrap();
        assert!(output.emissions.is_empty());
    }

    #[test]
    fn test_known_types_resolve_through_wildcard_imports() {
        let source = SourceFile::new(
            "q/Use.java",
            "package q; import org.lib.*; @GenerateNativeHeaders(\"use\") class Use { native Handle open(); }",
        );
        assert!(matches!(generate(&[source.clone()]), Err(Error::Compilation { .. })));

        let config = GeneratorConfig::new().known_type("org.lib.Handle");
        let output = GenerationTask::new(config).generate(&[source]).unwrap();
        assert_eq!(output.emissions[0].entries[0].descriptor, "()Lorg/lib/Handle;");
    }
}
