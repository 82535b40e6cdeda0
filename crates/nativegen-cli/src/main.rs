//! nativegen - Generate JNI native-binding headers from annotated Java sources
//!
//! This tool scans a module's Java sources for types carrying the binding
//! marker and writes their prototype, registration-table, bootstrap and
//! logging headers into one output directory.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser};
use nativegen_core::config::{DEFAULT_MODULE_NAME, DEFAULT_PREFIX};
use nativegen_core::sink::{content_hash, stale_artifacts};
use nativegen_core::{DirectorySink, GenerationTask, GeneratorConfig, SourceFile, DEFAULT_MARKER};
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Generate JNI native-binding headers from annotated Java sources
#[derive(Parser, Debug)]
#[command(name = "nativegen")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Output directory for generated headers (recreated on every run)
    #[arg(short, long)]
    output: PathBuf,

    /// Module name, used as the log tag
    #[arg(short, long, default_value = DEFAULT_MODULE_NAME)]
    module_name: String,

    /// Marker annotation, simple or fully qualified
    #[arg(long, default_value = DEFAULT_MARKER)]
    marker: String,

    /// Prefix of generated file names and module-level symbols
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// File whose contents are placed as a comment block atop declaration headers
    #[arg(long, value_name = "FILE")]
    license_file: Option<PathBuf>,

    /// Binary name of a type outside the module to treat as resolvable
    #[arg(long = "known-type", value_name = "BINARY_NAME")]
    known_types: Vec<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Dry run - don't write files, just show what would be generated
    #[arg(long, conflicts_with = "check")]
    dry_run: bool,

    /// Fail if the output directory does not match what would be generated
    #[arg(long)]
    check: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Directory of the module's Java sources, searched recursively
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// A single Java source file (repeatable)
    #[arg(short, long)]
    file: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let paths = match cli.input.source_dir {
        Some(ref dir) => collect_sources(dir)?,
        None => check_files(&cli.input.file)?,
    };
    if paths.is_empty() {
        warn!("No Java sources found; generating module headers only");
    }
    check_output_dir(&cli.output, cli.input.source_dir.as_deref(), &paths)?;

    let sources = paths
        .iter()
        .map(|path| {
            SourceFile::read(path).with_context(|| format!("Failed to read source: {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let config = build_config(cli)?;
    let mut task = GenerationTask::new(config);

    if cli.dry_run {
        let output = task.generate(&sources).context("Header generation failed")?;
        for artifact in output.artifacts() {
            println!("Would write: {}", cli.output.join(&artifact.file_name).display());
            if cli.verbose > 0 {
                println!("--- {}", content_hash(artifact.as_bytes()));
                println!("{}", artifact.contents);
                println!("---");
            }
        }
        return Ok(());
    }

    if cli.check {
        let output = task.generate(&sources).context("Header generation failed")?;
        let stale = stale_artifacts(&cli.output, &output.artifacts())
            .with_context(|| format!("Failed to compare output: {}", cli.output.display()))?;
        if stale.is_empty() {
            info!("Generated headers in {} are up to date", cli.output.display());
            return Ok(());
        }
        for name in &stale {
            println!("Stale: {}", cli.output.join(name).display());
        }
        bail!(
            "{} generated file(s) out of date in {}",
            stale.len(),
            cli.output.display()
        );
    }

    let mut sink = DirectorySink::new(&cli.output);
    let report = task
        .run(&sources, &mut sink)
        .with_context(|| format!("Failed to generate headers into {}", cli.output.display()))?;

    info!(
        "Summary: {} files, {} types visited, {} marked, {} native methods",
        sources.len(),
        report.types_visited,
        report.marked_types,
        report.registration_entries
    );
    println!(
        "Wrote {} headers to {}",
        report.artifacts_written,
        cli.output.display()
    );
    Ok(())
}

fn build_config(cli: &Cli) -> Result<GeneratorConfig> {
    let mut config = GeneratorConfig::new()
        .marker(&cli.marker)
        .prefix(&cli.prefix)
        .module_name(&cli.module_name)
        .known_types(&cli.known_types);

    if let Some(ref path) = cli.license_file {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read license file: {}", path.display()))?;
        config = config.license_header(text);
    }

    config.validate().context("Invalid generator configuration")?;
    Ok(config)
}

/// Collects the `.java` files under `directory`, sorted by path
fn collect_sources(directory: &Path) -> Result<Vec<PathBuf>> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let mut sources = Vec::new();
    for entry in WalkDir::new(directory)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
    {
        let entry = entry.with_context(|| format!("Failed to walk {}", directory.display()))?;
        let path = entry.path();

        if !entry.file_type().is_file() {
            continue;
        }

        if path.extension().and_then(|e| e.to_str()) != Some("java") {
            trace!("Skipping non-Java file: {}", path.display());
            continue;
        }

        sources.push(path.to_path_buf());
    }
    sources.sort();

    debug!("Found {} Java sources", sources.len());
    Ok(sources)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

/// Validates explicitly listed files and returns them sorted and deduplicated
fn check_files(files: &[PathBuf]) -> Result<Vec<PathBuf>> {
    for file in files {
        if !file.exists() {
            bail!("Input file does not exist: {}", file.display());
        }
        if !file.is_file() {
            bail!("Input path is not a file: {}", file.display());
        }
    }
    let mut files = files.to_vec();
    files.sort();
    files.dedup();
    Ok(files)
}

/// Refuses an output directory whose recreation would delete sources
fn check_output_dir(output: &Path, source_dir: Option<&Path>, sources: &[PathBuf]) -> Result<()> {
    let output_abs = absolute(output)?;
    for input in source_dir.into_iter().chain(sources.iter().map(PathBuf::as_path)) {
        if absolute(input)?.starts_with(&output_abs) {
            bail!(
                "Output directory {} contains input {}; it is deleted on every run",
                output.display(),
                input.display()
            );
        }
    }
    Ok(())
}

/// Lexically normalized absolute path
fn absolute(path: &Path) -> Result<PathBuf> {
    let mut result = if path.is_absolute() {
        PathBuf::new()
    } else {
        env::current_dir().context("Failed to determine the current directory")?
    };
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                result.pop();
            }
            other => result.push(other.as_os_str()),
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MARKED: &str = r#"
        package demo;

        @GenerateNativeHeaders("hello")
        public class Hello {
            public static native String greet(String name);
        }
    "#;

    fn module() -> TempDir {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src/demo");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("Hello.java"), MARKED).unwrap();
        fs::write(src.join("Plain.java"), "package demo; class Plain {}").unwrap();
        fs::write(src.join("notes.txt"), "not java").unwrap();
        fs::create_dir_all(temp.path().join("src/.hidden")).unwrap();
        fs::write(temp.path().join("src/.hidden/Skip.java"), "class Skip {").unwrap();
        temp
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("nativegen").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_collect_sources_sorted_java_only() {
        let temp = module();
        let sources = collect_sources(&temp.path().join("src")).unwrap();
        let names: Vec<_> = sources
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Hello.java", "Plain.java"]);
    }

    #[test]
    fn test_collect_sources_missing_directory() {
        let temp = TempDir::new().unwrap();
        assert!(collect_sources(&temp.path().join("missing")).is_err());
    }

    #[test]
    fn test_output_containing_sources_is_refused() {
        let temp = module();
        let src = temp.path().join("src");
        let sources = collect_sources(&src).unwrap();
        assert!(check_output_dir(temp.path(), Some(&src), &sources).is_err());
        assert!(check_output_dir(&src.join("demo/../"), Some(&src), &sources).is_err());
        assert!(check_output_dir(&temp.path().join("out"), Some(&src), &sources).is_ok());
    }

    #[test]
    fn test_generate_then_check() {
        let temp = module();
        let src = temp.path().join("src");
        let out = temp.path().join("out");
        let src_arg = src.to_str().unwrap();
        let out_arg = out.to_str().unwrap();

        run(&cli(&["-s", src_arg, "-o", out_arg, "-m", "demo"])).unwrap();
        assert!(out.join("ts_hello.h").is_file());
        assert!(out.join("ts__onload.h").is_file());

        run(&cli(&["-s", src_arg, "-o", out_arg, "-m", "demo", "--check"])).unwrap();

        fs::write(out.join("ts_hello.h"), "edited").unwrap();
        assert!(run(&cli(&["-s", src_arg, "-o", out_arg, "-m", "demo", "--check"])).is_err());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let temp = module();
        let file = temp.path().join("src/demo/Hello.java");
        let out = temp.path().join("out");
        run(&cli(&["-f", file.to_str().unwrap(), "-o", out.to_str().unwrap(), "--dry-run"])).unwrap();
        assert!(!out.exists());
    }

    #[test]
    fn test_input_modes_are_exclusive() {
        assert!(Cli::try_parse_from(["nativegen", "-o", "out"]).is_err());
        assert!(Cli::try_parse_from(["nativegen", "-s", "src", "-f", "A.java", "-o", "out"]).is_err());
        let parsed = Cli::try_parse_from(["nativegen", "-f", "A.java", "-f", "B.java", "-o", "out"]).unwrap();
        assert_eq!(parsed.input.file.len(), 2);
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
