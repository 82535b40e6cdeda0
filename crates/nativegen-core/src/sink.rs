//! Artifact output.
//!
//! The generator never touches the file system while generating; every
//! artifact of a module is produced in memory first and then handed to an
//! [`ArtifactSink`] in one batch.
//!
//! ## Extensibility
//!
//! ```no_run
//! use nativegen_core::sink::ArtifactSink;
//! use nativegen_core::{GeneratedArtifact, Result};
//!
//! struct PrintSink;
//!
//! impl ArtifactSink for PrintSink {
//!     fn write(&mut self, artifact: &GeneratedArtifact) -> Result<()> {
//!         println!("// {}\n{}", artifact.file_name, artifact.contents);
//!         Ok(())
//!     }
//! }
//! ```

use crate::error::{Error, Result};
use crate::model::GeneratedArtifact;
use crate::resolver::validate_output_name;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Destination for generated artifacts
pub trait ArtifactSink {
    /// Writes a single artifact
    fn write(&mut self, artifact: &GeneratedArtifact) -> Result<()>;

    /// Writes every artifact of one module run
    ///
    /// Returns the number of artifacts written.
    fn write_all(&mut self, artifacts: &[GeneratedArtifact]) -> Result<usize> {
        for artifact in artifacts {
            self.write(artifact)?;
        }
        Ok(artifacts.len())
    }
}

/// A sink that discards all output
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ArtifactSink for NullSink {
    fn write(&mut self, _artifact: &GeneratedArtifact) -> Result<()> {
        Ok(())
    }
}

/// A sink that keeps every artifact in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    /// Artifacts in write order
    pub artifacts: Vec<GeneratedArtifact>,
}

impl MemorySink {
    /// Creates an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an artifact by file name
    pub fn get(&self, file_name: &str) -> Option<&GeneratedArtifact> {
        self.artifacts.iter().find(|a| a.file_name == file_name)
    }
}

impl ArtifactSink for MemorySink {
    fn write(&mut self, artifact: &GeneratedArtifact) -> Result<()> {
        self.artifacts.push(artifact.clone());
        Ok(())
    }
}

/// A sink that records the blake3 digest of every artifact
#[derive(Debug, Default, Clone)]
pub struct DigestSink {
    /// file name -> hex digest
    pub digests: BTreeMap<String, String>,
    /// Total bytes seen
    pub bytes: usize,
}

impl DigestSink {
    /// Creates an empty sink
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArtifactSink for DigestSink {
    fn write(&mut self, artifact: &GeneratedArtifact) -> Result<()> {
        self.bytes += artifact.contents.len();
        self.digests
            .insert(artifact.file_name.clone(), content_hash(artifact.as_bytes()));
        Ok(())
    }
}

/// Writes artifacts into a module's output directory
///
/// [`ArtifactSink::write_all`] deletes and recreates the directory before
/// writing, and deletes it again if any write fails, so no stale or
/// half-written headers survive a run.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    /// Creates a sink writing into `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The output directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deletes the directory if present and creates it empty
    pub fn recreate(&self) -> Result<()> {
        if self.root.exists() {
            debug!("Removing output directory {}", self.root.display());
            fs::remove_dir_all(&self.root).map_err(|e| Error::directory_remove(&self.root, e))?;
        }
        fs::create_dir_all(&self.root).map_err(|e| Error::directory_create(&self.root, e))
    }

    fn write_batch(&mut self, artifacts: &[GeneratedArtifact]) -> Result<usize> {
        self.recreate()?;
        for artifact in artifacts {
            self.write(artifact)?;
        }
        Ok(artifacts.len())
    }
}

impl ArtifactSink for DirectorySink {
    fn write(&mut self, artifact: &GeneratedArtifact) -> Result<()> {
        validate_output_name(&artifact.file_name)?;
        let path = self.root.join(&artifact.file_name);
        trace!("Writing {} ({} bytes)", path.display(), artifact.contents.len());
        fs::write(&path, artifact.as_bytes()).map_err(|e| Error::file_write(path, e))
    }

    fn write_all(&mut self, artifacts: &[GeneratedArtifact]) -> Result<usize> {
        match self.write_batch(artifacts) {
            Ok(written) => Ok(written),
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&self.root) {
                    warn!(
                        "Failed to clean up {} after error: {}",
                        self.root.display(),
                        cleanup
                    );
                }
                Err(e)
            }
        }
    }
}

/// Hex blake3 digest of `data`
pub fn content_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Lists the files of `dir` that do not match `artifacts`
///
/// A file is stale when it is missing, its digest differs, or it is not one
/// of the artifacts. A missing directory makes every artifact stale.
pub fn stale_artifacts(dir: &Path, artifacts: &[GeneratedArtifact]) -> Result<Vec<String>> {
    let mut stale = Vec::new();
    for artifact in artifacts {
        let path = dir.join(&artifact.file_name);
        let fresh = match fs::read(&path) {
            Ok(data) => blake3::hash(&data) == blake3::hash(artifact.as_bytes()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(Error::file_read(path, e)),
        };
        if !fresh {
            stale.push(artifact.file_name.clone());
        }
    }

    if dir.is_dir() {
        let entries = fs::read_dir(dir).map_err(|e| Error::file_read(dir, e))?;
        let mut extra = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::file_read(dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !artifacts.iter().any(|a| a.file_name == name) {
                extra.push(name);
            }
        }
        extra.sort();
        stale.extend(extra);
    }
    Ok(stale)
}
