//! Per-run registry of claimed output-names.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Owner of an output-name
#[derive(Debug, Clone, PartialEq, Eq)]
struct Claim {
    type_name: String,
    path: PathBuf,
}

/// Tracks which type owns each output-name and artifact file within one
/// module run
///
/// A registry is created per generation task and dropped with it, so
/// sibling modules never observe each other's names.
#[derive(Debug, Default)]
pub struct OutputRegistry {
    claims: BTreeMap<String, Claim>,
    files: BTreeMap<String, Claim>,
}

impl OutputRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `name` for `type_name` declared in `path`
    ///
    /// Fails with [`Error::DuplicateOutputName`] naming both owners if the
    /// name is already taken.
    pub fn claim(&mut self, name: &str, type_name: &str, path: &Path) -> Result<()> {
        insert_claim(&mut self.claims, name, type_name, path)?;
        debug!("Output name '{}' claimed by {}", name, type_name);
        Ok(())
    }

    /// Claims an artifact file name
    ///
    /// Distinct output-names can still map to the same file, e.g. `a_sigs`
    /// and the signatures header of `a`.
    pub fn claim_file(&mut self, file_name: &str, type_name: &str, path: &Path) -> Result<()> {
        insert_claim(&mut self.files, file_name, type_name, path)
    }

    /// Returns the type owning `name`
    pub fn owner(&self, name: &str) -> Option<&str> {
        self.claims.get(name).map(|c| c.type_name.as_str())
    }

    /// Number of claimed names
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Returns true if nothing has been claimed
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

fn insert_claim(
    claims: &mut BTreeMap<String, Claim>,
    name: &str,
    type_name: &str,
    path: &Path,
) -> Result<()> {
    if let Some(first) = claims.get(name) {
        return Err(Error::DuplicateOutputName {
            name: name.to_string(),
            first_type: first.type_name.clone(),
            first_path: first.path.clone(),
            second_type: type_name.to_string(),
            second_path: path.to_path_buf(),
        });
    }
    claims.insert(
        name.to_string(),
        Claim {
            type_name: type_name.to_string(),
            path: path.to_path_buf(),
        },
    );
    Ok(())
}
