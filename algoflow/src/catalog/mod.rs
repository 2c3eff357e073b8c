//! Algorithm identities and the metadata catalog.
//!
//! One record per algorithm, discovered from `algorithms/<name>/algorithm.json`.
//! The catalog is the only state that outlives a single run: the version
//! field is mutated by the version stage and persisted back to disk.

use crate::errors::PipelineError;
use crate::version::SemVer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Metadata file name expected inside each algorithm directory.
pub const METADATA_FILE: &str = "algorithm.json";

/// Identity of one independently versioned algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlgorithmId(String);

impl AlgorithmId {
    /// Creates an identity.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AlgorithmId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// On-disk metadata record, one per algorithm directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmMeta {
    /// Algorithm name; must match the directory name.
    pub name: String,
    /// Owning team.
    pub owner: String,
    /// Address receiving success and failure notifications.
    pub owner_email: String,
    /// Addresses of downstream consumers, notified on release.
    #[serde(default)]
    pub consumers: Vec<String>,
    /// Current semantic version.
    pub version: String,
    /// Declared dependencies on other algorithms. Recorded but not yet
    /// used for transitive rebuilds.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// One independently versioned, owned unit of computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Algorithm {
    /// Identity (directory name under the algorithms root).
    pub id: AlgorithmId,
    /// Owning team.
    pub owner: String,
    /// Owner notification address.
    pub owner_email: String,
    /// Consumer notification addresses.
    pub consumers: Vec<String>,
    /// Current semantic version.
    pub version: SemVer,
    /// Declared dependency set.
    pub dependencies: Vec<AlgorithmId>,
    /// The algorithm's directory.
    pub dir: PathBuf,
}

impl Algorithm {
    fn from_meta(meta: AlgorithmMeta, dir: PathBuf) -> Result<Self, PipelineError> {
        let version = meta.version.parse::<SemVer>()?;
        Ok(Self {
            id: AlgorithmId::new(meta.name),
            owner: meta.owner,
            owner_email: meta.owner_email,
            consumers: meta.consumers,
            version,
            dependencies: meta.dependencies.into_iter().map(AlgorithmId::new).collect(),
            dir,
        })
    }

    /// Returns the on-disk metadata representation.
    #[must_use]
    pub fn to_meta(&self) -> AlgorithmMeta {
        AlgorithmMeta {
            name: self.id.to_string(),
            owner: self.owner.clone(),
            owner_email: self.owner_email.clone(),
            consumers: self.consumers.clone(),
            version: self.version.to_string(),
            dependencies: self.dependencies.iter().map(ToString::to_string).collect(),
        }
    }
}

/// The set of known algorithms, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct AlgorithmCatalog {
    algorithms: Vec<Algorithm>,
}

impl AlgorithmCatalog {
    /// Builds a catalog from pre-loaded records (used by tests and
    /// in-memory collaborators).
    #[must_use]
    pub fn from_algorithms(algorithms: Vec<Algorithm>) -> Self {
        Self { algorithms }
    }

    /// Discovers algorithms under `root`.
    ///
    /// Discovery order is sorted directory order, which keeps the
    /// "all algorithms affected" fan-out deterministic. Directories with
    /// missing or invalid metadata are skipped with a warning; a missing
    /// root yields an empty catalog.
    pub fn discover(root: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let root = root.as_ref();
        if !root.is_dir() {
            debug!(root = %root.display(), "algorithms root missing, empty catalog");
            return Ok(Self::default());
        }

        let mut dirs: Vec<PathBuf> = fs::read_dir(root)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();

        let mut algorithms = Vec::new();
        for dir in dirs {
            let meta_path = dir.join(METADATA_FILE);
            if !meta_path.is_file() {
                warn!(dir = %dir.display(), "skipping directory without metadata file");
                continue;
            }
            match Self::load_one(&meta_path, &dir) {
                Ok(algorithm) => algorithms.push(algorithm),
                Err(err) => {
                    warn!(dir = %dir.display(), error = %err, "skipping algorithm with invalid metadata");
                }
            }
        }

        debug!(count = algorithms.len(), "discovered algorithms");
        Ok(Self { algorithms })
    }

    fn load_one(meta_path: &Path, dir: &Path) -> Result<Algorithm, PipelineError> {
        let raw = fs::read_to_string(meta_path)?;
        let meta: AlgorithmMeta = serde_json::from_str(&raw)
            .map_err(|e| PipelineError::Input(format!("{}: {e}", meta_path.display())))?;

        let dir_name = dir.file_name().map(|n| n.to_string_lossy().to_string());
        if dir_name.as_deref() != Some(meta.name.as_str()) {
            return Err(PipelineError::Input(format!(
                "metadata name '{}' does not match directory '{}'",
                meta.name,
                dir.display()
            )));
        }

        Algorithm::from_meta(meta, dir.to_path_buf())
    }

    /// Returns the algorithm with the given identity.
    #[must_use]
    pub fn get(&self, id: &AlgorithmId) -> Option<&Algorithm> {
        self.algorithms.iter().find(|a| &a.id == id)
    }

    /// Returns true if the identity is known (metadata file exists and
    /// was valid at discovery time).
    #[must_use]
    pub fn contains(&self, id: &AlgorithmId) -> bool {
        self.get(id).is_some()
    }

    /// Returns all identities in discovery order.
    #[must_use]
    pub fn ids(&self) -> Vec<AlgorithmId> {
        self.algorithms.iter().map(|a| a.id.clone()).collect()
    }

    /// Iterates over algorithms in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &Algorithm> {
        self.algorithms.iter()
    }

    /// Returns the number of known algorithms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    /// Returns true if no algorithms are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }

    /// Updates the in-memory version record for one algorithm.
    pub fn set_version(&mut self, id: &AlgorithmId, version: SemVer) -> Result<(), PipelineError> {
        let algorithm = self
            .algorithms
            .iter_mut()
            .find(|a| &a.id == id)
            .ok_or_else(|| PipelineError::Input(format!("unknown algorithm '{id}'")))?;
        algorithm.version = version;
        Ok(())
    }
}
