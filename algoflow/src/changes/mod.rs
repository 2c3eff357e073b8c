//! Dependency-aware change detection.
//!
//! Maps a commit range's changed file list to the ordered set of affected
//! algorithms. A change under a shared-infrastructure prefix affects every
//! known algorithm; otherwise the first path segment after the algorithms
//! root selects one.

mod ordered_set;

pub use ordered_set::OrderedSet;

use crate::catalog::{AlgorithmCatalog, AlgorithmId};
use crate::config::PipelineConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The changed files of one commit range and the algorithms they affect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Baseline reference of the range.
    pub baseline: String,
    /// Current (head) reference of the range.
    pub head: String,
    /// Changed file paths, in input order.
    pub files: Vec<String>,
    /// Affected algorithm identities, first-file-match order,
    /// duplicates collapsed.
    pub affected: OrderedSet<AlgorithmId>,
    /// True when a shared-infrastructure path was touched and the full
    /// known-algorithm set was selected.
    pub shared_infrastructure_hit: bool,
}

impl ChangeSet {
    /// Returns true if no algorithm is affected ("nothing to do").
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.affected.is_empty()
    }
}

/// Maps changed file paths to affected algorithms.
#[derive(Debug)]
pub struct ChangeDetector<'a> {
    catalog: &'a AlgorithmCatalog,
    config: &'a PipelineConfig,
}

impl<'a> ChangeDetector<'a> {
    /// Creates a detector over the known algorithms.
    #[must_use]
    pub fn new(catalog: &'a AlgorithmCatalog, config: &'a PipelineConfig) -> Self {
        Self { catalog, config }
    }

    /// Detects the affected algorithms for one commit range.
    #[must_use]
    pub fn detect(&self, baseline: &str, head: &str, files: &[String]) -> ChangeSet {
        let shared_hit = files.iter().any(|file| {
            self.config
                .shared_prefixes
                .iter()
                .any(|prefix| file.starts_with(prefix.as_str()))
        });

        let affected = if shared_hit {
            debug!("shared infrastructure changed, all algorithms affected");
            self.catalog.ids().into_iter().collect()
        } else {
            self.affected_by_path(files)
        };

        debug!(
            baseline,
            head,
            files = files.len(),
            affected = affected.len(),
            "change detection complete"
        );

        ChangeSet {
            baseline: baseline.to_string(),
            head: head.to_string(),
            files: files.to_vec(),
            affected,
            shared_infrastructure_hit: shared_hit,
        }
    }

    fn affected_by_path(&self, files: &[String]) -> OrderedSet<AlgorithmId> {
        let root_prefix = format!("{}/", self.config.algorithms_root.trim_end_matches('/'));
        let mut affected = OrderedSet::new();

        for file in files {
            let Some(rest) = file.strip_prefix(root_prefix.as_str()) else {
                continue;
            };
            let Some(name) = rest.split('/').next().filter(|s| !s.is_empty()) else {
                continue;
            };
            let id = AlgorithmId::new(name);
            if self.catalog.contains(&id) {
                affected.insert(id);
            } else {
                // Path references a deleted or unregistered algorithm
                // directory; not an error.
                warn!(file, algorithm = name, "changed path has no valid algorithm metadata");
            }
        }

        affected
    }
}
