//! Structured output files for external collaborators.
//!
//! Everything downstream tooling acts on is written here: the affected
//! list consumed by the scheduler, per-algorithm equivalence reports and
//! release notes, and the persisted version state (VERSION, metadata,
//! changelog) inside each algorithm directory.

use crate::catalog::{Algorithm, AlgorithmId, METADATA_FILE};
use crate::equivalence::EquivalenceReport;
use crate::errors::PipelineError;
use crate::version::VersionDecision;
use chrono::Utc;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes run artifacts under a configured output directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    /// Creates a writer rooted at `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Returns the output root.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn algorithm_dir(&self, algorithm: &AlgorithmId) -> Result<PathBuf, PipelineError> {
        let dir = self.output_dir.join(algorithm.as_str());
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Writes the affected-algorithm list, one identity per line in
    /// detection order.
    pub fn write_affected_list(
        &self,
        affected: &[AlgorithmId],
    ) -> Result<PathBuf, PipelineError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join("affected_algorithms.txt");
        let mut body = String::new();
        for id in affected {
            body.push_str(id.as_str());
            body.push('\n');
        }
        fs::write(&path, body)?;
        debug!(path = %path.display(), count = affected.len(), "wrote affected list");
        Ok(path)
    }

    /// Writes one algorithm's equivalence report as pretty JSON.
    pub fn write_equivalence_report(
        &self,
        algorithm: &AlgorithmId,
        report: &EquivalenceReport,
    ) -> Result<PathBuf, PipelineError> {
        let path = self.algorithm_dir(algorithm)?.join("equivalence_report.json");
        fs::write(&path, report.to_json()?)?;
        debug!(path = %path.display(), "wrote equivalence report");
        Ok(path)
    }

    /// Writes the run-level report as pretty JSON.
    pub fn write_run_report<T: Serialize>(&self, report: &T) -> Result<PathBuf, PipelineError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join("run_report.json");
        fs::write(&path, serde_json::to_string_pretty(report)?)?;
        Ok(path)
    }

    /// Writes the release-notes markdown for one algorithm.
    pub fn write_release_notes(
        &self,
        algorithm: &AlgorithmId,
        decision: &VersionDecision,
        equivalence: Option<&EquivalenceReport>,
        api_diff: Option<&str>,
    ) -> Result<PathBuf, PipelineError> {
        let mut notes = String::new();
        let _ = writeln!(
            notes,
            "# {algorithm} v{} -- Release Notes\n",
            decision.next
        );
        let _ = writeln!(notes, "**Date**: {}\n", Utc::now().format("%Y-%m-%d"));

        if let Some(report) = equivalence {
            let _ = writeln!(notes, "## Equivalence Summary\n");
            let _ = writeln!(notes, "| Metric | Value |");
            let _ = writeln!(notes, "|--------|-------|");
            let _ = writeln!(notes, "| Total tests | {} |", report.total_tests);
            let _ = writeln!(notes, "| All passed | {} |", report.all_passed);
            let _ = writeln!(
                notes,
                "| Max absolute error | {:.2e} |",
                report.max_absolute_error
            );
            let _ = writeln!(
                notes,
                "| Max relative error | {:.2e} |\n",
                report.max_relative_error
            );
        }

        let _ = writeln!(notes, "## API Changes\n");
        match api_diff {
            Some(diff) => {
                let _ = writeln!(notes, "```diff\n{diff}\n```\n");
            }
            None => {
                let _ = writeln!(notes, "No API signature changes\n");
            }
        }

        if decision.released() {
            let _ = writeln!(notes, "## Install\n");
            let _ = writeln!(
                notes,
                "```bash\nconan install --requires={algorithm}/{} --remote=nexus\n```",
                decision.next
            );
        }

        let path = self.algorithm_dir(algorithm)?.join("release_notes.md");
        fs::write(&path, notes)?;
        Ok(path)
    }

    /// Persists a released version into the algorithm directory: the
    /// plain-text `VERSION` file, the rewritten metadata record, and a
    /// changelog entry prepended to `CHANGELOG.md`.
    pub fn persist_version(
        &self,
        algorithm: &Algorithm,
        decision: &VersionDecision,
        subjects: &[String],
    ) -> Result<(), PipelineError> {
        let dir = &algorithm.dir;
        fs::create_dir_all(dir)?;

        fs::write(dir.join("VERSION"), format!("{}\n", decision.next))?;

        let mut meta = algorithm.to_meta();
        meta.version = decision.next.to_string();
        fs::write(
            dir.join(METADATA_FILE),
            serde_json::to_string_pretty(&meta)?,
        )?;

        let mut entry = String::new();
        let bump = decision
            .bump
            .map_or_else(|| "none".to_string(), |b| b.to_string());
        let _ = writeln!(
            entry,
            "## {} - {} ({bump})\n",
            decision.next,
            Utc::now().format("%Y-%m-%d")
        );
        for subject in subjects {
            let _ = writeln!(entry, "- {subject}");
        }
        entry.push('\n');

        let changelog = dir.join("CHANGELOG.md");
        let existing = fs::read_to_string(&changelog).unwrap_or_default();
        fs::write(&changelog, format!("{entry}{existing}"))?;

        debug!(algorithm = %algorithm.id, version = %decision.next, "persisted version state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equivalence::CaseOutcome;
    use crate::version::{BumpKind, SemVer};

    fn algorithm(dir: &Path) -> Algorithm {
        Algorithm {
            id: AlgorithmId::new("kalman_filter"),
            owner: "algorithm-team".to_string(),
            owner_email: "algorithm-team@example.com".to_string(),
            consumers: Vec::new(),
            version: SemVer::new(0, 1, 0),
            dependencies: Vec::new(),
            dir: dir.join("kalman_filter"),
        }
    }

    fn decision() -> VersionDecision {
        VersionDecision {
            previous: SemVer::new(0, 1, 0),
            bump: Some(BumpKind::Minor),
            next: SemVer::new(0, 2, 0),
        }
    }

    #[test]
    fn test_affected_list_order_and_format() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(tmp.path());

        let path = writer
            .write_affected_list(&[
                AlgorithmId::new("pid_controller"),
                AlgorithmId::new("kalman_filter"),
            ])
            .unwrap();

        let body = fs::read_to_string(path).unwrap();
        assert_eq!(body, "pid_controller\nkalman_filter\n");
    }

    #[test]
    fn test_equivalence_report_path() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(tmp.path());
        let report = EquivalenceReport::from_details(
            "kalman_filter",
            vec![CaseOutcome::passed("t", 0.0, 0.0, 1e-10)],
        );

        let path = writer
            .write_equivalence_report(&AlgorithmId::new("kalman_filter"), &report)
            .unwrap();

        assert!(path.ends_with("kalman_filter/equivalence_report.json"));
        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed["all_passed"], true);
    }

    #[test]
    fn test_persist_version_writes_all_three_files() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(tmp.path().join("out"));
        let algorithm = algorithm(tmp.path());

        writer
            .persist_version(&algorithm, &decision(), &["feat: add mode".to_string()])
            .unwrap();

        let version = fs::read_to_string(algorithm.dir.join("VERSION")).unwrap();
        assert_eq!(version, "0.2.0\n");

        let meta: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(algorithm.dir.join(METADATA_FILE)).unwrap())
                .unwrap();
        assert_eq!(meta["version"], "0.2.0");

        let changelog = fs::read_to_string(algorithm.dir.join("CHANGELOG.md")).unwrap();
        assert!(changelog.starts_with("## 0.2.0"));
        assert!(changelog.contains("- feat: add mode"));
    }

    #[test]
    fn test_changelog_entries_prepend() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(tmp.path().join("out"));
        let algorithm = algorithm(tmp.path());

        writer.persist_version(&algorithm, &decision(), &[]).unwrap();
        let second = VersionDecision {
            previous: SemVer::new(0, 2, 0),
            bump: Some(BumpKind::Patch),
            next: SemVer::new(0, 2, 1),
        };
        writer.persist_version(&algorithm, &second, &[]).unwrap();

        let changelog = fs::read_to_string(algorithm.dir.join("CHANGELOG.md")).unwrap();
        let first_pos = changelog.find("## 0.2.1").unwrap();
        let second_pos = changelog.find("## 0.2.0").unwrap();
        assert!(first_pos < second_pos);
    }

    #[test]
    fn test_release_notes_content() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(tmp.path());
        let report = EquivalenceReport::from_details(
            "kalman_filter",
            vec![CaseOutcome::passed("t", 1e-14, 1e-13, 1e-10)],
        );

        let path = writer
            .write_release_notes(
                &AlgorithmId::new("kalman_filter"),
                &decision(),
                Some(&report),
                None,
            )
            .unwrap();

        let notes = fs::read_to_string(path).unwrap();
        assert!(notes.contains("# kalman_filter v0.2.0"));
        assert!(notes.contains("No API signature changes"));
        assert!(notes.contains("conan install --requires=kalman_filter/0.2.0"));
    }
}
