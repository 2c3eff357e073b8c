//! Conventional-commit subject classification.
//!
//! The heuristics live behind this single module so they can be replaced
//! without touching the resolver.

use regex::Regex;
use std::sync::OnceLock;

/// Classification of one commit subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitKind {
    /// Breaking change: `!` immediately before the colon, or a
    /// `BREAKING CHANGE` footer line.
    Breaking,
    /// A `feat` subject.
    Feature,
    /// A `fix` subject.
    Fix,
    /// Anything else (docs, chore, unconventional, ...).
    Other,
}

#[allow(clippy::expect_used)]
fn subject_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<kind>[A-Za-z]+)(?:\([^)]*\))?(?P<bang>!)?:").expect("pattern is valid")
    })
}

/// Classifies one commit subject line.
#[must_use]
pub fn classify(subject: &str) -> CommitKind {
    let subject = subject.trim();

    // Footer convention, occasionally pasted into the subject line.
    if subject.starts_with("BREAKING CHANGE") || subject.starts_with("BREAKING-CHANGE") {
        return CommitKind::Breaking;
    }

    let Some(caps) = subject_pattern().captures(subject) else {
        return CommitKind::Other;
    };

    if caps.name("bang").is_some() {
        return CommitKind::Breaking;
    }

    match caps["kind"].to_ascii_lowercase().as_str() {
        "feat" => CommitKind::Feature,
        "fix" => CommitKind::Fix,
        _ => CommitKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_fix() {
        assert_eq!(classify("fix: typo"), CommitKind::Fix);
        assert_eq!(classify("fix(kalman_filter): covariance"), CommitKind::Fix);
    }

    #[test]
    fn test_classifies_feature() {
        assert_eq!(classify("feat: add mode"), CommitKind::Feature);
        assert_eq!(classify("feat(pid): add clamp"), CommitKind::Feature);
    }

    #[test]
    fn test_bang_marks_breaking() {
        assert_eq!(classify("feat!: change signature"), CommitKind::Breaking);
        assert_eq!(classify("fix(scope)!: drop field"), CommitKind::Breaking);
    }

    #[test]
    fn test_breaking_change_footer() {
        assert_eq!(
            classify("BREAKING CHANGE: output reordered"),
            CommitKind::Breaking
        );
        assert_eq!(
            classify("BREAKING-CHANGE: output reordered"),
            CommitKind::Breaking
        );
    }

    #[test]
    fn test_unconventional_subjects_are_other() {
        assert_eq!(classify("merge branch main"), CommitKind::Other);
        assert_eq!(classify("docs: update readme"), CommitKind::Other);
        assert_eq!(classify(""), CommitKind::Other);
    }

    #[test]
    fn test_bang_must_precede_colon() {
        // A bang elsewhere in the subject is not a breaking marker.
        assert_eq!(classify("fix: urgent!"), CommitKind::Fix);
    }
}
