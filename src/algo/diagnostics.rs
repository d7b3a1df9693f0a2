//! Contained failures reported by the layout pipeline.
//!
//! A degenerate edge, an unmatched cut group or a runaway separatrix only
//! affects part of the layout. Such problems are recorded here and logged,
//! and the pipeline carries on. Errors clear the overall success flag;
//! warnings do not.

use std::fmt;

/// How serious an issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Result is usable; something was excluded or approximated.
    Warning,
    /// Part of the result is missing or wrong.
    Error,
}

/// Category of a contained failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    /// Zero-length edge, zero-area face, or non-manifold input.
    Degeneracy,
    /// The linear solver did not produce an accurate solution.
    SolverFailure,
    /// Unmatched cut sides, T-junctions, separatrices lost from the layout.
    Topology,
    /// An iteration cap was reached.
    IterationCap,
    /// Singularity indices do not add up to the Euler characteristic.
    PoincareHopf,
}

/// A single reported issue.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    /// Severity.
    pub severity: Severity,
    /// Category.
    pub kind: IssueKind,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{} [{:?}]: {}", level, self.kind, self.message)
    }
}

/// Accumulated issues plus the overall success flag.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    success: bool,
    issues: Vec<Issue>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagnostics {
    /// An empty, successful report.
    pub fn new() -> Self {
        Self {
            success: true,
            issues: Vec::new(),
        }
    }

    /// Record a warning.
    pub fn warn(&mut self, kind: IssueKind, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{:?}: {}", kind, message);
        self.issues.push(Issue {
            severity: Severity::Warning,
            kind,
            message,
        });
    }

    /// Record an error and clear the success flag.
    pub fn error(&mut self, kind: IssueKind, message: impl Into<String>) {
        let message = message.into();
        log::error!("{:?}: {}", kind, message);
        self.success = false;
        self.issues.push(Issue {
            severity: Severity::Error,
            kind,
            message,
        });
    }

    /// Append all issues from another report.
    pub fn merge(&mut self, other: Diagnostics) {
        self.success &= other.success;
        self.issues.extend(other.issues);
    }

    /// Whether no error was recorded.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// All recorded issues in order.
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Number of issues of a kind.
    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }

    /// Whether any issue of a kind was recorded.
    pub fn has(&self, kind: IssueKind) -> bool {
        self.count(kind) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_keep_success() {
        let mut d = Diagnostics::new();
        d.warn(IssueKind::Degeneracy, "edge 3 has zero length");
        assert!(d.is_success());
        assert!(d.has(IssueKind::Degeneracy));
        assert_eq!(
            d.issues()[0].to_string(),
            "warning [Degeneracy]: edge 3 has zero length"
        );
    }

    #[test]
    fn test_merge_propagates_errors() {
        let mut a = Diagnostics::new();
        let mut b = Diagnostics::new();
        b.error(IssueKind::SolverFailure, "singular system");
        a.merge(b);
        assert!(!a.is_success());
        assert_eq!(a.count(IssueKind::SolverFailure), 1);
    }
}
