//! Severity resolution and suppression
//!
//! An [`IssueConfiguration`] is an explicit immutable value threaded through
//! the run; there is no process-wide severity state. It holds an ordered
//! list of kind-level severity overrides (later entries win, and an override
//! on a parent kind re-targets its children unless a child has an override
//! of its own) plus narrow per-value suppressions that silence one exact
//! value-change occurrence, matched structurally against the issue's own
//! fields rather than by substring matching on rendered text.

use crate::error::ApiVetError;
use crate::issues::{Issue, IssueKind, Severity};
use crate::result::Result;
use serde::Deserialize;
use tracing::debug;

/// A typed per-value suppression record
///
/// Matches a single value-change issue whose kind, qualified location, and
/// old/new rendered values all agree. `None` values match an issue side
/// where no value was recorded (for example "to nothing" removals).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValueSuppression {
    pub kind: String,
    pub location: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Compiled suppression with the kind name resolved
#[derive(Debug, Clone)]
struct CompiledSuppression {
    kind: IssueKind,
    location: String,
    old_value: Option<String>,
    new_value: Option<String>,
}

impl CompiledSuppression {
    fn matches(&self, issue: &Issue) -> bool {
        issue.kind == self.kind
            && issue.location == self.location
            && issue.old_value == self.old_value
            && issue.new_value == self.new_value
    }
}

/// Immutable severity configuration for one run
#[derive(Debug, Clone, Default)]
pub struct IssueConfiguration {
    /// Ordered (kind, severity) overrides; later entries win
    overrides: Vec<(IssueKind, Severity)>,
    suppressions: Vec<CompiledSuppression>,
    /// Deprecated-usage warnings collected while the configuration was built
    warnings: Vec<String>,
}

impl IssueConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a kind-level severity override by configured name
    ///
    /// Unknown kind names are fatal configuration errors, raised before any
    /// comparison begins. Case-insensitive matches are accepted but recorded
    /// as a deprecated-usage warning.
    pub fn add_override(&mut self, name: &str, severity: Severity) -> Result<()> {
        let (kind, exact) = IssueKind::from_name(name)
            .ok_or_else(|| ApiVetError::UnknownIssueKind {
                name: name.to_string(),
            })?;
        if !exact {
            self.warnings.push(format!(
                "issue kind '{name}' matched '{}' case-insensitively; this is deprecated, use the exact name",
                kind.name()
            ));
        }
        self.overrides.push((kind, severity));
        Ok(())
    }

    /// Append a per-value suppression record
    pub fn add_suppression(&mut self, suppression: ValueSuppression) -> Result<()> {
        let (kind, exact) = IssueKind::from_name(&suppression.kind)
            .ok_or_else(|| ApiVetError::UnknownIssueKind {
                name: suppression.kind.clone(),
            })?;
        if !exact {
            self.warnings.push(format!(
                "issue kind '{}' matched '{}' case-insensitively; this is deprecated, use the exact name",
                suppression.kind,
                kind.name()
            ));
        }
        self.suppressions.push(CompiledSuppression {
            kind,
            location: suppression.location,
            old_value: suppression.old_value,
            new_value: suppression.new_value,
        });
        Ok(())
    }

    /// Deprecated-usage warnings collected so far
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Resolve the severity of a kind under the configured overrides
    ///
    /// The kind's own overrides win over inherited ones; within one kind the
    /// last configured entry wins; with no override anywhere on the parent
    /// chain, the kind's default severity applies.
    pub fn resolve(&self, kind: IssueKind) -> Severity {
        let mut current = Some(kind);
        while let Some(k) = current {
            let last = self
                .overrides
                .iter()
                .rev()
                .find(|(overridden, _)| *overridden == k);
            if let Some((_, severity)) = last {
                return *severity;
            }
            current = k.parent();
        }
        kind.default_severity()
    }

    /// Apply severity resolution and suppression to a raw issue stream
    ///
    /// A matching per-value suppression silences the occurrence even when a
    /// kind-level override would have raised it; the suppression is the
    /// narrower statement of intent. Issues that resolve to `Hidden` are
    /// filtered from the stream.
    pub fn apply(&self, issues: Vec<Issue>) -> Vec<Issue> {
        let total = issues.len();
        let resolved: Vec<Issue> = issues
            .into_iter()
            .filter(|issue| !self.suppressions.iter().any(|s| s.matches(issue)))
            .map(|mut issue| {
                issue.severity = self.resolve(issue.kind);
                issue
            })
            .filter(|issue| issue.severity != Severity::Hidden)
            .collect();
        debug!(
            raw = total,
            reported = resolved.len(),
            "severity resolution applied"
        );
        resolved
    }
}
