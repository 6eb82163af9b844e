//! Issue report rendering and baselines
//!
//! The renderer turns the surviving issue stream into one of the supported
//! output formats. Text output is one line per issue in the stable shape
//! `<location>: <severity>: <message> [<KindName>]`; JSON output is meant
//! for programmatic consumption.
//!
//! A [`Baseline`] is a checked-in grandfather list: known issues keyed by
//! (kind, location, message) that are filtered from future runs. Matching is
//! exact; once the underlying difference changes shape it stops matching and
//! surfaces again.

use crate::error::ApiVetError;
use crate::issues::Issue;
use crate::result::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

const BASELINE_HEADER: &str = "// Baseline format: 1.0";

/// Output format for the issue report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// One stable text line per issue
    #[default]
    Text,
    /// JSON array for programmatic consumption
    Json,
    /// JSON with pretty-printing
    JsonPretty,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            "json-pretty" => Ok(ReportFormat::JsonPretty),
            other => Err(format!("unknown report format '{other}'")),
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    issues: &'a [Issue],
    errors: usize,
    warnings: usize,
}

/// Renders the issue stream in a configured format
#[derive(Debug, Default)]
pub struct ReportRenderer {
    format: ReportFormat,
}

impl ReportRenderer {
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    /// Render all issues; text output ends with a trailing newline when
    /// non-empty
    pub fn render(&self, issues: &[Issue]) -> Result<String> {
        match self.format {
            ReportFormat::Text => {
                let mut out = String::new();
                for issue in issues {
                    out.push_str(&issue.to_string());
                    out.push('\n');
                }
                Ok(out)
            }
            ReportFormat::Json | ReportFormat::JsonPretty => {
                let report = JsonReport {
                    issues,
                    errors: issues
                        .iter()
                        .filter(|i| i.severity == crate::issues::Severity::Error)
                        .count(),
                    warnings: issues
                        .iter()
                        .filter(|i| i.severity == crate::issues::Severity::Warning)
                        .count(),
                };
                let rendered = if self.format == ReportFormat::JsonPretty {
                    serde_json::to_string_pretty(&report)
                } else {
                    serde_json::to_string(&report)
                };
                rendered.map_err(|e| {
                    ApiVetError::internal_error(format!("report serialization failed: {e}"))
                })
            }
        }
    }
}

/// Entry identity in a baseline file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BaselineKey {
    kind: String,
    location: String,
    message: String,
}

impl BaselineKey {
    fn of(issue: &Issue) -> Self {
        let (kind, location, message) = issue.stable_key();
        Self {
            kind: kind.to_string(),
            location: location.to_string(),
            message: message.to_string(),
        }
    }
}

/// A grandfather list of known issues
///
/// File format is line oriented: an optional format header, `//` comments,
/// and one `<KindName>: <location>: <message>` entry per line.
#[derive(Debug, Default)]
pub struct Baseline {
    entries: HashSet<BaselineKey>,
}

impl Baseline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse baseline text
    pub fn parse(text: &str) -> Result<Self> {
        let mut entries = HashSet::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            let mut parts = line.splitn(3, ": ");
            let (Some(kind), Some(location), Some(message)) =
                (parts.next(), parts.next(), parts.next())
            else {
                return Err(ApiVetError::baseline_error(format!(
                    "malformed entry at line {}: {line}",
                    index + 1
                )));
            };
            entries.insert(BaselineKey {
                kind: kind.to_string(),
                location: location.to_string(),
                message: message.to_string(),
            });
        }
        Ok(Self { entries })
    }

    /// Read and parse a baseline file
    pub fn load(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|e| ApiVetError::io_error(path, e))?;
        Self::parse(&text)
    }

    /// Build a baseline that covers exactly the given issues
    pub fn from_issues(issues: &[Issue]) -> Self {
        Self {
            entries: issues.iter().map(BaselineKey::of).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, issue: &Issue) -> bool {
        self.entries.contains(&BaselineKey::of(issue))
    }

    /// Drop baselined issues from the stream
    pub fn filter(&self, issues: Vec<Issue>) -> (Vec<Issue>, usize) {
        let before = issues.len();
        let kept: Vec<Issue> = issues
            .into_iter()
            .filter(|issue| !self.contains(issue))
            .collect();
        let suppressed = before - kept.len();
        if suppressed > 0 {
            debug!(suppressed, "issues suppressed by baseline");
        }
        (kept, suppressed)
    }

    /// Render the baseline file content with entries in sorted order
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = self
            .entries
            .iter()
            .map(|e| format!("{}: {}: {}", e.kind, e.location, e.message))
            .collect();
        lines.sort();
        let mut out = String::from(BASELINE_HEADER);
        out.push('\n');
        for line in lines {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    /// Write the baseline to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render()).map_err(|e| ApiVetError::io_error(path, e))
    }
}
