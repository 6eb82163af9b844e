//! Run configuration loaded from TOML
//!
//! ```toml
//! baseline = "api-baseline.txt"
//!
//! [[severities]]
//! kind = "RemovedDeprecatedClass"
//! severity = "warning"
//!
//! [[suppressions]]
//! kind = "ChangedValue"
//! location = "test.pkg.Foo.LIMIT"
//! old_value = "1"
//! new_value = "42"
//! ```
//!
//! Severity overrides apply in file order, so a later entry for the same
//! kind wins. Unknown issue kinds and unknown severities are fatal before
//! any comparison starts.

use crate::error::ApiVetError;
use crate::result::Result;
use crate::severity::{IssueConfiguration, ValueSuppression};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One kind-level severity override entry
#[derive(Debug, Clone, Deserialize)]
pub struct SeverityOverride {
    pub kind: String,
    pub severity: String,
}

/// Declarative configuration for a compatibility run
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckConfig {
    /// Baseline file path, resolved relative to the config file
    #[serde(default)]
    pub baseline: Option<PathBuf>,
    #[serde(default)]
    pub severities: Vec<SeverityOverride>,
    #[serde(default)]
    pub suppressions: Vec<ValueSuppression>,
}

impl CheckConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text)
            .map_err(|e| ApiVetError::config_error(format!("invalid config: {e}")))
    }

    /// Read and parse a configuration file
    ///
    /// A relative baseline path becomes relative to the config file's
    /// directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|e| ApiVetError::io_error(path, e))?;
        let mut config = Self::from_toml(&text)?;
        if let (Some(baseline), Some(parent)) = (&config.baseline, path.parent()) {
            if baseline.is_relative() {
                config.baseline = Some(parent.join(baseline));
            }
        }
        debug!(path = %path.display(), overrides = config.severities.len(), "config loaded");
        Ok(config)
    }

    /// Compile into the immutable per-run configuration
    pub fn issue_configuration(&self) -> Result<IssueConfiguration> {
        let mut config = IssueConfiguration::new();
        for entry in &self.severities {
            let severity = entry.severity.parse().map_err(ApiVetError::config_error)?;
            config.add_override(&entry.kind, severity)?;
        }
        for suppression in &self.suppressions {
            config.add_suppression(suppression.clone())?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::{IssueKind, Severity};

    #[test]
    fn parses_full_config() {
        let config = CheckConfig::from_toml(
            r#"
            baseline = "api-baseline.txt"

            [[severities]]
            kind = "RemovedDeprecatedClass"
            severity = "warning"

            [[severities]]
            kind = "RemovedFinal"
            severity = "hidden"

            [[suppressions]]
            kind = "ChangedValue"
            location = "test.pkg.Foo.LIMIT"
            old_value = "1"
            new_value = "42"
            "#,
        )
        .unwrap();

        assert_eq!(config.baseline.as_deref(), Some(Path::new("api-baseline.txt")));
        assert_eq!(config.severities.len(), 2);
        assert_eq!(config.suppressions.len(), 1);

        let compiled = config.issue_configuration().unwrap();
        assert_eq!(
            compiled.resolve(IssueKind::RemovedDeprecatedClass),
            Severity::Warning
        );
        assert_eq!(compiled.resolve(IssueKind::RemovedFinal), Severity::Hidden);
        // untouched kinds keep their defaults
        assert_eq!(compiled.resolve(IssueKind::RemovedClass), Severity::Error);
    }

    #[test]
    fn empty_config_is_valid() {
        let config = CheckConfig::from_toml("").unwrap();
        assert!(config.baseline.is_none());
        assert!(config.severities.is_empty());
        config.issue_configuration().unwrap();
    }

    #[test]
    fn unknown_kind_fails_compilation() {
        let config = CheckConfig::from_toml(
            r#"
            [[severities]]
            kind = "NoSuchKind"
            severity = "error"
            "#,
        )
        .unwrap();
        let err = config.issue_configuration().unwrap_err();
        assert!(matches!(err, ApiVetError::UnknownIssueKind { .. }));
    }

    #[test]
    fn unknown_severity_fails_compilation() {
        let config = CheckConfig::from_toml(
            r#"
            [[severities]]
            kind = "RemovedClass"
            severity = "catastrophic"
            "#,
        )
        .unwrap();
        let err = config.issue_configuration().unwrap_err();
        assert!(matches!(err, ApiVetError::ConfigError { .. }));
    }

    #[test]
    fn unknown_top_level_keys_are_rejected() {
        assert!(CheckConfig::from_toml("unexpected = true").is_err());
    }

    #[test]
    fn relative_baseline_resolves_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apivet.toml");
        std::fs::write(&path, "baseline = \"known-issues.txt\"\n").unwrap();
        let config = CheckConfig::load(&path).unwrap();
        assert_eq!(
            config.baseline.as_deref(),
            Some(dir.path().join("known-issues.txt").as_path())
        );
    }
}
