//! Run orchestrator
//!
//! A [`CompatibilityCheck`] owns the immutable configuration for one run and
//! drives the pipeline: validate the input models, merge the optional base
//! overlay into the old surface, compare, then resolve severities and apply
//! suppressions. The result is a [`CheckResult`] whose verdict is derived
//! purely from the surviving issue stream.

use crate::compare::{merge_base, ApiComparator};
use crate::issues::{Issue, Severity};
use crate::model::Codebase;
use crate::result::Result;
use crate::severity::IssueConfiguration;
use std::time::Instant;
use tracing::{debug, info};

/// Outcome of one compatibility run
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Surviving issues in old-surface declaration order
    pub issues: Vec<Issue>,
    /// Deprecated-usage warnings from configuration loading
    pub config_warnings: Vec<String>,
    /// Wall-clock duration of the run
    pub duration_ms: u64,
}

impl CheckResult {
    /// A run passes when no surviving issue carries `Error` severity
    ///
    /// Warnings and lint findings are reported but never fail the run.
    pub fn passed(&self) -> bool {
        !self
            .issues
            .iter()
            .any(|issue| issue.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn lint_count(&self) -> usize {
        self.count(Severity::Lint)
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
    }
}

/// Orchestrates a single old-vs-new comparison
pub struct CompatibilityCheck {
    config: IssueConfiguration,
}

impl CompatibilityCheck {
    pub fn new(config: IssueConfiguration) -> Self {
        Self { config }
    }

    /// Run the full pipeline
    ///
    /// Structural validation failures in any input, or in the merged surface
    /// when a base overlay is given, abort the run before any comparison.
    /// The merge can introduce supertype cycles that neither input had on
    /// its own, so the merged codebase is validated again.
    pub fn run(
        &self,
        old: &Codebase,
        base: Option<&Codebase>,
        new: &Codebase,
    ) -> Result<CheckResult> {
        let started = Instant::now();

        old.validate()?;
        new.validate()?;
        if let Some(base) = base {
            base.validate()?;
        }

        let merged;
        let old_surface = match base {
            Some(base) => {
                merged = merge_base(old, base);
                merged.validate()?;
                debug!(
                    old = old.len(),
                    base = base.len(),
                    merged = merged.len(),
                    "base overlay merged"
                );
                &merged
            }
            None => old,
        };

        let comparator = ApiComparator::new(old_surface, new);
        let raw = comparator.compare()?;
        let issues = self.config.apply(raw);

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            issues = issues.len(),
            duration_ms,
            old = %old.label(),
            new = %new.label(),
            "compatibility check finished"
        );
        Ok(CheckResult {
            issues,
            config_warnings: self.config.warnings().to_vec(),
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiVetError;
    use crate::issues::IssueKind;
    use crate::model::{ClassItem, ClassKind, MemberItem, TypeItem};
    use crate::signature::parse_api;

    fn check(old: &str, new: &str) -> CheckResult {
        let old = parse_api("released", old).unwrap();
        let new = parse_api("current", new).unwrap();
        CompatibilityCheck::new(IssueConfiguration::new())
            .run(&old, None, &new)
            .unwrap()
    }

    #[test]
    fn identical_surfaces_pass() {
        let api = r#"
            package test.pkg {
              public class Foo {
                ctor public Foo();
                method public void bar();
              }
            }
            "#;
        let result = check(api, api);
        assert!(result.passed());
        assert!(result.issues.is_empty());
    }

    #[test]
    fn removal_fails_the_run() {
        let old = r#"
            package test.pkg {
              public class Foo {
                method public void bar();
              }
            }
            "#;
        let new = r#"
            package test.pkg {
              public class Foo {
              }
            }
            "#;
        let result = check(old, new);
        assert!(!result.passed());
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.issues[0].kind, IssueKind::RemovedMethod);
    }

    #[test]
    fn lint_findings_do_not_fail() {
        let old = r#"
            package test.pkg {
              public class Foo {
                ctor public Foo();
                method public final void bar();
              }
            }
            "#;
        let new = r#"
            package test.pkg {
              public class Foo {
                ctor public Foo();
                method public void bar();
              }
            }
            "#;
        let result = check(old, new);
        assert!(result.passed());
        assert_eq!(result.lint_count(), 1);
        assert_eq!(result.issues[0].kind, IssueKind::RemovedFinal);
    }

    #[test]
    fn override_can_fail_a_previously_passing_run() {
        let old = r#"
            package test.pkg {
              public class Foo {
                ctor public Foo();
                method public final void bar();
              }
            }
            "#;
        let new = r#"
            package test.pkg {
              public class Foo {
                ctor public Foo();
                method public void bar();
              }
            }
            "#;
        let old = parse_api("released", old).unwrap();
        let new = parse_api("current", new).unwrap();

        let mut config = IssueConfiguration::new();
        config
            .add_override("RemovedFinal", Severity::Error)
            .unwrap();
        let result = CompatibilityCheck::new(config).run(&old, None, &new).unwrap();
        assert!(!result.passed());
    }

    #[test]
    fn base_overlay_supplies_missing_classes() {
        let old = r#"
            package test.pkg {
              public class Child extends test.pkg.Base {
              }
            }
            "#;
        let base = r#"
            package test.pkg {
              public class Base {
                method public void inherited();
              }
            }
            "#;
        let new = r#"
            package test.pkg {
              public class Base {
                method public void inherited();
              }
              public class Child extends test.pkg.Base {
              }
            }
            "#;
        let old = parse_api("released", old).unwrap();
        let base = parse_api("base", base).unwrap();
        let new = parse_api("current", new).unwrap();
        let result = CompatibilityCheck::new(IssueConfiguration::new())
            .run(&old, Some(&base), &new)
            .unwrap();
        assert!(result.passed(), "{:?}", result.issues);
    }

    #[test]
    fn merged_surface_is_validated() {
        // old and base are each acyclic; the merge closes a cycle
        let mut old = Codebase::new("released");
        let mut a = ClassItem::new("test.pkg.A", ClassKind::Class);
        a.modifiers = crate::model::Modifiers::public();
        a.super_class = Some("test.pkg.B".to_string());
        old.add_class(a).unwrap();

        let mut base = Codebase::new("base");
        let mut b = ClassItem::new("test.pkg.B", ClassKind::Class);
        b.modifiers = crate::model::Modifiers::public();
        b.super_class = Some("test.pkg.A".to_string());
        base.add_class(b).unwrap();

        let new = Codebase::new("current");
        let err = CompatibilityCheck::new(IssueConfiguration::new())
            .run(&old, Some(&base), &new)
            .unwrap_err();
        assert!(matches!(err, ApiVetError::InheritanceCycle { .. }));
    }

    #[test]
    fn config_warnings_surface_in_the_result() {
        let mut config = IssueConfiguration::new();
        config.add_override("removedclass", Severity::Lint).unwrap();
        let old = Codebase::new("released");
        let new = Codebase::new("current");
        let result = CompatibilityCheck::new(config).run(&old, None, &new).unwrap();
        assert_eq!(result.config_warnings.len(), 1);
    }

    #[test]
    fn counts_by_severity() {
        let mut old = Codebase::new("released");
        let mut class = ClassItem::new("test.pkg.Foo", ClassKind::Class);
        class.modifiers = crate::model::Modifiers::public();
        class
            .members
            .push(MemberItem::field("GONE", TypeItem::primitive("int")));
        old.add_class(class).unwrap();
        let mut pkg_new = Codebase::new("current");
        let mut class = ClassItem::new("test.pkg.Foo", ClassKind::Class);
        class.modifiers = crate::model::Modifiers::public();
        pkg_new.add_class(class).unwrap();

        let result = CompatibilityCheck::new(IssueConfiguration::new())
            .run(&old, None, &pkg_new)
            .unwrap();
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.warning_count(), 0);
        assert_eq!(result.lint_count(), 0);
    }
}
