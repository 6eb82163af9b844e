//! Report printing and summary formatting

use apivet_core::{Issue, ReportFormat, ReportRenderer, Severity};
use colored::*;

/// Summary statistics for a check run
#[derive(Debug, Clone, Default)]
struct CheckSummary {
    errors: usize,
    warnings: usize,
    lints: usize,
    baselined: usize,
}

impl CheckSummary {
    fn of(issues: &[Issue], baselined: usize) -> Self {
        let mut summary = Self {
            baselined,
            ..Self::default()
        };
        for issue in issues {
            match issue.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Lint => summary.lints += 1,
                Severity::Hidden => {}
            }
        }
        summary
    }

    fn total(&self) -> usize {
        self.errors + self.warnings + self.lints
    }
}

/// Print the issue report followed by a one-line summary (text format only)
pub fn print_report(
    issues: &[Issue],
    baselined: usize,
    format: ReportFormat,
) -> anyhow::Result<()> {
    let renderer = ReportRenderer::new(format);
    print!("{}", renderer.render(issues)?);
    if format == ReportFormat::Text {
        print_summary(&CheckSummary::of(issues, baselined));
    }
    Ok(())
}

fn print_summary(summary: &CheckSummary) {
    if summary.total() == 0 {
        let mut line = format!("{} no incompatibilities found", "ok:".green().bold());
        if summary.baselined > 0 {
            line.push_str(&format!(" ({} baselined)", summary.baselined));
        }
        println!("{line}");
        return;
    }

    let mut parts = Vec::new();
    if summary.errors > 0 {
        parts.push(
            format!("{} error{}", summary.errors, plural(summary.errors))
                .red()
                .bold()
                .to_string(),
        );
    }
    if summary.warnings > 0 {
        parts.push(
            format!("{} warning{}", summary.warnings, plural(summary.warnings))
                .yellow()
                .to_string(),
        );
    }
    if summary.lints > 0 {
        parts.push(format!("{} lint{}", summary.lints, plural(summary.lints)));
    }
    if summary.baselined > 0 {
        parts.push(format!("{} baselined", summary.baselined).dimmed().to_string());
    }
    println!("found {}", parts.join(", "));
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apivet_core::IssueKind;

    #[test]
    fn summary_counts_by_severity() {
        let mut warning = Issue::new(IssueKind::AddedFinalUninstantiable, "a.B", "added final");
        warning.severity = Severity::Warning;
        let issues = vec![
            Issue::new(IssueKind::RemovedClass, "a.A", "Removed class a.A"),
            warning,
        ];
        let summary = CheckSummary::of(&issues, 3);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.lints, 0);
        assert_eq!(summary.baselined, 3);
        assert_eq!(summary.total(), 2);
    }
}
