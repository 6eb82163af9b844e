//! apivet CLI
//!
//! Command-line interface for checking API surface compatibility between a
//! released signature file and the current one.

mod output;

use anyhow::Context;
use apivet_core::{
    Baseline, CheckConfig, CompatibilityCheck, ReportFormat, load_api,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

/// Exit code for fatal errors, as opposed to incompatibility findings
const EXIT_FATAL: u8 = 2;

#[derive(Parser)]
#[command(name = "apivet")]
#[command(about = "Checks API surfaces for binary and source incompatibilities")]
#[command(version = apivet_core::VERSION)]
#[command(
    long_about = "apivet compares a released API signature file against the current one and\n\
reports every incompatible difference, classified into a configurable issue\n\
taxonomy.\n\
\n\
Examples:\n  \
apivet check released.txt current.txt          # Plain comparison\n  \
apivet check old.txt new.txt --config apivet.toml\n  \
apivet check old.txt new.txt --update-baseline # Grandfather current issues"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a released API signature file against the current one
    Check {
        /// Released (old) API signature file
        old: PathBuf,

        /// Current (new) API signature file
        new: PathBuf,

        /// Base API overlay completing a partial released surface
        #[arg(long)]
        base: Option<PathBuf>,

        /// Configuration file with severity overrides and suppressions
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Baseline file of grandfathered issues (overrides the config)
        #[arg(long)]
        baseline: Option<PathBuf>,

        /// Write the surviving issues to the baseline file and exit
        #[arg(long, requires = "baseline")]
        update_baseline: bool,

        /// Report format: text, json, or json-pretty
        #[arg(short, long, default_value = "text")]
        format: ReportFormat,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(&cli) {
        Ok(passed) => {
            if passed {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(err) => {
            error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    match &cli.command {
        Commands::Check {
            old,
            new,
            base,
            config,
            baseline,
            update_baseline,
            format,
        } => {
            let config = match config {
                Some(path) => CheckConfig::load(path)
                    .with_context(|| format!("failed to load config {}", path.display()))?,
                None => CheckConfig::default(),
            };
            let baseline_path = baseline.clone().or_else(|| config.baseline.clone());

            let old_api = load_api("released", old)
                .with_context(|| format!("failed to load {}", old.display()))?;
            let new_api = load_api("current", new)
                .with_context(|| format!("failed to load {}", new.display()))?;
            let base_api = base
                .as_ref()
                .map(|path| {
                    load_api("base", path)
                        .with_context(|| format!("failed to load {}", path.display()))
                })
                .transpose()?;

            let check = CompatibilityCheck::new(config.issue_configuration()?);
            let result = check.run(&old_api, base_api.as_ref(), &new_api)?;
            for warning in &result.config_warnings {
                eprintln!("warning: {warning}");
            }

            if *update_baseline {
                let path = baseline_path.context("--update-baseline requires --baseline")?;
                Baseline::from_issues(&result.issues).save(&path)?;
                eprintln!(
                    "wrote {} baseline entries to {}",
                    result.issues.len(),
                    path.display()
                );
                return Ok(true);
            }

            let (issues, baselined) = match &baseline_path {
                Some(path) if path.exists() => {
                    Baseline::load(path)?.filter(result.issues.clone())
                }
                _ => (result.issues.clone(), 0),
            };

            output::print_report(&issues, baselined, *format)?;
            Ok(!issues
                .iter()
                .any(|i| i.severity == apivet_core::Severity::Error))
        }
    }
}

fn init_tracing(verbosity: u8) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let default = match verbosity {
        0 => "apivet=warn",
        1 => "apivet=info",
        2 => "apivet=debug",
        _ => "apivet=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
