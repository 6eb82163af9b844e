//! apivet core
//!
//! Core engine for API surface compatibility checking. This crate models an
//! API surface as a [`model::Codebase`], resolves the inheritance-aware
//! effective member surface of each class, compares a released surface
//! against a current one, and classifies every incompatible difference into
//! a closed issue taxonomy with configurable severities.

pub mod check;
pub mod compare;
pub mod config;
pub mod error;
pub mod issues;
pub mod model;
pub mod report;
pub mod resolver;
pub mod result;
pub mod severity;
pub mod signature;

// Re-export commonly used types
pub use check::{CheckResult, CompatibilityCheck};
pub use compare::{ApiComparator, merge_base};
pub use config::{CheckConfig, SeverityOverride};
pub use error::{ApiVetError, ErrorKind};
pub use issues::{Issue, IssueKind, Severity};
pub use model::{
    ClassItem, ClassKind, Codebase, FormatVersion, MemberItem, MemberKey, MemberKind, Modifiers,
    Nullability, Package, Parameter, TypeItem, TypeKind, TypeParameter, Visibility,
};
pub use report::{Baseline, ReportFormat, ReportRenderer};
pub use resolver::{EffectiveMember, InheritanceResolver};
pub use result::Result;
pub use severity::{IssueConfiguration, ValueSuppression};
pub use signature::{load_api, parse_api};

/// Initialize the tracing subscriber for logging
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("apivet=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
