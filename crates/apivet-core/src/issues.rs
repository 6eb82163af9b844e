//! Compatibility issue taxonomy
//!
//! Every difference the comparator finds is classified as one of a closed
//! set of [`IssueKind`]s. Each kind carries a fixed default severity and an
//! optional parent kind: overriding the severity of a parent also re-targets
//! its children unless a child has an override of its own (for example,
//! overriding `RemovedClass` also covers `RemovedDeprecatedClass`).
//!
//! Issues are created only by the comparator; the severity resolver in
//! [`crate::severity`] assigns the final severity, and suppression drops
//! matching occurrences before the verdict is computed.

use serde::Serialize;
use std::fmt;

/// Severity of a compatibility issue
///
/// `Hidden` issues are filtered from the report stream entirely; `Lint`
/// issues never fail a run by themselves; any surviving `Error` fails it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Hidden,
    Lint,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Hidden => write!(f, "hidden"),
            Severity::Lint => write!(f, "lint"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hidden" => Ok(Severity::Hidden),
            "lint" => Ok(Severity::Lint),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

macro_rules! issue_kinds {
    ($( $variant:ident => ($name:literal, $severity:expr, $parent:expr) ),+ $(,)?) => {
        /// Closed enumeration of compatibility issue kinds
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum IssueKind {
            $( $variant, )+
        }

        impl IssueKind {
            /// Every kind, in declaration order
            pub const ALL: &'static [IssueKind] = &[ $( IssueKind::$variant, )+ ];

            /// Stable name used in reports, baselines, and configuration
            pub fn name(&self) -> &'static str {
                match self {
                    $( IssueKind::$variant => $name, )+
                }
            }

            /// Severity assigned when no override applies
            pub fn default_severity(&self) -> Severity {
                match self {
                    $( IssueKind::$variant => $severity, )+
                }
            }

            /// Parent kind in the severity-inheritance graph
            pub fn parent(&self) -> Option<IssueKind> {
                match self {
                    $( IssueKind::$variant => $parent, )+
                }
            }
        }
    };
}

issue_kinds! {
    RemovedPackage => ("RemovedPackage", Severity::Error, None),
    RemovedClass => ("RemovedClass", Severity::Error, None),
    RemovedDeprecatedClass => ("RemovedDeprecatedClass", Severity::Error, Some(IssueKind::RemovedClass)),
    RemovedMethod => ("RemovedMethod", Severity::Error, None),
    RemovedDeprecatedMethod => ("RemovedDeprecatedMethod", Severity::Error, Some(IssueKind::RemovedMethod)),
    RemovedConstructor => ("RemovedConstructor", Severity::Error, Some(IssueKind::RemovedMethod)),
    RemovedField => ("RemovedField", Severity::Error, None),
    RemovedDeprecatedField => ("RemovedDeprecatedField", Severity::Error, Some(IssueKind::RemovedField)),
    RemovedInterface => ("RemovedInterface", Severity::Error, None),
    ChangedClass => ("ChangedClass", Severity::Error, None),
    ChangedScope => ("ChangedScope", Severity::Error, None),
    ChangedAbstract => ("ChangedAbstract", Severity::Error, None),
    ChangedStatic => ("ChangedStatic", Severity::Error, None),
    ChangedSuperclass => ("ChangedSuperclass", Severity::Error, None),
    ChangedType => ("ChangedType", Severity::Error, None),
    ChangedThrows => ("ChangedThrows", Severity::Error, None),
    ChangedValue => ("ChangedValue", Severity::Error, None),
    ChangedDefault => ("ChangedDefault", Severity::Error, None),
    ChangedVolatile => ("ChangedVolatile", Severity::Error, None),
    ChangedTransient => ("ChangedTransient", Severity::Error, None),
    ChangedDeprecated => ("ChangedDeprecated", Severity::Hidden, None),
    AddedFinal => ("AddedFinal", Severity::Error, None),
    AddedFinalUninstantiable => ("AddedFinalUninstantiable", Severity::Warning, Some(IssueKind::AddedFinal)),
    AddedSealed => ("AddedSealed", Severity::Error, None),
    AddedAbstractMethod => ("AddedAbstractMethod", Severity::Error, None),
    AddedReified => ("AddedReified", Severity::Error, None),
    InvalidNullConversion => ("InvalidNullConversion", Severity::Error, None),
    ParameterNameChange => ("ParameterNameChange", Severity::Error, None),
    DefaultValueChange => ("DefaultValueChange", Severity::Error, None),
    VarargRemoval => ("VarargRemoval", Severity::Error, None),
    InfixRemoval => ("InfixRemoval", Severity::Error, None),
    OperatorRemoval => ("OperatorRemoval", Severity::Error, None),
    FunRemoval => ("FunRemoval", Severity::Error, None),
    RemovedFinal => ("RemovedFinal", Severity::Lint, None),
}

impl IssueKind {
    /// Resolve a configured kind name
    ///
    /// Exact matches are preferred; a case-insensitive match is accepted for
    /// backwards compatibility but the `bool` in the result is `false` so the
    /// caller can record a deprecated-usage warning.
    pub fn from_name(name: &str) -> Option<(IssueKind, bool)> {
        for kind in IssueKind::ALL {
            if kind.name() == name {
                return Some((*kind, true));
            }
        }
        for kind in IssueKind::ALL {
            if kind.name().eq_ignore_ascii_case(name) {
                return Some((*kind, false));
            }
        }
        None
    }

    /// Whether `self` is `ancestor` or inherits from it
    pub fn inherits_from(&self, ancestor: IssueKind) -> bool {
        let mut current = Some(*self);
        while let Some(kind) = current {
            if kind == ancestor {
                return true;
            }
            current = kind.parent();
        }
        false
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single classified compatibility finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub kind: IssueKind,
    /// Qualified location: package, class, or member signature
    pub location: String,
    pub message: String,
    /// Resolved severity; starts at the kind default, finalized by the resolver
    pub severity: Severity,
    /// Old and new rendered values for value-change issues, used by
    /// structural suppression matching
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
}

impl Issue {
    /// Create an issue at the kind's default severity
    pub fn new(kind: IssueKind, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            location: location.into(),
            message: message.into(),
            severity: kind.default_severity(),
            old_value: None,
            new_value: None,
        }
    }

    /// Attach the old/new rendered values (value-change issues only)
    pub fn with_values(
        mut self,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        self.old_value = Some(old_value.into());
        self.new_value = Some(new_value.into());
        self
    }

    /// Stable identity used by baselines: (kind, location, message)
    pub fn stable_key(&self) -> (&'static str, &str, &str) {
        (self.kind.name(), &self.location, &self.message)
    }
}

impl fmt::Display for Issue {
    /// Report-stream line: `<location>: <severity>: <message> [<KindName>]`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}: {} [{}]",
            self.location, self.severity, self.message, self.kind
        )
    }
}
