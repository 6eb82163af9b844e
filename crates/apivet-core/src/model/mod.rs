//! Immutable model of an API surface
//!
//! A [`Codebase`] is a graph of packages, classes, and members with their
//! types and modifiers, as produced by a model builder (for example the
//! signature-format parser in [`crate::signature`]). The comparator trusts
//! this model and never re-derives types from source.
//!
//! Construction goes through [`Codebase::add_class`]; once built, a codebase
//! must pass [`Codebase::validate`] before it takes part in a comparison.
//! Validation enforces the structural invariants that are fatal errors
//! rather than compatibility issues: unique qualified names and an acyclic
//! supertype graph.

mod item;
mod types;

pub use item::{
    ClassItem, ClassKind, MemberItem, MemberKey, MemberKind, Modifiers, Parameter, TypeParameter,
    Visibility,
};
pub use types::{Nullability, TypeItem, TypeKind};

use crate::error::ApiVetError;
use crate::result::Result;
use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Version of the signature format a codebase was built from
///
/// Default-value semantics differ across versions: under [`FormatVersion::V1`]
/// and [`FormatVersion::V2`] an absent recorded default simply means "no
/// default was written down", while [`FormatVersion::V3`] records optionality
/// explicitly, so the absence of the marker on a previously-optional
/// parameter is itself the incompatibility trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FormatVersion {
    V1,
    V2,
    V3,
}

impl FormatVersion {
    /// Whether this format records parameter optionality explicitly
    pub fn records_optionality(&self) -> bool {
        *self >= FormatVersion::V3
    }
}

/// A named package and its classes, in declaration order
#[derive(Debug, Clone, Default)]
pub struct Package {
    pub name: String,
    /// Qualified names of the classes declared in this package
    pub classes: Vec<String>,
}

/// An immutable API surface: packages and classes keyed by qualified name
#[derive(Debug, Clone)]
pub struct Codebase {
    /// Human label used in error messages ("old", "new", "base")
    label: String,
    format: FormatVersion,
    packages: IndexMap<String, Package>,
    classes: IndexMap<String, ClassItem>,
}

impl Codebase {
    /// Create an empty codebase with the given label
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            format: FormatVersion::V1,
            packages: IndexMap::new(),
            classes: IndexMap::new(),
        }
    }

    /// Label this codebase was created with
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Signature format version this codebase was built from
    pub fn format(&self) -> FormatVersion {
        self.format
    }

    /// Record the signature format version (set by the model builder)
    pub fn set_format(&mut self, format: FormatVersion) {
        self.format = format;
    }

    /// Register a package, which may stay empty
    ///
    /// A package with no remaining classes is still part of the surface;
    /// whether it exists at all decides RemovedPackage versus per-class
    /// removal issues.
    pub fn add_package(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.packages.entry(name.clone()).or_insert_with(|| Package {
            name,
            classes: Vec::new(),
        });
    }

    /// Add a class, rejecting duplicate qualified names
    pub fn add_class(&mut self, class: ClassItem) -> Result<()> {
        if self.classes.contains_key(&class.qualified_name) {
            return Err(ApiVetError::duplicate_class(
                &class.qualified_name,
                &self.label,
            ));
        }
        let package = class.package_name().to_string();
        self.packages
            .entry(package.clone())
            .or_insert_with(|| Package {
                name: package,
                classes: Vec::new(),
            })
            .classes
            .push(class.qualified_name.clone());
        self.classes.insert(class.qualified_name.clone(), class);
        Ok(())
    }

    /// Look up a class by qualified name
    pub fn find_class(&self, qualified_name: &str) -> Option<&ClassItem> {
        self.classes.get(qualified_name)
    }

    /// Look up a package by name
    pub fn find_package(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    /// Packages in declaration order
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }

    /// All classes in declaration order
    pub fn classes(&self) -> impl Iterator<Item = &ClassItem> {
        self.classes.values()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check the structural invariants: acyclic supertype graph
    ///
    /// Duplicate qualified names are already rejected at [`Self::add_class`]
    /// time; this pass builds the supertype digraph (superclass and interface
    /// edges between declared classes) and fails on any cycle. A cycle is a
    /// fatal structural error that aborts the whole comparison.
    pub fn validate(&self) -> Result<()> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

        for class in self.classes.values() {
            let idx = graph.add_node(class.qualified_name.as_str());
            nodes.insert(class.qualified_name.as_str(), idx);
        }
        for class in self.classes.values() {
            let from = nodes[class.qualified_name.as_str()];
            let supertypes = class
                .super_class
                .iter()
                .chain(class.interfaces.iter());
            for super_name in supertypes {
                // Edges only between declared classes; external supertypes
                // cannot participate in a declared cycle
                if let Some(&to) = nodes.get(super_name.as_str()) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        match toposort(&graph, None) {
            Ok(_) => {
                debug!(
                    codebase = %self.label,
                    classes = self.classes.len(),
                    "supertype graph validated"
                );
                Ok(())
            }
            Err(cycle) => {
                let start = graph[cycle.node_id()];
                Err(ApiVetError::inheritance_cycle(self.cycle_chain(start)))
            }
        }
    }

    /// Reconstruct a readable cycle chain starting from a known participant
    fn cycle_chain(&self, start: &str) -> Vec<String> {
        let mut chain = vec![start.to_string()];
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(start);
        let mut current = start;
        while let Some(class) = self.classes.get(current) {
            let Some(next) = class.super_class.as_deref().or_else(|| {
                class
                    .interfaces
                    .iter()
                    .map(String::as_str)
                    .find(|i| self.classes.contains_key(*i))
            }) else {
                break;
            };
            chain.push(next.to_string());
            if !seen.insert(next) {
                break;
            }
            current = next;
        }
        chain
    }
}
