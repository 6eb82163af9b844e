//! Declared items of an API surface: classes, members, modifiers

use super::types::{Nullability, TypeItem};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Visibility, totally ordered by accessibility
///
/// The derived `Ord` gives `Private < PackagePrivate < Protected < Public`,
/// which is exactly the "may only widen" order the comparator relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Private,
    PackagePrivate,
    Protected,
    Public,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Private => write!(f, "private"),
            Visibility::PackagePrivate => write!(f, "package-private"),
            Visibility::Protected => write!(f, "protected"),
            Visibility::Public => write!(f, "public"),
        }
    }
}

/// Kind of a class-level declaration; the set is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
    Annotation,
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassKind::Class => write!(f, "class"),
            ClassKind::Interface => write!(f, "interface"),
            ClassKind::Enum => write!(f, "enum"),
            ClassKind::Annotation => write!(f, "annotation"),
        }
    }
}

/// Kind of a member declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberKind {
    Constructor,
    Method,
    Field,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Constructor => write!(f, "constructor"),
            MemberKind::Method => write!(f, "method"),
            MemberKind::Field => write!(f, "field"),
        }
    }
}

/// Modifier set shared by classes and members
///
/// Not every flag is meaningful on every item; the comparator only consults
/// the flags that apply to the item kind at hand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
    pub is_deprecated: bool,
    pub is_sealed: bool,
    /// Interface method with a body (`default` in Java terms)
    pub is_default: bool,
    pub is_varargs: bool,
    pub is_infix: bool,
    pub is_operator: bool,
    /// Functional-interface marker (`fun interface`)
    pub is_fun: bool,
    pub is_volatile: bool,
    pub is_transient: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::PackagePrivate
    }
}

impl Modifiers {
    /// Modifiers for a plain public item
    pub fn public() -> Self {
        Self {
            visibility: Visibility::Public,
            ..Self::default()
        }
    }

    /// Whether an item with these modifiers is part of the visible API
    pub fn is_api_visible(&self) -> bool {
        self.visibility >= Visibility::Protected
    }
}

/// Generic type parameter of a class or method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParameter {
    pub name: String,
    pub bound: Option<String>,
    /// Kotlin `reified` marker; only meaningful on inline functions
    pub is_reified: bool,
}

impl TypeParameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bound: None,
            is_reified: false,
        }
    }
}

/// A single parameter of a callable member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Declared name; `None` when the source format did not record one
    pub name: Option<String>,
    pub ty: TypeItem,
    /// Whether a default value (or an explicit `optional` marker, depending
    /// on the signature format version) was recorded for this parameter
    pub has_default: bool,
}

impl Parameter {
    pub fn new(ty: TypeItem) -> Self {
        Self {
            name: None,
            ty,
            has_default: false,
        }
    }

    pub fn named(name: impl Into<String>, ty: TypeItem) -> Self {
        Self {
            name: Some(name.into()),
            ty,
            has_default: false,
        }
    }

    /// Erased type spelling used in the member match key
    pub fn erased(&self) -> String {
        self.ty.erased()
    }
}

/// Match key for members across codebases
///
/// Callables match on (name, kind, erased parameter types); fields on
/// (name, kind). The containing class is implied by where the lookup happens.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberKey {
    pub name: String,
    pub kind: MemberKind,
    pub erased_params: Option<Vec<String>>,
}

/// A constructor, method, or field declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberItem {
    pub kind: MemberKind,
    pub name: String,
    pub modifiers: Modifiers,
    /// Return type for methods, declared type for fields, `None` for constructors
    pub ty: Option<TypeItem>,
    pub parameters: Vec<Parameter>,
    /// Method-level type parameters
    pub type_parameters: Vec<TypeParameter>,
    /// Checked exceptions declared thrown
    pub throws: Vec<String>,
    /// Literal constant value (fields) or default value (annotation elements)
    pub value: Option<String>,
}

impl MemberItem {
    pub fn method(name: impl Into<String>) -> Self {
        Self {
            kind: MemberKind::Method,
            name: name.into(),
            modifiers: Modifiers::public(),
            ty: None,
            parameters: Vec::new(),
            type_parameters: Vec::new(),
            throws: Vec::new(),
            value: None,
        }
    }

    pub fn field(name: impl Into<String>, ty: TypeItem) -> Self {
        Self {
            kind: MemberKind::Field,
            name: name.into(),
            modifiers: Modifiers::public(),
            ty: Some(ty),
            parameters: Vec::new(),
            type_parameters: Vec::new(),
            throws: Vec::new(),
            value: None,
        }
    }

    pub fn constructor(class_simple_name: impl Into<String>) -> Self {
        Self {
            kind: MemberKind::Constructor,
            name: class_simple_name.into(),
            modifiers: Modifiers::public(),
            ty: None,
            parameters: Vec::new(),
            type_parameters: Vec::new(),
            throws: Vec::new(),
            value: None,
        }
    }

    /// Match key within a containing class
    pub fn key(&self) -> MemberKey {
        MemberKey {
            name: self.name.clone(),
            kind: self.kind,
            erased_params: match self.kind {
                MemberKind::Field => None,
                MemberKind::Constructor | MemberKind::Method => {
                    Some(self.parameters.iter().map(Parameter::erased).collect())
                }
            },
        }
    }

    /// Whether this member is callable (has a parameter list)
    pub fn is_callable(&self) -> bool {
        matches!(self.kind, MemberKind::Constructor | MemberKind::Method)
    }

    /// Return nullability for methods, field nullability for fields
    pub fn type_nullability(&self) -> Option<Nullability> {
        self.ty.as_ref().map(|t| t.nullability)
    }

    /// Qualified signature for report locations, e.g. `test.pkg.Foo.bar(Float)`
    pub fn signature_in(&self, class_name: &str) -> String {
        match self.kind {
            MemberKind::Field => format!("{class_name}.{}", self.name),
            MemberKind::Constructor => {
                format!("{class_name}({})", self.erased_param_list())
            }
            MemberKind::Method => {
                format!("{class_name}.{}({})", self.name, self.erased_param_list())
            }
        }
    }

    /// Signature variant that spells out parameter names where recorded,
    /// used by parameter-scoped messages
    pub fn described_signature_in(&self, class_name: &str) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| match &p.name {
                Some(name) => format!("{} {name}", p.ty),
                None => p.ty.to_string(),
            })
            .collect();
        match self.kind {
            MemberKind::Field => format!("{class_name}.{}", self.name),
            MemberKind::Constructor => format!("{class_name}({})", params.join(", ")),
            MemberKind::Method => {
                format!("{class_name}.{}({})", self.name, params.join(", "))
            }
        }
    }

    fn erased_param_list(&self) -> String {
        self.parameters
            .iter()
            .map(Parameter::erased)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// A class, interface, enum, or annotation declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassItem {
    /// Globally unique qualified name, the identity key of the class
    pub qualified_name: String,
    pub kind: ClassKind,
    pub modifiers: Modifiers,
    /// Qualified name of the declared superclass, if any
    pub super_class: Option<String>,
    /// Qualified names of directly implemented interfaces, in declaration order
    pub interfaces: Vec<String>,
    pub type_parameters: Vec<TypeParameter>,
    pub members: Vec<MemberItem>,
}

impl ClassItem {
    pub fn new(qualified_name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            kind,
            modifiers: Modifiers::public(),
            super_class: None,
            interfaces: Vec::new(),
            type_parameters: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Package portion of the qualified name (empty for the default package)
    pub fn package_name(&self) -> &str {
        match self.qualified_name.rfind('.') {
            Some(idx) => &self.qualified_name[..idx],
            None => "",
        }
    }

    /// Simple (unqualified) class name
    pub fn simple_name(&self) -> &str {
        match self.qualified_name.rfind('.') {
            Some(idx) => &self.qualified_name[idx + 1..],
            None => &self.qualified_name,
        }
    }

    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    pub fn is_annotation(&self) -> bool {
        self.kind == ClassKind::Annotation
    }

    pub fn is_deprecated(&self) -> bool {
        self.modifiers.is_deprecated
    }

    /// Whether this class is part of the visible API surface
    pub fn is_api_visible(&self) -> bool {
        self.modifiers.is_api_visible()
    }

    pub fn constructors(&self) -> impl Iterator<Item = &MemberItem> {
        self.members
            .iter()
            .filter(|m| m.kind == MemberKind::Constructor)
    }

    pub fn fields(&self) -> impl Iterator<Item = &MemberItem> {
        self.members.iter().filter(|m| m.kind == MemberKind::Field)
    }
}
