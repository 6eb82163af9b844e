//! Type references carried by the API model
//!
//! A [`TypeItem`] is a structural description of a declared type occurrence:
//! field types, return types, parameter types, superclass references. Every
//! occurrence carries a [`Nullability`] tag; the tag is deliberately not part
//! of structural equality because nullability changes are judged by their own
//! lattice rule, not by the type-change rule.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Three-state nullability lattice attached to every type occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nullability {
    /// Declared non-null (`@NonNull`, or a bare type under Kotlin-style nulls)
    NonNull,
    /// Declared nullable (`@Nullable`, or `T?`)
    Nullable,
    /// No declaration either way (platform types, `T!`, unannotated legacy API)
    Unknown,
}

impl fmt::Display for Nullability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nullability::NonNull => write!(f, "@NonNull"),
            Nullability::Nullable => write!(f, "@Nullable"),
            Nullability::Unknown => write!(f, "unannotated"),
        }
    }
}

/// Structural variant of a type occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// Primitive type (`int`, `boolean`, `void`, ...)
    Primitive(String),
    /// Reference to a class or interface, with generic arguments
    ClassRef {
        name: String,
        args: Vec<TypeItem>,
    },
    /// Array of a component type; `varargs` marks the trailing `...` spelling
    Array {
        component: Box<TypeItem>,
        varargs: bool,
    },
    /// Type variable with an optional upper bound
    Variable {
        name: String,
        bound: Option<String>,
    },
    /// Unbounded wildcard (`?`)
    Wildcard,
}

/// A single type occurrence in the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeItem {
    pub kind: TypeKind,
    pub nullability: Nullability,
}

impl TypeItem {
    /// Create a type occurrence with [`Nullability::Unknown`]
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            nullability: Nullability::Unknown,
        }
    }

    /// Set the nullability tag
    pub fn with_nullability(mut self, nullability: Nullability) -> Self {
        self.nullability = nullability;
        self
    }

    /// Shorthand for an unparameterized class reference
    pub fn class_ref(name: impl Into<String>) -> Self {
        Self::new(TypeKind::ClassRef {
            name: name.into(),
            args: Vec::new(),
        })
    }

    /// Shorthand for a primitive type
    pub fn primitive(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Primitive(name.into()))
    }

    /// Whether this occurrence is a varargs array
    pub fn is_varargs(&self) -> bool {
        matches!(self.kind, TypeKind::Array { varargs: true, .. })
    }

    /// Whether this occurrence is any array (varargs or plain)
    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array { .. })
    }

    /// The erased spelling used in member match keys
    ///
    /// Generic arguments are dropped, type variables erase to their bound (or
    /// `java.lang.Object`), and varargs normalize to the array spelling so a
    /// varargs/array flip still matches the same member.
    pub fn erased(&self) -> String {
        match &self.kind {
            TypeKind::Primitive(name) => name.clone(),
            TypeKind::ClassRef { name, .. } => name.clone(),
            TypeKind::Array { component, .. } => format!("{}[]", component.erased()),
            TypeKind::Variable { bound, .. } => {
                bound.clone().unwrap_or_else(|| "java.lang.Object".to_string())
            }
            TypeKind::Wildcard => "java.lang.Object".to_string(),
        }
    }

    /// Structural equality modulo generic-argument whitespace and consistent
    /// per-member type-variable renaming
    ///
    /// `renames` accumulates the old-name to new-name variable mapping across
    /// all type occurrences of one member, so `<T> T id(T)` matched against
    /// `<U> U id(U)` compares equal, while `<T> T first(T, T)` against
    /// `<U> U first(U, V)` does not.
    pub fn structurally_equal(&self, other: &TypeItem, renames: &mut HashMap<String, String>) -> bool {
        match (&self.kind, &other.kind) {
            (TypeKind::Primitive(a), TypeKind::Primitive(b)) => a == b,
            (
                TypeKind::ClassRef { name: a, args: aa },
                TypeKind::ClassRef { name: b, args: ba },
            ) => {
                a == b
                    && aa.len() == ba.len()
                    && aa
                        .iter()
                        .zip(ba.iter())
                        .all(|(x, y)| x.structurally_equal(y, renames))
            }
            (
                TypeKind::Array { component: a, .. },
                TypeKind::Array { component: b, .. },
            ) => a.structurally_equal(b, renames),
            (
                TypeKind::Variable { name: a, bound: ab },
                TypeKind::Variable { name: b, bound: bb },
            ) => {
                if ab != bb {
                    return false;
                }
                match renames.get(a) {
                    Some(mapped) => mapped == b,
                    None => {
                        renames.insert(a.clone(), b.clone());
                        true
                    }
                }
            }
            (TypeKind::Wildcard, TypeKind::Wildcard) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TypeItem {
    /// Canonical spelling: no whitespace inside generic arguments, variables
    /// rendered with their bound the way report messages expect
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::Primitive(name) => write!(f, "{name}"),
            TypeKind::ClassRef { name, args } => {
                write!(f, "{name}")?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ",")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            TypeKind::Array { component, varargs } => {
                write!(f, "{component}{}", if *varargs { "..." } else { "[]" })
            }
            TypeKind::Variable { name, bound } => match bound {
                Some(bound) => write!(f, "{name} (extends {bound})"),
                None => write!(f, "{name}"),
            },
            TypeKind::Wildcard => write!(f, "?"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(name: &str, bound: Option<&str>) -> TypeItem {
        TypeItem::new(TypeKind::Variable {
            name: name.to_string(),
            bound: bound.map(str::to_string),
        })
    }

    #[test]
    fn erasure_drops_generic_arguments() {
        let list = TypeItem::new(TypeKind::ClassRef {
            name: "java.util.List".to_string(),
            args: vec![TypeItem::class_ref("java.lang.String")],
        });
        assert_eq!(list.erased(), "java.util.List");
    }

    #[test]
    fn erasure_of_type_variable_uses_bound() {
        assert_eq!(
            variable("T", Some("java.lang.Number")).erased(),
            "java.lang.Number"
        );
        assert_eq!(variable("T", None).erased(), "java.lang.Object");
    }

    #[test]
    fn varargs_erases_like_array() {
        let varargs = TypeItem::new(TypeKind::Array {
            component: Box::new(TypeItem::class_ref("java.lang.String")),
            varargs: true,
        });
        let array = TypeItem::new(TypeKind::Array {
            component: Box::new(TypeItem::class_ref("java.lang.String")),
            varargs: false,
        });
        assert_eq!(varargs.erased(), array.erased());
    }

    #[test]
    fn consistent_variable_renaming_is_equal() {
        let mut renames = HashMap::new();
        assert!(variable("T", None).structurally_equal(&variable("U", None), &mut renames));
        // Same mapping again is fine
        assert!(variable("T", None).structurally_equal(&variable("U", None), &mut renames));
        // T is already mapped to U, so T = V is inconsistent
        assert!(!variable("T", None).structurally_equal(&variable("V", None), &mut renames));
    }

    #[test]
    fn renaming_does_not_cross_bounds() {
        let mut renames = HashMap::new();
        assert!(!variable("T", Some("java.lang.Number"))
            .structurally_equal(&variable("T", Some("java.lang.Float")), &mut renames));
    }

    #[test]
    fn nullability_is_not_structural() {
        let mut renames = HashMap::new();
        let a = TypeItem::class_ref("java.lang.String").with_nullability(Nullability::Nullable);
        let b = TypeItem::class_ref("java.lang.String").with_nullability(Nullability::NonNull);
        assert!(a.structurally_equal(&b, &mut renames));
    }
}
