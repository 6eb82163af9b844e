//! Inheritance-aware effective-member resolution
//!
//! The comparator never walks class hierarchies itself; it asks the
//! [`InheritanceResolver`] for a class's *effective member surface*: the
//! members the class exposes to callers once superclass inheritance,
//! promotion through hidden ancestors, and interface defaults are resolved.
//!
//! Results are memoized per class in a [`DashMap`] with compute-once
//! semantics under concurrent access: the first caller computes and
//! publishes, later callers (including rayon workers comparing other
//! classes) reuse the published surface.

use crate::error::ApiVetError;
use crate::model::{ClassItem, Codebase, MemberItem, MemberKey, MemberKind, Visibility};
use crate::result::Result;
use dashmap::DashMap;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::trace;

/// A member of a class's effective surface and the class it is attributed to
///
/// For members promoted out of a hidden ancestor, `declaring_class` is the
/// nearest API-visible descendant, not the hidden declarer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveMember {
    pub member: MemberItem,
    pub declaring_class: String,
}

/// Memoizing resolver over one codebase
pub struct InheritanceResolver<'a> {
    codebase: &'a Codebase,
    cache: DashMap<String, Arc<Vec<EffectiveMember>>>,
}

impl<'a> InheritanceResolver<'a> {
    pub fn new(codebase: &'a Codebase) -> Self {
        Self {
            codebase,
            cache: DashMap::new(),
        }
    }

    /// The codebase this resolver reads from
    pub fn codebase(&self) -> &Codebase {
        self.codebase
    }

    /// Effective member surface of a class, most-derived declaration first
    ///
    /// On a key collision the most-derived declaration wins. Inheritance
    /// cycles abort the run with a fatal structural error.
    pub fn effective_members(&self, class_name: &str) -> Result<Arc<Vec<EffectiveMember>>> {
        if let Some(cached) = self.cache.get(class_name) {
            return Ok(Arc::clone(&cached));
        }
        let computed = Arc::new(self.compute_surface(class_name)?);
        // Publish once; a concurrent first caller's value wins for everyone
        let entry = self
            .cache
            .entry(class_name.to_string())
            .or_insert_with(|| Arc::clone(&computed));
        Ok(Arc::clone(&entry))
    }

    /// Nearest API-visible ancestor of `class`, skipping hidden superclasses
    ///
    /// A superclass declared in the codebase below Protected visibility is
    /// hidden; one not declared at all is treated as visible external API.
    pub fn nearest_visible_ancestor(&self, class: &ClassItem) -> Option<String> {
        let mut seen = HashSet::new();
        let mut current = class.super_class.clone();
        while let Some(name) = current {
            if !seen.insert(name.clone()) {
                return None;
            }
            match self.codebase.find_class(&name) {
                Some(declared) if !declared.is_api_visible() => {
                    current = declared.super_class.clone();
                }
                _ => return Some(name),
            }
        }
        None
    }

    /// Whether the class exposes no usable constructor
    ///
    /// Final-ness of the contract does not require an explicit modifier: a
    /// class nobody can instantiate cannot be subclassed either, so the
    /// comparator treats it as effectively final.
    pub fn is_uninstantiable(&self, class_name: &str) -> Result<bool> {
        let surface = self.effective_members(class_name)?;
        Ok(!surface.iter().any(|em| {
            em.member.kind == MemberKind::Constructor
                && em.member.modifiers.visibility >= Visibility::Protected
        }))
    }

    /// Whether members of this class are final as far as callers can tell
    pub fn is_effectively_final(&self, class: &ClassItem) -> Result<bool> {
        if class.modifiers.is_final {
            return Ok(true);
        }
        self.is_uninstantiable(&class.qualified_name)
    }

    fn compute_surface(&self, class_name: &str) -> Result<Vec<EffectiveMember>> {
        let mut surface: IndexMap<MemberKey, EffectiveMember> = IndexMap::new();
        let mut interfaces: Vec<String> = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut chain: Vec<String> = Vec::new();

        // Nearest visible class on the path so far, the promotion target for
        // members declared in hidden ancestors
        let mut promotion_target: Option<String> = None;
        let mut current = Some(class_name.to_string());

        while let Some(name) = current {
            if !visited.insert(name.clone()) {
                chain.push(name);
                return Err(ApiVetError::inheritance_cycle(chain));
            }
            chain.push(name.clone());

            let Some(class) = self.codebase.find_class(&name) else {
                // Referenced but undeclared ancestor: nothing to promote
                break;
            };
            if class.is_api_visible() && promotion_target.is_none() {
                promotion_target = Some(name.clone());
            }
            let attributed_to = if class.is_api_visible() {
                name.clone()
            } else {
                promotion_target.clone().unwrap_or_else(|| name.clone())
            };
            for member in &class.members {
                surface.entry(member.key()).or_insert_with(|| EffectiveMember {
                    member: member.clone(),
                    declaring_class: attributed_to.clone(),
                });
            }
            interfaces.extend(class.interfaces.iter().cloned());
            current = class.super_class.clone();
        }

        // Merge in abstract/default methods from all implemented interfaces,
        // including interfaces of ancestors and superinterfaces, that have no
        // override already recorded
        let mut iface_seen: HashSet<String> = HashSet::new();
        while let Some(iface_name) = interfaces.pop() {
            if !iface_seen.insert(iface_name.clone()) {
                continue;
            }
            let Some(iface) = self.codebase.find_class(&iface_name) else {
                continue;
            };
            for member in &iface.members {
                if member.kind != MemberKind::Method {
                    continue;
                }
                surface.entry(member.key()).or_insert_with(|| EffectiveMember {
                    member: member.clone(),
                    declaring_class: iface_name.clone(),
                });
            }
            interfaces.extend(iface.interfaces.iter().cloned());
            if let Some(parent) = &iface.super_class {
                interfaces.push(parent.clone());
            }
        }

        trace!(
            class = class_name,
            members = surface.len(),
            "effective surface computed"
        );
        Ok(surface.into_values().collect())
    }
}
