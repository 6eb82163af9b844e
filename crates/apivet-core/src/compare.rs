//! Structural comparison of two API surfaces
//!
//! [`ApiComparator::compare`] walks every entity present in the old surface
//! (after the optional base overlay is merged in) and emits a raw [`Issue`]
//! for each incompatible difference. Additions-only differences never
//! produce issues: anything present only in the new surface is compatible.
//!
//! Per-class comparisons are independent given the memoized effective-member
//! surfaces, so they fan out across rayon workers; collection preserves the
//! declaration order of the old codebase, keeping the issue stream
//! deterministic.

use crate::issues::{Issue, IssueKind};
use crate::model::{ClassItem, ClassKind, Codebase, MemberItem, MemberKind, Nullability};
use crate::resolver::{EffectiveMember, InheritanceResolver};
use crate::result::Result;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Merge the base overlay into the old surface
///
/// The base overlay represents the parts of a partial/incremental surface
/// that were not re-declared in `old`; on a qualified-name collision the
/// `old` declaration wins. The merged codebase keeps the old surface's
/// label and signature format version.
pub fn merge_base(old: &Codebase, base: &Codebase) -> Codebase {
    let mut merged = Codebase::new(old.label());
    merged.set_format(old.format());
    for class in old.classes() {
        // Uniqueness was already validated per input codebase
        let _ = merged.add_class(class.clone());
    }
    for class in base.classes() {
        if merged.find_class(&class.qualified_name).is_none() {
            let _ = merged.add_class(class.clone());
        }
    }
    merged
}

/// Pairwise comparator over two validated codebases
pub struct ApiComparator<'a> {
    old: InheritanceResolver<'a>,
    new: InheritanceResolver<'a>,
}

impl<'a> ApiComparator<'a> {
    pub fn new(old: &'a Codebase, new: &'a Codebase) -> Self {
        Self {
            old: InheritanceResolver::new(old),
            new: InheritanceResolver::new(new),
        }
    }

    /// Compare the surfaces and return the raw issue stream in old-surface order
    pub fn compare(&self) -> Result<Vec<Issue>> {
        let old_codebase = self.old.codebase();
        let new_codebase = self.new.codebase();

        let mut issues = Vec::new();
        let mut jobs: Vec<&ClassItem> = Vec::new();

        for package in old_codebase.packages() {
            if new_codebase.find_package(&package.name).is_none() {
                issues.push(Issue::new(
                    IssueKind::RemovedPackage,
                    package.name.clone(),
                    format!("Removed package {}", package.name),
                ));
                continue;
            }
            for class_name in &package.classes {
                if let Some(class) = old_codebase.find_class(class_name) {
                    if class.is_api_visible() {
                        jobs.push(class);
                    }
                }
            }
        }

        let per_class: Result<Vec<Vec<Issue>>> = jobs
            .par_iter()
            .map(|old_class| self.check_class(old_class))
            .collect();
        for class_issues in per_class? {
            issues.extend(class_issues);
        }

        debug!(
            old_classes = old_codebase.len(),
            new_classes = new_codebase.len(),
            issues = issues.len(),
            "comparison finished"
        );
        Ok(issues)
    }

    fn check_class(&self, old_class: &ClassItem) -> Result<Vec<Issue>> {
        match self.new.codebase().find_class(&old_class.qualified_name) {
            Some(new_class) => self.compare_class(old_class, new_class),
            None => Ok(self.removed_class(old_class)?.into_iter().collect()),
        }
    }

    /// Class absent from the new surface: removal, unless its members remain
    /// reachable through inheritance promotion from a still-present subclass
    fn removed_class(&self, old_class: &ClassItem) -> Result<Option<Issue>> {
        if self.reachable_through_subclass(old_class)? {
            return Ok(None);
        }
        let issue = if old_class.is_deprecated() {
            Issue::new(
                IssueKind::RemovedDeprecatedClass,
                old_class.qualified_name.clone(),
                format!("Removed deprecated class {}", old_class.qualified_name),
            )
        } else {
            Issue::new(
                IssueKind::RemovedClass,
                old_class.qualified_name.clone(),
                format!("Removed class {}", old_class.qualified_name),
            )
        };
        Ok(Some(issue))
    }

    fn reachable_through_subclass(&self, old_class: &ClassItem) -> Result<bool> {
        let wanted: Vec<_> = old_class
            .members
            .iter()
            .filter(|m| m.modifiers.is_api_visible())
            .map(MemberItem::key)
            .collect();
        for candidate in self.old.codebase().classes() {
            if candidate.qualified_name == old_class.qualified_name {
                continue;
            }
            if !self.has_ancestor(self.old.codebase(), candidate, &old_class.qualified_name) {
                continue;
            }
            if self
                .new
                .codebase()
                .find_class(&candidate.qualified_name)
                .is_none()
            {
                continue;
            }
            let surface = self.new.effective_members(&candidate.qualified_name)?;
            let keys: HashSet<_> = surface.iter().map(|em| em.member.key()).collect();
            if wanted.iter().all(|key| keys.contains(key)) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn has_ancestor(&self, codebase: &Codebase, class: &ClassItem, ancestor: &str) -> bool {
        let mut seen = HashSet::new();
        let mut current = class.super_class.clone();
        while let Some(name) = current {
            if name == ancestor {
                return true;
            }
            if !seen.insert(name.clone()) {
                return false;
            }
            current = codebase
                .find_class(&name)
                .and_then(|c| c.super_class.clone());
        }
        false
    }

    fn compare_class(&self, old_class: &ClassItem, new_class: &ClassItem) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();
        let name = &old_class.qualified_name;

        if old_class.kind != new_class.kind {
            issues.push(Issue::new(
                IssueKind::ChangedClass,
                name.clone(),
                format!("Class {name} changed class/interface declaration"),
            ));
        }

        let old_mods = &old_class.modifiers;
        let new_mods = &new_class.modifiers;

        if new_mods.visibility < old_mods.visibility {
            issues.push(Issue::new(
                IssueKind::ChangedScope,
                name.clone(),
                format!(
                    "Class {name} changed visibility from {} to {}",
                    old_mods.visibility, new_mods.visibility
                ),
            ));
        }

        if old_mods.is_abstract != new_mods.is_abstract
            && old_class.kind == ClassKind::Class
            && new_class.kind == ClassKind::Class
        {
            issues.push(Issue::new(
                IssueKind::ChangedAbstract,
                name.clone(),
                format!("Class {name} changed 'abstract' qualifier"),
            ));
        }

        if old_mods.is_static != new_mods.is_static {
            issues.push(Issue::new(
                IssueKind::ChangedStatic,
                name.clone(),
                format!("Class {name} changed 'static' qualifier"),
            ));
        }

        // Becoming final inside an already-sealed type changes nothing for
        // callers, who could never extend it anyway
        if !old_mods.is_final && new_mods.is_final && !old_mods.is_sealed {
            if self.old.is_uninstantiable(name)? {
                issues.push(Issue::new(
                    IssueKind::AddedFinalUninstantiable,
                    name.clone(),
                    format!(
                        "Class {name} added final qualifier but was previously uninstantiable \
                         and therefore could not be subclassed"
                    ),
                ));
            } else {
                issues.push(Issue::new(
                    IssueKind::AddedFinal,
                    name.clone(),
                    format!("Class {name} added 'final' qualifier"),
                ));
            }
        }

        if !old_mods.is_sealed && new_mods.is_sealed {
            issues.push(Issue::new(
                IssueKind::AddedSealed,
                name.clone(),
                format!("Cannot add 'sealed' modifier to class {name}: Incompatible change"),
            ));
        }

        if old_mods.is_fun && !new_mods.is_fun {
            issues.push(Issue::new(
                IssueKind::FunRemoval,
                name.clone(),
                format!(
                    "Cannot remove 'fun' modifier from class {name}: source incompatible change"
                ),
            ));
        }

        if old_mods.is_deprecated != new_mods.is_deprecated {
            issues.push(Issue::new(
                IssueKind::ChangedDeprecated,
                name.clone(),
                format!(
                    "Class {name} has changed deprecation state {} --> {}",
                    old_mods.is_deprecated, new_mods.is_deprecated
                ),
            ));
        }

        // Superclass identity, judged against the nearest visible ancestor so
        // that hiding an intermediate base class is not itself a break
        let old_super = self.old.nearest_visible_ancestor(old_class);
        if let Some(expected) = &old_super {
            let actual = self.new.nearest_visible_ancestor(new_class);
            if actual.as_deref() != Some(expected) {
                issues.push(Issue::new(
                    IssueKind::ChangedSuperclass,
                    name.clone(),
                    format!(
                        "Class {name} superclass changed from {expected} to {}",
                        actual.as_deref().unwrap_or("java.lang.Object")
                    ),
                ));
            }
        }

        let new_interfaces = self.implemented_interfaces(&self.new, new_class);
        for iface in &old_class.interfaces {
            if let Some(declared) = self.old.codebase().find_class(iface) {
                if !declared.is_api_visible() {
                    continue;
                }
            }
            if !new_interfaces.contains(iface) {
                issues.push(Issue::new(
                    IssueKind::RemovedInterface,
                    name.clone(),
                    format!("Class {name} no longer implements {iface}"),
                ));
            }
        }

        let old_tp = old_class.type_parameters.len();
        let new_tp = new_class.type_parameters.len();
        if old_tp != new_tp && !(old_tp == 0 && new_tp == 1) {
            issues.push(Issue::new(
                IssueKind::ChangedType,
                name.clone(),
                format!("Class {name} changed number of type parameters from {old_tp} to {new_tp}"),
            ));
        }

        self.compare_members(old_class, new_class, &mut issues)?;
        Ok(issues)
    }

    /// Transitive closure of interfaces a class implements, following both
    /// the superclass chain and superinterfaces
    fn implemented_interfaces(
        &self,
        resolver: &InheritanceResolver<'_>,
        class: &ClassItem,
    ) -> HashSet<String> {
        let codebase = resolver.codebase();
        let mut result = HashSet::new();
        let mut classes = vec![class.qualified_name.clone()];
        let mut pending: Vec<String> = Vec::new();
        let mut seen_classes = HashSet::new();

        while let Some(class_name) = classes.pop() {
            if !seen_classes.insert(class_name.clone()) {
                continue;
            }
            let Some(item) = codebase.find_class(&class_name) else {
                continue;
            };
            pending.extend(item.interfaces.iter().cloned());
            if let Some(parent) = &item.super_class {
                classes.push(parent.clone());
            }
        }
        while let Some(iface) = pending.pop() {
            if !result.insert(iface.clone()) {
                continue;
            }
            if let Some(item) = codebase.find_class(&iface) {
                pending.extend(item.interfaces.iter().cloned());
            }
        }
        result
    }

    fn compare_members(
        &self,
        old_class: &ClassItem,
        new_class: &ClassItem,
        issues: &mut Vec<Issue>,
    ) -> Result<()> {
        let class_name = &old_class.qualified_name;
        let old_surface = self.old.effective_members(class_name)?;
        let new_surface = self.new.effective_members(class_name)?;
        let new_by_key: HashMap<_, &EffectiveMember> = new_surface
            .iter()
            .map(|em| (em.member.key(), em))
            .collect();

        for old_em in old_surface.iter() {
            if !old_em.member.modifiers.is_api_visible() {
                continue;
            }
            // Members inherited from a visible class are compared where they
            // are declared; re-checking them here would duplicate every
            // finding once per subclass
            let foreign = old_em.declaring_class != *class_name
                && self
                    .old
                    .codebase()
                    .find_class(&old_em.declaring_class)
                    .is_some_and(|c| c.is_api_visible());
            if foreign {
                continue;
            }
            match new_by_key.get(&old_em.member.key()) {
                Some(new_em) => {
                    self.compare_member_pair(old_class, &old_em.member, &new_em.member, issues)?;
                }
                None => issues.push(self.removed_member(class_name, &old_em.member)),
            }
        }

        // New abstract requirements on types that outside code can still
        // extend or implement are the only addition that can break anyone
        let old_keys: HashSet<_> = old_surface.iter().map(|em| em.member.key()).collect();
        for new_em in new_surface.iter() {
            if old_keys.contains(&new_em.member.key()) {
                continue;
            }
            let foreign = new_em.declaring_class != *class_name
                && self.old.codebase().find_class(&new_em.declaring_class).is_some();
            if foreign {
                // Reported where the declaring class is itself compared
                continue;
            }
            if let Some(issue) = self.added_abstract_method(new_class, &new_em.member)? {
                issues.push(issue);
            }
        }
        Ok(())
    }

    fn removed_member(&self, class_name: &str, member: &MemberItem) -> Issue {
        let signature = member.signature_in(class_name);
        let deprecated = member.modifiers.is_deprecated;
        let (kind, noun) = match (member.kind, deprecated) {
            (MemberKind::Field, false) => (IssueKind::RemovedField, "field"),
            (MemberKind::Field, true) => (IssueKind::RemovedDeprecatedField, "deprecated field"),
            (MemberKind::Method, false) => (IssueKind::RemovedMethod, "method"),
            (MemberKind::Method, true) => (IssueKind::RemovedDeprecatedMethod, "deprecated method"),
            (MemberKind::Constructor, false) => (IssueKind::RemovedConstructor, "constructor"),
            (MemberKind::Constructor, true) => {
                (IssueKind::RemovedDeprecatedMethod, "deprecated constructor")
            }
        };
        Issue::new(kind, signature.clone(), format!("Removed {noun} {signature}"))
    }

    fn added_abstract_method(
        &self,
        new_class: &ClassItem,
        member: &MemberItem,
    ) -> Result<Option<Issue>> {
        if member.kind != MemberKind::Method || !member.modifiers.is_api_visible() {
            return Ok(None);
        }
        let requires_implementation = match new_class.kind {
            ClassKind::Interface => {
                !member.modifiers.is_default && !member.modifiers.is_static
            }
            ClassKind::Class => member.modifiers.is_abstract,
            ClassKind::Enum | ClassKind::Annotation => false,
        };
        if !requires_implementation {
            return Ok(None);
        }
        // Sealed and otherwise closed types cannot be extended outside the
        // library, so nobody inherits the new obligation
        if new_class.modifiers.is_sealed {
            return Ok(None);
        }
        if new_class.kind == ClassKind::Class
            && self.new.is_effectively_final(new_class)?
        {
            return Ok(None);
        }
        let signature = member.signature_in(&new_class.qualified_name);
        Ok(Some(Issue::new(
            IssueKind::AddedAbstractMethod,
            signature.clone(),
            format!("Added method {signature}"),
        )))
    }

    fn compare_member_pair(
        &self,
        old_class: &ClassItem,
        old: &MemberItem,
        new: &MemberItem,
        issues: &mut Vec<Issue>,
    ) -> Result<()> {
        let class_name = &old_class.qualified_name;
        let location = old.signature_in(class_name);
        let desc = qualifier_desc(old, class_name);

        if new.modifiers.visibility < old.modifiers.visibility {
            issues.push(Issue::new(
                IssueKind::ChangedScope,
                location.clone(),
                format!(
                    "{desc} changed visibility from {} to {}",
                    old.modifiers.visibility, new.modifiers.visibility
                ),
            ));
        }

        if old.modifiers.is_static != new.modifiers.is_static {
            issues.push(Issue::new(
                IssueKind::ChangedStatic,
                location.clone(),
                format!("{desc} has changed 'static' qualifier"),
            ));
        }

        if !old.modifiers.is_final && new.modifiers.is_final {
            if !self.old.is_effectively_final(old_class)? {
                issues.push(Issue::new(
                    IssueKind::AddedFinal,
                    location.clone(),
                    format!("{desc} has added 'final' qualifier"),
                ));
            }
        } else if old.modifiers.is_final && !new.modifiers.is_final {
            issues.push(Issue::new(
                IssueKind::RemovedFinal,
                location.clone(),
                format!("{desc} has removed 'final' qualifier"),
            ));
        }

        if old.modifiers.is_deprecated != new.modifiers.is_deprecated {
            issues.push(Issue::new(
                IssueKind::ChangedDeprecated,
                location.clone(),
                format!(
                    "{desc} has changed deprecation state {} --> {}",
                    old.modifiers.is_deprecated, new.modifiers.is_deprecated
                ),
            ));
        }

        match old.kind {
            MemberKind::Method | MemberKind::Constructor => {
                self.compare_callable(old_class, old, new, &location, &desc, issues)?;
            }
            MemberKind::Field => {
                self.compare_field(class_name, old, new, &location, &desc, issues);
            }
        }
        Ok(())
    }

    fn compare_callable(
        &self,
        old_class: &ClassItem,
        old: &MemberItem,
        new: &MemberItem,
        location: &str,
        desc: &str,
        issues: &mut Vec<Issue>,
    ) -> Result<()> {
        let class_name = &old_class.qualified_name;

        if old.modifiers.is_abstract != new.modifiers.is_abstract {
            issues.push(Issue::new(
                IssueKind::ChangedAbstract,
                location.to_string(),
                format!("{desc} has changed 'abstract' qualifier"),
            ));
        }

        if old.modifiers.is_default != new.modifiers.is_default {
            issues.push(Issue::new(
                IssueKind::ChangedDefault,
                location.to_string(),
                format!("{desc} has changed 'default' qualifier"),
            ));
        }

        if old.modifiers.is_infix && !new.modifiers.is_infix {
            issues.push(Issue::new(
                IssueKind::InfixRemoval,
                location.to_string(),
                format!(
                    "Cannot remove `infix` modifier from method {location}: Incompatible change"
                ),
            ));
        }

        if old.modifiers.is_operator && !new.modifiers.is_operator {
            issues.push(Issue::new(
                IssueKind::OperatorRemoval,
                location.to_string(),
                format!(
                    "Cannot remove `operator` modifier from method {location}: Incompatible change"
                ),
            ));
        }

        for (old_tp, new_tp) in old.type_parameters.iter().zip(new.type_parameters.iter()) {
            if !old_tp.is_reified && new_tp.is_reified {
                issues.push(Issue::new(
                    IssueKind::AddedReified,
                    location.to_string(),
                    format!(
                        "Method {class_name}.{} made type variable {} reified: incompatible change",
                        old.name, new_tp.name
                    ),
                ));
            }
        }

        // One rename map per member: parameter positions pin the old-to-new
        // type-variable mapping the return type must then agree with
        let mut renames = HashMap::new();
        for (index, (old_param, new_param)) in
            old.parameters.iter().zip(new.parameters.iter()).enumerate()
        {
            old_param.ty.structurally_equal(&new_param.ty, &mut renames);
            let param_name = old_param
                .name
                .clone()
                .or_else(|| new_param.name.clone())
                .unwrap_or_else(|| format!("arg{}", index + 1));
            let described = old.described_signature_in(class_name);

            if let Some(old_name) = &old_param.name {
                match &new_param.name {
                    None => issues.push(Issue::new(
                        IssueKind::ParameterNameChange,
                        location.to_string(),
                        format!(
                            "Attempted to remove parameter name from parameter {old_name} in {described}"
                        ),
                    )),
                    Some(new_name) if new_name != old_name => issues.push(Issue::new(
                        IssueKind::ParameterNameChange,
                        location.to_string(),
                        format!(
                            "Attempted to change parameter name from {old_name} to {new_name} in method {class_name}.{}",
                            old.name
                        ),
                    )),
                    Some(_) => {}
                }
            }

            if old_param.has_default && !new_param.has_default {
                issues.push(Issue::new(
                    IssueKind::DefaultValueChange,
                    location.to_string(),
                    format!(
                        "Attempted to remove default value from parameter {param_name} in {class_name}.{}",
                        old.name
                    ),
                ));
            }

            if old_param.ty.is_varargs() && new_param.ty.is_array() && !new_param.ty.is_varargs() {
                issues.push(Issue::new(
                    IssueKind::VarargRemoval,
                    location.to_string(),
                    format!(
                        "Changing from varargs to array is an incompatible change: parameter {param_name} in {described}"
                    ),
                ));
            }

            if let Some(message) = nullability_change(
                old_param.ty.nullability,
                new_param.ty.nullability,
                NullabilityContext::Parameter,
                &format!("parameter {param_name} in {described}"),
            ) {
                issues.push(Issue::new(
                    IssueKind::InvalidNullConversion,
                    location.to_string(),
                    message,
                ));
            }
        }

        if let (Some(old_ty), Some(new_ty)) = (&old.ty, &new.ty) {
            if !old_ty.structurally_equal(new_ty, &mut renames) {
                issues.push(Issue::new(
                    IssueKind::ChangedType,
                    location.to_string(),
                    format!(
                        "Method {class_name}.{} has changed return type from {old_ty} to {new_ty}",
                        old.name
                    ),
                ));
            }
            if let Some(message) = nullability_change(
                old_ty.nullability,
                new_ty.nullability,
                NullabilityContext::Return,
                &format!("method {location}"),
            ) {
                issues.push(Issue::new(
                    IssueKind::InvalidNullConversion,
                    location.to_string(),
                    message,
                ));
            }
        }

        // Exceptions no longer thrown are compatible; only additions break callers
        let old_throws: HashSet<&String> = old.throws.iter().collect();
        for exception in &new.throws {
            if !old_throws.contains(exception) {
                issues.push(Issue::new(
                    IssueKind::ChangedThrows,
                    location.to_string(),
                    format!("{desc} added thrown exception {exception}"),
                ));
            }
        }

        // Annotation element defaults: weakening or dropping the default
        // forces existing annotation uses to spell the value out
        if old_class.is_annotation() {
            let changed = match (&old.value, &new.value) {
                (Some(old_value), Some(new_value)) => old_value != new_value,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if changed {
                issues.push(
                    Issue::new(
                        IssueKind::ChangedValue,
                        location.to_string(),
                        format!(
                            "Method {class_name}.{} has changed value from {} to {}",
                            old.name,
                            render_value(&old.value),
                            render_value(&new.value)
                        ),
                    )
                    .with_values(render_value(&old.value), render_value(&new.value)),
                );
            }
        }
        Ok(())
    }

    fn compare_field(
        &self,
        class_name: &str,
        old: &MemberItem,
        new: &MemberItem,
        location: &str,
        desc: &str,
        issues: &mut Vec<Issue>,
    ) {
        if old.modifiers.is_volatile != new.modifiers.is_volatile {
            issues.push(Issue::new(
                IssueKind::ChangedVolatile,
                location.to_string(),
                format!("{desc} has changed 'volatile' qualifier"),
            ));
        }

        if old.modifiers.is_transient != new.modifiers.is_transient {
            issues.push(Issue::new(
                IssueKind::ChangedTransient,
                location.to_string(),
                format!("{desc} has changed 'transient' qualifier"),
            ));
        }

        if let (Some(old_ty), Some(new_ty)) = (&old.ty, &new.ty) {
            let mut renames = HashMap::new();
            if !old_ty.structurally_equal(new_ty, &mut renames) {
                issues.push(Issue::new(
                    IssueKind::ChangedType,
                    location.to_string(),
                    format!(
                        "Field {class_name}.{} has changed type from {old_ty} to {new_ty}",
                        old.name
                    ),
                ));
            }
            if let Some(message) = nullability_change(
                old_ty.nullability,
                new_ty.nullability,
                NullabilityContext::Return,
                &format!("field {location}"),
            ) {
                issues.push(Issue::new(
                    IssueKind::InvalidNullConversion,
                    location.to_string(),
                    message,
                ));
            }
        }

        if old.value != new.value {
            issues.push(
                Issue::new(
                    IssueKind::ChangedValue,
                    location.to_string(),
                    format!(
                        "Field {class_name}.{} has changed value from {} to {}",
                        old.name,
                        render_value(&old.value),
                        render_value(&new.value)
                    ),
                )
                .with_values(render_value(&old.value), render_value(&new.value)),
            );
        }
    }
}

fn render_value(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "nothing".to_string())
}

fn qualifier_desc(member: &MemberItem, class_name: &str) -> String {
    match member.kind {
        MemberKind::Field => format!("Field {class_name}.{}", member.name),
        MemberKind::Method => format!("Method {class_name}.{}", member.name),
        MemberKind::Constructor => format!("Constructor {class_name}"),
    }
}

enum NullabilityContext {
    Parameter,
    Return,
}

/// Judge a nullability transition against the three-state lattice
///
/// Parameters may weaken what callers must pass (NonNull to Nullable is
/// fine), returns and fields may strengthen what callers receive (Nullable
/// to NonNull is fine); every other declared-to-declared flip and every
/// declared-to-Unknown erasure is incompatible. Transitions out of Unknown
/// are always compatible.
fn nullability_change(
    old: Nullability,
    new: Nullability,
    context: NullabilityContext,
    subject: &str,
) -> Option<String> {
    use Nullability::*;
    if old == new || old == Unknown {
        return None;
    }
    match (old, new, context) {
        (NonNull, Nullable, NullabilityContext::Parameter) => None,
        (Nullable, NonNull, NullabilityContext::Return) => None,
        (Nullable, NonNull, NullabilityContext::Parameter) => Some(format!(
            "Attempted to change parameter from @Nullable to @NonNull: incompatible change for {subject}"
        )),
        (NonNull, Nullable, NullabilityContext::Return) => Some(format!(
            "Attempted to change method return from @NonNull to @Nullable: incompatible change for {subject}"
        )),
        (annotation, Unknown, _) => Some(format!(
            "Attempted to remove {annotation} annotation from {subject}"
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Parameter, TypeItem, TypeParameter, Visibility};

    fn codebase(label: &str, classes: Vec<ClassItem>) -> Codebase {
        let mut codebase = Codebase::new(label);
        for class in classes {
            codebase.add_class(class).unwrap();
        }
        codebase
    }

    fn compare(old: &Codebase, new: &Codebase) -> Vec<Issue> {
        ApiComparator::new(old, new).compare().unwrap()
    }

    fn kinds(issues: &[Issue]) -> Vec<IssueKind> {
        issues.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn identical_codebases_yield_no_issues() {
        let mut class = ClassItem::new("test.pkg.Foo", ClassKind::Class);
        class.members.push(MemberItem::constructor("Foo"));
        class
            .members
            .push(MemberItem::field("x", TypeItem::primitive("int")));
        let old = codebase("old", vec![class.clone()]);
        let new = codebase("new", vec![class]);
        assert!(compare(&old, &new).is_empty());
    }

    #[test]
    fn additions_are_always_compatible() {
        let class = ClassItem::new("test.pkg.Foo", ClassKind::Class);
        let old = codebase("old", vec![class.clone()]);
        let mut grown = class;
        grown
            .members
            .push(MemberItem::field("added", TypeItem::primitive("int")));
        let new = codebase(
            "new",
            vec![grown, ClassItem::new("test.pkg.Added", ClassKind::Class)],
        );
        assert!(compare(&old, &new).is_empty());
    }

    #[test]
    fn removed_package_is_one_issue() {
        let old = codebase(
            "old",
            vec![
                ClassItem::new("test.pkg.Foo", ClassKind::Class),
                ClassItem::new("gone.pkg.Bar", ClassKind::Class),
            ],
        );
        let new = codebase("new", vec![ClassItem::new("test.pkg.Foo", ClassKind::Class)]);
        let issues = compare(&old, &new);
        assert_eq!(kinds(&issues), vec![IssueKind::RemovedPackage]);
        assert_eq!(issues[0].location, "gone.pkg");
    }

    #[test]
    fn removed_deprecated_class_uses_deprecated_kind() {
        let mut deprecated = ClassItem::new("test.pkg.Old", ClassKind::Class);
        deprecated.modifiers.is_deprecated = true;
        let old = codebase(
            "old",
            vec![deprecated, ClassItem::new("test.pkg.Keep", ClassKind::Class)],
        );
        let new = codebase("new", vec![ClassItem::new("test.pkg.Keep", ClassKind::Class)]);
        let issues = compare(&old, &new);
        assert_eq!(kinds(&issues), vec![IssueKind::RemovedDeprecatedClass]);
        assert_eq!(
            issues[0].message,
            "Removed deprecated class test.pkg.Old"
        );
    }

    #[test]
    fn emptied_package_reports_class_removals_not_package_removal() {
        let mut deprecated = ClassItem::new("test.pkg.Old", ClassKind::Class);
        deprecated.modifiers.is_deprecated = true;
        let old = codebase("old", vec![deprecated]);

        // The package survives with no classes left in it
        let mut new = Codebase::new("new");
        new.add_package("test.pkg");

        let issues = compare(&old, &new);
        assert_eq!(kinds(&issues), vec![IssueKind::RemovedDeprecatedClass]);
    }

    #[test]
    fn class_kind_change_is_incompatible_both_ways() {
        let old = codebase(
            "old",
            vec![
                ClassItem::new("test.pkg.A", ClassKind::Class),
                ClassItem::new("test.pkg.B", ClassKind::Interface),
            ],
        );
        let new = codebase(
            "new",
            vec![
                ClassItem::new("test.pkg.A", ClassKind::Interface),
                ClassItem::new("test.pkg.B", ClassKind::Class),
            ],
        );
        assert_eq!(
            kinds(&compare(&old, &new)),
            vec![IssueKind::ChangedClass, IssueKind::ChangedClass]
        );
    }

    #[test]
    fn visibility_may_only_widen() {
        let mut protected_class = ClassItem::new("test.pkg.Widens", ClassKind::Class);
        protected_class.modifiers.visibility = Visibility::Protected;
        let mut public_class = ClassItem::new("test.pkg.Narrows", ClassKind::Class);
        public_class.modifiers.visibility = Visibility::Public;
        let old = codebase("old", vec![protected_class.clone(), public_class.clone()]);

        let mut widened = protected_class;
        widened.modifiers.visibility = Visibility::Public;
        let mut narrowed = public_class;
        narrowed.modifiers.visibility = Visibility::Protected;
        let new = codebase("new", vec![widened, narrowed]);

        let issues = compare(&old, &new);
        assert_eq!(kinds(&issues), vec![IssueKind::ChangedScope]);
        assert_eq!(
            issues[0].message,
            "Class test.pkg.Narrows changed visibility from public to protected"
        );
    }

    #[test]
    fn field_scope_narrowing_reports_on_the_field() {
        let mut class = ClassItem::new("test.pkg.Foo", ClassKind::Class);
        class
            .members
            .push(MemberItem::field("x", TypeItem::primitive("int")));
        let old = codebase("old", vec![class.clone()]);
        let mut narrowed = class;
        narrowed.members[0].modifiers.visibility = Visibility::Protected;
        let new = codebase("new", vec![narrowed]);

        let issues = compare(&old, &new);
        assert_eq!(kinds(&issues), vec![IssueKind::ChangedScope]);
        assert_eq!(issues[0].location, "test.pkg.Foo.x");
        assert_eq!(
            issues[0].message,
            "Field test.pkg.Foo.x changed visibility from public to protected"
        );
    }

    #[test]
    fn added_final_softens_for_uninstantiable_class() {
        let mut open = ClassItem::new("test.pkg.Open", ClassKind::Class);
        open.members.push(MemberItem::constructor("Open"));
        let locked = ClassItem::new("test.pkg.Locked", ClassKind::Class);
        let old = codebase("old", vec![open.clone(), locked.clone()]);

        let mut open_final = open;
        open_final.modifiers.is_final = true;
        let mut locked_final = locked;
        locked_final.modifiers.is_final = true;
        let new = codebase("new", vec![open_final, locked_final]);

        assert_eq!(
            kinds(&compare(&old, &new)),
            vec![IssueKind::AddedFinal, IssueKind::AddedFinalUninstantiable]
        );
    }

    #[test]
    fn final_inside_sealed_type_is_allowed() {
        let mut sealed = ClassItem::new("test.pkg.Sealed", ClassKind::Class);
        sealed.modifiers.is_sealed = true;
        sealed.members.push(MemberItem::constructor("Sealed"));
        let old = codebase("old", vec![sealed.clone()]);
        let mut now_final = sealed;
        now_final.modifiers.is_final = true;
        let new = codebase("new", vec![now_final]);
        assert!(compare(&old, &new).is_empty());
    }

    #[test]
    fn removed_interface_is_flagged_and_moving_it_up_is_not() {
        let mut impl_class = ClassItem::new("test.pkg.Impl", ClassKind::Class);
        impl_class.interfaces.push("java.io.Closeable".to_string());
        let old = codebase("old", vec![impl_class.clone()]);

        // Moved up: interface now implemented by a declared parent
        let mut via_parent = impl_class.clone();
        via_parent.interfaces.clear();
        via_parent.super_class = Some("test.pkg.Parent".to_string());
        let mut parent = ClassItem::new("test.pkg.Parent", ClassKind::Class);
        parent.interfaces.push("java.io.Closeable".to_string());
        let new_ok = codebase("new", vec![via_parent, parent]);
        assert!(compare(&old, &new_ok).is_empty());

        let mut dropped = impl_class;
        dropped.interfaces.clear();
        let new_bad = codebase("new", vec![dropped]);
        let issues = compare(&old, &new_bad);
        assert_eq!(kinds(&issues), vec![IssueKind::RemovedInterface]);
        assert_eq!(
            issues[0].message,
            "Class test.pkg.Impl no longer implements java.io.Closeable"
        );
    }

    #[test]
    fn type_parameter_count_allows_zero_to_one() {
        let plain = ClassItem::new("test.pkg.Foo", ClassKind::Class);
        let old = codebase("old", vec![plain.clone()]);
        let mut generic = plain.clone();
        generic.type_parameters.push(TypeParameter::new("T"));
        let new = codebase("new", vec![generic.clone()]);
        assert!(compare(&old, &new).is_empty());

        let mut two = generic.clone();
        two.type_parameters.push(TypeParameter::new("U"));
        let old_generic = codebase("old", vec![generic]);
        let new_two = codebase("new", vec![two]);
        let issues = compare(&old_generic, &new_two);
        assert_eq!(kinds(&issues), vec![IssueKind::ChangedType]);
        assert_eq!(
            issues[0].message,
            "Class test.pkg.Foo changed number of type parameters from 1 to 2"
        );
    }

    #[test]
    fn removing_a_method_moved_to_parent_is_compatible() {
        let mut child = ClassItem::new("test.pkg.Child", ClassKind::Class);
        child.super_class = Some("test.pkg.Parent".to_string());
        let mut moved = MemberItem::method("m");
        moved.ty = Some(TypeItem::primitive("void"));
        child.members.push(moved.clone());
        let parent = ClassItem::new("test.pkg.Parent", ClassKind::Class);
        let old = codebase("old", vec![child.clone(), parent.clone()]);

        let mut new_child = child;
        new_child.members.clear();
        let mut new_parent = parent;
        new_parent.members.push(moved);
        let new = codebase("new", vec![new_child, new_parent]);
        assert!(compare(&old, &new).is_empty());
    }

    #[test]
    fn default_value_asymmetry() {
        let mut class = ClassItem::new("test.pkg.Foo", ClassKind::Class);
        let mut method = MemberItem::method("m");
        method
            .parameters
            .push(Parameter::named("s1", TypeItem::class_ref("String")));
        class.members.push(method);

        let mut with_default = class.clone();
        with_default.members[0].parameters[0].has_default = true;

        // Adding a default: no issues
        let old = codebase("old", vec![class.clone()]);
        let new = codebase("new", vec![with_default.clone()]);
        assert!(compare(&old, &new).is_empty());

        // Removing one: exactly one DefaultValueChange
        let old = codebase("old", vec![with_default]);
        let new = codebase("new", vec![class]);
        let issues = compare(&old, &new);
        assert_eq!(kinds(&issues), vec![IssueKind::DefaultValueChange]);
        assert_eq!(
            issues[0].message,
            "Attempted to remove default value from parameter s1 in test.pkg.Foo.m"
        );
    }

    #[test]
    fn same_erasure_parameter_generic_change_is_not_reported() {
        // Parameter types participate in the match key only through their
        // erasure; generic-argument changes on parameters are not flagged,
        // matching the reference behavior that reserves ChangedType for
        // return and field types
        let make = |arg: &str| {
            let mut class = ClassItem::new("test.pkg.Foo", ClassKind::Class);
            let mut m = MemberItem::method("m");
            let list = TypeItem::new(crate::model::TypeKind::ClassRef {
                name: "java.util.List".to_string(),
                args: vec![TypeItem::class_ref(arg)],
            });
            m.parameters.push(Parameter::named("items", list));
            m.ty = Some(TypeItem::primitive("void"));
            class.members.push(m);
            class
        };
        let old = codebase("old", vec![make("java.lang.String")]);
        let new = codebase("new", vec![make("java.lang.Integer")]);
        assert!(compare(&old, &new).is_empty());
    }

    #[test]
    fn vararg_to_array_is_flagged_one_way() {
        let varargs_ty = TypeItem::new(crate::model::TypeKind::Array {
            component: Box::new(TypeItem::class_ref("java.lang.String")),
            varargs: true,
        });
        let array_ty = TypeItem::new(crate::model::TypeKind::Array {
            component: Box::new(TypeItem::class_ref("java.lang.String")),
            varargs: false,
        });
        let mut with_varargs = ClassItem::new("test.pkg.Foo", ClassKind::Class);
        let mut m = MemberItem::method("m");
        m.parameters.push(Parameter::named("x", varargs_ty));
        with_varargs.members.push(m);
        let mut with_array = with_varargs.clone();
        with_array.members[0].parameters[0].ty = array_ty;

        let issues = compare(
            &codebase("old", vec![with_varargs.clone()]),
            &codebase("new", vec![with_array.clone()]),
        );
        assert_eq!(kinds(&issues), vec![IssueKind::VarargRemoval]);

        let issues = compare(
            &codebase("old", vec![with_array]),
            &codebase("new", vec![with_varargs]),
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn parameter_nullability_matrix() {
        use Nullability::*;
        let cases = [
            (NonNull, NonNull, false),
            (NonNull, Nullable, false),
            (NonNull, Unknown, true),
            (Nullable, NonNull, true),
            (Nullable, Nullable, false),
            (Nullable, Unknown, true),
            (Unknown, NonNull, false),
            (Unknown, Nullable, false),
            (Unknown, Unknown, false),
        ];
        for (old_null, new_null, expect_issue) in cases {
            let result = nullability_change(
                old_null,
                new_null,
                NullabilityContext::Parameter,
                "parameter p in test.pkg.Foo.m(String p)",
            );
            assert_eq!(
                result.is_some(),
                expect_issue,
                "parameter {old_null:?} -> {new_null:?}"
            );
        }
    }

    #[test]
    fn return_nullability_matrix() {
        use Nullability::*;
        let cases = [
            (NonNull, NonNull, false),
            (NonNull, Nullable, true),
            (NonNull, Unknown, true),
            (Nullable, NonNull, false),
            (Nullable, Nullable, false),
            (Nullable, Unknown, true),
            (Unknown, NonNull, false),
            (Unknown, Nullable, false),
            (Unknown, Unknown, false),
        ];
        for (old_null, new_null, expect_issue) in cases {
            let result = nullability_change(
                old_null,
                new_null,
                NullabilityContext::Return,
                "method test.pkg.Foo.m()",
            );
            assert_eq!(
                result.is_some(),
                expect_issue,
                "return {old_null:?} -> {new_null:?}"
            );
        }
    }

    #[test]
    fn added_abstract_method_needs_a_body_or_a_closed_type() {
        let iface = ClassItem::new("test.pkg.Iface", ClassKind::Interface);
        let old = codebase("old", vec![iface.clone()]);

        let mut with_abstract = iface.clone();
        let mut m = MemberItem::method("m");
        m.ty = Some(TypeItem::primitive("void"));
        with_abstract.members.push(m.clone());
        let new = codebase("new", vec![with_abstract]);
        let issues = compare(&old, &new);
        assert_eq!(kinds(&issues), vec![IssueKind::AddedAbstractMethod]);
        assert_eq!(issues[0].message, "Added method test.pkg.Iface.m()");

        let mut with_default = iface.clone();
        let mut dm = m.clone();
        dm.modifiers.is_default = true;
        with_default.members.push(dm);
        let new = codebase("new", vec![with_default]);
        assert!(compare(&old, &new).is_empty());

        let mut sealed_iface = iface;
        sealed_iface.modifiers.is_sealed = true;
        let old_sealed = codebase("old", vec![sealed_iface.clone()]);
        let mut sealed_with_method = sealed_iface;
        sealed_with_method.members.push(m);
        let new = codebase("new", vec![sealed_with_method]);
        assert!(compare(&old_sealed, &new).is_empty());
    }

    #[test]
    fn changed_throws_only_for_additions() {
        let mut class = ClassItem::new("test.pkg.Foo", ClassKind::Class);
        let mut m = MemberItem::method("m");
        m.ty = Some(TypeItem::primitive("void"));
        m.throws.push("java.io.IOException".to_string());
        class.members.push(m);
        let mut swapped = class.clone();
        swapped.members[0].throws =
            vec!["java.lang.UnsupportedOperationException".to_string()];

        let issues = compare(
            &codebase("old", vec![class]),
            &codebase("new", vec![swapped]),
        );
        assert_eq!(kinds(&issues), vec![IssueKind::ChangedThrows]);
        assert_eq!(
            issues[0].message,
            "Method test.pkg.Foo.m added thrown exception java.lang.UnsupportedOperationException"
        );
    }

    #[test]
    fn constant_value_change_carries_structured_values() {
        let mut class = ClassItem::new("test.pkg.Foo", ClassKind::Class);
        let mut field = MemberItem::field("LIMIT", TypeItem::primitive("int"));
        field.value = Some("1".to_string());
        class.members.push(field);
        let mut changed = class.clone();
        changed.members[0].value = Some("42".to_string());

        let issues = compare(
            &codebase("old", vec![class]),
            &codebase("new", vec![changed]),
        );
        assert_eq!(kinds(&issues), vec![IssueKind::ChangedValue]);
        assert_eq!(issues[0].old_value.as_deref(), Some("1"));
        assert_eq!(issues[0].new_value.as_deref(), Some("42"));
        assert_eq!(
            issues[0].message,
            "Field test.pkg.Foo.LIMIT has changed value from 1 to 42"
        );
    }

    #[test]
    fn annotation_default_removal_is_flagged() {
        let mut annotation = ClassItem::new("test.pkg.Anno", ClassKind::Annotation);
        let mut element = MemberItem::method("prefix");
        element.ty = Some(TypeItem::class_ref("java.lang.String"));
        element.value = Some("\"\"".to_string());
        annotation.members.push(element);
        let mut dropped = annotation.clone();
        dropped.members[0].value = None;

        let issues = compare(
            &codebase("old", vec![annotation.clone()]),
            &codebase("new", vec![dropped.clone()]),
        );
        assert_eq!(kinds(&issues), vec![IssueKind::ChangedValue]);
        assert_eq!(
            issues[0].message,
            "Method test.pkg.Anno.prefix has changed value from \"\" to nothing"
        );

        // Absent to present is compatible
        let issues = compare(
            &codebase("old", vec![dropped]),
            &codebase("new", vec![annotation]),
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn type_variable_renaming_is_tolerated_when_consistent() {
        let make = |var: &str| {
            let mut class = ClassItem::new("test.pkg.Foo", ClassKind::Class);
            let mut m = MemberItem::method("id");
            m.type_parameters.push(TypeParameter::new(var));
            m.parameters.push(Parameter::named(
                "value",
                TypeItem::new(crate::model::TypeKind::Variable {
                    name: var.to_string(),
                    bound: None,
                }),
            ));
            m.ty = Some(TypeItem::new(crate::model::TypeKind::Variable {
                name: var.to_string(),
                bound: None,
            }));
            class.members.push(m);
            class
        };
        let old = codebase("old", vec![make("T")]);
        let new = codebase("new", vec![make("U")]);
        assert!(compare(&old, &new).is_empty());
    }

    #[test]
    fn base_overlay_merges_with_old_winning() {
        let mut old_class = ClassItem::new("test.pkg.Foo", ClassKind::Class);
        old_class
            .members
            .push(MemberItem::field("x", TypeItem::primitive("int")));
        let old = codebase("old", vec![old_class]);

        let mut base_foo = ClassItem::new("test.pkg.Foo", ClassKind::Class);
        base_foo
            .members
            .push(MemberItem::field("ignored", TypeItem::primitive("int")));
        let base_only = ClassItem::new("test.pkg.FromBase", ClassKind::Class);
        let base = codebase("base", vec![base_foo, base_only]);

        let merged = merge_base(&old, &base);
        assert_eq!(merged.len(), 2);
        let foo = merged.find_class("test.pkg.Foo").unwrap();
        assert_eq!(foo.members[0].name, "x");
        assert!(merged.find_class("test.pkg.FromBase").is_some());

        // A class only present in base is still checked for removal
        let new = codebase("new", vec![merged.find_class("test.pkg.Foo").unwrap().clone()]);
        let issues = compare(&merged, &new);
        assert_eq!(kinds(&issues), vec![IssueKind::RemovedClass]);
    }

    #[test]
    fn infix_and_operator_removal() {
        let mut class = ClassItem::new("test.pkg.Foo", ClassKind::Class);
        let mut plus = MemberItem::method("plus");
        plus.modifiers.is_operator = true;
        plus.parameters
            .push(Parameter::named("other", TypeItem::class_ref("String")));
        plus.ty = Some(TypeItem::class_ref("test.pkg.Foo"));
        class.members.push(plus);
        let mut stripped = class.clone();
        stripped.members[0].modifiers.is_operator = false;

        let issues = compare(
            &codebase("old", vec![class]),
            &codebase("new", vec![stripped]),
        );
        assert_eq!(kinds(&issues), vec![IssueKind::OperatorRemoval]);
        assert_eq!(
            issues[0].message,
            "Cannot remove `operator` modifier from method test.pkg.Foo.plus(String): Incompatible change"
        );
    }

    #[test]
    fn reified_addition_is_flagged() {
        let mut class = ClassItem::new("test.pkg.TestKt", ClassKind::Class);
        let mut m = MemberItem::method("add");
        m.type_parameters.push(TypeParameter::new("T"));
        class.members.push(m);
        let mut reified = class.clone();
        reified.members[0].type_parameters[0].is_reified = true;

        let issues = compare(
            &codebase("old", vec![class]),
            &codebase("new", vec![reified]),
        );
        assert_eq!(kinds(&issues), vec![IssueKind::AddedReified]);
        assert_eq!(
            issues[0].message,
            "Method test.pkg.TestKt.add made type variable T reified: incompatible change"
        );
    }
}
