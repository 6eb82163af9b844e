//! Model builder for the textual API-signature format
//!
//! Parses the line-oriented signature dialect (`api.txt` style) into a
//! [`Codebase`]. The grammar is block structured:
//!
//! ```text
//! // Signature format: 3.0
//! package test.pkg {
//!   public final class Foo extends test.pkg.Base implements java.io.Closeable {
//!     ctor public Foo();
//!     method public java.util.List<java.lang.String> names(int count = 10);
//!     field public static final int LIMIT = 42;
//!   }
//! }
//! ```
//!
//! The format version from the header is threaded into the model because
//! default-value semantics depend on it: formats before 3.0 only know a
//! parameter is optional when a literal default was recorded, while 3.0
//! records optionality explicitly (a default expression or the `optional`
//! marker). Nullability is read from `@Nullable`/`@NonNull` annotations in
//! 2.0 and from Kotlin-style suffixes (`?`, `!`, bare) in 3.0.

use crate::error::ApiVetError;
use crate::model::{
    ClassItem, ClassKind, Codebase, FormatVersion, MemberItem, MemberKind, Modifiers, Nullability,
    Parameter, TypeItem, TypeKind, TypeParameter, Visibility,
};
use crate::result::Result;
use std::collections::HashMap;
use std::path::Path;
use tracing::trace;

const FORMAT_HEADER: &str = "// Signature format:";

/// Parse signature text into a codebase with the given label
pub fn parse_api(label: &str, text: &str) -> Result<Codebase> {
    SignatureParser::new(label).parse(text)
}

/// Read and parse a signature file
pub fn load_api(label: &str, path: &Path) -> Result<Codebase> {
    let text =
        std::fs::read_to_string(path).map_err(|e| ApiVetError::io_error(path, e))?;
    parse_api(label, &text)
}

struct SignatureParser {
    label: String,
    format: FormatVersion,
}

impl SignatureParser {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            format: FormatVersion::V1,
        }
    }

    fn parse(mut self, text: &str) -> Result<Codebase> {
        let mut codebase = Codebase::new(&self.label);
        let mut package: Option<String> = None;
        let mut class: Option<ClassItem> = None;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(version) = line.strip_prefix(FORMAT_HEADER) {
                self.format = parse_format_version(version.trim(), line_no)?;
                continue;
            }
            if line.starts_with("//") {
                continue;
            }
            if line == "}" {
                if let Some(done) = class.take() {
                    codebase.add_class(done)?;
                } else if package.take().is_none() {
                    return Err(ApiVetError::signature_error("unbalanced '}'", line_no));
                }
                continue;
            }
            if let Some(rest) = line.strip_prefix("package ") {
                if package.is_some() {
                    return Err(ApiVetError::signature_error(
                        "nested package block",
                        line_no,
                    ));
                }
                let name = rest.trim_end_matches('{').trim().to_string();
                // Even an empty package block is part of the surface
                codebase.add_package(&name);
                package = Some(name);
                continue;
            }
            let Some(pkg) = package.as_deref() else {
                return Err(ApiVetError::signature_error(
                    format!("declaration outside package block: {line}"),
                    line_no,
                ));
            };
            if line.ends_with('{') {
                if class.is_some() {
                    return Err(ApiVetError::signature_error(
                        "nested class block; nested classes use dotted names",
                        line_no,
                    ));
                }
                class = Some(self.parse_class(pkg, line, line_no)?);
            } else if let Some(current) = class.as_mut() {
                self.parse_member(current, line, line_no)?;
            } else {
                return Err(ApiVetError::signature_error(
                    format!("member outside class block: {line}"),
                    line_no,
                ));
            }
        }
        if class.is_some() || package.is_some() {
            return Err(ApiVetError::signature_error(
                "unexpected end of input, unclosed block",
                text.lines().count(),
            ));
        }

        codebase.set_format(self.format);
        trace!(label = %self.label, classes = codebase.len(), "signature parsed");
        Ok(codebase)
    }

    fn parse_class(&self, pkg: &str, line: &str, line_no: usize) -> Result<ClassItem> {
        let decl = line.trim_end_matches('{').trim();
        let tokens = tokenize(decl);
        let mut modifiers = Modifiers::default();
        let mut kind: Option<ClassKind> = None;
        let mut name_decl: Option<&str> = None;
        let mut supertypes_from = None;
        let mut iter = tokens.iter().enumerate();

        while let Some((index, token)) = iter.next() {
            let token = token.as_str();
            match token {
                "@interface" | "annotation" => kind = Some(ClassKind::Annotation),
                "class" => kind = Some(ClassKind::Class),
                "interface" => kind = Some(ClassKind::Interface),
                "enum" => kind = Some(ClassKind::Enum),
                _ if kind.is_none() && token.starts_with('@') => {
                    apply_annotation(&mut modifiers, token)
                }
                _ if kind.is_none() => apply_modifier(&mut modifiers, token),
                _ if name_decl.is_none() => name_decl = Some(token),
                _ => {
                    supertypes_from = Some(index);
                    break;
                }
            }
        }

        let kind = kind.ok_or_else(|| {
            ApiVetError::signature_error(format!("not a class declaration: {decl}"), line_no)
        })?;
        let name_decl = name_decl.ok_or_else(|| {
            ApiVetError::signature_error("class declaration without a name", line_no)
        })?;
        let (simple, type_parameters) = parse_name_and_type_params(name_decl);
        let mut class = ClassItem::new(format!("{pkg}.{simple}"), kind);
        class.modifiers = modifiers;
        class.type_parameters = type_parameters;
        if kind == ClassKind::Interface || kind == ClassKind::Annotation {
            class.modifiers.is_abstract = true;
        }

        if let Some(start) = supertypes_from {
            let mut section: Option<&str> = None;
            let mut extends: Vec<String> = Vec::new();
            let mut implements: Vec<String> = Vec::new();
            for token in &tokens[start..] {
                match token.as_str() {
                    "extends" => section = Some("extends"),
                    "implements" => section = Some("implements"),
                    other => {
                        let names = other.split(',').map(str::trim).filter(|s| !s.is_empty());
                        match section {
                            Some("extends") => extends.extend(names.map(erase_type_spelling)),
                            Some("implements") => {
                                implements.extend(names.map(erase_type_spelling))
                            }
                            _ => {
                                return Err(ApiVetError::signature_error(
                                    format!("unexpected token '{other}' in class declaration"),
                                    line_no,
                                ));
                            }
                        }
                    }
                }
            }
            if kind == ClassKind::Interface {
                // Interfaces extend other interfaces
                implements.extend(extends);
            } else {
                class.super_class = extends.into_iter().next();
            }
            class.interfaces = implements;
        }
        Ok(class)
    }

    fn parse_member(&self, class: &mut ClassItem, line: &str, line_no: usize) -> Result<()> {
        let line = line.trim_end_matches(';').trim();
        let (keyword, rest) = line.split_once(' ').ok_or_else(|| {
            ApiVetError::signature_error(format!("malformed member line: {line}"), line_no)
        })?;
        let scope = self.type_param_scope(class);
        match keyword {
            "ctor" => self.parse_callable(class, rest, line_no, MemberKind::Constructor, scope),
            "method" => self.parse_callable(class, rest, line_no, MemberKind::Method, scope),
            "field" | "enum_constant" => self.parse_field(class, rest, line_no, scope),
            "property" => Ok(()), // accessors are listed as methods as well
            other => Err(ApiVetError::signature_error(
                format!("unknown member keyword '{other}'"),
                line_no,
            )),
        }
    }

    fn type_param_scope(&self, class: &ClassItem) -> HashMap<String, Option<String>> {
        class
            .type_parameters
            .iter()
            .map(|tp| (tp.name.clone(), tp.bound.clone()))
            .collect()
    }

    fn parse_callable(
        &self,
        class: &mut ClassItem,
        rest: &str,
        line_no: usize,
        kind: MemberKind,
        mut scope: HashMap<String, Option<String>>,
    ) -> Result<()> {
        let tokens = tokenize(rest);
        let mut modifiers = Modifiers::public();
        let mut type_parameters: Vec<TypeParameter> = Vec::new();
        let mut pending_nullability: Option<Nullability> = None;
        let mut positional: Vec<&str> = Vec::new();
        let mut throws: Vec<String> = Vec::new();
        let mut default_value: Option<String> = None;
        let mut tail: Option<&str> = None;

        for token in &tokens {
            let token = token.as_str();
            if positional.is_empty() && token.starts_with('<') {
                type_parameters = parse_type_params(token);
                for tp in &type_parameters {
                    scope.insert(tp.name.clone(), tp.bound.clone());
                }
            } else if positional.is_empty() && token.starts_with('@') {
                match annotation_nullability(token) {
                    Some(n) => pending_nullability = Some(n),
                    None => apply_annotation(&mut modifiers, token),
                }
            } else if positional.is_empty() && is_modifier(token) {
                apply_modifier(&mut modifiers, token);
            } else if token == "throws" {
                tail = Some("throws");
            } else if token == "default" {
                tail = Some("default");
                default_value = Some(String::new());
            } else {
                match tail {
                    Some("throws") => throws.extend(
                        token
                            .split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string),
                    ),
                    Some("default") => {
                        let value = default_value.get_or_insert_with(String::new);
                        if !value.is_empty() {
                            value.push(' ');
                        }
                        value.push_str(token);
                    }
                    _ => positional.push(token),
                }
            }
        }

        // Constructors have no return type: `Name(params)`. Methods have
        // `ReturnType name(params)`.
        let (return_spelling, signature) = match (kind, positional.as_slice()) {
            (MemberKind::Constructor, [sig]) => (None, *sig),
            (MemberKind::Method, [ret, sig]) => (Some(*ret), *sig),
            _ => {
                return Err(ApiVetError::signature_error(
                    format!("malformed {kind} declaration: {rest}"),
                    line_no,
                ));
            }
        };
        let (name, params) = signature.split_once('(').ok_or_else(|| {
            ApiVetError::signature_error(
                format!("missing parameter list in: {signature}"),
                line_no,
            )
        })?;
        let params = params.trim_end_matches(')');

        let mut member = MemberItem {
            kind,
            name: name.to_string(),
            modifiers,
            ty: None,
            parameters: Vec::new(),
            type_parameters,
            throws,
            value: default_value,
        };
        if let Some(spelling) = return_spelling {
            member.ty = Some(self.parse_type(spelling, &scope, pending_nullability, line_no)?);
        }
        for param in split_top_level(params, ',') {
            member
                .parameters
                .push(self.parse_parameter(&param, &scope, line_no)?);
        }
        member.modifiers.is_varargs = member
            .parameters
            .last()
            .is_some_and(|p| p.ty.is_varargs());
        class.members.push(member);
        Ok(())
    }

    fn parse_field(
        &self,
        class: &mut ClassItem,
        rest: &str,
        line_no: usize,
        scope: HashMap<String, Option<String>>,
    ) -> Result<()> {
        let tokens = tokenize(rest);
        let mut modifiers = Modifiers::public();
        let mut pending_nullability: Option<Nullability> = None;
        let mut positional: Vec<&str> = Vec::new();
        let mut value: Option<String> = None;
        let mut in_value = false;

        for token in &tokens {
            let token = token.as_str();
            if in_value {
                let stored = value.get_or_insert_with(String::new);
                if !stored.is_empty() {
                    stored.push(' ');
                }
                stored.push_str(token);
            } else if token == "=" {
                in_value = true;
            } else if positional.is_empty() && token.starts_with('@') {
                match annotation_nullability(token) {
                    Some(n) => pending_nullability = Some(n),
                    None => apply_annotation(&mut modifiers, token),
                }
            } else if positional.is_empty() && is_modifier(token) {
                apply_modifier(&mut modifiers, token);
            } else {
                positional.push(token);
            }
        }

        let [ty, name] = positional.as_slice() else {
            return Err(ApiVetError::signature_error(
                format!("malformed field declaration: {rest}"),
                line_no,
            ));
        };
        let mut field = MemberItem::field(
            *name,
            self.parse_type(ty, &scope, pending_nullability, line_no)?,
        );
        field.modifiers = modifiers;
        field.value = value;
        class.members.push(field);
        Ok(())
    }

    fn parse_parameter(
        &self,
        text: &str,
        scope: &HashMap<String, Option<String>>,
        line_no: usize,
    ) -> Result<Parameter> {
        let tokens = tokenize(text.trim());
        let mut pending_nullability: Option<Nullability> = None;
        let mut has_default = false;
        let mut positional: Vec<&str> = Vec::new();

        let mut iter = tokens.iter();
        while let Some(token) = iter.next() {
            let token = token.as_str();
            if token.starts_with('@') {
                if let Some(n) = annotation_nullability(token) {
                    pending_nullability = Some(n);
                }
            } else if token == "optional" && positional.is_empty() {
                // Explicit optionality marker of the later format
                has_default = true;
            } else if token == "=" {
                has_default = true;
                break; // default expression is not modeled, only its presence
            } else {
                positional.push(token);
            }
        }

        let (ty, name) = match positional.as_slice() {
            [ty] => (*ty, None),
            [ty, name] => (*ty, Some((*name).to_string())),
            _ => {
                return Err(ApiVetError::signature_error(
                    format!("malformed parameter: {text}"),
                    line_no,
                ));
            }
        };
        Ok(Parameter {
            name,
            ty: self.parse_type(ty, scope, pending_nullability, line_no)?,
            has_default,
        })
    }

    fn parse_type(
        &self,
        spelling: &str,
        scope: &HashMap<String, Option<String>>,
        annotated: Option<Nullability>,
        line_no: usize,
    ) -> Result<TypeItem> {
        let spelling = spelling.trim();
        if spelling.is_empty() {
            return Err(ApiVetError::signature_error("empty type", line_no));
        }
        if spelling == "?" {
            return Ok(TypeItem::new(TypeKind::Wildcard));
        }
        if let Some(component) = spelling.strip_suffix("...") {
            let component = self.parse_type(component, scope, None, line_no)?;
            return Ok(self.tagged(
                TypeKind::Array {
                    component: Box::new(component),
                    varargs: true,
                },
                annotated,
            ));
        }
        if let Some(component) = spelling.strip_suffix("[]") {
            let component = self.parse_type(component, scope, None, line_no)?;
            return Ok(self.tagged(
                TypeKind::Array {
                    component: Box::new(component),
                    varargs: false,
                },
                annotated,
            ));
        }

        // Kotlin-style suffixes are only meaningful in format 3.0
        let (spelling, suffix) = if self.format >= FormatVersion::V3 {
            match spelling.strip_suffix(['?', '!']) {
                Some(stripped) if !stripped.is_empty() => {
                    (stripped, spelling.chars().next_back())
                }
                _ => (spelling, None),
            }
        } else {
            (spelling, None)
        };

        if is_primitive(spelling) {
            return Ok(TypeItem::primitive(spelling).with_nullability(Nullability::NonNull));
        }

        let kind = if let Some((base, args)) = spelling.split_once('<') {
            let args = args.trim_end_matches('>');
            let mut parsed = Vec::new();
            for arg in split_top_level(args, ',') {
                parsed.push(self.parse_type(&arg, scope, None, line_no)?);
            }
            TypeKind::ClassRef {
                name: base.to_string(),
                args: parsed,
            }
        } else if let Some(bound) = scope.get(spelling) {
            TypeKind::Variable {
                name: spelling.to_string(),
                bound: bound.clone(),
            }
        } else {
            TypeKind::ClassRef {
                name: spelling.to_string(),
                args: Vec::new(),
            }
        };

        let nullability = match (annotated, suffix) {
            (Some(n), _) => n,
            (None, Some('?')) => Nullability::Nullable,
            (None, Some('!')) => Nullability::Unknown,
            (None, None) if self.format >= FormatVersion::V3 => Nullability::NonNull,
            (None, _) => Nullability::Unknown,
        };
        Ok(TypeItem::new(kind).with_nullability(nullability))
    }

    fn tagged(&self, kind: TypeKind, annotated: Option<Nullability>) -> TypeItem {
        let nullability = match annotated {
            Some(n) => n,
            None if self.format >= FormatVersion::V3 => Nullability::NonNull,
            None => Nullability::Unknown,
        };
        TypeItem::new(kind).with_nullability(nullability)
    }
}

fn parse_format_version(text: &str, line_no: usize) -> Result<FormatVersion> {
    match text {
        "1.0" => Ok(FormatVersion::V1),
        "2.0" => Ok(FormatVersion::V2),
        "3.0" | "4.0" => Ok(FormatVersion::V3),
        other => Err(ApiVetError::signature_error(
            format!("unsupported signature format '{other}'"),
            line_no,
        )),
    }
}

/// Split on whitespace at bracket/quote depth zero
///
/// Keeps `Map<String, Integer>`, `m(int a, int b)`, and quoted strings
/// together as single tokens.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                current.push(c);
            }
            '<' | '(' | '{' | '[' => {
                depth += 1;
                current.push(c);
            }
            '>' | ')' | '}' | ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Split on `separator` at bracket/quote depth zero
fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                current.push(c);
            }
            '<' | '(' | '{' | '[' => {
                depth += 1;
                current.push(c);
            }
            '>' | ')' | '}' | ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c == separator && depth == 0 => {
                let part = current.trim().to_string();
                if !part.is_empty() {
                    parts.push(part);
                }
                current.clear();
            }
            c => current.push(c),
        }
    }
    let part = current.trim().to_string();
    if !part.is_empty() {
        parts.push(part);
    }
    parts
}

fn parse_name_and_type_params(decl: &str) -> (String, Vec<TypeParameter>) {
    match decl.split_once('<') {
        Some((name, params)) => (
            name.to_string(),
            parse_type_params(&format!("<{params}")),
        ),
        None => (decl.to_string(), Vec::new()),
    }
}

/// Parse `<T, reified U, K extends java.lang.Number>`
fn parse_type_params(decl: &str) -> Vec<TypeParameter> {
    let inner = decl.trim_start_matches('<').trim_end_matches('>');
    split_top_level(inner, ',')
        .into_iter()
        .map(|entry| {
            let mut tp = TypeParameter::new("");
            let mut tokens = entry.split_whitespace().peekable();
            while let Some(token) = tokens.next() {
                match token {
                    "reified" => tp.is_reified = true,
                    "extends" => {
                        tp.bound = Some(tokens.by_ref().collect::<Vec<_>>().join(" "));
                        break;
                    }
                    name if tp.name.is_empty() => tp.name = name.to_string(),
                    _ => {}
                }
            }
            tp
        })
        .collect()
}

/// Drop generic arguments from a supertype spelling
fn erase_type_spelling(spelling: &str) -> String {
    match spelling.split_once('<') {
        Some((base, _)) => base.to_string(),
        None => spelling.to_string(),
    }
}

fn is_primitive(name: &str) -> bool {
    matches!(
        name,
        "void" | "boolean" | "byte" | "short" | "int" | "long" | "char" | "float" | "double"
    )
}

fn is_modifier(token: &str) -> bool {
    matches!(
        token,
        "public"
            | "protected"
            | "private"
            | "internal"
            | "static"
            | "final"
            | "abstract"
            | "deprecated"
            | "sealed"
            | "default"
            | "open"
            | "infix"
            | "operator"
            | "inline"
            | "suspend"
            | "fun"
            | "volatile"
            | "transient"
            | "synchronized"
            | "native"
            | "strictfp"
    )
}

fn apply_modifier(modifiers: &mut Modifiers, token: &str) {
    match token {
        "public" => modifiers.visibility = Visibility::Public,
        "protected" => modifiers.visibility = Visibility::Protected,
        "private" => modifiers.visibility = Visibility::Private,
        "internal" => modifiers.visibility = Visibility::PackagePrivate,
        "static" => modifiers.is_static = true,
        "final" => modifiers.is_final = true,
        "abstract" => modifiers.is_abstract = true,
        "deprecated" => modifiers.is_deprecated = true,
        "sealed" => modifiers.is_sealed = true,
        "default" => modifiers.is_default = true,
        "infix" => modifiers.is_infix = true,
        "operator" => modifiers.is_operator = true,
        "fun" => modifiers.is_fun = true,
        "volatile" => modifiers.is_volatile = true,
        "transient" => modifiers.is_transient = true,
        // open, inline, suspend, synchronized, native, strictfp carry no
        // compatibility signal of their own
        _ => {}
    }
}

fn apply_annotation(modifiers: &mut Modifiers, token: &str) {
    let name = token.split('(').next().unwrap_or(token);
    if name == "@Deprecated" || name.ends_with(".Deprecated") {
        modifiers.is_deprecated = true;
    }
}

fn annotation_nullability(token: &str) -> Option<Nullability> {
    let name = token.split('(').next().unwrap_or(token);
    if name == "@Nullable" || name.ends_with("Nullable") {
        Some(Nullability::Nullable)
    } else if name == "@NonNull" || name.ends_with("NonNull") || name.ends_with("NotNull") {
        Some(Nullability::NonNull)
    } else {
        None
    }
}
