//! Strongly-typed schema model. No serde_json::Value past this point.
//!
//! In-memory representation of the source type declarations, independent of
//! the output language. Built once per run, validated on construction,
//! immutable afterwards.

use indexmap::IndexMap;
use thiserror::Error;

// ------------------------------ Type refs -------------------------------- //

/// A reference to a type, as it appears in field/alias/union positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Str,
    Num,
    Bool,
    Date,
    /// Reference to another declaration, stored as a qualified name once the
    /// model is built (`module.Name`).
    Named(String),
    ArrayOf(Box<TypeRef>),
    SetOf(Box<TypeRef>),
    /// Fixed arity, ordered.
    TupleOf(Vec<TypeRef>),
    DictOf {
        key: Box<TypeRef>,
        value: Box<TypeRef>,
    },
    OptionalOf(Box<TypeRef>),
    /// A generic type parameter used in a concrete position. Emitters cannot
    /// encode these; they degrade to an explicit unsupported marker.
    Param(String),
}

impl TypeRef {
    /// Visit every named reference below `self`. `lazy` is true when the
    /// reference is reached through an `OptionalOf` (breakable for ordering).
    pub fn walk_named<F: FnMut(&str, bool)>(&self, f: &mut F) {
        self.walk_inner(f, false)
    }

    fn walk_inner<F: FnMut(&str, bool)>(&self, f: &mut F, lazy: bool) {
        match self {
            TypeRef::Str | TypeRef::Num | TypeRef::Bool | TypeRef::Date | TypeRef::Param(_) => {}
            TypeRef::Named(name) => f(name, lazy),
            TypeRef::ArrayOf(item) | TypeRef::SetOf(item) => item.walk_inner(f, lazy),
            TypeRef::TupleOf(elems) => {
                for e in elems {
                    e.walk_inner(f, lazy);
                }
            }
            TypeRef::DictOf { key, value } => {
                key.walk_inner(f, lazy);
                value.walk_inner(f, lazy);
            }
            TypeRef::OptionalOf(item) => item.walk_inner(f, true),
        }
    }
}

// ----------------------------- Declarations ------------------------------ //

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: TypeRef,
    pub optional: bool,
}

impl Field {
    pub fn required(name: impl Into<String>, ty: TypeRef) -> Self {
        Self { name: name.into(), ty, optional: false }
    }

    pub fn optional(name: impl Into<String>, ty: TypeRef) -> Self {
        Self { name: name.into(), ty, optional: true }
    }
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    /// Product type over named fields (declaration order is significant).
    Record { fields: Vec<Field> },
    /// Sum over member type refs (declaration order is significant).
    Union { members: Vec<TypeRef> },
    /// A named value with no runtime fields, identity-compared.
    Singleton,
    /// A name bound to another type ref.
    Alias { target: TypeRef },
    /// Closed set of string literal values.
    Enum { values: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct Declaration {
    pub module: String,
    pub name: String,
    pub kind: DeclKind,
}

impl Declaration {
    pub fn qualified(&self) -> String {
        qualified_name(&self.module, &self.name)
    }

    /// Visit every named reference of this declaration. Union membership is
    /// always a lazy edge (satisfied via forward type references).
    pub fn walk_named<F: FnMut(&str, bool)>(&self, f: &mut F) {
        match &self.kind {
            DeclKind::Record { fields } => {
                for field in fields {
                    field.ty.walk_named(f);
                }
            }
            DeclKind::Union { members } => {
                for m in members {
                    m.walk_inner_lazy(f);
                }
            }
            DeclKind::Alias { target } => target.walk_named(f),
            DeclKind::Singleton | DeclKind::Enum { .. } => {}
        }
    }
}

impl TypeRef {
    fn walk_inner_lazy<F: FnMut(&str, bool)>(&self, f: &mut F) {
        self.walk_inner(f, true)
    }
}

pub fn qualified_name(module: &str, name: &str) -> String {
    if module.is_empty() {
        name.to_string()
    } else {
        format!("{module}.{name}")
    }
}

// ------------------------------- Errors ----------------------------------- //

/// Malformed input schema. Fatal; aborts the run before any emission.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("duplicate declaration `{0}`")]
    DuplicateDeclaration(String),

    #[error("declaration `{decl}` references undefined `{referenced}`")]
    UnknownReference { decl: String, referenced: String },

    #[error("declaration `{decl}` reference `{referenced}` is ambiguous (candidates: {candidates:?})")]
    AmbiguousReference {
        decl: String,
        referenced: String,
        candidates: Vec<String>,
    },

    #[error("union `{0}` has no members")]
    EmptyUnion(String),

    #[error("duplicate field `{field}` in record `{decl}`")]
    DuplicateField { decl: String, field: String },

    #[error("invalid identifier `{name}` ({context})")]
    InvalidIdentifier { name: String, context: String },

    #[error("malformed schema description: {0}")]
    Malformed(String),
}

// -------------------------------- Model ----------------------------------- //

/// Immutable, validated declaration graph keyed by qualified name, in
/// insertion order.
#[derive(Debug)]
pub struct SchemaModel {
    decls: IndexMap<String, Declaration>,
}

impl SchemaModel {
    /// Validate and index a set of declarations.
    ///
    /// Named references may be given as a qualified name, as a short name of
    /// a declaration in the same module, or as a globally unique short name;
    /// they are rewritten to qualified names here so everything downstream
    /// deals in one spelling.
    pub fn build(decls: Vec<Declaration>) -> Result<Self, SchemaError> {
        let mut indexed: IndexMap<String, Declaration> = IndexMap::with_capacity(decls.len());
        for decl in decls {
            let q = decl.qualified();
            if indexed.insert(q.clone(), decl).is_some() {
                return Err(SchemaError::DuplicateDeclaration(q));
            }
        }

        // short name -> qualified candidates, for reference resolution
        let mut by_short: IndexMap<&str, Vec<String>> = IndexMap::new();
        for (q, decl) in &indexed {
            by_short.entry(decl.name.as_str()).or_default().push(q.clone());
        }

        let mut resolved: IndexMap<String, Declaration> = IndexMap::with_capacity(indexed.len());
        for (q, decl) in &indexed {
            let mut decl = decl.clone();
            match &mut decl.kind {
                DeclKind::Record { fields } => {
                    let mut seen = std::collections::HashSet::new();
                    for field in fields.iter_mut() {
                        if !seen.insert(field.name.clone()) {
                            return Err(SchemaError::DuplicateField {
                                decl: q.clone(),
                                field: field.name.clone(),
                            });
                        }
                        resolve_refs(&mut field.ty, q, &decl.module, &indexed, &by_short)?;
                    }
                }
                DeclKind::Union { members } => {
                    if members.is_empty() {
                        return Err(SchemaError::EmptyUnion(q.clone()));
                    }
                    for m in members.iter_mut() {
                        resolve_refs(m, q, &decl.module, &indexed, &by_short)?;
                    }
                }
                DeclKind::Alias { target } => {
                    resolve_refs(target, q, &decl.module, &indexed, &by_short)?;
                }
                DeclKind::Singleton | DeclKind::Enum { .. } => {}
            }
            resolved.insert(q.clone(), decl);
        }

        Ok(Self { decls: resolved })
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn get(&self, qualified: &str) -> Option<&Declaration> {
        self.decls.get(qualified)
    }

    /// Declarations in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Declaration)> {
        self.decls.iter()
    }

    /// Qualified names in input order.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.decls.keys()
    }
}

/// Rewrite every `Named` under `ty` to a qualified name.
fn resolve_refs(
    ty: &mut TypeRef,
    decl: &str,
    module: &str,
    indexed: &IndexMap<String, Declaration>,
    by_short: &IndexMap<&str, Vec<String>>,
) -> Result<(), SchemaError> {
    match ty {
        TypeRef::Str | TypeRef::Num | TypeRef::Bool | TypeRef::Date | TypeRef::Param(_) => Ok(()),
        TypeRef::Named(name) => {
            if indexed.contains_key(name.as_str()) {
                return Ok(());
            }
            let local = qualified_name(module, name);
            if indexed.contains_key(&local) {
                *name = local;
                return Ok(());
            }
            match by_short.get(name.as_str()).map(Vec::as_slice) {
                Some([unique]) => {
                    *name = unique.clone();
                    Ok(())
                }
                Some(many) => Err(SchemaError::AmbiguousReference {
                    decl: decl.to_string(),
                    referenced: name.clone(),
                    candidates: many.to_vec(),
                }),
                None => Err(SchemaError::UnknownReference {
                    decl: decl.to_string(),
                    referenced: name.clone(),
                }),
            }
        }
        TypeRef::ArrayOf(item) | TypeRef::SetOf(item) | TypeRef::OptionalOf(item) => {
            resolve_refs(item, decl, module, indexed, by_short)
        }
        TypeRef::TupleOf(elems) => {
            for e in elems {
                resolve_refs(e, decl, module, indexed, by_short)?;
            }
            Ok(())
        }
        TypeRef::DictOf { key, value } => {
            resolve_refs(key, decl, module, indexed, by_short)?;
            resolve_refs(value, decl, module, indexed, by_short)
        }
    }
}

// --------------------------------- Tests ---------------------------------- //
