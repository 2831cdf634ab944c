//! Loading the schema description.
//!
//! The generator does not parse host-language source text. An external
//! collaborator (e.g. a compiler plugin) hands it JSON documents of the
//! shape:
//!
//! ```json
//! {
//!   "module": "api",
//!   "declarations": [
//!     { "name": "Bar", "record": { "fields": [
//!       { "name": "name", "type": "string" },
//!       { "name": "amount", "type": "number", "optional": true }
//!     ] } },
//!     { "name": "Transport", "union": { "members": ["BusLine", "TrainLine"] } },
//!     { "name": "WeekDay", "enum": { "values": ["Mon", "Tue"] } },
//!     { "name": "Hello", "singleton": {} },
//!     { "name": "Name", "alias": { "type": "string" } }
//!   ]
//! }
//! ```
//!
//! Type references are either a string (`"string"`, `"number"`, `"boolean"`,
//! `"date"` are primitives, anything else names a declaration) or a
//! single-key object: `{"array": T}`, `{"set": T}`, `{"tuple": [T...]}`,
//! `{"dict": {"key": T, "value": T}}`, `{"optional": T}`, `{"param": "T"}`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::schema::{DeclKind, Declaration, Field, SchemaError, TypeRef};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"));

/// Module names may be dotted paths of identifiers (or empty).
static MODULE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*)?$").expect("module regex")
});

// ---------------------------- Wire mirror types ---------------------------- //

#[derive(Debug, Deserialize)]
struct DocumentDe {
    #[serde(default)]
    module: String,
    declarations: Vec<DeclarationDe>,
}

#[derive(Debug, Deserialize)]
struct DeclarationDe {
    name: String,
    #[serde(flatten)]
    kind: DeclKindDe,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum DeclKindDe {
    Record { fields: Vec<FieldDe> },
    Union { members: Vec<TypeRefDe> },
    Singleton {},
    Alias {
        #[serde(rename = "type")]
        target: TypeRefDe,
    },
    Enum { values: Vec<String> },
}

#[derive(Debug, Deserialize)]
struct FieldDe {
    name: String,
    #[serde(rename = "type")]
    ty: TypeRefDe,
    #[serde(default)]
    optional: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TypeRefDe {
    Name(String),
    Compound(CompoundDe),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum CompoundDe {
    Array(Box<TypeRefDe>),
    Set(Box<TypeRefDe>),
    Tuple(Vec<TypeRefDe>),
    Dict {
        key: Box<TypeRefDe>,
        value: Box<TypeRefDe>,
    },
    Optional(Box<TypeRefDe>),
    Param(String),
}

// ------------------------------- Conversion -------------------------------- //

impl TypeRefDe {
    fn into_type_ref(self) -> TypeRef {
        match self {
            TypeRefDe::Name(name) => match name.as_str() {
                "string" => TypeRef::Str,
                "number" => TypeRef::Num,
                "boolean" => TypeRef::Bool,
                "date" => TypeRef::Date,
                _ => TypeRef::Named(name),
            },
            TypeRefDe::Compound(c) => match c {
                CompoundDe::Array(item) => TypeRef::ArrayOf(Box::new(item.into_type_ref())),
                CompoundDe::Set(item) => TypeRef::SetOf(Box::new(item.into_type_ref())),
                CompoundDe::Tuple(elems) => {
                    TypeRef::TupleOf(elems.into_iter().map(|e| e.into_type_ref()).collect())
                }
                CompoundDe::Dict { key, value } => TypeRef::DictOf {
                    key: Box::new(key.into_type_ref()),
                    value: Box::new(value.into_type_ref()),
                },
                CompoundDe::Optional(item) => {
                    TypeRef::OptionalOf(Box::new(item.into_type_ref()))
                }
                CompoundDe::Param(p) => TypeRef::Param(p),
            },
        }
    }
}

/// Parse one schema description document into declarations.
pub fn parse_document(doc: &serde_json::Value) -> Result<Vec<Declaration>, SchemaError> {
    let parsed: DocumentDe =
        serde_json::from_value(doc.clone()).map_err(|e| SchemaError::Malformed(e.to_string()))?;
    document_to_declarations(parsed)
}

/// Parse a schema description from source text, with JSON-path context in
/// deserialization errors.
pub fn parse_str(src: &str) -> Result<Vec<Declaration>, SchemaError> {
    let parsed: DocumentDe = from_str_with_path(src).map_err(SchemaError::Malformed)?;
    document_to_declarations(parsed)
}

fn document_to_declarations(parsed: DocumentDe) -> Result<Vec<Declaration>, SchemaError> {
    if !MODULE_NAME.is_match(&parsed.module) {
        return Err(SchemaError::InvalidIdentifier {
            name: parsed.module,
            context: "module name".into(),
        });
    }

    let mut decls = Vec::with_capacity(parsed.declarations.len());
    for decl in parsed.declarations {
        if !IDENTIFIER.is_match(&decl.name) {
            return Err(SchemaError::InvalidIdentifier {
                name: decl.name,
                context: format!("declaration name in module `{}`", parsed.module),
            });
        }
        let kind = match decl.kind {
            DeclKindDe::Record { fields } => {
                let mut converted = Vec::with_capacity(fields.len());
                for field in fields {
                    if !IDENTIFIER.is_match(&field.name) {
                        return Err(SchemaError::InvalidIdentifier {
                            name: field.name,
                            context: format!("field name in record `{}`", decl.name),
                        });
                    }
                    converted.push(Field {
                        name: field.name,
                        ty: field.ty.into_type_ref(),
                        optional: field.optional,
                    });
                }
                DeclKind::Record { fields: converted }
            }
            DeclKindDe::Union { members } => DeclKind::Union {
                members: members.into_iter().map(|m| m.into_type_ref()).collect(),
            },
            DeclKindDe::Singleton {} => DeclKind::Singleton,
            DeclKindDe::Alias { target } => DeclKind::Alias { target: target.into_type_ref() },
            DeclKindDe::Enum { values } => DeclKind::Enum { values },
        };
        decls.push(Declaration {
            module: parsed.module.clone(),
            name: decl.name,
            kind,
        });
    }
    Ok(decls)
}

/// Deserialize with JSON-path context in error messages.
fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    let de = &mut serde_json::Deserializer::from_str(src);
    match serde_path_to_error::deserialize::<_, T>(de) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(format!("at JSON path {path} → {}", err.into_inner()))
        }
    }
}

// --------------------------------- Tests ---------------------------------- //
