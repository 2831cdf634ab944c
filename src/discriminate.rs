//! Per-union discrimination strategy.
//!
//! Decided once per union at resolution time, never per value at runtime:
//! - `Flat`: every member is a literal-like value (singleton/enum) —
//!   discrimination is literal equality, no extra field.
//! - `Tagged`: every member is a record and a discriminator is configured —
//!   each member grows a discriminated companion carrying a literal tag.
//! - `Structural`: members are told apart by shape alone, tried in
//!   declaration order, first match wins.

use std::collections::{BTreeSet, HashMap};

use crate::config::GeneratorConfig;
use crate::report::Warning;
use crate::schema::{DeclKind, SchemaModel, TypeRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnionMode {
    Flat,
    Tagged { discriminator: String },
    Structural,
}

/// Resolved strategies for every union in the model, plus the set of records
/// that need a discriminated companion because some tagged union lists them.
#[derive(Debug, Default)]
pub struct UnionStrategies {
    modes: HashMap<String, UnionMode>,
    tagged_members: HashMap<String, String>, // member qualified -> discriminator
}

impl UnionStrategies {
    pub fn mode_of(&self, union_qualified: &str) -> Option<&UnionMode> {
        self.modes.get(union_qualified)
    }

    /// Discriminator field name when `record_qualified` is a member of at
    /// least one tagged union.
    pub fn tag_field_of(&self, record_qualified: &str) -> Option<&str> {
        self.tagged_members.get(record_qualified).map(String::as_str)
    }
}

/// Walk every union in the model and fix its mode.
pub fn decide(model: &SchemaModel, config: &GeneratorConfig) -> (UnionStrategies, Vec<Warning>) {
    let mut strategies = UnionStrategies::default();
    let mut warnings = Vec::new();

    for (qualified, decl) in model.iter() {
        let DeclKind::Union { members } = &decl.kind else {
            continue;
        };

        let mode = decide_one(model, config, members);

        if let UnionMode::Tagged { discriminator } = &mode {
            for member in members {
                if let TypeRef::Named(m) = member {
                    strategies
                        .tagged_members
                        .insert(m.clone(), discriminator.clone());
                }
            }
        }
        if mode == UnionMode::Structural {
            warn_ambiguous_shapes(model, qualified, members, &mut warnings);
        }

        strategies.modes.insert(qualified.clone(), mode);
    }

    (strategies, warnings)
}

fn decide_one(model: &SchemaModel, config: &GeneratorConfig, members: &[TypeRef]) -> UnionMode {
    let mut all_literal_like = true;
    let mut all_records = true;

    for member in members {
        match member_kind(model, member) {
            Some(DeclKind::Singleton) | Some(DeclKind::Enum { .. }) => all_records = false,
            Some(DeclKind::Record { .. }) => all_literal_like = false,
            _ => {
                // aliases, nested unions, non-named members: shape only
                all_literal_like = false;
                all_records = false;
            }
        }
    }

    if all_literal_like {
        UnionMode::Flat
    } else if all_records {
        match &config.discriminator {
            Some(field) => UnionMode::Tagged { discriminator: field.clone() },
            None => UnionMode::Structural,
        }
    } else {
        UnionMode::Structural
    }
}

fn member_kind<'a>(model: &'a SchemaModel, member: &TypeRef) -> Option<&'a DeclKind> {
    match member {
        TypeRef::Named(q) => model.get(q).map(|d| &d.kind),
        _ => None,
    }
}

/// First-match order silently misclassifies when an earlier member's required
/// fields are a subset of a later member's. Surface those pairs.
fn warn_ambiguous_shapes(
    model: &SchemaModel,
    union: &str,
    members: &[TypeRef],
    warnings: &mut Vec<Warning>,
) {
    let shapes: Vec<(String, BTreeSet<&str>)> = members
        .iter()
        .filter_map(|m| match m {
            TypeRef::Named(q) => match model.get(q).map(|d| &d.kind) {
                Some(DeclKind::Record { fields }) => Some((
                    q.clone(),
                    fields
                        .iter()
                        .filter(|f| !f.optional)
                        .map(|f| f.name.as_str())
                        .collect(),
                )),
                _ => None,
            },
            _ => None,
        })
        .collect();

    for (i, (earlier, earlier_req)) in shapes.iter().enumerate() {
        for (later, later_req) in shapes.iter().skip(i + 1) {
            if earlier_req.is_subset(later_req) {
                warnings.push(Warning::declaration(
                    union.to_string(),
                    format!(
                        "structural union is ambiguous: `{earlier}` matches every \
                         `{later}` value (required fields are a subset); \
                         first match wins"
                    ),
                ));
            }
        }
    }
}

// --------------------------------- Tests ---------------------------------- //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Declaration, Field, SchemaModel};

    fn model_with_union(members: Vec<&str>, extra: Vec<Declaration>) -> SchemaModel {
        let mut decls = extra;
        decls.push(Declaration {
            module: "api".into(),
            name: "U".into(),
            kind: DeclKind::Union {
                members: members.into_iter().map(|m| TypeRef::Named(m.into())).collect(),
            },
        });
        SchemaModel::build(decls).unwrap()
    }

    fn singleton(name: &str) -> Declaration {
        Declaration { module: "api".into(), name: name.into(), kind: DeclKind::Singleton }
    }

    fn record(name: &str, fields: Vec<Field>) -> Declaration {
        Declaration {
            module: "api".into(),
            name: name.into(),
            kind: DeclKind::Record { fields },
        }
    }

    #[test]
    fn all_singletons_is_flat() {
        let model = model_with_union(vec!["Hi", "Bye"], vec![singleton("Hi"), singleton("Bye")]);
        let (strategies, warnings) = decide(&model, &GeneratorConfig::default());
        assert_eq!(strategies.mode_of("api.U"), Some(&UnionMode::Flat));
        assert!(warnings.is_empty());
    }

    #[test]
    fn all_records_is_tagged_with_configured_field() {
        let model = model_with_union(
            vec!["A", "B"],
            vec![
                record("A", vec![Field::required("x", TypeRef::Str)]),
                record("B", vec![Field::required("y", TypeRef::Num)]),
            ],
        );
        let (strategies, _) = decide(&model, &GeneratorConfig::default());
        assert_eq!(
            strategies.mode_of("api.U"),
            Some(&UnionMode::Tagged { discriminator: "_type".into() })
        );
        assert_eq!(strategies.tag_field_of("api.A"), Some("_type"));
        assert_eq!(strategies.tag_field_of("api.B"), Some("_type"));
    }

    #[test]
    fn record_union_without_discriminator_is_structural() {
        let model = model_with_union(
            vec!["A", "B"],
            vec![
                record("A", vec![Field::required("x", TypeRef::Str)]),
                record("B", vec![Field::required("y", TypeRef::Num)]),
            ],
        );
        let config = GeneratorConfig { discriminator: None, ..Default::default() };
        let (strategies, warnings) = decide(&model, &config);
        assert_eq!(strategies.mode_of("api.U"), Some(&UnionMode::Structural));
        assert!(strategies.tag_field_of("api.A").is_none());
        assert!(warnings.is_empty());
    }

    #[test]
    fn mixed_members_are_structural() {
        let model = model_with_union(
            vec!["A", "Hi"],
            vec![record("A", vec![Field::required("x", TypeRef::Str)]), singleton("Hi")],
        );
        let (strategies, _) = decide(&model, &GeneratorConfig::default());
        assert_eq!(strategies.mode_of("api.U"), Some(&UnionMode::Structural));
    }

    #[test]
    fn subset_shapes_warn_in_structural_mode() {
        let model = model_with_union(
            vec!["Small", "Big"],
            vec![
                record("Small", vec![Field::required("x", TypeRef::Str)]),
                record(
                    "Big",
                    vec![
                        Field::required("x", TypeRef::Str),
                        Field::required("y", TypeRef::Num),
                    ],
                ),
            ],
        );
        let config = GeneratorConfig { discriminator: None, ..Default::default() };
        let (_, warnings) = decide(&model, &config);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("api.Small"));
        assert!(warnings[0].message.contains("api.Big"));
    }
}
