//! Artifact emission: one declaration in, three synchronized artifacts out
//! (structural type, `is<Name>` predicate, `validator<Name>` validator).
//!
//! Emitters are pure functions of `(declaration, resolved context)`. They all
//! derive names deterministically from the declaration name and agree on
//! field order (declaration order, never alphabetical). Anything the target
//! format cannot encode degrades to an explicit unsupported marker; the
//! warning is collected here, not raised.

pub mod predicate;
pub mod types;
pub mod validator;

use std::collections::{BTreeSet, HashMap};

use crate::config::{GeneratorConfig, OutputLayout};
use crate::discriminate::UnionStrategies;
use crate::report::Warning;
use crate::resolve::EmissionOrder;
use crate::schema::{DeclKind, Declaration, SchemaModel, TypeRef};

// ------------------------------- Artifacts -------------------------------- //

/// Everything emitted for a single declaration, plus what the module writer
/// needs to place it (required imports, runtime usage).
#[derive(Debug)]
pub struct Artifact {
    pub qualified: String,
    pub module: String,
    pub index: usize,
    pub type_code: String,
    pub predicate_code: Option<String>,
    pub validator_code: Option<String>,
    /// Discriminated companion for records listed by a tagged union.
    pub companion_code: Option<String>,
    /// Qualified names of every referenced declaration (excluding self).
    pub deps: BTreeSet<String>,
    pub uses_runtime: bool,
    pub warnings: Vec<Warning>,
}

impl Artifact {
    /// Artifact sections in output order, skipping disabled ones.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        [
            Some(self.type_code.as_str()),
            self.predicate_code.as_deref(),
            self.validator_code.as_deref(),
            self.companion_code.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}

// -------------------------------- Context --------------------------------- //

struct LocalNames {
    short: String,
    /// Module-prefixed fallback, used when two declarations of different
    /// source modules share a short name.
    disamb: String,
    collides: bool,
}

/// Shared emission context: resolved model, order, strategies, and the
/// collision-aware name table every emitter goes through.
pub struct EmitCtx<'a> {
    pub model: &'a SchemaModel,
    pub config: &'a GeneratorConfig,
    pub strategies: &'a UnionStrategies,
    pub order: &'a EmissionOrder,
    locals: HashMap<String, LocalNames>,
}

impl<'a> EmitCtx<'a> {
    pub fn new(
        model: &'a SchemaModel,
        config: &'a GeneratorConfig,
        strategies: &'a UnionStrategies,
        order: &'a EmissionOrder,
    ) -> Self {
        let mut by_short: HashMap<&str, usize> = HashMap::new();
        for (_, decl) in model.iter() {
            *by_short.entry(decl.name.as_str()).or_default() += 1;
        }

        let mut locals = HashMap::with_capacity(model.len());
        for (qualified, decl) in model.iter() {
            let collides = by_short[decl.name.as_str()] > 1;
            locals.insert(
                qualified.clone(),
                LocalNames {
                    short: decl.name.clone(),
                    disamb: format!("{}{}", pascal(&decl.module), decl.name),
                    collides,
                },
            );
        }

        Self { model, config, strategies, order, locals }
    }

    // ------------------------------ Naming -------------------------------- //

    /// Rendered local name of a declaration. Short unless the short name
    /// collides across modules in single-file layout, where everything
    /// shares one scope.
    pub fn local_name(&self, qualified: &str) -> &str {
        let names = &self.locals[qualified];
        if names.collides && self.config.layout == OutputLayout::SingleFile {
            &names.disamb
        } else {
            &names.short
        }
    }

    /// Output file stem in per-declaration layout. Collisions get the
    /// module-prefixed stem so two `Foo`s land in distinct files.
    pub fn file_stem(&self, qualified: &str) -> &str {
        let names = &self.locals[qualified];
        if names.collides { &names.disamb } else { &names.short }
    }

    /// Namespace import alias (`nsFoo`, or `nsCommonFoo` on collision).
    pub fn ns_alias(&self, qualified: &str) -> String {
        format!("ns{}", self.file_stem(qualified))
    }

    pub fn predicate_name(&self, qualified: &str) -> String {
        format!("is{}", self.local_name(qualified))
    }

    pub fn validator_name(&self, qualified: &str) -> String {
        format!("{}{}", self.config.validator_prefix, self.local_name(qualified))
    }

    pub fn discriminated_type_name(&self, qualified: &str) -> String {
        format!("Discriminated{}", self.local_name(qualified))
    }

    pub fn discriminated_validator_name(&self, qualified: &str) -> String {
        format!(
            "{}Discriminated{}",
            self.config.validator_prefix,
            self.local_name(qualified)
        )
    }

    pub fn injector_name(&self, qualified: &str) -> String {
        format!("discriminated{}", self.local_name(qualified))
    }

    pub fn inhabitant_name(&self, qualified: &str) -> String {
        format!("{}Inhabitant", self.local_name(qualified))
    }

    pub fn values_name(&self, qualified: &str) -> String {
        format!("{}Values", self.local_name(qualified))
    }

    pub fn known_values_name(&self, qualified: &str) -> String {
        format!("{}KnownValues", self.local_name(qualified))
    }

    // ---------------------------- References ------------------------------ //

    /// Spell `name` (an export of declaration `target`) as seen from the file
    /// of declaration `from`.
    fn qualify(&self, from: &str, target: &str, name: String) -> String {
        if from == target || self.config.layout == OutputLayout::SingleFile {
            name
        } else {
            format!("{}.{}", self.ns_alias(target), name)
        }
    }

    pub fn type_ref(&self, from: &str, target: &str) -> String {
        self.qualify(from, target, self.local_name(target).to_string())
    }

    pub fn predicate_ref(&self, from: &str, target: &str) -> String {
        self.qualify(from, target, self.predicate_name(target))
    }

    pub fn validator_ref(&self, from: &str, target: &str) -> String {
        self.qualify(from, target, self.validator_name(target))
    }

    pub fn discriminated_type_ref(&self, from: &str, target: &str) -> String {
        self.qualify(from, target, self.discriminated_type_name(target))
    }

    pub fn discriminated_validator_ref(&self, from: &str, target: &str) -> String {
        self.qualify(from, target, self.discriminated_validator_name(target))
    }

    pub fn inhabitant_ref(&self, from: &str, target: &str) -> String {
        self.qualify(from, target, self.inhabitant_name(target))
    }

    pub fn values_ref(&self, from: &str, target: &str) -> String {
        self.qualify(from, target, self.values_name(target))
    }

    /// True when `target` is emitted at or after `from` — its validator value
    /// may not exist yet at module-evaluation time, so references must go
    /// through `rt.lazy`.
    pub fn is_forward(&self, from: &str, target: &str) -> bool {
        match (self.order.index_of(target), self.order.index_of(from)) {
            (Some(t), Some(f)) => t >= f,
            _ => true,
        }
    }
}

fn pascal(module: &str) -> String {
    module
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| {
            let mut chars = s.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Quote an object key when it is not a plain identifier.
pub(crate) fn object_key(name: &str) -> String {
    let plain = !name.is_empty()
        && name
            .chars()
            .enumerate()
            .all(|(i, c)| c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit()));
    if plain {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}

// ------------------------------- Emission --------------------------------- //

/// Emit every artifact of one declaration.
pub fn emit_declaration(ctx: &EmitCtx<'_>, qualified: &str, index: usize) -> Artifact {
    let decl = ctx
        .model
        .get(qualified)
        .unwrap_or_else(|| unreachable!("emission order only lists model declarations"));

    let type_code = types::emit(ctx, qualified, decl);
    let predicate_code = ctx
        .config
        .emit_predicates
        .then(|| predicate::emit(ctx, qualified, decl));
    let validator_code = ctx
        .config
        .emit_validators
        .then(|| validator::emit(ctx, qualified, decl));

    let companion_code = ctx
        .strategies
        .tag_field_of(qualified)
        .map(|tag_field| emit_companion(ctx, qualified, decl, tag_field));

    let mut deps = BTreeSet::new();
    decl.walk_named(&mut |referenced, _lazy| {
        if referenced != qualified {
            deps.insert(referenced.to_string());
        }
    });

    Artifact {
        qualified: qualified.to_string(),
        module: decl.module.clone(),
        index,
        // Companions only touch `rt` for their validator half, so validator
        // emission alone decides whether the runtime is needed.
        uses_runtime: validator_code.is_some(),
        type_code,
        predicate_code,
        validator_code,
        companion_code,
        deps,
        warnings: unsupported_warnings(qualified, decl),
    }
}

/// Discriminated companion for a record listed by a tagged union: the
/// intersection type, its validator, and the tag-injecting helper.
fn emit_companion(ctx: &EmitCtx<'_>, qualified: &str, decl: &Declaration, tag_field: &str) -> String {
    let name = ctx.local_name(qualified);
    let disc_type = ctx.discriminated_type_name(qualified);
    let tag = object_key(tag_field);
    let literal = &decl.name; // tag value is the semantic (short) name

    let mut out = String::new();
    out.push_str(&format!(
        "export type {disc_type} = {name} & {{ {tag}: '{literal}' }};\n\n"
    ));
    if ctx.config.emit_validators {
        out.push_str(&format!(
            "export const {}: rt.Validator<{disc_type}> = rt.intersection(\n  {},\n  rt.object({{ {tag}: rt.literal('{literal}') }}));\n\n",
            ctx.discriminated_validator_name(qualified),
            ctx.validator_name(qualified),
        ));
    }
    out.push_str(&format!(
        "export const {}: (_: {name}) => {disc_type} =\n  (v: {name}) => ({{ {tag}: '{literal}', ...v }});",
        ctx.injector_name(qualified),
    ));
    out
}

/// Return the first type parameter below `ty`, if any.
fn find_param(ty: &TypeRef) -> Option<&str> {
    match ty {
        TypeRef::Param(p) => Some(p),
        TypeRef::Str | TypeRef::Num | TypeRef::Bool | TypeRef::Date | TypeRef::Named(_) => None,
        TypeRef::ArrayOf(item) | TypeRef::SetOf(item) | TypeRef::OptionalOf(item) => {
            find_param(item)
        }
        TypeRef::TupleOf(elems) => elems.iter().find_map(find_param),
        TypeRef::DictOf { key, value } => find_param(key).or_else(|| find_param(value)),
    }
}

/// One warning per field (or per declaration, for aliases and unions) whose
/// type the target format cannot encode. Emission still completes; the
/// artifact carries an explicit `unknown` marker in that slot.
fn unsupported_warnings(qualified: &str, decl: &Declaration) -> Vec<Warning> {
    let mut warnings = Vec::new();
    let note = |p: &str| format!("unsupported type parameter '{p}'; emitted as explicit unknown");
    match &decl.kind {
        DeclKind::Record { fields } => {
            for field in fields {
                if let Some(p) = find_param(&field.ty) {
                    warnings.push(Warning::field(qualified, field.name.clone(), note(p)));
                }
            }
        }
        DeclKind::Union { members } => {
            if let Some(p) = members.iter().find_map(find_param) {
                warnings.push(Warning::declaration(qualified, note(p)));
            }
        }
        DeclKind::Alias { target } => {
            if let Some(p) = find_param(target) {
                warnings.push(Warning::declaration(qualified, note(p)));
            }
        }
        DeclKind::Singleton | DeclKind::Enum { .. } => {}
    }
    warnings
}

// --------------------------------- Tests ---------------------------------- //
