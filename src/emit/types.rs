//! Structural type emitter.
//!
//! Records become open interfaces (optional fields get `?:` slots), unions
//! become sum types over their member types (discriminated companions for
//! tagged unions), enums become closed literal sets with a `Values` constant,
//! singletons become a literal type plus its single inhabitant constant.

use crate::discriminate::UnionMode;
use crate::emit::{object_key, EmitCtx};
use crate::schema::{DeclKind, Declaration, Field, TypeRef};

pub fn emit(ctx: &EmitCtx<'_>, qualified: &str, decl: &Declaration) -> String {
    match &decl.kind {
        DeclKind::Record { fields } => emit_record(ctx, qualified, fields),
        DeclKind::Union { members } => emit_union(ctx, qualified, members),
        DeclKind::Singleton => emit_singleton(ctx, qualified, decl),
        DeclKind::Alias { target } => {
            format!(
                "export type {} = {};",
                ctx.local_name(qualified),
                type_ref_text(ctx, qualified, target)
            )
        }
        DeclKind::Enum { values } => emit_enum(ctx, qualified, values),
    }
}

/// Render a type reference as seen from the file of `from`.
pub fn type_ref_text(ctx: &EmitCtx<'_>, from: &str, ty: &TypeRef) -> String {
    match ty {
        TypeRef::Str => "string".to_string(),
        TypeRef::Num => "number".to_string(),
        TypeRef::Bool => "boolean".to_string(),
        TypeRef::Date => "Date".to_string(),
        TypeRef::Named(target) => ctx.type_ref(from, target),
        TypeRef::ArrayOf(item) => {
            format!("ReadonlyArray<{}>", type_ref_text(ctx, from, item))
        }
        TypeRef::SetOf(item) => format!("ReadonlySet<{}>", type_ref_text(ctx, from, item)),
        TypeRef::TupleOf(elems) => {
            let parts: Vec<String> = elems.iter().map(|e| type_ref_text(ctx, from, e)).collect();
            format!("[{}]", parts.join(", "))
        }
        TypeRef::DictOf { key, value } => format!(
            "Readonly<Partial<Record<{}, {}>>>",
            type_ref_text(ctx, from, key),
            type_ref_text(ctx, from, value)
        ),
        TypeRef::OptionalOf(item) => {
            format!("({} | undefined)", type_ref_text(ctx, from, item))
        }
        TypeRef::Param(p) => format!("unknown /* unsupported type parameter '{p}' */"),
    }
}

fn emit_record(ctx: &EmitCtx<'_>, qualified: &str, fields: &[Field]) -> String {
    let mut out = format!("export interface {} {{\n", ctx.local_name(qualified));
    for field in fields {
        // `?:` already encodes optionality; unwrap the explicit wrapper so we
        // never render `amount?: (number | undefined)`.
        let (ty, optional) = match &field.ty {
            TypeRef::OptionalOf(inner) => (inner.as_ref(), true),
            other => (other, field.optional),
        };
        out.push_str(&format!(
            "  {}{}: {};\n",
            object_key(&field.name),
            if optional { "?" } else { "" },
            type_ref_text(ctx, qualified, ty),
        ));
    }
    out.push('}');
    out
}

fn emit_union(ctx: &EmitCtx<'_>, qualified: &str, members: &[TypeRef]) -> String {
    let mode = ctx.strategies.mode_of(qualified);
    let name = ctx.local_name(qualified);

    let member_text = |m: &TypeRef| -> String {
        match (mode, m) {
            (Some(UnionMode::Tagged { .. }), TypeRef::Named(target)) => {
                ctx.discriminated_type_ref(qualified, target)
            }
            _ => type_ref_text(ctx, qualified, m),
        }
    };

    let arms: Vec<String> = members.iter().map(|m| member_text(m)).collect();
    let mut out = format!("export type {name} =\n  {};", arms.join(" |\n  "));

    // Flat unions additionally export the closed set of inhabitants.
    if mode == Some(&UnionMode::Flat) {
        let mut entries = Vec::new();
        for m in members {
            if let TypeRef::Named(target) = m {
                match ctx.model.get(target).map(|d| &d.kind) {
                    Some(DeclKind::Singleton) => {
                        entries.push(ctx.inhabitant_ref(qualified, target));
                    }
                    Some(DeclKind::Enum { .. }) => {
                        entries.push(format!("...{}", ctx.values_ref(qualified, target)));
                    }
                    _ => {}
                }
            }
        }
        out.push_str(&format!(
            "\n\nexport const {}: ReadonlyArray<{name}> = [\n  {}\n];",
            ctx.known_values_name(qualified),
            entries.join(",\n  "),
        ));
    }

    out
}

fn emit_singleton(ctx: &EmitCtx<'_>, qualified: &str, decl: &Declaration) -> String {
    let name = ctx.local_name(qualified);
    // A singleton is one shared immutable constant compared by identity; its
    // runtime representation is its own name as a literal.
    format!(
        "export type {name} = '{}';\n\nexport const {}: {name} = '{}';",
        decl.name,
        ctx.inhabitant_name(qualified),
        decl.name,
    )
}

fn emit_enum(ctx: &EmitCtx<'_>, qualified: &str, values: &[String]) -> String {
    let name = ctx.local_name(qualified);
    let entries_name = format!("{name}Entries");

    let mut out = format!("const {entries_name} = {{\n");
    for value in values {
        out.push_str(&format!(
            "  {}: '{}',\n",
            object_key(value),
            value.replace('\\', "\\\\").replace('\'', "\\'")
        ));
    }
    out.push_str("};\n\n");

    out.push_str(&format!(
        "export type {name} = keyof (typeof {entries_name});\n\n"
    ));
    out.push_str(&format!(
        "export const {}: ReadonlyArray<{name}> =\n  Object.keys({entries_name}) as ReadonlyArray<{name}>;\n\n",
        ctx.values_name(qualified),
    ));
    out.push_str(&format!(
        "export const {name} = {{\n  ...{entries_name},\n  values: {},\n}} as const;",
        ctx.values_name(qualified),
    ));
    out
}
