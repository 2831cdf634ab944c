//! Predicate emitter: the `is<Name>` runtime type guards.
//!
//! A record predicate is the conjunction of per-field shape checks; a union
//! predicate is the disjunction of its member predicates, evaluated in
//! declaration order and short-circuiting on first match; a singleton
//! predicate is identity equality against the single inhabitant.

use crate::emit::EmitCtx;
use crate::schema::{DeclKind, Declaration, TypeRef};

pub fn emit(ctx: &EmitCtx<'_>, qualified: &str, decl: &Declaration) -> String {
    let name = ctx.local_name(qualified);
    let body = match &decl.kind {
        DeclKind::Record { fields } => {
            let checks: Vec<String> = fields
                .iter()
                .map(|field| {
                    let expr = format!("v['{}']", field.name);
                    let check = if field.optional && !matches!(field.ty, TypeRef::OptionalOf(_)) {
                        check_expr(
                            ctx,
                            qualified,
                            &TypeRef::OptionalOf(Box::new(field.ty.clone())),
                            &expr,
                            0,
                        )
                    } else {
                        check_expr(ctx, qualified, &field.ty, &expr, 0)
                    };
                    format!("    {check}")
                })
                .collect();
            if checks.is_empty() {
                "    ((typeof v) === 'object') && (v !== null)".to_string()
            } else {
                checks.join(" &&\n")
            }
        }
        DeclKind::Union { members } => {
            let arms: Vec<String> = members
                .iter()
                .map(|m| format!("    {}", member_check(ctx, qualified, m)))
                .collect();
            arms.join(" ||\n")
        }
        DeclKind::Singleton => {
            format!("    v === {}", ctx.inhabitant_name(qualified))
        }
        DeclKind::Alias { target } => {
            format!("    {}", check_expr(ctx, qualified, target, "v", 0))
        }
        DeclKind::Enum { .. } => {
            format!("    {}.includes(v)", ctx.values_name(qualified))
        }
    };

    format!(
        "export function is{name}(v: any): v is {name} {{\n  return (\n{body}\n  );\n}}"
    )
}

/// A union member check: delegate to the member's own predicate when the
/// member is a declaration, otherwise test the shape inline.
fn member_check(ctx: &EmitCtx<'_>, from: &str, member: &TypeRef) -> String {
    match member {
        TypeRef::Named(target) => format!("{}(v)", ctx.predicate_ref(from, target)),
        other => check_expr(ctx, from, other, "v", 0),
    }
}

/// Render the boolean shape check of `ty` against the value expression
/// `expr`. `depth` disambiguates nested element binders.
pub fn check_expr(ctx: &EmitCtx<'_>, from: &str, ty: &TypeRef, expr: &str, depth: usize) -> String {
    match ty {
        TypeRef::Str => format!("((typeof {expr}) === 'string')"),
        TypeRef::Num => format!("((typeof {expr}) === 'number')"),
        TypeRef::Bool => format!("((typeof {expr}) === 'boolean')"),
        TypeRef::Date => format!("({expr} && ({expr} instanceof Date))"),
        TypeRef::Named(target) => {
            format!("({expr} && {}({expr}))", ctx.predicate_ref(from, target))
        }
        TypeRef::ArrayOf(item) => {
            let elmt = binder(depth);
            format!(
                "(Array.isArray({expr}) && {expr}.every({elmt} => {}))",
                check_expr(ctx, from, item, &elmt, depth + 1)
            )
        }
        TypeRef::SetOf(item) => {
            let elmt = binder(depth);
            format!(
                "(({expr} instanceof Set) && Array.from({expr}).every({elmt} => {}))",
                check_expr(ctx, from, item, &elmt, depth + 1)
            )
        }
        TypeRef::TupleOf(elems) => {
            let mut parts = vec![
                format!("Array.isArray({expr})"),
                format!("({expr}.length === {})", elems.len()),
            ];
            for (i, elem) in elems.iter().enumerate() {
                parts.push(check_expr(ctx, from, elem, &format!("{expr}[{i}]"), depth));
            }
            format!("({})", parts.join(" && "))
        }
        TypeRef::DictOf { key, value } => {
            let entry = format!("entry{}", if depth == 0 { String::new() } else { depth.to_string() });
            format!(
                "(({expr} && ((typeof {expr}) === 'object')) && Object.entries({expr}).every({entry} => {} && {}))",
                check_expr(ctx, from, key, &format!("{entry}[0]"), depth + 1),
                check_expr(ctx, from, value, &format!("{entry}[1]"), depth + 1),
            )
        }
        TypeRef::OptionalOf(item) => {
            format!("(!{expr} || {})", check_expr(ctx, from, item, expr, depth))
        }
        TypeRef::Param(p) => format!("true /* unsupported type parameter '{p}' */"),
    }
}

fn binder(depth: usize) -> String {
    if depth == 0 {
        "elmt".to_string()
    } else {
        format!("elmt{depth}")
    }
}
