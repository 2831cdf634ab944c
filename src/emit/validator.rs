//! Validator emitter: composable runtime parsers.
//!
//! Validators are built from a small combinator runtime (`rt`) that the
//! module writer materializes next to the generated code (`_runtime.ts`, or
//! an inlined namespace in single-file layout). A record validator is the
//! product of its field validators; a union validator tries members in
//! declaration order, with the error policy (`first` vs `all`) fixed per run
//! by configuration.

use crate::config::UnionErrorPolicy;
use crate::discriminate::UnionMode;
use crate::emit::{object_key, EmitCtx};
use crate::schema::{DeclKind, Declaration, TypeRef};

pub fn emit(ctx: &EmitCtx<'_>, qualified: &str, decl: &Declaration) -> String {
    let name = ctx.local_name(qualified);
    let value_name = ctx.validator_name(qualified);

    let body = match &decl.kind {
        DeclKind::Record { fields } => {
            let mut out = "rt.object({\n".to_string();
            for field in fields {
                let expr = if field.optional && !matches!(field.ty, TypeRef::OptionalOf(_)) {
                    format!(
                        "rt.optional({})",
                        validator_expr(ctx, qualified, &field.ty)
                    )
                } else {
                    validator_expr(ctx, qualified, &field.ty)
                };
                out.push_str(&format!("  {}: {expr},\n", object_key(&field.name)));
            }
            out.push_str("})");
            out
        }
        DeclKind::Union { members } => {
            let combinator = match ctx.config.union_errors {
                UnionErrorPolicy::First => "rt.union",
                UnionErrorPolicy::All => "rt.unionAll",
            };
            let tagged = matches!(
                ctx.strategies.mode_of(qualified),
                Some(UnionMode::Tagged { .. })
            );
            let arms: Vec<String> = members
                .iter()
                .map(|m| match m {
                    TypeRef::Named(target) if tagged => lazy_wrap(
                        ctx,
                        qualified,
                        target,
                        ctx.discriminated_validator_ref(qualified, target),
                    ),
                    other => validator_expr(ctx, qualified, other),
                })
                .collect();
            format!("{combinator}(\n  {})", arms.join(",\n  "))
        }
        DeclKind::Singleton => format!("rt.literal('{}')", decl.name),
        DeclKind::Alias { target } => validator_expr(ctx, qualified, target),
        DeclKind::Enum { .. } => format!("rt.oneOf({})", ctx.values_name(qualified)),
    };

    format!("export const {value_name}: rt.Validator<{name}> = {body};")
}

/// Render the validator expression for a type reference as seen from `from`.
pub fn validator_expr(ctx: &EmitCtx<'_>, from: &str, ty: &TypeRef) -> String {
    match ty {
        TypeRef::Str => "rt.string".to_string(),
        TypeRef::Num => "rt.number".to_string(),
        TypeRef::Bool => "rt.boolean".to_string(),
        TypeRef::Date => "rt.isoDate".to_string(),
        TypeRef::Named(target) => {
            lazy_wrap(ctx, from, target, ctx.validator_ref(from, target))
        }
        TypeRef::ArrayOf(item) => format!("rt.array({})", validator_expr(ctx, from, item)),
        TypeRef::SetOf(item) => format!("rt.set({})", validator_expr(ctx, from, item)),
        TypeRef::TupleOf(elems) => {
            let parts: Vec<String> = elems.iter().map(|e| validator_expr(ctx, from, e)).collect();
            format!("rt.tuple([{}])", parts.join(", "))
        }
        TypeRef::DictOf { key, value } => format!(
            "rt.dict({}, {})",
            validator_expr(ctx, from, key),
            validator_expr(ctx, from, value)
        ),
        TypeRef::OptionalOf(item) => format!("rt.optional({})", validator_expr(ctx, from, item)),
        TypeRef::Param(p) => {
            format!("rt.unknown /* unsupported type parameter '{p}' */")
        }
    }
}

/// Validator values referenced before their module-evaluation slot (self,
/// forward and cyclic references) go through `rt.lazy`.
fn lazy_wrap(ctx: &EmitCtx<'_>, from: &str, target: &str, reference: String) -> String {
    if ctx.is_forward(from, target) {
        format!("rt.lazy(() => {reference})")
    } else {
        reference
    }
}

/// The combinator runtime the emitted validators compose. Written once per
/// output target by the module writer.
pub const RUNTIME: &str = r#"export type VError = { path: string; message: string };

export type VResult<T> =
  | { ok: true; value: T }
  | { ok: false; errors: ReadonlyArray<VError> };

/// A composable parser: returns the coerced value, or structured errors with
/// dotted/bracketed paths relative to the root input.
export type Validator<T> = (input: unknown, path?: string) => VResult<T>;

const failure = (path: string, message: string): { ok: false; errors: ReadonlyArray<VError> } =>
  ({ ok: false, errors: [{ path, message }] });

export const string: Validator<string> = (input, path = '') =>
  ((typeof input) === 'string')
    ? { ok: true, value: input as string }
    : failure(path, 'expected a string');

export const number: Validator<number> = (input, path = '') =>
  ((typeof input) === 'number')
    ? { ok: true, value: input as number }
    : failure(path, 'expected a number');

export const boolean: Validator<boolean> = (input, path = '') =>
  ((typeof input) === 'boolean')
    ? { ok: true, value: input as boolean }
    : failure(path, 'expected a boolean');

export const isoDate: Validator<Date> = (input, path = '') => {
  if (input instanceof Date) {
    return { ok: true, value: input };
  }
  if ((typeof input) === 'string') {
    const parsed = new Date(input as string);
    if (!isNaN(parsed.getTime())) {
      return { ok: true, value: parsed };
    }
  }
  return failure(path, 'expected a Date or ISO-8601 string');
};

export const unknown: Validator<unknown> = (input, _path = '') =>
  ({ ok: true, value: input });

export function literal<T extends string>(expected: T): Validator<T> {
  return (input, path = '') =>
    input === expected
      ? { ok: true, value: expected }
      : failure(path, "expected literal '" + expected + "'");
}

export function oneOf<T extends string>(values: ReadonlyArray<T>): Validator<T> {
  return (input, path = '') =>
    values.includes(input as T)
      ? { ok: true, value: input as T }
      : failure(path, 'expected one of: ' + values.join(', '));
}

export function optional<T>(item: Validator<T>): Validator<T | undefined> {
  return (input, path = '') =>
    (input === undefined || input === null)
      ? { ok: true, value: undefined }
      : item(input, path);
}

export function array<T>(item: Validator<T>): Validator<ReadonlyArray<T>> {
  return (input, path = '') => {
    if (!Array.isArray(input)) {
      return failure(path, 'expected an array');
    }
    const out: T[] = [];
    const errors: VError[] = [];
    input.forEach((elmt, i) => {
      const r = item(elmt, path + '[' + i + ']');
      if (r.ok) { out.push(r.value); } else { errors.push(...r.errors); }
    });
    return (errors.length === 0) ? { ok: true, value: out } : { ok: false, errors };
  };
}

export function set<T>(item: Validator<T>): Validator<ReadonlySet<T>> {
  const items = array(item);
  return (input, path = '') => {
    const source = (input instanceof Set) ? Array.from(input) : input;
    const r = items(source, path);
    return r.ok ? { ok: true, value: new Set(r.value) } : r;
  };
}

export function tuple<T extends ReadonlyArray<unknown>>(
  items: { [K in keyof T]: Validator<T[K]> }
): Validator<T> {
  return (input, path = '') => {
    if (!Array.isArray(input)) {
      return failure(path, 'expected an array');
    }
    if (input.length !== items.length) {
      return failure(path, 'expected ' + items.length + ' element(s)');
    }
    const out: unknown[] = [];
    const errors: VError[] = [];
    (items as ReadonlyArray<Validator<unknown>>).forEach((item, i) => {
      const r = item(input[i], path + '[' + i + ']');
      if (r.ok) { out.push(r.value); } else { errors.push(...r.errors); }
    });
    return (errors.length === 0)
      ? { ok: true, value: out as unknown as T }
      : { ok: false, errors };
  };
}

export function dict<K extends string, V>(
  key: Validator<K>,
  value: Validator<V>
): Validator<Readonly<Partial<Record<K, V>>>> {
  return (input, path = '') => {
    if (input === null || ((typeof input) !== 'object') || Array.isArray(input)) {
      return failure(path, 'expected an object');
    }
    const out: Partial<Record<K, V>> = {};
    const errors: VError[] = [];
    for (const [k, v] of Object.entries(input as object)) {
      const at = path + '[' + JSON.stringify(k) + ']';
      const kr = key(k, at);
      const vr = value(v, at);
      if (kr.ok && vr.ok) {
        out[kr.value] = vr.value;
      } else {
        if (!kr.ok) { errors.push(...kr.errors); }
        if (!vr.ok) { errors.push(...vr.errors); }
      }
    }
    return (errors.length === 0) ? { ok: true, value: out } : { ok: false, errors };
  };
}

export function object<T>(
  fields: { [K in keyof T]: Validator<T[K]> }
): Validator<T> {
  return (input, path = '') => {
    if (input === null || ((typeof input) !== 'object') || Array.isArray(input)) {
      return failure(path, 'expected an object');
    }
    const source = input as Record<string, unknown>;
    const out: Record<string, unknown> = {};
    const errors: VError[] = [];
    for (const name of Object.keys(fields) as Array<Extract<keyof T, string>>) {
      const r = fields[name](source[name], (path === '') ? name : path + '.' + name);
      if (r.ok) {
        if (r.value !== undefined) { out[name] = r.value; }
      } else {
        errors.push(...r.errors);
      }
    }
    return (errors.length === 0)
      ? { ok: true, value: out as T }
      : { ok: false, errors };
  };
}

export function intersection<A, B>(a: Validator<A>, b: Validator<B>): Validator<A & B> {
  return (input, path = '') => {
    const ra = a(input, path);
    if (!ra.ok) { return ra; }
    const rb = b(input, path);
    if (!rb.ok) { return rb; }
    return {
      ok: true,
      value: { ...(ra.value as object), ...(rb.value as object) } as A & B,
    };
  };
}

// Tries members in declaration order; reports the first failure when none match.
export function union<T>(...members: Array<Validator<T>>): Validator<T> {
  return (input, path = '') => {
    let first: VResult<T> | undefined;
    for (const member of members) {
      const r = member(input, path);
      if (r.ok) { return r; }
      if (first === undefined) { first = r; }
    }
    return (first !== undefined) ? first : failure(path, 'union has no members');
  };
}

// Tries members in declaration order; reports every member's failures.
export function unionAll<T>(...members: Array<Validator<T>>): Validator<T> {
  return (input, path = '') => {
    const errors: VError[] = [];
    for (const member of members) {
      const r = member(input, path);
      if (r.ok) { return r; }
      errors.push(...r.errors);
    }
    return { ok: false, errors };
  };
}

export function lazy<T>(thunk: () => Validator<T>): Validator<T> {
  return (input, path = '') => thunk()(input, path);
}
"#;
