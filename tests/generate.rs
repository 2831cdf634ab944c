//! End-to-end generation scenarios over the public API: input documents in,
//! generated TypeScript text out.

use schema_ts::config::{GeneratorConfig, OutputLayout, UnionErrorPolicy};
use schema_ts::input;
use schema_ts::schema::{DeclKind, Declaration, Field, SchemaModel, TypeRef};
use schema_ts::writer::GeneratedFile;
use serde_json::json;

fn generate(decls: Vec<Declaration>, config: &GeneratorConfig) -> schema_ts::Generation {
    let model = SchemaModel::build(decls).unwrap();
    schema_ts::generate(&model, config).unwrap()
}

fn file<'a>(files: &'a [GeneratedFile], name: &str) -> &'a GeneratedFile {
    files
        .iter()
        .find(|f| f.path.to_str() == Some(name))
        .unwrap_or_else(|| {
            let names: Vec<_> = files.iter().map(|f| f.path.display().to_string()).collect();
            panic!("no file `{name}` in {names:?}")
        })
}

fn bar_declarations() -> Vec<Declaration> {
    input::parse_document(&json!({
        "module": "api",
        "declarations": [
            { "name": "Name", "alias": { "type": "string" } },
            { "name": "Bar", "record": { "fields": [
                { "name": "name", "type": "Name" },
                { "name": "amount", "type": "number", "optional": true },
                { "name": "tags", "type": { "array": "string" } },
                { "name": "ids", "type": { "set": "number" } },
                { "name": "created", "type": "date" }
            ] } }
        ]
    }))
    .unwrap()
}

fn transport_declarations() -> Vec<Declaration> {
    input::parse_document(&json!({
        "module": "transport",
        "declarations": [
            { "name": "Transport", "union": { "members": ["BusLine", "TrainLine"] } },
            { "name": "BusLine", "record": { "fields": [
                { "name": "id", "type": "number" },
                { "name": "name", "type": "string" }
            ] } },
            { "name": "TrainLine", "record": { "fields": [
                { "name": "name", "type": "string" },
                { "name": "startStationId", "type": "string" }
            ] } }
        ]
    }))
    .unwrap()
}

// ------------------------- Record with an optional ------------------------- //

#[test]
fn record_artifacts_agree_on_shape() {
    let generation = generate(bar_declarations(), &GeneratorConfig::default());
    let bar = file(&generation.files, "Bar.ts");

    // structural type: optional field gets `?`, collections are readonly
    assert!(bar.contents.contains("export interface Bar {"));
    assert!(bar.contents.contains("name: Name;"));
    assert!(bar.contents.contains("amount?: number;"));
    assert!(bar.contents.contains("tags: ReadonlyArray<string>;"));
    assert!(bar.contents.contains("ids: ReadonlySet<number>;"));
    assert!(bar.contents.contains("created: Date;"));

    // predicate: required checks are bare, the optional one is or-ed away
    assert!(bar.contents.contains("export function isBar(v: any): v is Bar {"));
    assert!(bar.contents.contains("(!v['amount'] || ((typeof v['amount']) === 'number'))"));
    assert!(bar.contents.contains("Array.isArray(v['tags'])"));
    assert!(bar.contents.contains("v['ids'] instanceof Set"));

    // validator mirrors the same fields through combinators
    assert!(bar.contents.contains("export const validatorBar: rt.Validator<Bar> = rt.object({"));
    assert!(bar.contents.contains("amount: rt.optional(rt.number),"));
    assert!(bar.contents.contains("tags: rt.array(rt.string),"));
    assert!(bar.contents.contains("created: rt.isoDate,"));
}

#[test]
fn alias_file_precedes_its_dependent() {
    let generation = generate(bar_declarations(), &GeneratorConfig::default());
    let name_at = generation.order.iter().position(|n| n == "api.Name").unwrap();
    let bar_at = generation.order.iter().position(|n| n == "api.Bar").unwrap();
    assert!(name_at < bar_at);

    let name = file(&generation.files, "Name.ts");
    assert!(name.contents.contains("export type Name = string;"));
    assert!(name.contents.contains("export const validatorName: rt.Validator<Name> = rt.string;"));
}

// ------------------------------ Tagged union ------------------------------- //

#[test]
fn tagged_union_emits_discriminated_companions() {
    let generation = generate(transport_declarations(), &GeneratorConfig::default());

    let transport = file(&generation.files, "Transport.ts");
    assert!(transport.contents.contains(
        "export type Transport =\n  nsBusLine.DiscriminatedBusLine |\n  nsTrainLine.DiscriminatedTrainLine;"
    ));
    assert!(transport.contents.contains(
        "export function isTransport(v: any): v is Transport {"
    ));
    // members are declared after the union, so validator refs are lazy
    assert!(transport
        .contents
        .contains("rt.lazy(() => nsBusLine.validatorDiscriminatedBusLine)"));

    let bus = file(&generation.files, "BusLine.ts");
    assert!(bus
        .contents
        .contains("export type DiscriminatedBusLine = BusLine & { _type: 'BusLine' };"));
    assert!(bus.contents.contains("rt.object({ _type: rt.literal('BusLine') })"));
    assert!(bus.contents.contains(
        "export const discriminatedBusLine: (_: BusLine) => DiscriminatedBusLine ="
    ));
}

#[test]
fn structural_mode_without_discriminator() {
    let config = GeneratorConfig {
        discriminator: None,
        ..Default::default()
    };
    let generation = generate(transport_declarations(), &config);
    let bus = file(&generation.files, "BusLine.ts");
    assert!(!bus.contents.contains("DiscriminatedBusLine"));

    let transport = file(&generation.files, "Transport.ts");
    assert!(!transport.contents.contains("_type"));
    // structural overlap: both members are records, ambiguity check applies
    assert!(transport.contents.contains("nsBusLine.isBusLine(v)"));
}

#[test]
fn union_error_policy_selects_combinator() {
    let first = generate(transport_declarations(), &GeneratorConfig::default());
    assert!(file(&first.files, "Transport.ts").contents.contains("rt.union("));

    let config = GeneratorConfig {
        union_errors: UnionErrorPolicy::All,
        ..Default::default()
    };
    let all = generate(transport_declarations(), &config);
    assert!(file(&all.files, "Transport.ts").contents.contains("rt.unionAll("));
}

// -------------------------------- Cycles ----------------------------------- //

#[test]
fn mutual_embedding_reports_both_members() {
    let decls = input::parse_document(&json!({
        "module": "api",
        "declarations": [
            { "name": "A", "record": { "fields": [ { "name": "b", "type": "B" } ] } },
            { "name": "B", "record": { "fields": [ { "name": "a", "type": "A" } ] } }
        ]
    }))
    .unwrap();
    let model = SchemaModel::build(decls).unwrap();
    let err = schema_ts::generate(&model, &GeneratorConfig::default()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("api.A"), "missing member in: {message}");
    assert!(message.contains("api.B"), "missing member in: {message}");
}

#[test]
fn optional_back_reference_resolves() {
    let decls = input::parse_document(&json!({
        "module": "api",
        "declarations": [
            { "name": "A", "record": { "fields": [ { "name": "b", "type": "B" } ] } },
            { "name": "B", "record": { "fields": [
                { "name": "a", "type": { "optional": "A" }, "optional": true }
            ] } }
        ]
    }))
    .unwrap();
    let model = SchemaModel::build(decls).unwrap();
    let generation = schema_ts::generate(&model, &GeneratorConfig::default()).unwrap();

    // B comes first; A's validator ref from B is a forward ref through rt.lazy
    assert_eq!(generation.order, ["api.B", "api.A"]);
    let b = file(&generation.files, "B.ts");
    assert!(b.contents.contains("rt.lazy(() => nsA.validatorA)"));
}

// -------------------------- Unsupported degradation ------------------------ //

#[test]
fn type_parameter_degrades_with_one_warning() {
    let decls = input::parse_document(&json!({
        "module": "api",
        "declarations": [
            { "name": "Box", "record": { "fields": [
                { "name": "value", "type": { "param": "T" } },
                { "name": "label", "type": "string" }
            ] } }
        ]
    }))
    .unwrap();
    let model = SchemaModel::build(decls).unwrap();
    let generation = schema_ts::generate(&model, &GeneratorConfig::default()).unwrap();

    let boxed = file(&generation.files, "Box.ts");
    assert!(boxed.contents.contains("value: unknown /* unsupported type parameter 'T' */;"));
    assert!(boxed.contents.contains("label: string;"));

    assert_eq!(generation.warnings.len(), 1);
    let warning = generation.warnings[0].to_string();
    assert!(warning.contains("api.Box"), "bad warning: {warning}");
    assert!(warning.contains("value"), "bad warning: {warning}");
}

// ---------------------- Enums, singletons, known values -------------------- //

#[test]
fn enum_and_singleton_artifacts() {
    let decls = input::parse_document(&json!({
        "module": "api",
        "declarations": [
            { "name": "WeekDay", "enum": { "values": ["Mon", "Tue", "Wed"] } },
            { "name": "Hello", "singleton": {} }
        ]
    }))
    .unwrap();
    let generation = generate(decls, &GeneratorConfig::default());

    let weekday = file(&generation.files, "WeekDay.ts");
    assert!(weekday.contents.contains("export type WeekDay = keyof (typeof WeekDayEntries);"));
    assert!(weekday.contents.contains("export const WeekDayValues"));
    assert!(weekday.contents.contains("WeekDayValues.includes(v)"));
    assert!(weekday.contents.contains("rt.oneOf(WeekDayValues)"));

    let hello = file(&generation.files, "Hello.ts");
    assert!(hello.contents.contains("export type Hello = 'Hello';"));
    assert!(hello.contents.contains("export const HelloInhabitant: Hello = 'Hello';"));
    assert!(hello.contents.contains("v === HelloInhabitant"));
    assert!(hello.contents.contains("rt.literal('Hello')"));
}

#[test]
fn flat_union_of_singletons_lists_known_values() {
    let decls = input::parse_document(&json!({
        "module": "api",
        "declarations": [
            { "name": "Lorem", "singleton": {} },
            { "name": "Ipsum", "singleton": {} },
            { "name": "Greeting", "union": { "members": ["Lorem", "Ipsum"] } }
        ]
    }))
    .unwrap();
    let generation = generate(decls, &GeneratorConfig::default());

    let greeting = file(&generation.files, "Greeting.ts");
    assert!(greeting
        .contents
        .contains("export type Greeting =\n  nsLorem.Lorem |\n  nsIpsum.Ipsum;"));
    assert!(greeting.contents.contains("GreetingKnownValues"));
    assert!(greeting.contents.contains("nsLorem.LoremInhabitant"));
    // flat unions carry no discriminated companions
    assert!(!file(&generation.files, "Lorem.ts").contents.contains("Discriminated"));
}

// ------------------------------ Layout modes ------------------------------- //

#[test]
fn single_file_layout_is_self_contained() {
    let config = GeneratorConfig {
        layout: OutputLayout::SingleFile,
        ..Default::default()
    };
    let mut decls = bar_declarations();
    decls.extend(transport_declarations());
    let generation = generate(decls, &config);

    assert_eq!(generation.files.len(), 1);
    let merged = &generation.files[0].contents;
    assert!(generation.files[0].path.to_str() == Some("generated.ts"));
    assert!(merged.contains("namespace rt {"));
    assert!(merged.contains("export interface Bar {"));
    assert!(merged.contains("export type Transport =\n  DiscriminatedBusLine |\n  DiscriminatedTrainLine;"));
    assert!(!merged.contains("import "));
}

#[test]
fn disabled_artifacts_are_absent() {
    let config = GeneratorConfig {
        emit_predicates: false,
        emit_validators: false,
        ..Default::default()
    };
    let generation = generate(bar_declarations(), &config);
    let bar = file(&generation.files, "Bar.ts");
    assert!(bar.contents.contains("export interface Bar {"));
    assert!(!bar.contents.contains("isBar"));
    assert!(!bar.contents.contains("validatorBar"));
    // nothing used the runtime, so it is not written at all
    assert!(generation.files.iter().all(|f| f.path.to_str() != Some("_runtime.ts")));
}

#[test]
fn companions_without_validators_skip_the_runtime() {
    let config = GeneratorConfig {
        emit_validators: false,
        ..Default::default()
    };
    let generation = generate(transport_declarations(), &config);
    // the companion keeps its type and injector, but nothing references rt
    let bus = file(&generation.files, "BusLine.ts");
    assert!(bus.contents.contains("export type DiscriminatedBusLine"));
    assert!(bus.contents.contains("export const discriminatedBusLine"));
    assert!(!bus.contents.contains("validatorDiscriminatedBusLine"));
    assert!(!bus.contents.contains("import * as rt"));
    assert!(generation.files.iter().all(|f| f.path.to_str() != Some("_runtime.ts")));
}

#[test]
fn generated_header_on_every_file() {
    let generation = generate(bar_declarations(), &GeneratorConfig::default());
    for f in &generation.files {
        assert!(
            f.contents.starts_with("// Generated by schema-ts "),
            "missing header in {}",
            f.path.display()
        );
    }
}

#[test]
fn predicate_and_validator_accept_the_same_instances() {
    // The two runtime artifacts are derived from the same fields; spot-check
    // that each field present in the predicate is also guarded in the
    // validator, so they cannot drift apart silently.
    let generation = generate(bar_declarations(), &GeneratorConfig::default());
    let bar = &file(&generation.files, "Bar.ts").contents;
    for field in ["name", "amount", "tags", "ids", "created"] {
        assert!(bar.contains(&format!("v['{field}']")), "predicate misses {field}");
        assert!(bar.contains(&format!("{field}: ")), "validator misses {field}");
    }
}
