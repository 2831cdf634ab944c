//! Development driver: builds a small demo model in code and prints every
//! generated file to stdout. Handy for eyeballing emitter output without
//! wiring up input documents.

use schema_ts::config::GeneratorConfig;
use schema_ts::report;
use schema_ts::schema::{DeclKind, Declaration, Field, SchemaModel, TypeRef};

fn demo_declarations() -> Vec<Declaration> {
    vec![
        Declaration {
            module: "demo".into(),
            name: "Name".into(),
            kind: DeclKind::Alias { target: TypeRef::Str },
        },
        Declaration {
            module: "demo".into(),
            name: "Bar".into(),
            kind: DeclKind::Record {
                fields: vec![
                    Field::required("name", TypeRef::Named("Name".into())),
                    Field::optional("amount", TypeRef::Num),
                    Field::required("tags", TypeRef::ArrayOf(Box::new(TypeRef::Str))),
                ],
            },
        },
        Declaration {
            module: "demo".into(),
            name: "BusLine".into(),
            kind: DeclKind::Record {
                fields: vec![
                    Field::required("id", TypeRef::Num),
                    Field::required("stopIds", TypeRef::SetOf(Box::new(TypeRef::Str))),
                ],
            },
        },
        Declaration {
            module: "demo".into(),
            name: "TrainLine".into(),
            kind: DeclKind::Record {
                fields: vec![
                    Field::required("name", TypeRef::Str),
                    Field::required("startStationId", TypeRef::Str),
                ],
            },
        },
        Declaration {
            module: "demo".into(),
            name: "Transport".into(),
            kind: DeclKind::Union {
                members: vec![
                    TypeRef::Named("BusLine".into()),
                    TypeRef::Named("TrainLine".into()),
                ],
            },
        },
        Declaration {
            module: "demo".into(),
            name: "WeekDay".into(),
            kind: DeclKind::Enum {
                values: vec!["Mon".into(), "Tue".into(), "Wed".into()],
            },
        },
    ]
}

fn main() {
    let model = match SchemaModel::build(demo_declarations()) {
        Ok(model) => model,
        Err(error) => {
            eprintln!("demo model is broken: {error}");
            std::process::exit(1);
        }
    };

    let config = GeneratorConfig::default();
    match schema_ts::generate(&model, &config) {
        Ok(generation) => {
            for file in &generation.files {
                println!("// ==== {} ====", file.path.display());
                println!("{}", file.contents);
            }
            report::print_summary(&generation.warnings);
        }
        Err(error) => {
            eprintln!("generation failed: {error}");
            std::process::exit(1);
        }
    }
}
