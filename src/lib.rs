//! schema-ts: schema-driven multi-artifact TypeScript generator.
//!
//! From a single source-of-truth schema description, derive three
//! synchronized artifacts per declaration — a structural type, a runtime
//! type-guard predicate, and a runtime validator — and place them into
//! output files with correct imports.
//!
//! ```text
//! Schema description      Model            Artifacts            Files
//! ──────────────────   ───────────    ──────────────────    ───────────
//! JSON documents   ──> SchemaModel ─> types / predicates ─> ModuleWriter
//!                       │      │      / validators
//!                       │      └── EmissionOrder (resolve)
//!                       └── UnionStrategies (discriminate)
//! ```
//!
//! The whole run is a single-pass batch transformation: the model is
//! immutable after construction, emission of independent declarations is
//! parallel, and output is buffered and written atomically at the end.

pub mod cli;
pub mod config;
pub mod discriminate;
pub mod emit;
pub mod input;
pub mod jq_exec;
pub mod report;
pub mod resolve;
pub mod schema;
pub mod writer;

use rayon::prelude::*;

use crate::config::GeneratorConfig;
use crate::report::Warning;
use crate::resolve::ResolveError;
use crate::schema::SchemaModel;
use crate::writer::GeneratedFile;

/// The buffered result of a generation run: nothing has touched the
/// filesystem yet.
#[derive(Debug)]
pub struct Generation {
    pub files: Vec<GeneratedFile>,
    pub warnings: Vec<Warning>,
    /// Qualified names in emission order.
    pub order: Vec<String>,
}

/// Resolve, emit and lay out the whole model.
///
/// Fatal resolution problems (genuine non-lazy cycles) abort before any
/// emission. Per-field unsupported types degrade to explicit markers and
/// come back as warnings.
pub fn generate(model: &SchemaModel, config: &GeneratorConfig) -> Result<Generation, ResolveError> {
    let order = resolve::emission_order(model)?;
    let (strategies, mut warnings) = discriminate::decide(model, config);
    let ctx = emit::EmitCtx::new(model, config, &strategies, &order);

    let indexed: Vec<(usize, &String)> = order.iter().enumerate().collect();

    // Emission is embarrassingly parallel; the writer re-sorts by emission
    // index, so completion order does not matter.
    let mut artifacts: Vec<emit::Artifact> = indexed
        .par_iter()
        .map(|(index, qualified)| emit::emit_declaration(&ctx, qualified, *index))
        .collect();
    artifacts.sort_by_key(|a| a.index);

    for artifact in &artifacts {
        warnings.extend(artifact.warnings.iter().cloned());
    }

    let header = generated_header();
    let files = writer::layout_files(&ctx, &artifacts, &header);

    Ok(Generation {
        files,
        warnings,
        order: order.iter().cloned().collect(),
    })
}

fn generated_header() -> String {
    format!(
        "// Generated by schema-ts {} on {}",
        env!("CARGO_PKG_VERSION"),
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    )
}
