//! Optional jq pre-processing of schema description documents.
//!
//! Build pipelines sometimes wrap the schema description in envelopes
//! (tool metadata, arrays of documents); `--jq-expr` lets the caller peel
//! those off before parsing.

use anyhow::{anyhow, Context as _, Result};
use jaq_core::{compile::Undefined, load, Compiler, Ctx, RcIter};
use jaq_json::Val;
use serde_json::Value;

/// Apply `filter_src` to `input`, returning every produced document.
pub fn apply_filter(filter_src: &str, input: &Value) -> Result<Vec<Value>> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader.load(&arena, program).map_err(parse_errors)?;

    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(undefined_errors)?;

    let inputs = RcIter::new(core::iter::empty());
    let mut outputs = Vec::new();
    for item in filter.run((Ctx::new([], &inputs), Val::from(input.clone()))) {
        let val = item.map_err(|e| anyhow!("jq filter failed: {e:?}"))?;
        let doc: Value = serde_json::from_str(&format!("{val}"))
            .context("jq filter produced non-JSON output")?;
        outputs.push(doc);
    }
    Ok(outputs)
}

fn parse_errors(errs: Vec<(load::File<&str, ()>, load::Error<&str>)>) -> anyhow::Error {
    let mut s = String::new();
    for (file, err) in errs {
        s.push_str(&format!("jq parse error: {err:?} in `{}`\n", file.code));
    }
    anyhow!(s)
}

fn undefined_errors(
    errs: Vec<(load::File<&str, ()>, Vec<(&str, Undefined)>)>,
) -> anyhow::Error {
    let mut s = String::new();
    for (file, list) in errs {
        for (name, undef) in list {
            s.push_str(&format!(
                "jq undefined `{name}`: {undef:?} in `{}`\n",
                file.code
            ));
        }
    }
    anyhow!(s)
}
