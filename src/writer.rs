//! Module writer: partitions emitted declarations into output files and
//! threads the cross-file imports.
//!
//! All output is buffered in memory first. Writing goes through per-file
//! temp siblings renamed into place only after every write succeeded, so a
//! failed run never leaves a partially updated output tree.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::OutputLayout;
use crate::emit::{validator, Artifact, EmitCtx};

pub const RUNTIME_STEM: &str = "_runtime";

/// I/O failure writing output. Fatal, reported with the offending path.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to write `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct GeneratedFile {
    /// Path relative to the output directory.
    pub path: PathBuf,
    pub contents: String,
}

/// Group the ordered artifacts into output files per the configured layout.
pub fn layout_files(ctx: &EmitCtx<'_>, artifacts: &[Artifact], header: &str) -> Vec<GeneratedFile> {
    match ctx.config.layout {
        OutputLayout::PerDeclaration => per_declaration(ctx, artifacts, header),
        OutputLayout::SingleFile => single_file(ctx, artifacts, header),
    }
}

fn per_declaration(
    ctx: &EmitCtx<'_>,
    artifacts: &[Artifact],
    header: &str,
) -> Vec<GeneratedFile> {
    let mut files = Vec::with_capacity(artifacts.len() + 1);
    let needs_runtime = artifacts.iter().any(|a| a.uses_runtime);

    if needs_runtime {
        files.push(GeneratedFile {
            path: PathBuf::from(format!("{RUNTIME_STEM}.ts")),
            contents: format!("{header}\n{}", validator::RUNTIME),
        });
    }

    for artifact in artifacts {
        let mut out = String::new();
        out.push_str(header);
        out.push('\n');

        if artifact.uses_runtime {
            out.push_str(&format!("import * as rt from './{RUNTIME_STEM}';\n"));
        }

        if ctx.config.dependency_module_exports {
            out.push_str("\ndeclare var exports: any;\n\n");
            out.push_str(&format!(
                "export const {} = exports;\n",
                ctx.ns_alias(&artifact.qualified)
            ));
        }

        // de-duplicated, alias-sorted imports
        let imports: BTreeMap<String, &str> = artifact
            .deps
            .iter()
            .map(|dep| (ctx.ns_alias(dep), ctx.file_stem(dep)))
            .collect();
        if !imports.is_empty() {
            out.push('\n');
            for (alias, stem) in &imports {
                out.push_str(&format!("import * as {alias} from './{stem}';\n"));
            }
        }

        if ctx.config.dependency_module_exports && !imports.is_empty() {
            out.push_str("\nexport const dependencyModules = [\n");
            for alias in imports.keys() {
                out.push_str(&format!("  {alias},\n"));
            }
            out.push_str("];\n");
        }

        for section in artifact.sections() {
            out.push('\n');
            out.push_str(section);
            out.push('\n');
        }

        files.push(GeneratedFile {
            path: PathBuf::from(format!("{}.ts", ctx.file_stem(&artifact.qualified))),
            contents: out,
        });
    }

    files
}

fn single_file(ctx: &EmitCtx<'_>, artifacts: &[Artifact], header: &str) -> Vec<GeneratedFile> {
    let mut out = String::new();
    out.push_str(header);
    out.push('\n');

    if let Some(prelude) = &ctx.config.prelude {
        out.push('\n');
        out.push_str(prelude);
        if !prelude.ends_with('\n') {
            out.push('\n');
        }
    }

    if artifacts.iter().any(|a| a.uses_runtime) {
        // Inline the combinator runtime once, namespaced so emitted `rt.`
        // references read the same in both layouts.
        out.push_str("\nnamespace rt {\n");
        out.push_str(validator::RUNTIME);
        out.push_str("}\n");
    }

    for artifact in artifacts {
        if ctx.config.dependency_module_exports {
            out.push_str(&format!(
                "\nexport const {} = {{ /* single-file layout: all exports in-module */ }};\n",
                ctx.ns_alias(&artifact.qualified)
            ));
        }
        for section in artifact.sections() {
            out.push('\n');
            out.push_str(section);
            out.push('\n');
        }
    }

    vec![GeneratedFile { path: PathBuf::from("generated.ts"), contents: out }]
}

/// Write every buffered file under `out_dir`, all-or-nothing: temp siblings
/// first, renames only once every temp write succeeded.
pub fn write_all(files: &[GeneratedFile], out_dir: &Path) -> Result<(), WriteError> {
    let io_err = |path: &Path, source: std::io::Error| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    fs::create_dir_all(out_dir).map_err(|e| io_err(out_dir, e))?;

    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(files.len());
    for file in files {
        let target = out_dir.join(&file.path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let tmp = target.with_extension("ts.tmp");
        if let Err(e) = fs::write(&tmp, &file.contents) {
            cleanup(&staged);
            return Err(io_err(&tmp, e));
        }
        staged.push((tmp, target));
    }

    for (tmp, target) in &staged {
        if let Err(e) = fs::rename(tmp, target) {
            cleanup(&staged);
            return Err(io_err(target, e));
        }
    }

    Ok(())
}

fn cleanup(staged: &[(PathBuf, PathBuf)]) {
    for (tmp, _) in staged {
        let _ = fs::remove_file(tmp);
    }
}

// --------------------------------- Tests ---------------------------------- //
