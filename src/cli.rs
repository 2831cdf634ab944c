//! CLI: load schema description → resolve → emit → write (or check only).
use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use crate::config::{GeneratorConfig, OutputLayout, UnionErrorPolicy};
use crate::schema::{Declaration, SchemaModel};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate TypeScript types, predicates and validators from a schema description
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// resolve and emit all artifacts to the output directory (or stdout)
    Generate(GenerateArgs),
    /// validate the schema and print the resolved emission order
    Check(CheckArgs),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// JSON Pointer to select a subnode in each document (e.g. /payload/schema)
    #[arg(long)]
    json_pointer: Option<String>,

    /// jq pre-process filter applied to each document
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// output layout
    #[arg(long, value_enum, default_value = "per-declaration")]
    layout: OutputLayout,

    /// discriminator field injected into tagged union members
    #[arg(long, default_value = "_type")]
    discriminator: String,

    /// disable tagging entirely; record unions fall back to structural mode
    #[arg(long, default_value_t = false)]
    no_discriminator: bool,

    /// skip the is<Name> predicate artifacts
    #[arg(long, default_value_t = false)]
    no_predicates: bool,

    /// skip the validator artifacts (and the emitted runtime)
    #[arg(long, default_value_t = false)]
    no_validators: bool,

    /// also emit the dependencyModules re-export block per file
    #[arg(long, default_value_t = false)]
    dependency_module_exports: bool,

    /// union validator error reporting policy
    #[arg(long, value_enum, default_value = "first")]
    union_errors: UnionErrorPolicy,

    /// prefix for emitted validator values
    #[arg(long, default_value = "validator")]
    validator_prefix: String,

    /// banner text inserted at the top of single-file output
    #[arg(long)]
    prelude: Option<String>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    config: ConfigArgs,

    /// output directory (single-file layout prints to stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    config: ConfigArgs,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl ConfigArgs {
    fn to_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            layout: self.layout,
            discriminator: if self.no_discriminator {
                None
            } else {
                Some(self.discriminator.clone())
            },
            emit_predicates: !self.no_predicates,
            emit_validators: !self.no_validators,
            dependency_module_exports: self.dependency_module_exports,
            union_errors: self.union_errors,
            validator_prefix: self.validator_prefix.clone(),
            prelude: self.prelude.clone(),
        }
    }
}

impl InputSettings {
    /// Load every input document and collect the declarations they carry.
    fn load_declarations(&self) -> Result<Vec<Declaration>> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .context("failed to resolve input file paths")?;
        if source_paths.is_empty() {
            bail!("no input files");
        }

        let mut decls = Vec::new();
        for source_path in source_paths {
            let display = source_path.display().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read schema description `{display}`"))?;
            let document: serde_json::Value = serde_json::from_str(&source)
                .with_context(|| format!("failed to parse JSON in `{display}`"))?;

            let documents = match self.jq_expr.as_deref() {
                None => vec![document],
                Some(expr) => crate::jq_exec::apply_filter(expr, &document)
                    .with_context(|| format!("failed to apply jq expression to `{display}`"))?,
            };

            for document in documents {
                let selected = match self.json_pointer.as_deref() {
                    None => &document,
                    Some(pointer) => document.pointer(pointer).with_context(|| {
                        format!("JSON pointer `{pointer}` matched nothing in `{display}`")
                    })?,
                };
                let parsed = crate::input::parse_document(selected)
                    .with_context(|| format!("invalid schema description in `{display}`"))?;
                decls.extend(parsed);
            }
        }
        Ok(decls)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Generate(target) => {
                let config = target.config.to_config();
                let model = build_model(&target.input_settings)?;
                let generation = crate::generate(&model, &config)?;

                // Summary first: collected warnings must survive a failed
                // write.
                crate::report::print_summary(&generation.warnings);

                match (&target.out, config.layout) {
                    (Some(out), _) => {
                        crate::writer::write_all(&generation.files, out)?;
                        eprintln!(
                            "wrote {} file(s) to {}",
                            generation.files.len(),
                            out.display()
                        );
                    }
                    (None, OutputLayout::SingleFile) => {
                        for file in &generation.files {
                            println!("{}", file.contents);
                        }
                    }
                    (None, OutputLayout::PerDeclaration) => {
                        bail!("per-declaration layout requires --out <DIR>");
                    }
                }

                Ok(())
            }
            Command::Check(target) => {
                // Load, validate and resolve only; nothing is emitted.
                let config = target.config.to_config();
                let model = build_model(&target.input_settings)?;
                let order = crate::resolve::emission_order(&model)?;
                let (_, warnings) = crate::discriminate::decide(&model, &config);

                println!("{} declaration(s), emission order:", order.len());
                for (index, name) in order.iter().enumerate() {
                    println!("  {index:>3}. {name}");
                }

                let module_deps = crate::resolve::module_dependencies(&model);
                if module_deps.values().any(|deps| !deps.is_empty()) {
                    println!("module dependencies:");
                    for (module, deps) in &module_deps {
                        if !deps.is_empty() {
                            let listed: Vec<&str> = deps.iter().map(String::as_str).collect();
                            println!("  {module} -> {}", listed.join(", "));
                        }
                    }
                }

                crate::report::print_summary(&warnings);
                Ok(())
            }
        }
    }
}

fn build_model(input_settings: &InputSettings) -> Result<SchemaModel> {
    let decls = input_settings.load_declarations()?;
    Ok(SchemaModel::build(decls)?)
}

/// Entry point used by `main`: run, and turn any fatal error into a red
/// message plus a non-zero exit.
pub fn run_to_exit_code(interface: &CommandLineInterface) -> i32 {
    match interface.run() {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            1
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

// --------------------------------- Tests ---------------------------------- //

#[cfg(test)]
mod tests {
    use super::*;

    const PARAM_SCHEMA: &str = r#"{ "module": "api", "declarations": [
        { "name": "Box", "record": { "fields": [
            { "name": "value", "type": { "param": "T" } }
        ] } }
    ] }"#;

    const CYCLIC_SCHEMA: &str = r#"{ "module": "api", "declarations": [
        { "name": "A", "record": { "fields": [ { "name": "b", "type": "B" } ] } },
        { "name": "B", "record": { "fields": [ { "name": "a", "type": "A" } ] } }
    ] }"#;

    fn write_input(name: &str, contents: &str) -> PathBuf {
        let path =
            std::env::temp_dir().join(format!("schema-ts-cli-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn parse(args: &[&str]) -> CommandLineInterface {
        CommandLineInterface::try_parse_from(args).unwrap()
    }

    #[test]
    fn failed_write_surfaces_after_the_warning_summary() {
        let input = write_input("box.json", PARAM_SCHEMA);
        // a plain file where the output directory should go, so the write
        // fails after generation (and its warnings) completed
        let blocker = write_input("blocker", "");
        let out = blocker.join("out");

        let interface = parse(&[
            "schema-ts",
            "generate",
            "--input",
            input.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
        ]);
        let err = interface.run().unwrap_err();
        assert!(
            format!("{err:#}").contains("failed to write"),
            "unexpected error: {err:#}"
        );

        let _ = std::fs::remove_file(input);
        let _ = std::fs::remove_file(blocker);
    }

    #[test]
    fn check_passes_a_valid_schema() {
        let input = write_input("valid.json", PARAM_SCHEMA);
        let interface = parse(&["schema-ts", "check", "--input", input.to_str().unwrap()]);
        interface.run().unwrap();
        let _ = std::fs::remove_file(input);
    }

    #[test]
    fn check_rejects_a_cyclic_schema() {
        let input = write_input("cyclic.json", CYCLIC_SCHEMA);
        let interface = parse(&["schema-ts", "check", "--input", input.to_str().unwrap()]);
        let err = interface.run().unwrap_err();
        assert!(
            format!("{err:#}").contains("cyclic dependency"),
            "unexpected error: {err:#}"
        );
        let _ = std::fs::remove_file(input);
    }
}
