//! Generation run configuration.
//!
//! Everything here is plain data so an embedding build tool can drive the
//! library without going through the CLI (serde-deserializable).

use serde::Deserialize;

/// How emitted declarations are grouped into output files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OutputLayout {
    /// One `.ts` file per declaration, cross-references as imports.
    PerDeclaration,
    /// Everything concatenated into a single file, in emission order.
    SingleFile,
}

/// Union validator error reporting policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum UnionErrorPolicy {
    /// Report only the first member's failure (short-circuit).
    First,
    /// Report every member's failures, concatenated.
    All,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorConfig {
    pub layout: OutputLayout,

    /// Discriminator field injected into tagged union members.
    /// `None` disables tagging: record unions fall back to structural
    /// (shape-based) discrimination.
    pub discriminator: Option<String>,

    pub emit_predicates: bool,
    pub emit_validators: bool,

    /// Also emit the `dependencyModules` re-export block per file.
    pub dependency_module_exports: bool,

    pub union_errors: UnionErrorPolicy,

    /// Prefix for emitted validator values (`validator` -> `validatorBar`).
    pub validator_prefix: String,

    /// Extra banner text inserted after the generated header in single-file
    /// output.
    pub prelude: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            layout: OutputLayout::PerDeclaration,
            discriminator: Some("_type".to_string()),
            emit_predicates: true,
            emit_validators: true,
            dependency_module_exports: false,
            union_errors: UnionErrorPolicy::First,
            validator_prefix: "validator".to_string(),
            prelude: None,
        }
    }
}
