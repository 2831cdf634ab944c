//! Per-run warning collection and the end-of-run summary.

use colored::Colorize;

/// A recoverable problem surfaced during resolution or emission. Warnings
/// never abort the run; they are aggregated and printed at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Qualified name of the declaration the warning belongs to.
    pub decl: String,
    /// Offending field, when the warning is field-scoped.
    pub field: Option<String>,
    pub message: String,
}

impl Warning {
    pub fn declaration(decl: impl Into<String>, message: impl Into<String>) -> Self {
        Self { decl: decl.into(), field: None, message: message.into() }
    }

    pub fn field(
        decl: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            decl: decl.into(),
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}.{}: {}", self.decl, field, self.message),
            None => write!(f, "{}: {}", self.decl, self.message),
        }
    }
}

/// Print the aggregate summary to stderr (also on success, per contract).
pub fn print_summary(warnings: &[Warning]) {
    if warnings.is_empty() {
        return;
    }
    eprintln!(
        "{}",
        format!("{} warning(s):", warnings.len()).yellow().bold()
    );
    for w in warnings {
        eprintln!("  {} {w}", "warning:".yellow());
    }
}
