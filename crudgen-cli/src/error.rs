//! Error types for the CLI.
//!
//! Every error knows the pipeline [`Stage`] it stopped at, so the operator
//! sees which step failed as well as the offending token or path.

use std::path::PathBuf;

use crudgen::SpecError;
use thiserror::Error;

use crate::pipeline::{GenerationReport, Stage};

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Main error type for CLI operations.
#[derive(Debug, Error)]
pub enum CliError {
    /// The field tokens or model options were rejected.
    #[error("{stage} failed: {source}")]
    Spec {
        stage: Stage,
        #[source]
        source: SpecError,
    },

    /// Error loading configuration.
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    /// A target could not be written; nothing was written for this run.
    #[error("write-artifacts failed: {0}")]
    Write(#[from] WriteError),

    /// An aggregation file could not be edited; nothing was written for this run.
    #[error("apply-wiring-edit failed: {0}")]
    Wiring(#[from] WiringError),

    /// Some files were written and others failed.
    #[error("{stage} failed for {}", format_failures(.failures))]
    Partial {
        stage: Stage,
        failures: Vec<(PathBuf, String)>,
        report: Box<GenerationReport>,
    },

    /// The report could not be serialized.
    #[error("Failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),
}

impl CliError {
    /// Wrap a core error raised at `stage`.
    pub fn spec(stage: Stage, source: SpecError) -> Self {
        Self::Spec { stage, source }
    }

    /// The per-file report of a run that stopped after writing started.
    pub fn report(&self) -> Option<&GenerationReport> {
        match self {
            CliError::Partial { report, .. } => Some(&**report),
            _ => None,
        }
    }

    /// The stage the pipeline stopped at.
    pub fn stage(&self) -> Stage {
        match self {
            CliError::Spec { stage, .. } | CliError::Partial { stage, .. } => *stage,
            CliError::Config(_) => Stage::ParseArgs,
            CliError::Write(_) => Stage::WriteArtifacts,
            CliError::Wiring(_) => Stage::ApplyWiringEdit,
            CliError::Report(_) => Stage::Done,
        }
    }
}

/// Error loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file given with `--config` does not exist.
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid TOML syntax.
    #[error("Invalid TOML in {path}: {message}")]
    InvalidToml { path: PathBuf, message: String },

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// IO error reading config.
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error writing generated files.
#[derive(Debug, Error)]
pub enum WriteError {
    /// A generated file is already present.
    #[error("Refusing to overwrite {path}: file already exists (use --force)")]
    DestinationExists { path: PathBuf },

    /// Failed to create directory.
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write file.
    #[error("Failed to write file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error editing an aggregation file.
#[derive(Debug, Error)]
pub enum WiringError {
    /// The application module to register the router in does not exist.
    #[error("Aggregation file not found: {path}")]
    MissingTarget { path: PathBuf },

    /// The edit could not be placed.
    #[error("Cannot wire {path}: {source}")]
    Edit {
        path: PathBuf,
        #[source]
        source: SpecError,
    },

    /// IO error reading the file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn format_failures(failures: &[(PathBuf, String)]) -> String {
    failures
        .iter()
        .map(|(path, message)| format!("{} ({})", path.display(), message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ConfigError {
    /// Create a not found error.
    pub fn not_found(path: PathBuf) -> Self {
        Self::NotFound { path }
    }

    /// Create an invalid TOML error.
    pub fn invalid_toml(path: PathBuf, message: impl Into<String>) -> Self {
        Self::InvalidToml {
            path,
            message: message.into(),
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_error_names_stage_and_token() {
        let err = CliError::spec(
            Stage::ResolveTypes,
            SpecError::UnknownType {
                type_name: "decimalish".to_string(),
                supported: vec!["str", "int"],
            },
        );
        assert_eq!(err.stage(), Stage::ResolveTypes);
        let message = err.to_string();
        assert!(message.starts_with("resolve-types failed"), "{message}");
        assert!(message.contains("decimalish"));
    }

    #[test]
    fn test_write_error_stage() {
        let err = CliError::from(WriteError::DestinationExists {
            path: PathBuf::from("src/schemas/book.py"),
        });
        assert_eq!(err.stage(), Stage::WriteArtifacts);
        assert!(err.to_string().contains("src/schemas/book.py"));
    }

    #[test]
    fn test_wiring_error_names_anchor() {
        let err = CliError::from(WiringError::Edit {
            path: PathBuf::from("src/api/app.py"),
            source: SpecError::anchor_not_found("app = ..."),
        });
        assert_eq!(err.stage(), Stage::ApplyWiringEdit);
        let message = err.to_string();
        assert!(message.contains("src/api/app.py"));
        assert!(message.contains("app = ..."));
    }
}
