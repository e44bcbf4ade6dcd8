//! # crudgen-cli
//!
//! CLI library for generating FastAPI CRUD modules from field descriptors.
//!
//! This crate drives [`crudgen`]: it loads configuration, runs the
//! generation pipeline, writes the generated modules and wires them into
//! the application's aggregation files.
//!
//! ## Architecture
//!
//! - [`config`] - Configuration management and TOML parsing
//! - [`pipeline`] - Stage orchestration and the generation report
//! - [`writer`] - File output, package markers and dry-run support
//! - [`formatter`] - The external lint/format pass
//! - [`error`] - Error types and handling

pub mod config;
pub mod error;
pub mod formatter;
pub mod pipeline;
pub mod writer;

// Re-export main types for convenience
pub use config::{CliArgs, Config, ConfigManager, WiringMode};
pub use error::{CliError, CliResult, ConfigError, WiringError, WriteError};
pub use formatter::{Formatter, FormatterOutcome};
pub use pipeline::{FileReport, FileRole, FileStatus, GenerateRequest, GenerationReport, Pipeline, Stage};
pub use writer::{FileWriter, WriteResult};
