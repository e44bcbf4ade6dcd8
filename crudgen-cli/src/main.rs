//! # crudgen
//!
//! Generate FastAPI CRUD modules (schema, model, repository, routes) from a
//! model name and field descriptors, and wire them into the application.
//!
//! ## Usage
//!
//! ```bash
//! # Generate a Book resource
//! crudgen generate Book title:str:length=200 author:str year:int:nullable
//!
//! # Preview without touching the filesystem
//! crudgen generate Book title:str --dry-run
//!
//! # Register routers above a marker comment instead of at the module end
//! crudgen generate Book title:str --wiring marker
//!
//! # Machine-readable report
//! crudgen generate Book title:str --json
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crudgen_cli::{
    config::{CliArgs, ConfigManager, WiringMode},
    error::CliError,
    formatter::FormatterOutcome,
    pipeline::{FileStatus, GenerateRequest, GenerationReport, Pipeline},
};

#[derive(Parser)]
#[command(name = "crudgen")]
#[command(author, version, about = "Generate FastAPI CRUD modules from field descriptors", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate schema, model, repository and routes for one model
    Generate {
        /// Model class name (e.g. Book)
        model: String,

        /// Field descriptors: name:type[:param[=value],...]
        #[arg(required = true, num_args = 1..)]
        fields: Vec<String>,

        /// Module name (defaults to the snake_case model name)
        #[arg(short, long)]
        module: Option<String>,

        /// Table name (defaults to the module name)
        #[arg(long)]
        table_name: Option<String>,

        /// Path parameter name (defaults to {module}_id)
        #[arg(long)]
        id_param: Option<String>,

        /// Plural used for the route prefix, tag and list handler (defaults to the pluralized module name)
        #[arg(long)]
        plural: Option<String>,

        /// Project root the formatter runs in
        #[arg(long)]
        project_root: Option<PathBuf>,

        /// Source directory, relative to the project root
        #[arg(long)]
        src_dir: Option<PathBuf>,

        /// Application module to register the router in, relative to the project root
        #[arg(long)]
        app_file: Option<PathBuf>,

        /// Name of the FastAPI instance in the application module
        #[arg(long)]
        app_name: Option<String>,

        /// Import package prefix for generated imports (empty for none)
        #[arg(long)]
        package: Option<String>,

        /// How routers are registered in the application module
        #[arg(long, value_enum)]
        wiring: Option<WiringMode>,

        /// Skip router and dependency registration
        #[arg(long)]
        no_register: bool,

        /// Replace generated files that already exist
        #[arg(short, long)]
        force: bool,

        /// Preview changes without writing files
        #[arg(long)]
        dry_run: bool,

        /// Skip the external formatter
        #[arg(long)]
        no_format: bool,

        /// Run the formatter through `uv run` when uv is on PATH
        #[arg(long, overrides_with = "no_uv")]
        uv: bool,

        /// Run the formatter directly, without `uv run`
        #[arg(long, overrides_with = "uv")]
        no_uv: bool,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Generate {
            model,
            fields,
            module,
            table_name,
            id_param,
            plural,
            project_root,
            src_dir,
            app_file,
            app_name,
            package,
            wiring,
            no_register,
            force,
            dry_run,
            no_format,
            uv,
            no_uv,
            config,
            json,
        } => {
            let config = ConfigManager::load(config.as_deref())?;
            let config = ConfigManager::merge_cli_args(
                config,
                &CliArgs {
                    project_root,
                    src_dir,
                    app_file,
                    app_name,
                    package,
                    wiring,
                    no_register,
                    no_format,
                    use_uv: match (uv, no_uv) {
                        (true, _) => Some(true),
                        (_, true) => Some(false),
                        _ => None,
                    },
                },
            );
            let request = GenerateRequest {
                model,
                fields,
                module,
                table_name,
                id_param,
                plural,
                force,
                dry_run,
            };
            cmd_generate(Pipeline::new(config), &request, json)
        }
    }
}

/// Generate command implementation.
fn cmd_generate(pipeline: Pipeline, request: &GenerateRequest, json: bool) -> Result<(), CliError> {
    if !json {
        println!(
            "{} {} ({} field(s))",
            "Generating".cyan(),
            request.model.bold(),
            request.fields.len()
        );
    }

    let result = pipeline.run(request);

    let report = match &result {
        Ok(report) => Some(report),
        Err(e) => e.report(),
    };
    if let Some(report) = report {
        if json {
            println!("{}", serde_json::to_string_pretty(report)?);
        } else {
            print_report(report);
        }
    }
    result.map(|_| ())
}

/// Print one line per file, then dry-run previews and the formatter outcome.
fn print_report(report: &GenerationReport) {
    for file in &report.files {
        let label = match &file.status {
            FileStatus::Created => "created".green(),
            FileStatus::Overwritten => "overwritten".yellow(),
            FileStatus::Modified => "modified".green(),
            FileStatus::Unchanged => "unchanged".dimmed(),
            FileStatus::Skipped => "skipped".yellow(),
            FileStatus::Failed(_) => "failed".red(),
        };
        let prefix = if report.dry_run { "[dry-run] " } else { "" };
        println!("  {}{:>11} {}", prefix.yellow(), label, file.path.display());
    }

    if report.dry_run {
        for file in report.files.iter().filter(|f| f.preview.is_some()) {
            println!(
                "\n{} Would write to {}:",
                "[dry-run]".yellow(),
                file.path.display()
            );
            println!("{}", "─".repeat(60).dimmed());
            print!("{}", file.preview.as_deref().unwrap_or_default());
            println!("{}", "─".repeat(60).dimmed());
        }
    }

    match &report.formatter {
        FormatterOutcome::Succeeded => println!("{} formatter passed", "✓".green()),
        FormatterOutcome::Skipped(reason) => {
            println!("{}", format!("  formatter skipped ({})", reason).dimmed())
        }
        FormatterOutcome::Warning(_) => {}
    }
    for warning in report.warnings() {
        println!("{} {}", "Warning:".yellow(), warning);
    }
}

/// Print an error with formatting.
fn print_error(error: &CliError) {
    eprintln!(
        "{} [{}] {}",
        "Error:".red().bold(),
        error.stage(),
        error
    );
}
