//! Pipeline orchestrator.
//!
//! Runs the stages in order: parse, resolve, build, render, write, wire,
//! format. Everything up to rendering is pure. The wiring edits are planned
//! (files read, edits computed) before the first write, so every failure
//! short of an I/O error leaves the filesystem untouched.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crudgen::render::render_all;
use crudgen::{
    parse_field_tokens, ArtifactKind, FieldDescriptor, ModelBuilder, ModelDescriptor,
    ResolvedField, SpecError, StructuredStrategy, WiringEdit, WiringOutcome, WiringStrategy,
};
use serde::Serialize;

use crate::config::{Config, WiringMode};
use crate::error::{CliError, CliResult, WiringError};
use crate::formatter::{Formatter, FormatterOutcome};
use crate::writer::{FileWriter, WriteResult};

/// Module that holds the repository dependency providers.
const DEPENDENCIES_MODULE: &str = "api/repositories/dependencies.py";

/// Package whose `__init__` re-exports every persistence model.
const MODELS_PACKAGE_INIT: &str = "db/models/__init__.py";

/// Steps of one generation run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    ParseArgs,
    ParseFields,
    ResolveTypes,
    BuildIr,
    RenderAll,
    WriteArtifacts,
    ApplyWiringEdit,
    InvokeExternalFormatter,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ParseArgs => "parse-args",
            Stage::ParseFields => "parse-fields",
            Stage::ResolveTypes => "resolve-types",
            Stage::BuildIr => "build-ir",
            Stage::RenderAll => "render-all",
            Stage::WriteArtifacts => "write-artifacts",
            Stage::ApplyWiringEdit => "apply-wiring-edit",
            Stage::InvokeExternalFormatter => "invoke-external-formatter",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// One `generate` invocation.
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    /// Model class name.
    pub model: String,
    /// Field descriptor tokens.
    pub fields: Vec<String>,
    pub module: Option<String>,
    pub table_name: Option<String>,
    pub id_param: Option<String>,
    pub plural: Option<String>,
    /// Replace existing generated files.
    pub force: bool,
    /// Compute everything, write nothing.
    pub dry_run: bool,
}

/// What a file in the report is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    Schema,
    Model,
    Repository,
    Routes,
    /// An `__init__.py` added so the generated module is importable.
    Package,
    /// An existing aggregation file edited to reach the new code.
    Wiring,
}

impl From<ArtifactKind> for FileRole {
    fn from(kind: ArtifactKind) -> Self {
        match kind {
            ArtifactKind::Schema => FileRole::Schema,
            ArtifactKind::Model => FileRole::Model,
            ArtifactKind::Repository => FileRole::Repository,
            ArtifactKind::Routes => FileRole::Routes,
        }
    }
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum FileStatus {
    Created,
    Overwritten,
    Modified,
    Unchanged,
    /// Not attempted because an earlier step failed.
    Skipped,
    Failed(String),
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Created => f.write_str("created"),
            FileStatus::Overwritten => f.write_str("overwritten"),
            FileStatus::Modified => f.write_str("modified"),
            FileStatus::Unchanged => f.write_str("unchanged"),
            FileStatus::Skipped => f.write_str("skipped"),
            FileStatus::Failed(error) => write!(f, "failed: {}", error),
        }
    }
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub role: FileRole,
    #[serde(flatten)]
    pub status: FileStatus,
    /// The content that would be written, in dry-run mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// Everything a run did, in order.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub model: String,
    pub module: String,
    pub fields: Vec<FieldDescriptor>,
    pub dry_run: bool,
    pub wiring: WiringMode,
    pub files: Vec<FileReport>,
    pub formatter: FormatterOutcome,
}

impl GenerationReport {
    fn new(model: &ModelDescriptor, dry_run: bool, wiring: WiringMode) -> Self {
        Self {
            model: model.name.clone(),
            module: model.module.clone(),
            fields: model.fields.iter().map(|f| f.descriptor.clone()).collect(),
            dry_run,
            wiring,
            files: Vec::new(),
            formatter: FormatterOutcome::Skipped("not reached".to_string()),
        }
    }

    fn push(&mut self, path: &Path, role: FileRole, status: FileStatus, preview: Option<String>) {
        self.files.push(FileReport {
            path: path.to_path_buf(),
            role,
            status,
            preview,
        });
    }

    /// Status of the file at `path`, if it is in the report.
    pub fn status_of(&self, path: &Path) -> Option<&FileStatus> {
        self.files
            .iter()
            .find(|file| file.path == path)
            .map(|file| &file.status)
    }

    /// Warnings worth showing even though the run succeeded.
    pub fn warnings(&self) -> Vec<String> {
        match &self.formatter {
            FormatterOutcome::Warning(message) => vec![format!("formatter: {}", message)],
            _ => Vec::new(),
        }
    }
}

/// An aggregation file edit computed before anything is written.
#[derive(Debug)]
struct PlannedEdit {
    path: PathBuf,
    outcome: WiringOutcome,
}

/// Runs one generation request against a configuration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn run(&self, request: &GenerateRequest) -> CliResult<GenerationReport> {
        self.config.validate()?;

        tracing::info!(model = %request.model, fields = request.fields.len(), "parsing field descriptors");
        let descriptors = parse_field_tokens(&request.fields).map_err(|e| {
            let stage = match e {
                SpecError::UnknownType { .. } => Stage::ResolveTypes,
                _ => Stage::ParseFields,
            };
            CliError::spec(stage, e)
        })?;

        let fields = descriptors
            .into_iter()
            .map(ResolvedField::resolve)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CliError::spec(Stage::ResolveTypes, e))?;

        let model = ModelBuilder::new(request.model.as_str())
            .with_module(request.module.clone())
            .with_table_name(request.table_name.clone())
            .with_id_param(request.id_param.clone())
            .with_plural(request.plural.clone())
            .with_package(self.config.python.package.clone())
            .build(fields)
            .map_err(|e| CliError::spec(Stage::BuildIr, e))?;

        tracing::info!(model = %model.name, module = %model.module, "rendering artifacts");
        let artifacts = render_all(&model);

        let planned = self.plan_wiring(&model)?;

        let src_dir = self.config.paths.src_dir();
        let writer = FileWriter::new(request.dry_run).with_force(request.force);
        let targets: Vec<PathBuf> = artifacts.iter().map(|a| src_dir.join(&a.path)).collect();
        writer.preflight(targets.iter().map(PathBuf::as_path))?;

        let mut report = GenerationReport::new(&model, request.dry_run, self.config.wiring.strategy);
        let mut failures: Vec<(PathBuf, String)> = Vec::new();
        let mut packages = BTreeSet::new();

        tracing::info!(dir = %src_dir.display(), dry_run = request.dry_run, "writing artifacts");
        for (artifact, target) in artifacts.iter().zip(&targets) {
            let role = FileRole::from(artifact.kind);
            match writer.ensure_packages(&src_dir, &artifact.path) {
                Ok(created) => {
                    for marker in created {
                        if packages.insert(marker.clone()) {
                            report.push(&marker, FileRole::Package, FileStatus::Created, None);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %target.display(), error = %e, "package setup failed");
                    failures.push((target.clone(), e.to_string()));
                    report.push(target, role, FileStatus::Failed(e.to_string()), None);
                    continue;
                }
            }

            match writer.write_new(target, &artifact.content) {
                Ok(result) => {
                    tracing::debug!(
                        path = %result.path().display(),
                        bytes = result.bytes(),
                        written = result.was_written(),
                        "artifact written"
                    );
                    let status = if result.replaced_existing() {
                        FileStatus::Overwritten
                    } else {
                        FileStatus::Created
                    };
                    let preview = match result {
                        WriteResult::DryRun { content, .. } => Some(content),
                        _ => None,
                    };
                    report.push(target, role, status, preview);
                }
                Err(e) => {
                    tracing::warn!(path = %target.display(), error = %e, "write failed");
                    failures.push((target.clone(), e.to_string()));
                    report.push(target, role, FileStatus::Failed(e.to_string()), None);
                }
            }
        }

        if !failures.is_empty() {
            for edit in &planned {
                report.push(&edit.path, FileRole::Wiring, FileStatus::Skipped, None);
            }
            return Err(partial(Stage::WriteArtifacts, failures, report));
        }

        tracing::info!(edits = planned.len(), "applying wiring edits");
        for edit in planned {
            match edit.outcome {
                WiringOutcome::Unchanged => {
                    report.push(&edit.path, FileRole::Wiring, FileStatus::Unchanged, None)
                }
                WiringOutcome::Modified(content) => match writer.rewrite(&edit.path, &content) {
                    Ok(WriteResult::DryRun { content, .. }) => report.push(
                        &edit.path,
                        FileRole::Wiring,
                        FileStatus::Modified,
                        Some(content),
                    ),
                    Ok(_) => report.push(&edit.path, FileRole::Wiring, FileStatus::Modified, None),
                    Err(e) => {
                        tracing::warn!(path = %edit.path.display(), error = %e, "wiring edit failed");
                        failures.push((edit.path.clone(), e.to_string()));
                        report.push(
                            &edit.path,
                            FileRole::Wiring,
                            FileStatus::Failed(e.to_string()),
                            None,
                        );
                    }
                },
            }
        }

        if !failures.is_empty() {
            return Err(partial(Stage::ApplyWiringEdit, failures, report));
        }

        report.formatter = if request.dry_run {
            FormatterOutcome::Skipped("dry run".to_string())
        } else {
            Formatter::from_config(&self.config.formatter).run(&self.config.paths.project_root)
        };

        tracing::info!(model = %report.model, files = report.files.len(), "generation done");
        Ok(report)
    }

    /// Read every aggregation file this model touches and compute its edit.
    fn plan_wiring(&self, model: &ModelDescriptor) -> Result<Vec<PlannedEdit>, WiringError> {
        let src_dir = self.config.paths.src_dir();
        let mut planned = Vec::new();

        if self.config.wiring.register {
            let app_file = self.config.paths.app_file();
            if !app_file.is_file() {
                return Err(WiringError::MissingTarget { path: app_file });
            }
            let strategy = self.config.wiring.strategy();
            let edit = WiringEdit::router(model, &self.config.wiring.app_name);
            planned.push(plan_edit(&app_file, strategy.as_ref(), &edit)?);

            let dependencies = src_dir.join(DEPENDENCIES_MODULE);
            if dependencies.is_file() {
                let edit = WiringEdit::repository_dependency(model);
                planned.push(plan_edit(&dependencies, &StructuredStrategy, &edit)?);
            }
        }

        let models_init = src_dir.join(MODELS_PACKAGE_INIT);
        if models_init.is_file() {
            let edit = WiringEdit::model_export(model);
            planned.push(plan_edit(&models_init, &StructuredStrategy, &edit)?);
        }

        Ok(planned)
    }
}

fn plan_edit(
    path: &Path,
    strategy: &dyn WiringStrategy,
    edit: &WiringEdit,
) -> Result<PlannedEdit, WiringError> {
    let content = std::fs::read_to_string(path).map_err(|e| WiringError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let outcome = strategy
        .apply(&content, edit)
        .map_err(|source| WiringError::Edit {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!(
        path = %path.display(),
        strategy = strategy.name(),
        modified = outcome.is_modified(),
        "planned wiring edit"
    );
    Ok(PlannedEdit {
        path: path.to_path_buf(),
        outcome,
    })
}

fn partial(stage: Stage, failures: Vec<(PathBuf, String)>, report: GenerationReport) -> CliError {
    CliError::Partial {
        stage,
        failures,
        report: Box::new(report),
    }
}
