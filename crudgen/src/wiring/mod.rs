//! Idempotent edits to the application's aggregation files.
//!
//! A [`WiringEdit`] describes what must be present in a file (an import and
//! optionally a registration statement); a [`WiringStrategy`] decides where
//! missing pieces go. Re-applying an edit to its own output yields
//! [`WiringOutcome::Unchanged`].

mod marker;
mod pymodule;
mod structured;

use std::fmt;

use serde::Serialize;

use crate::error::{SpecError, SpecResult};
use crate::ir::ModelDescriptor;
use crate::render::ArtifactKind;

pub use marker::{MarkerStrategy, DEFAULT_ROUTER_MARKER};
pub use structured::StructuredStrategy;

use pymodule::PyModule;

/// Where a missing import is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportPlacement {
    /// After the last top-level import.
    AfterImports,
    /// At the end of the module, for re-exports that must follow other
    /// definitions.
    ModuleEnd,
}

/// A `from <module> import <name> [as <alias>]` statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSpec {
    pub module: String,
    pub name: String,
    pub alias: Option<String>,
    pub placement: ImportPlacement,
    /// Trailing comment written after the statement.
    pub comment: Option<String>,
}

impl ImportSpec {
    /// The name the import binds in the module namespace.
    pub fn bound_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn statement(&self) -> String {
        let statement = match &self.alias {
            Some(alias) => format!("from {} import {} as {}", self.module, self.name, alias),
            None => format!("from {} import {}", self.module, self.name),
        };
        match &self.comment {
            Some(comment) => format!("{}  # {}", statement, comment),
            None => statement,
        }
    }
}

/// How an existing registration is recognized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationProbe {
    /// `<callee>(<argument>, ...)` anywhere in the module.
    Call { callee: String, argument: String },
    /// `def <name>(` or `async def <name>(`.
    Definition(String),
}

/// A statement that makes the imported name reachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    /// Source text inserted when the probe finds nothing.
    pub text: String,
    pub probe: RegistrationProbe,
    /// A compound statement that needs blank-line separation.
    pub block: bool,
}

/// A top-level statement that must exist before an edit is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// `<name> = ...` or `<name>: T = ...`.
    Assignment(String),
    /// `def <name>(...)`.
    Definition(String),
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anchor::Assignment(name) => write!(f, "{} = ...", name),
            Anchor::Definition(name) => write!(f, "def {}(...)", name),
        }
    }
}

/// Everything one aggregation file must contain for a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WiringEdit {
    pub import: ImportSpec,
    pub registration: Option<Registration>,
    pub anchor: Option<Anchor>,
}

impl WiringEdit {
    /// Import the model's router and include it on the application.
    pub fn router(model: &ModelDescriptor, app_name: &str) -> Self {
        let alias = format!("{}_router", model.module);
        let callee = format!("{}.include_router", app_name);
        Self {
            import: ImportSpec {
                module: model.import_path(&ArtifactKind::Routes.module_path(&model.module)),
                name: "router".to_string(),
                alias: Some(alias.clone()),
                placement: ImportPlacement::AfterImports,
                // The application module may create the app before importing routers.
                comment: Some("noqa: E402".to_string()),
            },
            registration: Some(Registration {
                text: format!("{}({})", callee, alias),
                probe: RegistrationProbe::Call {
                    callee,
                    argument: alias,
                },
                block: false,
            }),
            anchor: Some(Anchor::Assignment(app_name.to_string())),
        }
    }

    /// Import the repository and define its `get_<module>_repository`
    /// dependency next to `get_storage`.
    pub fn repository_dependency(model: &ModelDescriptor) -> Self {
        let class = model.repository_class();
        let function = format!("get_{}_repository", model.module);
        let text = format!(
            "def {function}(\n    storage: AbstractSQLAlchemyStorage = Depends(get_storage),\n) -> {class}:\n    return {class}(storage)\n"
        );
        Self {
            import: ImportSpec {
                module: model.import_path(&ArtifactKind::Repository.module_path(&model.module)),
                name: class,
                alias: None,
                placement: ImportPlacement::AfterImports,
                comment: None,
            },
            registration: Some(Registration {
                text,
                probe: RegistrationProbe::Definition(function),
                block: true,
            }),
            anchor: Some(Anchor::Definition("get_storage".to_string())),
        }
    }

    /// Re-export the persistence model from the models package so the
    /// metadata sees its table.
    pub fn model_export(model: &ModelDescriptor) -> Self {
        Self {
            import: ImportSpec {
                module: model.import_path(&ArtifactKind::Model.module_path(&model.module)),
                name: model.name.clone(),
                alias: None,
                placement: ImportPlacement::ModuleEnd,
                comment: None,
            },
            registration: None,
            anchor: None,
        }
    }
}

/// Result of applying an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WiringOutcome {
    /// Everything was already present.
    Unchanged,
    /// The new file content.
    Modified(String),
}

impl WiringOutcome {
    pub fn is_modified(&self) -> bool {
        matches!(self, WiringOutcome::Modified(_))
    }
}

/// Placement policy for the registration statement.
pub trait WiringStrategy {
    /// Short name for logs and reports.
    fn name(&self) -> &'static str;

    /// Return the content with any missing import or registration added.
    fn apply(&self, content: &str, edit: &WiringEdit) -> SpecResult<WiringOutcome>;
}

/// Queue the import if it is missing.
fn ensure_import(module: &mut PyModule, import: &ImportSpec) {
    if module.has_import(import) {
        return;
    }
    match import.placement {
        ImportPlacement::AfterImports => {
            let at = module.import_line();
            module.insert(at, "", &import.statement());
        }
        ImportPlacement::ModuleEnd => module.append(&import.statement(), false),
    }
}

/// Whether the edit still needs its registration.
fn missing_registration<'a>(module: &PyModule, edit: &'a WiringEdit) -> Option<&'a Registration> {
    edit.registration
        .as_ref()
        .filter(|registration| !module.has_registration(&registration.probe))
}

fn require_anchor(module: &PyModule, anchor: Option<&Anchor>) -> SpecResult<()> {
    match anchor {
        Some(anchor) if !module.has_anchor(anchor) => {
            Err(SpecError::anchor_not_found(anchor.to_string()))
        }
        _ => Ok(()),
    }
}

fn outcome(content: &str, module: PyModule) -> WiringOutcome {
    if !module.is_edited() {
        return WiringOutcome::Unchanged;
    }
    let updated = module.finish();
    if updated == content {
        WiringOutcome::Unchanged
    } else {
        WiringOutcome::Modified(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::test_support;

    #[test]
    fn test_router_edit() {
        let edit = WiringEdit::router(&test_support::book(), "app");
        assert_eq!(
            edit.import.statement(),
            "from src.api.book.routes import router as book_router  # noqa: E402"
        );
        assert_eq!(edit.import.bound_name(), "book_router");
        let registration = edit.registration.unwrap();
        assert_eq!(registration.text, "app.include_router(book_router)");
        assert_eq!(edit.anchor.unwrap().to_string(), "app = ...");
    }

    #[test]
    fn test_repository_dependency_edit() {
        let edit = WiringEdit::repository_dependency(&test_support::book());
        assert_eq!(
            edit.import.statement(),
            "from src.db.repositories.book import BookRepository"
        );
        let registration = edit.registration.unwrap();
        assert!(registration.block);
        assert_eq!(
            registration.text,
            "def get_book_repository(\n    storage: AbstractSQLAlchemyStorage = Depends(get_storage),\n) -> BookRepository:\n    return BookRepository(storage)\n"
        );
    }

    #[test]
    fn test_model_export_edit() {
        let edit = WiringEdit::model_export(&test_support::book());
        assert_eq!(edit.import.statement(), "from src.db.models.book import Book");
        assert_eq!(edit.import.placement, ImportPlacement::ModuleEnd);
        assert!(edit.registration.is_none());
    }

    #[test]
    fn test_model_export_appends_once() {
        let edit = WiringEdit::model_export(&test_support::book());
        let content = "from sqlalchemy.orm import DeclarativeBase\n\n\nclass Base(DeclarativeBase):\n    pass\n";
        let WiringOutcome::Modified(updated) = StructuredStrategy.apply(content, &edit).unwrap()
        else {
            panic!("expected a modification");
        };
        assert_eq!(
            updated,
            "from sqlalchemy.orm import DeclarativeBase\n\n\nclass Base(DeclarativeBase):\n    pass\n\n\nfrom src.db.models.book import Book\n"
        );
        assert_eq!(
            StructuredStrategy.apply(&updated, &edit).unwrap(),
            WiringOutcome::Unchanged
        );
    }
}
