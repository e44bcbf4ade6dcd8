//! Registration appended after the module's last statement.

use super::{
    ensure_import, missing_registration, outcome, require_anchor, PyModule, WiringEdit,
    WiringOutcome, WiringStrategy,
};
use crate::error::SpecResult;

/// Works from the module's statement structure instead of a marker: the
/// edit's anchor statement must exist, imports follow the last top-level
/// import and registrations are appended at module end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructuredStrategy;

impl WiringStrategy for StructuredStrategy {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn apply(&self, content: &str, edit: &WiringEdit) -> SpecResult<WiringOutcome> {
        let mut module = PyModule::parse(content);
        let registration = missing_registration(&module, edit);
        let import_missing = !module.has_import(&edit.import);
        if registration.is_none() && !import_missing {
            return Ok(WiringOutcome::Unchanged);
        }

        require_anchor(&module, edit.anchor.as_ref())?;
        ensure_import(&mut module, &edit.import);
        if let Some(registration) = registration {
            module.append(&registration.text, registration.block);
        }

        Ok(outcome(content, module))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpecError;
    use crate::render::test_support;

    #[test]
    fn test_router_appended_at_end() {
        let content = "\"\"\"Application.\"\"\"\n\nfrom fastapi import FastAPI\n\napp = FastAPI(\n    title=\"shop\",\n)\n";
        let edit = WiringEdit::router(&test_support::book(), "app");
        let outcome = StructuredStrategy.apply(content, &edit).unwrap();
        assert_eq!(
            outcome,
            WiringOutcome::Modified(
                "\"\"\"Application.\"\"\"\n\nfrom fastapi import FastAPI\nfrom src.api.book.routes import router as book_router  # noqa: E402\n\napp = FastAPI(\n    title=\"shop\",\n)\napp.include_router(book_router)\n"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_missing_app_assignment() {
        let edit = WiringEdit::router(&test_support::book(), "application");
        let err = StructuredStrategy
            .apply("from fastapi import FastAPI\n\napp = FastAPI()\n", &edit)
            .unwrap_err();
        assert_eq!(err, SpecError::anchor_not_found("application = ..."));
    }

    #[test]
    fn test_dependency_function_separated_by_two_blank_lines() {
        let content = "from fastapi import Depends, Request\n\nfrom src.db.repositories import (\n    UserRepository,\n)\nfrom src.db.storage import AbstractSQLAlchemyStorage\n\n\ndef get_storage(request: Request) -> AbstractSQLAlchemyStorage:\n    return request.app.state.storage\n";
        let edit = WiringEdit::repository_dependency(&test_support::book());
        let WiringOutcome::Modified(updated) = StructuredStrategy.apply(content, &edit).unwrap()
        else {
            panic!("expected a modification");
        };
        assert_eq!(
            updated,
            "from fastapi import Depends, Request\n\nfrom src.db.repositories import (\n    UserRepository,\n)\nfrom src.db.storage import AbstractSQLAlchemyStorage\nfrom src.db.repositories.book import BookRepository\n\n\ndef get_storage(request: Request) -> AbstractSQLAlchemyStorage:\n    return request.app.state.storage\n\n\ndef get_book_repository(\n    storage: AbstractSQLAlchemyStorage = Depends(get_storage),\n) -> BookRepository:\n    return BookRepository(storage)\n"
        );
        assert_eq!(
            StructuredStrategy.apply(&updated, &edit).unwrap(),
            WiringOutcome::Unchanged
        );
    }

    #[test]
    fn test_dependency_requires_get_storage() {
        let edit = WiringEdit::repository_dependency(&test_support::book());
        let err = StructuredStrategy
            .apply("from fastapi import Depends\n", &edit)
            .unwrap_err();
        assert!(matches!(err, SpecError::AnchorNotFound { ref anchor } if anchor == "def get_storage(...)"));
    }

    #[test]
    fn test_aliased_import_elsewhere_still_counts() {
        let content = "from fastapi import FastAPI\nfrom src.api.book.routes import (\n    router as book_router,\n)\n\napp = FastAPI()\napp.include_router(book_router, prefix=\"/v1\")\n";
        let edit = WiringEdit::router(&test_support::book(), "app");
        assert_eq!(
            StructuredStrategy.apply(content, &edit).unwrap(),
            WiringOutcome::Unchanged
        );
    }
}
