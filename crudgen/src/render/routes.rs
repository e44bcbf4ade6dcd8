//! FastAPI router with the five CRUD handlers.

use super::{ArtifactKind, PySource, Renderer};
use crate::ir::ModelDescriptor;
use crate::types::python_str_literal;

/// Renders an `APIRouter` mounted at `/<plural>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteRenderer;

impl Renderer for RouteRenderer {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Routes
    }

    fn render_source(&self, model: &ModelDescriptor) -> String {
        let name = &model.name;
        let module = &model.module;
        let id = &model.id_param;
        let repo = model.repository_var();
        let repo_class = model.repository_class();
        let response = format!("{}Response", name);
        let dependency = format!(
            "{}: {} = Depends(get_{}_repository),",
            repo, repo_class, module
        );

        let mut src = PySource::new();
        src.line(0, "from fastapi import APIRouter, Depends, HTTPException, status");
        src.blank();
        src.line(
            0,
            format!(
                "from {} import get_{}_repository",
                model.import_path("api.repositories.dependencies"),
                module
            ),
        );
        src.line(
            0,
            format!(
                "from {} import {}",
                model.import_path(&ArtifactKind::Repository.module_path(module)),
                repo_class
            ),
        );
        src.line(
            0,
            format!(
                "from {} import {1}Create, {1}Response, {1}Update",
                model.import_path(&ArtifactKind::Schema.module_path(module)),
                name
            ),
        );
        src.blank();
        src.line(
            0,
            format!(
                "router = APIRouter(prefix={}, tags=[{}])",
                python_str_literal(&format!("/{}", model.plural)),
                python_str_literal(&model.tag())
            ),
        );
        src.blank();
        src.blank();
        src.line(0, format!("def _not_found({}: int) -> HTTPException:", id));
        src.line(
            1,
            format!(
                "return HTTPException(status_code=status.HTTP_404_NOT_FOUND, detail=f\"{} {{{}}} not found\")",
                name, id
            ),
        );

        // POST /
        src.blank();
        src.blank();
        src.line(0, "@router.post(\"\", status_code=status.HTTP_201_CREATED)");
        src.line(0, format!("async def create_{}(", module));
        src.line(1, format!("payload: {}Create,", name));
        src.line(1, &dependency);
        src.line(0, format!(") -> {}:", response));
        src.line(
            1,
            format!(
                "record = await {}.create_{}(**payload.model_dump())",
                repo, module
            ),
        );
        src.line(1, format!("return {}.model_validate(record)", response));

        // GET /
        src.blank();
        src.blank();
        src.line(0, "@router.get(\"\")");
        src.line(0, format!("async def list_{}(", model.plural));
        src.line(1, "offset: int = 0,");
        src.line(1, "limit: int = 100,");
        src.line(1, &dependency);
        src.line(0, format!(") -> list[{}]:", response));
        src.line(
            1,
            format!(
                "records = await {}.list_{}(offset=offset, limit=limit)",
                repo, model.plural
            ),
        );
        src.line(
            1,
            format!(
                "return [{}.model_validate(record) for record in records]",
                response
            ),
        );

        // GET /{id}
        src.blank();
        src.blank();
        src.line(0, format!("@router.get(\"/{{{}}}\")", id));
        src.line(0, format!("async def get_{}(", module));
        src.line(1, format!("{}: int,", id));
        src.line(1, &dependency);
        src.line(0, format!(") -> {}:", response));
        src.line(1, format!("record = await {}.get_{}({})", repo, module, id));
        src.line(1, "if record is None:");
        src.line(2, format!("raise _not_found({})", id));
        src.line(1, format!("return {}.model_validate(record)", response));

        // PATCH /{id}: only keys present in the request body are applied
        src.blank();
        src.blank();
        src.line(0, format!("@router.patch(\"/{{{}}}\")", id));
        src.line(0, format!("async def update_{}(", module));
        src.line(1, format!("{}: int,", id));
        src.line(1, format!("payload: {}Update,", name));
        src.line(1, &dependency);
        src.line(0, format!(") -> {}:", response));
        src.line(
            1,
            format!(
                "record = await {}.edit_{}({}, **payload.model_dump(exclude_unset=True))",
                repo, module, id
            ),
        );
        src.line(1, "if record is None:");
        src.line(2, format!("raise _not_found({})", id));
        src.line(1, format!("return {}.model_validate(record)", response));

        // DELETE /{id}
        src.blank();
        src.blank();
        src.line(
            0,
            format!(
                "@router.delete(\"/{{{}}}\", status_code=status.HTTP_204_NO_CONTENT)",
                id
            ),
        );
        src.line(0, format!("async def delete_{}(", module));
        src.line(1, format!("{}: int,", id));
        src.line(1, &dependency);
        src.line(0, ") -> None:");
        src.line(1, format!("record = await {}.delete_{}({})", repo, module, id));
        src.line(1, "if record is None:");
        src.line(2, format!("raise _not_found({})", id));

        src.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::test_support;

    #[test]
    fn test_book_routes() {
        let source = RouteRenderer.render_source(&test_support::book());
        let expected = r#"from fastapi import APIRouter, Depends, HTTPException, status

from src.api.repositories.dependencies import get_book_repository
from src.db.repositories.book import BookRepository
from src.schemas.book import BookCreate, BookResponse, BookUpdate

router = APIRouter(prefix="/books", tags=["Books"])


def _not_found(book_id: int) -> HTTPException:
    return HTTPException(status_code=status.HTTP_404_NOT_FOUND, detail=f"Book {book_id} not found")


@router.post("", status_code=status.HTTP_201_CREATED)
async def create_book(
    payload: BookCreate,
    book_repository: BookRepository = Depends(get_book_repository),
) -> BookResponse:
    record = await book_repository.create_book(**payload.model_dump())
    return BookResponse.model_validate(record)


@router.get("")
async def list_books(
    offset: int = 0,
    limit: int = 100,
    book_repository: BookRepository = Depends(get_book_repository),
) -> list[BookResponse]:
    records = await book_repository.list_books(offset=offset, limit=limit)
    return [BookResponse.model_validate(record) for record in records]


@router.get("/{book_id}")
async def get_book(
    book_id: int,
    book_repository: BookRepository = Depends(get_book_repository),
) -> BookResponse:
    record = await book_repository.get_book(book_id)
    if record is None:
        raise _not_found(book_id)
    return BookResponse.model_validate(record)


@router.patch("/{book_id}")
async def update_book(
    book_id: int,
    payload: BookUpdate,
    book_repository: BookRepository = Depends(get_book_repository),
) -> BookResponse:
    record = await book_repository.edit_book(book_id, **payload.model_dump(exclude_unset=True))
    if record is None:
        raise _not_found(book_id)
    return BookResponse.model_validate(record)


@router.delete("/{book_id}", status_code=status.HTTP_204_NO_CONTENT)
async def delete_book(
    book_id: int,
    book_repository: BookRepository = Depends(get_book_repository),
) -> None:
    record = await book_repository.delete_book(book_id)
    if record is None:
        raise _not_found(book_id)
"#;
        assert_eq!(source, expected);
    }

    #[test]
    fn test_five_handlers_under_plural_prefix() {
        let source = RouteRenderer.render_source(&test_support::book());
        let decorators = source
            .lines()
            .filter(|line| line.starts_with("@router."))
            .count();
        assert_eq!(decorators, 5);
        for method in ["post", "get", "patch", "delete"] {
            assert!(source.contains(&format!("@router.{}(", method)), "{method}");
        }
        assert!(source.contains("prefix=\"/books\""));
    }
}
