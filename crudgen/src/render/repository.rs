//! Async repository over the persistence model.
//!
//! Every method returns the persistence record (or `None`), never the
//! transfer shape; mapping to responses is the route layer's job.

use super::{ArtifactKind, PySource, Renderer};
use crate::ir::{ModelDescriptor, IDENTITY_FIELD};
use crate::types::python_str_literal;

/// Renders `<Model>Repository` with create, list, get, edit and delete.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepositoryRenderer;

impl Renderer for RepositoryRenderer {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Repository
    }

    fn render_source(&self, model: &ModelDescriptor) -> String {
        let name = &model.name;
        let module = &model.module;
        let record = record_var(module);
        let id = &model.id_param;

        let mut src = PySource::new();
        src.line(0, "from __future__ import annotations");
        src.blank();
        src.line(0, "from collections.abc import Sequence");
        src.line(0, "from typing import Any");
        src.blank();
        src.line(0, "from sqlalchemy import select");
        src.blank();
        src.line(
            0,
            format!(
                "from {} import {}",
                model.import_path(&ArtifactKind::Model.module_path(module)),
                name
            ),
        );
        src.line(
            0,
            format!(
                "from {} import AbstractSQLAlchemyStorage",
                model.import_path("db.storage")
            ),
        );
        src.blank();
        let editable: Vec<String> = model
            .fields
            .iter()
            .map(|f| python_str_literal(f.name()))
            .collect();
        src.line(
            0,
            format!("_EDITABLE_FIELDS = frozenset({{{}}})", editable.join(", ")),
        );
        src.blank();
        src.blank();
        src.line(0, format!("class {}:", model.repository_class()));
        src.line(
            1,
            "def __init__(self, storage: AbstractSQLAlchemyStorage) -> None:",
        );
        src.line(2, "self.storage = storage");

        // create
        src.blank();
        src.line(1, format!("async def create_{}(", module));
        src.line(2, "self,");
        src.line(2, "*,");
        for field in &model.fields {
            let annotation = field.annotate(field.mapping.repository);
            match field.omitted_default() {
                Some(default) => {
                    src.line(2, format!("{}: {} = {},", field.name(), annotation, default))
                }
                None => src.line(2, format!("{}: {},", field.name(), annotation)),
            }
        }
        src.line(1, format!(") -> {}:", name));
        src.line(2, format!("{} = {}(", record, name));
        for field in &model.fields {
            src.line(3, format!("{0}={0},", field.name()));
        }
        src.line(2, ")");
        src.line(2, "async with self.storage.session() as session:");
        src.line(3, format!("session.add({})", record));
        src.line(3, "await session.commit()");
        src.line(3, format!("await session.refresh({})", record));
        src.line(3, format!("return {}", record));

        // list
        src.blank();
        src.line(
            1,
            format!(
                "async def list_{}(self, *, offset: int = 0, limit: int = 100) -> Sequence[{}]:",
                model.plural, name
            ),
        );
        src.line(2, "async with self.storage.session() as session:");
        src.line(
            3,
            format!(
                "result = await session.execute(select({0}).order_by({0}.{1}).offset(offset).limit(limit))",
                name, IDENTITY_FIELD
            ),
        );
        src.line(3, "return result.scalars().all()");

        // get
        src.blank();
        src.line(
            1,
            format!(
                "async def get_{}(self, {}: int) -> {} | None:",
                module, id, name
            ),
        );
        src.line(2, "async with self.storage.session() as session:");
        src.line(3, format!("return await session.get({}, {})", name, id));

        // edit: only the supplied keys are written
        src.blank();
        src.line(
            1,
            format!(
                "async def edit_{}(self, {}: int, **changes: Any) -> {} | None:",
                module, id, name
            ),
        );
        src.line(2, "unknown = sorted(set(changes) - _EDITABLE_FIELDS)");
        src.line(2, "if unknown:");
        src.line(
            3,
            format!(
                "raise ValueError(f\"Unknown {} fields: {{', '.join(unknown)}}\")",
                name
            ),
        );
        src.line(2, "async with self.storage.session() as session:");
        src.line(3, format!("{} = await session.get({}, {})", record, name, id));
        src.line(3, format!("if {} is None:", record));
        src.line(4, "return None");
        src.line(3, "for field, value in changes.items():");
        src.line(4, format!("setattr({}, field, value)", record));
        src.line(3, "await session.commit()");
        src.line(3, format!("await session.refresh({})", record));
        src.line(3, format!("return {}", record));

        // delete
        src.blank();
        src.line(
            1,
            format!(
                "async def delete_{}(self, {}: int) -> {} | None:",
                module, id, name
            ),
        );
        src.line(2, "async with self.storage.session() as session:");
        src.line(3, format!("{} = await session.get({}, {})", record, name, id));
        src.line(3, format!("if {} is None:", record));
        src.line(4, "return None");
        src.line(3, format!("await session.delete({})", record));
        src.line(3, "await session.commit()");
        src.line(3, format!("return {}", record));

        src.finish()
    }
}

/// Local name for a single record; the module name unless it would shadow
/// a name the generated methods use.
fn record_var(module: &str) -> &str {
    match module {
        "self" | "session" | "result" | "select" | "storage" | "unknown" | "changes" | "field"
        | "value" => "record",
        module => module,
    }
}
