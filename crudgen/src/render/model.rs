//! SQLAlchemy declarative model.

use std::collections::BTreeSet;

use super::{ArtifactKind, PySource, Renderer};
use crate::ir::{ModelDescriptor, ResolvedField, IDENTITY_FIELD};
use crate::types::python_str_literal;

/// Renders one `Mapped[...]` attribute per field on a `Base` subclass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelRenderer;

impl Renderer for ModelRenderer {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Model
    }

    fn render_source(&self, model: &ModelDescriptor) -> String {
        let column_types: BTreeSet<&str> = model.fields.iter().map(|f| f.mapping.column).collect();

        let mut src = PySource::new();
        src.line(0, "from __future__ import annotations");
        src.blank();
        src.line(
            0,
            format!(
                "from sqlalchemy import {}",
                column_types.into_iter().collect::<Vec<_>>().join(", ")
            ),
        );
        src.line(0, "from sqlalchemy.orm import Mapped, mapped_column");
        src.blank();
        src.line(0, format!("from {} import Base", model.import_path("db.models")));
        src.blank();
        src.blank();
        src.line(0, format!("class {}(Base):", model.name));
        src.line(
            1,
            format!("__tablename__ = {}", python_str_literal(&model.table_name)),
        );
        src.blank();
        src.line(
            1,
            format!("{}: Mapped[int] = mapped_column(primary_key=True)", IDENTITY_FIELD),
        );
        src.blank();
        for field in &model.fields {
            src.line(
                1,
                format!(
                    "{}: Mapped[{}] = mapped_column({})",
                    field.name(),
                    field.annotate(field.mapping.orm),
                    column_args(field).join(", ")
                ),
            );
        }

        src.finish()
    }
}

/// Column type followed by the constraint keywords the field asks for.
fn column_args(field: &ResolvedField) -> Vec<String> {
    let mut args = vec![field.column_expr()];
    if field.is_unique() {
        args.push("unique=True".to_string());
    }
    if field.is_indexed() {
        args.push("index=True".to_string());
    }
    if field.is_nullable() {
        args.push("nullable=True".to_string());
    }
    if let Some(default) = &field.default_expr {
        args.push(format!("default={}", default));
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::test_support;

    #[test]
    fn test_book_model() {
        let source = ModelRenderer.render_source(&test_support::book());
        let expected = r#"from __future__ import annotations

from sqlalchemy import Boolean, Integer, String
from sqlalchemy.orm import Mapped, mapped_column

from src.db.models import Base


class Book(Base):
    __tablename__ = "book"

    id: Mapped[int] = mapped_column(primary_key=True)

    title: Mapped[str] = mapped_column(String(), unique=True)
    author_email: Mapped[str] = mapped_column(String())
    year: Mapped[int | None] = mapped_column(Integer(), nullable=True)
    in_stock: Mapped[bool] = mapped_column(Boolean(), default=True)
"#;
        assert_eq!(source, expected);
    }

    #[test]
    fn test_all_constraints_on_one_column() {
        let model = test_support::model(
            "User",
            &["handle:str:unique,index,nullable,length=32,default=\"anon\""],
        );
        let source = ModelRenderer.render_source(&model);
        assert!(source.contains(
            "    handle: Mapped[str | None] = mapped_column(String(32), unique=True, index=True, nullable=True, default=\"anon\")\n"
        ));
        assert!(source.contains("from sqlalchemy import String\n"));
    }
}
