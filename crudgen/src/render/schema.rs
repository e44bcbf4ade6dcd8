//! Pydantic transfer schemas: create, update and response shapes.

use std::collections::BTreeSet;

use super::{ArtifactKind, PySource, Renderer};
use crate::ir::{ModelDescriptor, IDENTITY_FIELD};

/// Renders `<Model>Create`, `<Model>Update` and `<Model>Response`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaRenderer;

impl Renderer for SchemaRenderer {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Schema
    }

    fn render_source(&self, model: &ModelDescriptor) -> String {
        let not_null: Vec<&str> = model
            .fields
            .iter()
            .filter(|f| !f.is_nullable())
            .map(|f| f.name())
            .collect();

        let mut imports: BTreeSet<&str> = BTreeSet::from(["ConfigDict"]);
        imports.extend(model.fields.iter().filter_map(|f| f.mapping.transfer_import));
        if !not_null.is_empty() {
            imports.insert("field_validator");
        }

        let mut src = PySource::new();
        if !not_null.is_empty() {
            src.line(0, "from typing import Any");
            src.blank();
        }
        src.line(
            0,
            format!(
                "from pydantic import {}",
                imports.into_iter().collect::<Vec<_>>().join(", ")
            ),
        );
        src.blank();
        src.line(
            0,
            format!(
                "from {} import BaseSchema",
                model.import_path("schemas.pydantic_base")
            ),
        );

        // Create: omitted fields fall back to their default, or None when nullable.
        src.blank();
        src.blank();
        src.line(0, format!("class {}Create(BaseSchema):", model.name));
        for field in &model.fields {
            let annotation = field.annotate(field.mapping.transfer);
            match field.omitted_default() {
                Some(default) => {
                    src.line(1, format!("{}: {} = {}", field.name(), annotation, default))
                }
                None => src.line(1, format!("{}: {}", field.name(), annotation)),
            }
        }

        // Update: every field optional; keys outside the model are rejected.
        src.blank();
        src.blank();
        src.line(0, format!("class {}Update(BaseSchema):", model.name));
        for field in &model.fields {
            src.line(
                1,
                format!("{}: {} | None = None", field.name(), field.mapping.transfer),
            );
        }
        src.blank();
        src.line(1, "model_config = ConfigDict(extra=\"forbid\")");
        // Omitted keys keep their value; an explicit null on a NOT NULL column is refused.
        if !not_null.is_empty() {
            let names: Vec<String> = not_null.iter().map(|n| format!("\"{}\"", n)).collect();
            src.blank();
            src.line(
                1,
                format!("@field_validator({}, mode=\"before\")", names.join(", ")),
            );
            src.line(1, "@classmethod");
            src.line(1, "def reject_null(cls, value: Any) -> Any:");
            src.line(2, "if value is None:");
            src.line(3, "raise ValueError(\"field is not nullable\")");
            src.line(2, "return value");
        }

        src.blank();
        src.blank();
        src.line(0, format!("class {}Response(BaseSchema):", model.name));
        src.line(1, format!("{}: int", IDENTITY_FIELD));
        for field in &model.fields {
            src.line(
                1,
                format!("{}: {}", field.name(), field.annotate(field.mapping.transfer)),
            );
        }
        src.blank();
        src.line(1, "model_config = ConfigDict(from_attributes=True)");

        src.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::test_support;

    #[test]
    fn test_book_schema() {
        let source = SchemaRenderer.render_source(&test_support::book());
        let expected = r#"from typing import Any

from pydantic import ConfigDict, EmailStr, field_validator

from src.schemas.pydantic_base import BaseSchema


class BookCreate(BaseSchema):
    title: str
    author_email: EmailStr
    year: int | None = None
    in_stock: bool = True


class BookUpdate(BaseSchema):
    title: str | None = None
    author_email: EmailStr | None = None
    year: int | None = None
    in_stock: bool | None = None

    model_config = ConfigDict(extra="forbid")

    @field_validator("title", "author_email", "in_stock", mode="before")
    @classmethod
    def reject_null(cls, value: Any) -> Any:
        if value is None:
            raise ValueError("field is not nullable")
        return value


class BookResponse(BaseSchema):
    id: int
    title: str
    author_email: EmailStr
    year: int | None
    in_stock: bool

    model_config = ConfigDict(from_attributes=True)
"#;
        assert_eq!(source, expected);
    }

    #[test]
    fn test_schema_without_email_imports_only_config_dict() {
        let model = test_support::model(
            "Tag",
            &["label:str:nullable", "weight:float:nullable,default=1"],
        );
        let source = SchemaRenderer.render_source(&model);
        assert!(source.starts_with("from pydantic import ConfigDict\n"));
        assert!(source.contains("    weight: float | None = 1.0\n"));
        assert!(!source.contains("reject_null"));
    }

    #[test]
    fn test_update_refuses_null_for_not_null_columns() {
        let model = test_support::model("Tag", &["label:str", "note:str:nullable", "weight:float:default=1"]);
        let source = SchemaRenderer.render_source(&model);
        assert!(source.contains("from pydantic import ConfigDict, field_validator\n"));
        assert!(source.contains("    @field_validator(\"label\", \"weight\", mode=\"before\")\n"));
        assert!(!source.contains("\"note\""));
        assert!(source.contains("    weight: float | None = None\n"));
    }

    #[test]
    fn test_nullable_default_keeps_given_default() {
        let model = test_support::model("Task", &["status:str:nullable,default=\"open\""]);
        let source = SchemaRenderer.render_source(&model);
        assert!(source.contains("    status: str | None = \"open\"\n"));
        assert!(source.contains("    status: str | None\n"));
    }
}
