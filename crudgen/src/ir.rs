//! Model intermediate representation.
//!
//! [`ModelBuilder`] validates the model name and field set and produces the
//! [`ModelDescriptor`] every renderer reads. The descriptor is immutable
//! once built; renderers only borrow it.

use serde::Serialize;

use crate::error::{SpecError, SpecResult};
use crate::naming::{self, is_identifier, is_python_keyword};
use crate::parser::FieldDescriptor;
use crate::types::{LogicalType, TypeMapping};

/// Name of the identity column added by the persistence and response layers.
pub const IDENTITY_FIELD: &str = "id";

/// A field with its type mapping and rendered default.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedField {
    /// The parsed descriptor.
    pub descriptor: FieldDescriptor,
    /// Type representations for every layer.
    #[serde(skip)]
    pub mapping: TypeMapping,
    /// Python expression for the default, when one was given.
    pub default_expr: Option<String>,
}

impl ResolvedField {
    /// Look up the type mapping and render the default for one field.
    pub fn resolve(descriptor: FieldDescriptor) -> SpecResult<Self> {
        let ty = descriptor.logical_type;
        let mapping = ty.mapping();

        if descriptor.length().is_some() && !mapping.sized {
            return Err(SpecError::InvalidParam {
                field: descriptor.name.clone(),
                param: "length".to_string(),
                type_name: ty.name(),
            });
        }

        let default_expr = match descriptor.default() {
            None => None,
            Some(value) => {
                let expr = ty
                    .default_expr(value)
                    .filter(|expr| expr != "None" || descriptor.is_nullable());
                match expr {
                    Some(expr) => Some(expr),
                    None => {
                        return Err(SpecError::IncompatibleDefault {
                            field: descriptor.name.clone(),
                            type_name: ty.name(),
                            value: value.canonical(),
                            nullable: descriptor.is_nullable(),
                        })
                    }
                }
            }
        };

        Ok(Self {
            descriptor,
            mapping,
            default_expr,
        })
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn logical_type(&self) -> LogicalType {
        self.descriptor.logical_type
    }

    pub fn is_nullable(&self) -> bool {
        self.descriptor.is_nullable()
    }

    pub fn is_unique(&self) -> bool {
        self.descriptor.is_unique()
    }

    pub fn is_indexed(&self) -> bool {
        self.descriptor.is_indexed()
    }

    /// Whether a caller may omit this field on create.
    pub fn is_optional(&self) -> bool {
        self.is_nullable() || self.default_expr.is_some()
    }

    /// Append `| None` to an annotation when the field is nullable.
    pub fn annotate(&self, base: &str) -> String {
        if self.is_nullable() {
            format!("{} | None", base)
        } else {
            base.to_string()
        }
    }

    /// Default expression used when the caller omits the field.
    pub fn omitted_default(&self) -> Option<&str> {
        match &self.default_expr {
            Some(expr) => Some(expr),
            None if self.is_nullable() => Some("None"),
            None => None,
        }
    }

    /// SQLAlchemy column type expression.
    pub fn column_expr(&self) -> String {
        self.mapping.column_expr(self.descriptor.length())
    }
}

/// The shared, read-only input of every renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelDescriptor {
    /// PascalCase class name.
    pub name: String,
    /// snake_case module path segment.
    pub module: String,
    /// Plural form of the module, used for collection paths.
    pub plural: String,
    /// SQL table name.
    pub table_name: String,
    /// Path parameter naming the identity.
    pub id_param: String,
    /// Python package the generated modules live in.
    pub package: String,
    /// Fields in input order.
    pub fields: Vec<ResolvedField>,
}

impl ModelDescriptor {
    /// OpenAPI tag for the routes.
    pub fn tag(&self) -> String {
        naming::class_name(&self.plural)
    }

    /// Variable name for a repository instance.
    pub fn repository_var(&self) -> String {
        format!("{}_repository", self.module)
    }

    /// Class name of the repository.
    pub fn repository_class(&self) -> String {
        format!("{}Repository", self.name)
    }

    /// Dotted import path for a module below the package root.
    pub fn import_path(&self, relative: &str) -> String {
        if self.package.is_empty() {
            relative.to_string()
        } else {
            format!("{}.{}", self.package, relative)
        }
    }
}

/// Builds a [`ModelDescriptor`] from a model name and resolved fields.
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    model: String,
    module: Option<String>,
    table_name: Option<String>,
    id_param: Option<String>,
    plural: Option<String>,
    package: String,
}

impl ModelBuilder {
    /// Start a model with the given class name.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            module: None,
            table_name: None,
            id_param: None,
            plural: None,
            package: "src".to_string(),
        }
    }

    /// Override the module segment (default: snake_case of the class name).
    pub fn with_module(mut self, module: Option<String>) -> Self {
        self.module = module;
        self
    }

    /// Override the table name (default: the module segment).
    pub fn with_table_name(mut self, table_name: Option<String>) -> Self {
        self.table_name = table_name;
        self
    }

    /// Override the identity path parameter (default: `<module>_id`).
    pub fn with_id_param(mut self, id_param: Option<String>) -> Self {
        self.id_param = id_param;
        self
    }

    /// Override the plural form (default: English plural of the module).
    pub fn with_plural(mut self, plural: Option<String>) -> Self {
        self.plural = plural;
        self
    }

    /// Set the Python package that generated imports start from.
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    /// Validate and assemble the model.
    pub fn build(self, fields: Vec<ResolvedField>) -> SpecResult<ModelDescriptor> {
        let raw = self.model.trim();
        if !is_identifier(raw) || is_python_keyword(raw) {
            return Err(SpecError::invalid_model(
                raw,
                "model name must be a valid identifier",
            ));
        }
        let name = naming::class_name(raw);

        let module = self
            .module
            .unwrap_or_else(|| naming::module_segment(&name));
        let plural = self
            .plural
            .unwrap_or_else(|| naming::pluralize(&module));
        let id_param = self
            .id_param
            .unwrap_or_else(|| format!("{}_{}", module, IDENTITY_FIELD));
        for (what, value) in [("module", &module), ("plural", &plural), ("id param", &id_param)] {
            if !is_identifier(value) || is_python_keyword(value) {
                return Err(SpecError::invalid_model(
                    &name,
                    format!("{} '{}' is not a valid identifier", what, value),
                ));
            }
        }

        let table_name = self.table_name.unwrap_or_else(|| module.clone());
        if table_name.trim().is_empty() {
            return Err(SpecError::invalid_model(&name, "table name is empty"));
        }

        if !self.package.is_empty()
            && !self
                .package
                .split('.')
                .all(|part| is_identifier(part) && !is_python_keyword(part))
        {
            return Err(SpecError::invalid_model(
                &name,
                format!("package '{}' is not a dotted Python path", self.package),
            ));
        }

        if fields.is_empty() {
            return Err(SpecError::invalid_model(&name, "at least one field is required"));
        }

        for (i, field) in fields.iter().enumerate() {
            if field.name() == "self" {
                return Err(SpecError::invalid_model(
                    &name,
                    "field name 'self' clashes with the repository receiver",
                ));
            }
            if let Some(reason) = reserved_field_reason(field.name(), &name) {
                return Err(SpecError::invalid_model(
                    &name,
                    format!("field name '{}' {}", field.name(), reason),
                ));
            }
            if field.name() == IDENTITY_FIELD || field.name() == id_param {
                return Err(SpecError::invalid_model(
                    &name,
                    format!(
                        "field '{}' is reserved for the identity column",
                        field.name()
                    ),
                ));
            }
            if fields[..i].iter().any(|other| other.name() == field.name()) {
                return Err(SpecError::invalid_model(
                    &name,
                    format!("duplicate field name '{}'", field.name()),
                ));
            }
        }

        tracing::debug!(model = %name, module = %module, fields = fields.len(), "built model descriptor");

        Ok(ModelDescriptor {
            name,
            module,
            plural,
            table_name,
            id_param,
            package: self.package,
            fields,
        })
    }
}

/// Names the generated class bodies already bind. A field with one of
/// these names would shadow it and break the module at import time.
const CLASS_SCOPE_NAMES: &[&str] = &[
    "Any",
    "Base",
    "BaseSchema",
    "Boolean",
    "ConfigDict",
    "EmailStr",
    "Float",
    "Integer",
    "Mapped",
    "String",
    "bool",
    "classmethod",
    "field_validator",
    "float",
    "int",
    "mapped_column",
    "reject_null",
    "str",
];

/// Why `field` cannot be used on model `model`, if it cannot.
fn reserved_field_reason(field: &str, model: &str) -> Option<&'static str> {
    if matches!(field, "metadata" | "registry") {
        return Some("is reserved by SQLAlchemy declarative models");
    }
    if field.starts_with("model_") {
        return Some("clashes with the Pydantic `model_` namespace");
    }
    if field.starts_with('_') {
        return Some("would be a private attribute, not a field");
    }
    if CLASS_SCOPE_NAMES.contains(&field) {
        return Some("shadows a name used by the generated classes");
    }
    let derived = ["", "Create", "Update", "Response", "Repository"];
    if derived
        .iter()
        .any(|suffix| field.strip_suffix(suffix) == Some(model))
    {
        return Some("shadows a generated class");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_field_token;

    fn resolved(tokens: &[&str]) -> Vec<ResolvedField> {
        tokens
            .iter()
            .map(|t| ResolvedField::resolve(parse_field_token(t).unwrap()).unwrap())
            .collect()
    }

    #[test]
    fn test_build_derives_names() {
        let model = ModelBuilder::new("BookItem")
            .build(resolved(&["title:str"]))
            .unwrap();
        assert_eq!(model.name, "BookItem");
        assert_eq!(model.module, "book_item");
        assert_eq!(model.plural, "book_items");
        assert_eq!(model.table_name, "book_item");
        assert_eq!(model.id_param, "book_item_id");
        assert_eq!(model.tag(), "BookItems");
        assert_eq!(model.repository_class(), "BookItemRepository");
        assert_eq!(model.import_path("schemas.book_item"), "src.schemas.book_item");
    }

    #[test]
    fn test_build_overrides() {
        let model = ModelBuilder::new("Person")
            .with_module(Some("people".to_string()))
            .with_plural(Some("people".to_string()))
            .with_table_name(Some("persons".to_string()))
            .with_id_param(Some("person_id".to_string()))
            .with_package("app")
            .build(resolved(&["name:str"]))
            .unwrap();
        assert_eq!(model.module, "people");
        assert_eq!(model.plural, "people");
        assert_eq!(model.table_name, "persons");
        assert_eq!(model.id_param, "person_id");
        assert_eq!(model.import_path("db.models"), "app.db.models");
    }

    #[test]
    fn test_lowercase_model_is_pascal_cased() {
        let model = ModelBuilder::new("book").build(resolved(&["title:str"])).unwrap();
        assert_eq!(model.name, "Book");
        assert_eq!(model.module, "book");
    }

    #[test]
    fn test_field_order_preserved() {
        let model = ModelBuilder::new("Book")
            .build(resolved(&["b:int", "a:str", "c:bool"]))
            .unwrap();
        let names: Vec<&str> = model.fields.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_duplicate_field_names_rejected() {
        let err = ModelBuilder::new("Book")
            .build(resolved(&["title:str", "title:int"]))
            .unwrap_err();
        assert!(matches!(err, SpecError::InvalidModel { ref reason, .. } if reason.contains("duplicate field name 'title'")));
    }

    #[test]
    fn test_invalid_model_names() {
        for name in ["", "9Lives", "Book-Store", "class"] {
            let err = ModelBuilder::new(name)
                .build(resolved(&["title:str"]))
                .unwrap_err();
            assert!(matches!(err, SpecError::InvalidModel { .. }), "{name}");
        }
    }

    #[test]
    fn test_reserved_identity_and_empty_fields() {
        let err = ModelBuilder::new("Book").build(resolved(&["id:int"])).unwrap_err();
        assert!(matches!(err, SpecError::InvalidModel { .. }));

        let err = ModelBuilder::new("Book").build(Vec::new()).unwrap_err();
        assert!(matches!(err, SpecError::InvalidModel { .. }));

        let err = ModelBuilder::new("Book")
            .build(resolved(&["title:str", "book_id:int"]))
            .unwrap_err();
        assert!(matches!(err, SpecError::InvalidModel { ref reason, .. } if reason.contains("book_id")));

        let err = ModelBuilder::new("Book").build(resolved(&["self:str"])).unwrap_err();
        assert!(matches!(err, SpecError::InvalidModel { .. }));
    }

    #[test]
    fn test_names_that_break_generated_classes_rejected() {
        for name in [
            "metadata",
            "registry",
            "model_config",
            "model_fields",
            "_secret",
            "Book",
            "BookCreate",
            "BookRepository",
            "mapped_column",
            "str",
            "reject_null",
        ] {
            let token = format!("{}:str", name);
            let err = ModelBuilder::new("Book")
                .build(resolved(&[token.as_str()]))
                .unwrap_err();
            assert!(
                matches!(err, SpecError::InvalidModel { ref reason, .. } if reason.contains(name)),
                "{name}"
            );
        }

        let model = ModelBuilder::new("Book")
            .build(resolved(&["model:str", "books:int", "meta:str"]))
            .unwrap();
        assert_eq!(model.fields.len(), 3);
    }

    #[test]
    fn test_invalid_package_rejected() {
        let err = ModelBuilder::new("Book")
            .with_package("my-app")
            .build(resolved(&["title:str"]))
            .unwrap_err();
        assert!(matches!(err, SpecError::InvalidModel { .. }));
    }

    #[test]
    fn test_resolve_defaults() {
        let field = ResolvedField::resolve(parse_field_token("in_stock:bool:default=True").unwrap())
            .unwrap();
        assert_eq!(field.default_expr.as_deref(), Some("True"));
        assert!(field.is_optional());

        let field =
            ResolvedField::resolve(parse_field_token("year:int:nullable").unwrap()).unwrap();
        assert_eq!(field.omitted_default(), Some("None"));
        assert_eq!(field.annotate("int"), "int | None");
    }

    #[test]
    fn test_resolve_incompatible_default() {
        let err = ResolvedField::resolve(parse_field_token("year:int:default=soon").unwrap())
            .unwrap_err();
        assert!(matches!(err, SpecError::IncompatibleDefault { ref field, .. } if field == "year"));

        let err = ResolvedField::resolve(parse_field_token("year:int:default=None").unwrap())
            .unwrap_err();
        assert!(matches!(err, SpecError::IncompatibleDefault { nullable: false, .. }));

        let field =
            ResolvedField::resolve(parse_field_token("year:int:nullable,default=None").unwrap())
                .unwrap();
        assert_eq!(field.default_expr.as_deref(), Some("None"));
    }

    #[test]
    fn test_length_only_for_strings() {
        let field =
            ResolvedField::resolve(parse_field_token("title:str:length=120").unwrap()).unwrap();
        assert_eq!(field.column_expr(), "String(120)");

        let err = ResolvedField::resolve(parse_field_token("year:int:length=4").unwrap())
            .unwrap_err();
        assert!(matches!(err, SpecError::InvalidParam { ref param, .. } if param == "length"));
    }
}
