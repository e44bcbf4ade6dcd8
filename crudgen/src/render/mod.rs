//! Artifact renderers.
//!
//! Each renderer turns a [`ModelDescriptor`] into one [`GeneratedArtifact`].
//! Renderers share no state and never read each other's output, so the
//! same descriptor always yields byte-identical text.

mod model;
mod repository;
mod routes;
mod schema;

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::ir::ModelDescriptor;

pub use model::ModelRenderer;
pub use repository::RepositoryRenderer;
pub use routes::RouteRenderer;
pub use schema::SchemaRenderer;

/// Which layer an artifact belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Schema,
    Model,
    Repository,
    Routes,
}

impl ArtifactKind {
    /// All kinds in render and write order.
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Schema,
        ArtifactKind::Model,
        ArtifactKind::Repository,
        ArtifactKind::Routes,
    ];

    /// Path of the artifact relative to the source root.
    pub fn relative_path(self, module: &str) -> PathBuf {
        match self {
            ArtifactKind::Schema => PathBuf::from("schemas").join(format!("{}.py", module)),
            ArtifactKind::Model => PathBuf::from("db/models").join(format!("{}.py", module)),
            ArtifactKind::Repository => {
                PathBuf::from("db/repositories").join(format!("{}.py", module))
            }
            ArtifactKind::Routes => PathBuf::from("api").join(module).join("routes.py"),
        }
    }

    /// Dotted module path relative to the package root.
    pub fn module_path(self, module: &str) -> String {
        match self {
            ArtifactKind::Schema => format!("schemas.{}", module),
            ArtifactKind::Model => format!("db.models.{}", module),
            ArtifactKind::Repository => format!("db.repositories.{}", module),
            ArtifactKind::Routes => format!("api.{}.routes", module),
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::Schema => "schema",
            ArtifactKind::Model => "model",
            ArtifactKind::Repository => "repository",
            ArtifactKind::Routes => "routes",
        };
        f.write_str(name)
    }
}

/// Rendered source text and where it goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedArtifact {
    pub kind: ArtifactKind,
    /// Path relative to the source root.
    pub path: PathBuf,
    #[serde(skip)]
    pub content: String,
}

/// A pure function from the model IR to one artifact.
pub trait Renderer {
    /// The artifact this renderer produces.
    fn kind(&self) -> ArtifactKind;

    /// Render the artifact text.
    fn render_source(&self, model: &ModelDescriptor) -> String;

    /// Render the artifact with its destination path.
    fn render(&self, model: &ModelDescriptor) -> GeneratedArtifact {
        GeneratedArtifact {
            kind: self.kind(),
            path: self.kind().relative_path(&model.module),
            content: self.render_source(model),
        }
    }
}

/// Render all four artifacts in [`ArtifactKind::ALL`] order.
pub fn render_all(model: &ModelDescriptor) -> Vec<GeneratedArtifact> {
    let renderers: [&dyn Renderer; 4] = [
        &SchemaRenderer,
        &ModelRenderer,
        &RepositoryRenderer,
        &RouteRenderer,
    ];
    renderers.iter().map(|r| r.render(model)).collect()
}

/// Line buffer for Python source with four-space indentation.
#[derive(Debug, Default)]
pub(crate) struct PySource {
    out: String,
}

impl PySource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn line(&mut self, depth: usize, text: impl AsRef<str>) {
        for _ in 0..depth {
            self.out.push_str("    ");
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    pub(crate) fn blank(&mut self) {
        self.out.push('\n');
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::ir::{ModelBuilder, ModelDescriptor, ResolvedField};
    use crate::parser::parse_field_token;

    /// The `Book` model used across renderer tests.
    pub(crate) fn book() -> ModelDescriptor {
        model(
            "Book",
            &[
                "title:str:unique",
                "author_email:email",
                "year:int:nullable",
                "in_stock:bool:default=True",
            ],
        )
    }

    pub(crate) fn model(name: &str, tokens: &[&str]) -> ModelDescriptor {
        let fields = tokens
            .iter()
            .map(|t| ResolvedField::resolve(parse_field_token(t).unwrap()).unwrap())
            .collect();
        ModelBuilder::new(name).build(fields).unwrap()
    }
}
