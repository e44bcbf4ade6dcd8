//! # crudgen
//!
//! Turns a model name and a list of field descriptors into a CRUD stack for
//! a layered FastAPI application: Pydantic schemas, a SQLAlchemy model, an
//! async repository and an `APIRouter`, plus idempotent wiring edits that
//! make the new router reachable.
//!
//! Everything in this crate is pure: it takes text and returns text. File
//! I/O lives in `crudgen-cli`.
//!
//! ## Usage
//!
//! ```rust
//! use crudgen::{parse_field_tokens, render_all, ModelBuilder, ResolvedField};
//!
//! let fields = parse_field_tokens(&["title:str:unique", "year:int:nullable"])?
//!     .into_iter()
//!     .map(ResolvedField::resolve)
//!     .collect::<Result<Vec<_>, _>>()?;
//! let model = ModelBuilder::new("Book").build(fields)?;
//!
//! let artifacts = render_all(&model);
//! assert_eq!(artifacts.len(), 4);
//! assert!(artifacts[0].content.contains("class BookCreate(BaseSchema):"));
//! # Ok::<(), crudgen::SpecError>(())
//! ```
//!
//! ## Field descriptors
//!
//! `name:type[:param[,param...]]` where `type` is one of `str`, `email`,
//! `int`, `bool`, `float` and the params are `unique`, `nullable`, `index`,
//! `default=<literal>` and `length=<n>`.

pub mod error;
pub mod ir;
pub mod naming;
pub mod parser;
pub mod render;
pub mod types;
pub mod wiring;

pub use error::{SpecError, SpecResult};
pub use ir::{ModelBuilder, ModelDescriptor, ResolvedField, IDENTITY_FIELD};
pub use parser::{parse_field_token, parse_field_tokens, FieldDescriptor, FieldParam};
pub use render::{render_all, ArtifactKind, GeneratedArtifact, Renderer};
pub use types::{DefaultValue, LogicalType, TypeMapping};
pub use wiring::{
    MarkerStrategy, StructuredStrategy, WiringEdit, WiringOutcome, WiringStrategy,
    DEFAULT_ROUTER_MARKER,
};
