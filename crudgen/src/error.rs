//! Error types for the generation core.
//!
//! Every failure carries the offending token, type name or anchor so the
//! operator can fix the input and re-run.

use thiserror::Error;

/// Result type alias for core operations.
pub type SpecResult<T> = Result<T, SpecError>;

/// Errors raised while turning field tokens into rendered artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    /// The token does not follow `name:type[:param[=value],...]`.
    #[error("Malformed field spec '{token}': {reason} (expected name:type[:param[=value],...])")]
    MalformedFieldSpec { token: String, reason: String },

    /// The same parameter was given twice for one field.
    #[error("Duplicate parameter '{param}' in field spec '{token}'")]
    DuplicateParam { token: String, param: String },

    /// The parameter is not part of the field grammar.
    #[error("Unknown parameter '{param}' in field spec '{token}' (supported: {})", .supported.join(", "))]
    UnknownParam {
        token: String,
        param: String,
        supported: Vec<&'static str>,
    },

    /// The logical type has no mapping.
    #[error("Unknown type '{type_name}' (supported: {})", .supported.join(", "))]
    UnknownType {
        type_name: String,
        supported: Vec<&'static str>,
    },

    /// A parameter is valid syntax but not applicable to the field's type.
    #[error("Parameter '{param}' is not valid for field '{field}' of type {type_name}")]
    InvalidParam {
        field: String,
        param: String,
        type_name: &'static str,
    },

    /// A default literal does not fit the field.
    #[error("Default {value} is not valid for field '{field}' of type {type_name}{}", nullable_hint(.nullable))]
    IncompatibleDefault {
        field: String,
        type_name: &'static str,
        value: String,
        nullable: bool,
    },

    /// The model name or field set cannot produce a model.
    #[error("Invalid model '{model}': {reason}")]
    InvalidModel { model: String, reason: String },

    /// The wiring anchor is missing from the aggregation file.
    #[error("Anchor '{anchor}' not found")]
    AnchorNotFound { anchor: String },
}

fn nullable_hint(nullable: &bool) -> &'static str {
    if *nullable {
        ""
    } else {
        " (add `nullable` to allow None)"
    }
}

impl SpecError {
    /// Create a malformed field spec error.
    pub fn malformed(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedFieldSpec {
            token: token.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid model error.
    pub fn invalid_model(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidModel {
            model: model.into(),
            reason: reason.into(),
        }
    }

    /// Create an anchor not found error.
    pub fn anchor_not_found(anchor: impl Into<String>) -> Self {
        Self::AnchorNotFound {
            anchor: anchor.into(),
        }
    }
}
