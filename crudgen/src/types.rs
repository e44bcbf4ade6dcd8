//! Logical field types and their target representations.
//!
//! A [`LogicalType`] is resolved by name once per field. Its [`TypeMapping`]
//! is produced by an exhaustive `match`, so the table is complete and
//! immutable before any command runs: adding a type means adding a variant
//! and the compiler points at every place that must learn about it.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{SpecError, SpecResult};

/// Abstract data type of a model field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalType {
    /// Free text.
    Str,
    /// Text validated as an email address at the transfer layer.
    Email,
    /// Signed integer.
    Int,
    /// Boolean flag.
    Bool,
    /// Floating point number.
    Float,
}

/// Concrete representations of a logical type in each generated layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMapping {
    /// Pydantic annotation used in the transfer schemas.
    pub transfer: &'static str,
    /// Name imported from `pydantic` for the transfer annotation, if any.
    pub transfer_import: Option<&'static str>,
    /// Annotation used in repository signatures.
    pub repository: &'static str,
    /// Python type inside `Mapped[...]`.
    pub orm: &'static str,
    /// SQLAlchemy column type constructor.
    pub column: &'static str,
    /// Whether the column type takes a length argument.
    pub sized: bool,
}

impl TypeMapping {
    /// Render the SQLAlchemy column type expression, e.g. `String(120)`.
    pub fn column_expr(&self, length: Option<u32>) -> String {
        match length {
            Some(length) if self.sized => format!("{}({})", self.column, length),
            _ => format!("{}()", self.column),
        }
    }
}

impl LogicalType {
    /// Every supported type, in the order they are listed to the user.
    pub const ALL: [LogicalType; 5] = [
        LogicalType::Str,
        LogicalType::Email,
        LogicalType::Int,
        LogicalType::Bool,
        LogicalType::Float,
    ];

    /// Canonical name used in field tokens.
    pub const fn name(self) -> &'static str {
        match self {
            LogicalType::Str => "str",
            LogicalType::Email => "email",
            LogicalType::Int => "int",
            LogicalType::Bool => "bool",
            LogicalType::Float => "float",
        }
    }

    /// Alternative spellings accepted by the resolver.
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            LogicalType::Str => &["string"],
            LogicalType::Int => &["integer"],
            LogicalType::Bool => &["boolean"],
            LogicalType::Email | LogicalType::Float => &[],
        }
    }

    /// Canonical names of every supported type.
    pub fn supported_names() -> Vec<&'static str> {
        Self::ALL.iter().map(|ty| ty.name()).collect()
    }

    /// Resolve a type name from a field token.
    ///
    /// Matching is case-insensitive and accepts the aliases listed by
    /// [`LogicalType::aliases`].
    pub fn resolve(name: &str) -> SpecResult<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|ty| ty.name() == normalized || ty.aliases().contains(&normalized.as_str()))
            .ok_or_else(|| SpecError::UnknownType {
                type_name: name.to_string(),
                supported: Self::supported_names(),
            })
    }

    /// The representations of this type in every target layer.
    pub const fn mapping(self) -> TypeMapping {
        match self {
            LogicalType::Str => TypeMapping {
                transfer: "str",
                transfer_import: None,
                repository: "str",
                orm: "str",
                column: "String",
                sized: true,
            },
            LogicalType::Email => TypeMapping {
                transfer: "EmailStr",
                transfer_import: Some("EmailStr"),
                repository: "str",
                orm: "str",
                column: "String",
                sized: true,
            },
            LogicalType::Int => TypeMapping {
                transfer: "int",
                transfer_import: None,
                repository: "int",
                orm: "int",
                column: "Integer",
                sized: false,
            },
            LogicalType::Bool => TypeMapping {
                transfer: "bool",
                transfer_import: None,
                repository: "bool",
                orm: "bool",
                column: "Boolean",
                sized: false,
            },
            LogicalType::Float => TypeMapping {
                transfer: "float",
                transfer_import: None,
                repository: "float",
                orm: "float",
                column: "Float",
                sized: false,
            },
        }
    }

    /// Render a default literal as a Python expression for this type.
    ///
    /// Returns `None` when the literal cannot be a value of this type.
    /// `None` literals are accepted here; nullability is checked by the
    /// model builder.
    pub fn default_expr(self, value: &DefaultValue) -> Option<String> {
        match (self, value) {
            (_, DefaultValue::None) => Some("None".to_string()),
            (LogicalType::Str | LogicalType::Email, DefaultValue::Str(s)) => {
                Some(python_str_literal(s))
            }
            (LogicalType::Int, DefaultValue::Int(i)) => Some(i.to_string()),
            (LogicalType::Float, DefaultValue::Float(f)) => Some(format!("{:?}", f)),
            (LogicalType::Float, DefaultValue::Int(i)) => Some(format!("{}.0", i)),
            (LogicalType::Bool, DefaultValue::Bool(b)) => Some(python_bool(*b).to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogicalType {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s)
    }
}

/// A `default=` literal from a field token.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// `None` (or `null`).
    None,
    /// `True` / `False`.
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Finite float literal.
    Float(f64),
    /// Quoted string, or any bare text that is not another literal.
    Str(String),
}

impl DefaultValue {
    /// Classify unquoted literal text the way Python would read it.
    pub fn from_literal(text: &str) -> Self {
        match text {
            "None" | "null" => return DefaultValue::None,
            "True" | "true" => return DefaultValue::Bool(true),
            "False" | "false" => return DefaultValue::Bool(false),
            _ => {}
        }

        if looks_numeric(text) {
            if let Ok(i) = text.parse::<i64>() {
                return DefaultValue::Int(i);
            }
            if let Ok(f) = text.parse::<f64>() {
                if f.is_finite() {
                    return DefaultValue::Float(f);
                }
            }
        }

        DefaultValue::Str(text.to_string())
    }

    /// Canonical token form; parsing it yields an equal value.
    pub fn canonical(&self) -> String {
        match self {
            DefaultValue::None => "None".to_string(),
            DefaultValue::Bool(b) => python_bool(*b).to_string(),
            DefaultValue::Int(i) => i.to_string(),
            DefaultValue::Float(f) => format!("{:?}", f),
            DefaultValue::Str(s) => {
                let mut out = String::with_capacity(s.len() + 2);
                out.push('"');
                for c in s.chars() {
                    if c == '"' || c == '\\' {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push('"');
                out
            }
        }
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

fn python_bool(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

/// Digits with an optional sign, fraction and exponent.
fn looks_numeric(text: &str) -> bool {
    let body = text.strip_prefix(['-', '+']).unwrap_or(text);
    body.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+' | '_'))
        && body.chars().any(|c| c.is_ascii_digit())
}

/// Render a Python double-quoted string literal.
pub fn python_str_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
