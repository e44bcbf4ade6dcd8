//! Field descriptor parser.
//!
//! Turns one `name:type[:param[=value],...]` token into a [`FieldDescriptor`].
//! Parameters after the type may be separated by `,` or by further `:`;
//! quoted values may contain either separator.

use std::fmt;

use serde::Serialize;

use crate::error::{SpecError, SpecResult};
use crate::naming::{is_identifier, is_python_keyword};
use crate::types::{DefaultValue, LogicalType};

/// Parameter keys understood by the parser.
pub const SUPPORTED_PARAMS: [&str; 5] = ["unique", "nullable", "index", "default", "length"];

/// One constraint attached to a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldParam {
    /// `unique`: the column carries a unique constraint.
    Unique,
    /// `nullable`: the value may be `None` in every layer.
    Nullable,
    /// `index`: the column is indexed.
    Index,
    /// `default=<literal>`: value used when the caller omits the field.
    Default(DefaultValue),
    /// `length=<n>`: maximum length of a string column.
    Length(u32),
}

impl FieldParam {
    /// The key this parameter is written with.
    pub fn key(&self) -> &'static str {
        match self {
            FieldParam::Unique => "unique",
            FieldParam::Nullable => "nullable",
            FieldParam::Index => "index",
            FieldParam::Default(_) => "default",
            FieldParam::Length(_) => "length",
        }
    }

    /// Canonical token form of this parameter.
    pub fn canonical(&self) -> String {
        match self {
            FieldParam::Default(value) => format!("default={}", value.canonical()),
            FieldParam::Length(n) => format!("length={}", n),
            flag => flag.key().to_string(),
        }
    }
}

/// A parsed, validated model attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Attribute name; a Python identifier.
    pub name: String,
    /// Resolved logical type.
    pub logical_type: LogicalType,
    /// Constraints in the order they were written.
    pub params: Vec<FieldParam>,
}

impl FieldDescriptor {
    pub fn is_unique(&self) -> bool {
        self.params.contains(&FieldParam::Unique)
    }

    pub fn is_nullable(&self) -> bool {
        self.params.contains(&FieldParam::Nullable)
    }

    pub fn is_indexed(&self) -> bool {
        self.params.contains(&FieldParam::Index)
    }

    pub fn default(&self) -> Option<&DefaultValue> {
        self.params.iter().find_map(|p| match p {
            FieldParam::Default(value) => Some(value),
            _ => None,
        })
    }

    pub fn length(&self) -> Option<u32> {
        self.params.iter().find_map(|p| match p {
            FieldParam::Length(n) => Some(*n),
            _ => None,
        })
    }

    /// Canonical token: `name:type[:param,param...]`.
    pub fn canonical(&self) -> String {
        let mut token = format!("{}:{}", self.name, self.logical_type);
        if !self.params.is_empty() {
            token.push(':');
            let params: Vec<String> = self.params.iter().map(FieldParam::canonical).collect();
            token.push_str(&params.join(","));
        }
        token
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl Serialize for FieldDescriptor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical())
    }
}

/// Parse every token, stopping at the first failure.
pub fn parse_field_tokens<S: AsRef<str>>(tokens: &[S]) -> SpecResult<Vec<FieldDescriptor>> {
    tokens
        .iter()
        .map(|token| parse_field_token(token.as_ref()))
        .collect()
}

/// Parse one field token.
pub fn parse_field_token(token: &str) -> SpecResult<FieldDescriptor> {
    let segments = split_segments(token)?;
    let mut segments = segments.into_iter();

    let name = match segments.next() {
        Some(segment) => segment.text,
        None => return Err(SpecError::malformed(token, "empty token")),
    };
    let type_segment = segments
        .next()
        .ok_or_else(|| SpecError::malformed(token, "missing type after field name"))?;
    if type_segment.separator != ':' {
        return Err(SpecError::malformed(
            token,
            "field name and type must be separated by ':'",
        ));
    }

    let name = name.trim();
    if !is_identifier(name) {
        return Err(SpecError::malformed(
            token,
            format!("'{}' is not a valid identifier", name),
        ));
    }
    if is_python_keyword(name) {
        return Err(SpecError::malformed(
            token,
            format!("'{}' is a reserved keyword", name),
        ));
    }

    let type_name = type_segment.text.trim();
    if type_name.is_empty() {
        return Err(SpecError::malformed(token, "missing type after field name"));
    }
    let logical_type = LogicalType::resolve(type_name)?;

    let mut params: Vec<FieldParam> = Vec::new();
    for (position, segment) in segments.enumerate() {
        if position == 0 && segment.separator != ':' {
            return Err(SpecError::malformed(
                token,
                "parameters must follow the type after ':'",
            ));
        }
        let param = parse_param(token, &segment.text)?;
        if params.iter().any(|p| p.key() == param.key()) {
            return Err(SpecError::DuplicateParam {
                token: token.to_string(),
                param: param.key().to_string(),
            });
        }
        params.push(param);
    }

    Ok(FieldDescriptor {
        name: name.to_string(),
        logical_type,
        params,
    })
}

fn parse_param(token: &str, raw: &str) -> SpecResult<FieldParam> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(SpecError::malformed(token, "empty parameter"));
    }

    let (key, value) = match raw.split_once('=') {
        Some((key, value)) => (key.trim().to_ascii_lowercase(), Some(value.trim())),
        None => (raw.to_ascii_lowercase(), None),
    };

    match (key.as_str(), value) {
        ("unique", None) => Ok(FieldParam::Unique),
        ("nullable", None) => Ok(FieldParam::Nullable),
        ("index", None) => Ok(FieldParam::Index),
        ("unique" | "nullable" | "index", Some(_)) => Err(SpecError::malformed(
            token,
            format!("'{}' is a flag and takes no value", key),
        )),
        ("default", Some(value)) => Ok(FieldParam::Default(parse_default(token, value)?)),
        ("length", Some(value)) => match value.parse::<u32>() {
            Ok(n) if n > 0 => Ok(FieldParam::Length(n)),
            _ => Err(SpecError::malformed(
                token,
                format!("length must be a positive integer, got '{}'", value),
            )),
        },
        ("default" | "length", None) => Err(SpecError::malformed(
            token,
            format!("'{}' requires a value ({}=<value>)", key, key),
        )),
        _ => Err(SpecError::UnknownParam {
            token: token.to_string(),
            param: key,
            supported: SUPPORTED_PARAMS.to_vec(),
        }),
    }
}

fn parse_default(token: &str, value: &str) -> SpecResult<DefaultValue> {
    let Some(quote) = value.chars().next().filter(|c| *c == '"' || *c == '\'') else {
        if value.is_empty() {
            return Err(SpecError::malformed(token, "default requires a value"));
        }
        return Ok(DefaultValue::from_literal(value));
    };

    let mut out = String::new();
    let mut chars = value[1..].chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => out.push(escaped),
                None => break,
            },
            c if c == quote => {
                if chars.as_str().is_empty() {
                    return Ok(DefaultValue::Str(out));
                }
                return Err(SpecError::malformed(
                    token,
                    "unexpected text after closing quote",
                ));
            }
            c => out.push(c),
        }
    }
    Err(SpecError::malformed(token, "unterminated quoted default"))
}

/// A piece of the token together with the separator that preceded it.
struct Segment {
    separator: char,
    text: String,
}

/// Split on `:` and `,` outside of quotes, keeping quotes and escapes intact.
fn split_segments(token: &str) -> SpecResult<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut separator = ':';
    let mut quote: Option<char> = None;
    let mut chars = token.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == '\\' {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                ':' | ',' => {
                    segments.push(Segment {
                        separator,
                        text: std::mem::take(&mut current),
                    });
                    separator = c;
                }
                '"' | '\'' => {
                    quote = Some(c);
                    current.push(c);
                }
                c => current.push(c),
            },
        }
    }

    if quote.is_some() {
        return Err(SpecError::malformed(token, "unterminated quoted default"));
    }
    segments.push(Segment {
        separator,
        text: current,
    });
    Ok(segments)
}
