//! Identifier checks and the naming conventions shared by every renderer.

use convert_case::{Case, Casing};

/// Python keywords that cannot be used as attribute or module names.
const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Whether `s` matches `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Whether `s` is a reserved Python keyword.
pub fn is_python_keyword(s: &str) -> bool {
    PYTHON_KEYWORDS.contains(&s)
}

/// Class name for a model; names that start lowercase are PascalCased.
pub fn class_name(model: &str) -> String {
    if model.starts_with(|c: char| c.is_ascii_uppercase()) {
        model.to_string()
    } else {
        model.to_case(Case::Pascal)
    }
}

/// Module path segment for a model class name (`BookItem` -> `book_item`).
pub fn module_segment(class_name: &str) -> String {
    class_name.to_case(Case::Snake)
}

/// Simple English pluralization for collection paths and method names.
pub fn pluralize(s: &str) -> String {
    if let Some(stem) = s.strip_suffix('y') {
        if stem
            .chars()
            .last()
            .is_some_and(|c| c.is_ascii_alphabetic() && !"aeiouAEIOU".contains(c))
        {
            return format!("{}ies", stem);
        }
        format!("{}s", s)
    } else if s.ends_with('s')
        || s.ends_with('x')
        || s.ends_with('z')
        || s.ends_with("sh")
        || s.ends_with("ch")
    {
        format!("{}es", s)
    } else {
        format!("{}s", s)
    }
}
