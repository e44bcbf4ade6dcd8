//! Line-level view of a Python module.
//!
//! Physical lines are grouped into logical lines the way the Python
//! tokenizer does it: open brackets, triple-quoted strings and trailing
//! backslashes continue a statement. Comment-only and blank lines belong
//! to no logical line.

use super::{Anchor, ImportSpec, RegistrationProbe};

/// Physical lines `start..end` forming one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LogicalLine {
    pub start: usize,
    pub end: usize,
    pub indent: usize,
    /// Code with comments removed, physical lines joined by a space.
    pub code: String,
}

impl LogicalLine {
    pub fn is_top_level(&self) -> bool {
        self.indent == 0
    }

    pub fn is_import(&self) -> bool {
        self.code.starts_with("import ") || self.code.starts_with("from ")
    }

    fn is_docstring(&self) -> bool {
        self.code.starts_with('"') || self.code.starts_with('\'')
    }

    /// Names bound by a `from <module> import ...` statement.
    fn from_import(&self) -> Option<(&str, Vec<(&str, Option<&str>)>)> {
        let rest = self.code.strip_prefix("from ")?.trim_start();
        let (module, tail) = rest.split_once(char::is_whitespace)?;
        let names = tail.trim_start().strip_prefix("import")?;
        let names = names
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')');
        let bound = names
            .split(',')
            .filter_map(|item| {
                let mut words = item.split_whitespace();
                let name = words.next()?;
                match (words.next(), words.next()) {
                    (Some("as"), Some(alias)) => Some((name, Some(alias))),
                    _ => Some((name, None)),
                }
            })
            .collect();
        Some((module, bound))
    }

    fn defines(&self, name: &str) -> bool {
        let code = self.code.strip_prefix("async ").unwrap_or(&self.code);
        code.strip_prefix("def ")
            .map(str::trim_start)
            .and_then(|rest| rest.strip_prefix(name))
            .is_some_and(|rest| rest.trim_start().starts_with('('))
    }

    fn assigns(&self, name: &str) -> bool {
        self.code
            .strip_prefix(name)
            .map(str::trim_start)
            .is_some_and(|rest| {
                (rest.starts_with('=') && !rest.starts_with("==")) || rest.starts_with(':')
            })
    }

    fn calls(&self, callee: &str, argument: &str) -> bool {
        let compact: String = self.code.chars().filter(|c| !c.is_whitespace()).collect();
        compact
            .strip_prefix(callee)
            .and_then(|rest| rest.strip_prefix('('))
            .and_then(|rest| rest.strip_prefix(argument))
            .is_some_and(|rest| rest.starts_with(')') || rest.starts_with(','))
    }
}

#[derive(Debug, Clone, Copy)]
enum Quote {
    Single(char),
    Triple(char),
}

/// A parsed module plus the pending insertions against it.
#[derive(Debug)]
pub(crate) struct PyModule {
    lines: Vec<String>,
    newline: &'static str,
    logical: Vec<LogicalLine>,
    insertions: Vec<(usize, Vec<String>)>,
}

impl PyModule {
    pub fn parse(content: &str) -> Self {
        let newline = if content.contains("\r\n") { "\r\n" } else { "\n" };
        let lines: Vec<String> = content.lines().map(str::to_string).collect();
        let logical = logical_lines(&lines);
        Self {
            lines,
            newline,
            logical,
            insertions: Vec::new(),
        }
    }

    pub fn has_import(&self, spec: &ImportSpec) -> bool {
        self.logical
            .iter()
            .filter_map(LogicalLine::from_import)
            .any(|(module, names)| {
                module == spec.module
                    && names.iter().any(|(name, alias)| {
                        *name == spec.name && alias.unwrap_or(*name) == spec.bound_name()
                    })
            })
    }

    pub fn has_registration(&self, probe: &RegistrationProbe) -> bool {
        self.logical.iter().any(|line| match probe {
            RegistrationProbe::Call { callee, argument } => line.calls(callee, argument),
            RegistrationProbe::Definition(name) => line.defines(name),
        })
    }

    pub fn has_anchor(&self, anchor: &Anchor) -> bool {
        self.logical
            .iter()
            .filter(|line| line.is_top_level())
            .any(|line| match anchor {
                Anchor::Assignment(name) => line.assigns(name),
                Anchor::Definition(name) => line.defines(name),
            })
    }

    /// Line after the last top-level import, or after the docstring when
    /// the module has no imports.
    pub fn import_line(&self) -> usize {
        let mut top = self.logical.iter().filter(|line| line.is_top_level());
        if let Some(last) = top.clone().filter(|line| line.is_import()).last() {
            return last.end;
        }
        match top.next() {
            Some(first) if first.is_docstring() => first.end,
            Some(first) => first.start,
            None => self.lines.len(),
        }
    }

    /// Index and indentation of a comment line equal to `marker`.
    pub fn marker_line(&self, marker: &str) -> Option<(usize, String)> {
        self.lines.iter().enumerate().find_map(|(index, line)| {
            let trimmed = line.trim_start();
            let in_statement = self
                .logical
                .iter()
                .any(|logical| logical.start <= index && index < logical.end);
            if trimmed.trim_end() == marker && !in_statement {
                Some((index, line[..line.len() - trimmed.len()].to_string()))
            } else {
                None
            }
        })
    }

    /// Queue `text` before line `at`, each line prefixed by `indent`.
    pub fn insert(&mut self, at: usize, indent: &str, text: &str) {
        let lines = text
            .lines()
            .map(|line| {
                if line.is_empty() {
                    String::new()
                } else {
                    format!("{}{}", indent, line)
                }
            })
            .collect();
        self.insertions.push((at, lines));
    }

    /// Queue `text` at the end of the module. `separate` asks for two blank
    /// lines before it; a module ending in an indented body always gets them.
    pub fn append(&mut self, text: &str, separate: bool) {
        let trailing_blank = self
            .lines
            .iter()
            .rev()
            .take_while(|line| line.trim().is_empty())
            .count();
        let body_end = self.lines.len() - trailing_blank;
        let ends_indented = self.lines[..body_end]
            .last()
            .is_some_and(|line| line.starts_with(char::is_whitespace));
        let wanted: usize = if body_end > 0 && (separate || ends_indented) {
            2
        } else {
            0
        };

        let mut lines = vec![String::new(); wanted.saturating_sub(trailing_blank)];
        lines.extend(text.lines().map(str::to_string));
        self.insertions.push((self.lines.len(), lines));
    }

    pub fn is_edited(&self) -> bool {
        !self.insertions.is_empty()
    }

    /// Apply the queued insertions and join with the original line ending.
    pub fn finish(mut self) -> String {
        // Later positions first so earlier indices stay valid; at the same
        // position the first queued insertion ends up on top.
        let mut insertions = std::mem::take(&mut self.insertions);
        insertions.reverse();
        insertions.sort_by(|a, b| b.0.cmp(&a.0));
        for (at, lines) in insertions {
            self.lines.splice(at..at, lines);
        }

        let mut out = self.lines.join(self.newline);
        if !out.is_empty() {
            out.push_str(self.newline);
        }
        out
    }
}

/// Group physical lines into logical lines.
pub(crate) fn logical_lines(lines: &[String]) -> Vec<LogicalLine> {
    let mut out = Vec::new();
    let mut current: Option<LogicalLine> = None;
    let mut depth = 0usize;
    let mut quote = None;

    for (index, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if current.is_none() {
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            current = Some(LogicalLine {
                start: index,
                end: index + 1,
                indent: line.len() - trimmed.len(),
                code: String::new(),
            });
        }

        let (code, continues) = scan_line(line, &mut depth, &mut quote);
        if let Some(logical) = current.as_mut() {
            let code = code.trim();
            if !logical.code.is_empty() && !code.is_empty() {
                logical.code.push(' ');
            }
            logical.code.push_str(code);
            logical.end = index + 1;
        }
        if !continues {
            out.extend(current.take());
        }
    }
    out.extend(current);
    out
}

/// Strip the comment from one physical line and report whether the
/// statement continues on the next line.
fn scan_line(line: &str, depth: &mut usize, quote: &mut Option<Quote>) -> (String, bool) {
    let chars: Vec<char> = line.chars().collect();
    let mut code = String::with_capacity(line.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match *quote {
            Some(open) => {
                code.push(c);
                if c == '\\' {
                    if let Some(&next) = chars.get(i + 1) {
                        code.push(next);
                    }
                    i += 2;
                    continue;
                }
                match open {
                    Quote::Triple(q)
                        if c == q && chars.get(i + 1) == Some(&q) && chars.get(i + 2) == Some(&q) =>
                    {
                        code.push(q);
                        code.push(q);
                        *quote = None;
                        i += 3;
                        continue;
                    }
                    Quote::Single(q) if c == q => *quote = None,
                    _ => {}
                }
            }
            None => match c {
                '#' => break,
                '\'' | '"' => {
                    if chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c) {
                        code.extend([c, c, c]);
                        *quote = Some(Quote::Triple(c));
                        i += 3;
                        continue;
                    }
                    code.push(c);
                    *quote = Some(Quote::Single(c));
                }
                '(' | '[' | '{' => {
                    *depth += 1;
                    code.push(c);
                }
                ')' | ']' | '}' => {
                    *depth = depth.saturating_sub(1);
                    code.push(c);
                }
                _ => code.push(c),
            },
        }
        i += 1;
    }

    let in_string = match *quote {
        Some(Quote::Triple(_)) => true,
        Some(Quote::Single(_)) => {
            // unterminated single-quoted string ends with the line
            let continued = line.ends_with('\\');
            if !continued {
                *quote = None;
            }
            continued
        }
        None => false,
    };

    let backslash = quote.is_none() && code.trim_end().ends_with('\\');
    if backslash {
        let end = code.trim_end().len() - 1;
        code.truncate(end);
    }

    (code, in_string || backslash || *depth > 0)
}
