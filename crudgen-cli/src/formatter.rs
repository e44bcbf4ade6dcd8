//! External lint/format pass run after generation.
//!
//! The formatter is best-effort: whatever happens, the outcome is reported
//! and the generation result stands.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Serialize;

use crate::config::FormatterConfig;

/// What happened when the formatter ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum FormatterOutcome {
    /// The command exited successfully.
    Succeeded,
    /// Not run; the reason is given.
    Skipped(String),
    /// The command could not start or exited non-zero.
    Warning(String),
}

/// Runs the configured command in the project root.
#[derive(Debug, Clone)]
pub struct Formatter {
    enabled: bool,
    command: Vec<String>,
    use_uv: bool,
}

impl Formatter {
    pub fn from_config(config: &FormatterConfig) -> Self {
        Self {
            enabled: config.enabled,
            command: config.command.clone(),
            use_uv: config.use_uv,
        }
    }

    /// The full command line, with `uv run` in front when requested and
    /// available.
    pub fn command_line(&self) -> Vec<String> {
        if self.use_uv && find_on_path("uv").is_some() {
            let mut line = vec!["uv".to_string(), "run".to_string()];
            line.extend(self.command.iter().cloned());
            line
        } else {
            self.command.clone()
        }
    }

    pub fn run(&self, project_root: &Path) -> FormatterOutcome {
        if !self.enabled {
            return FormatterOutcome::Skipped("disabled".to_string());
        }
        let line = self.command_line();
        let Some((program, args)) = line.split_first() else {
            return FormatterOutcome::Skipped("no command configured".to_string());
        };
        let shown = line.join(" ");
        tracing::info!(command = %shown, root = %project_root.display(), "running formatter");

        let output = Command::new(program)
            .args(args)
            .current_dir(project_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        match output {
            Ok(output) if output.status.success() => FormatterOutcome::Succeeded,
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let stdout = String::from_utf8_lossy(&output.stdout);
                let detail = stderr
                    .lines()
                    .chain(stdout.lines())
                    .find(|line| !line.trim().is_empty())
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                let code = output
                    .status
                    .code()
                    .map_or_else(|| "a signal".to_string(), |c| format!("status {}", c));
                tracing::warn!(command = %shown, %code, "formatter reported problems");
                if detail.is_empty() {
                    FormatterOutcome::Warning(format!("`{}` exited with {}", shown, code))
                } else {
                    FormatterOutcome::Warning(format!(
                        "`{}` exited with {}: {}",
                        shown, code, detail
                    ))
                }
            }
            Err(e) => {
                tracing::warn!(command = %shown, error = %e, "formatter could not start");
                FormatterOutcome::Warning(format!("`{}` could not be run: {}", shown, e))
            }
        }
    }
}

/// First executable named `program` on `PATH`.
fn find_on_path(program: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        let exe = dir.join(format!("{}.exe", program));
        exe.is_file().then_some(exe)
    })
}
