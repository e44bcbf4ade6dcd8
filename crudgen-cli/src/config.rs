//! Configuration management for the CLI.
//!
//! This module handles loading configuration from `crudgen.toml` files
//! and merging with command-line arguments.

use std::fmt;
use std::path::{Path, PathBuf};

use crudgen::naming::{is_identifier, is_python_keyword};
use crudgen::wiring::DEFAULT_ROUTER_MARKER;
use crudgen::{MarkerStrategy, StructuredStrategy, WiringStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{CliResult, ConfigError};

/// Default configuration filename.
pub const CONFIG_FILENAME: &str = "crudgen.toml";

/// Main configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the Python project lives.
    pub paths: PathsConfig,

    /// Python package settings.
    pub python: PythonConfig,

    /// Router registration.
    pub wiring: WiringConfig,

    /// Post-generation lint/format pass.
    pub formatter: FormatterConfig,
}

/// Filesystem locations. Relative paths are resolved against `project_root`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of the Python project; the formatter runs here.
    pub project_root: PathBuf,

    /// Source root the generated files go under.
    pub src_dir: PathBuf,

    /// Application module that includes the routers.
    pub app_file: PathBuf,
}

/// Python package settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PythonConfig {
    /// Dotted package that generated imports start from.
    pub package: String,
}

/// How the router is registered in the application module.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WiringConfig {
    /// Placement strategy for the registration call.
    pub strategy: WiringMode,

    /// Name of the FastAPI instance in the application module.
    pub app_name: String,

    /// Comment line the marker strategy inserts above.
    pub router_marker: String,

    /// Whether to edit the application and dependency modules at all.
    pub register: bool,
}

/// Which [`WiringStrategy`] edits the application module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WiringMode {
    /// Insert above a marker comment.
    Marker,
    /// Append after the module's statements; requires the app assignment.
    #[default]
    Structured,
}

/// External formatter configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FormatterConfig {
    /// Run the formatter after generation.
    pub enabled: bool,

    /// Program and arguments.
    pub command: Vec<String>,

    /// Prefix the command with `uv run` when `uv` is on `PATH`.
    pub use_uv: bool,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            src_dir: PathBuf::from("src"),
            app_file: PathBuf::from("src/api/app.py"),
        }
    }
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            package: "src".to_string(),
        }
    }
}

impl Default for WiringConfig {
    fn default() -> Self {
        Self {
            strategy: WiringMode::default(),
            app_name: "app".to_string(),
            router_marker: DEFAULT_ROUTER_MARKER.to_string(),
            register: true,
        }
    }
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: ["ruff", "check", "--fix", "."]
                .into_iter()
                .map(String::from)
                .collect(),
            use_uv: true,
        }
    }
}

impl fmt::Display for WiringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WiringMode::Marker => f.write_str("marker"),
            WiringMode::Structured => f.write_str("structured"),
        }
    }
}

impl PathsConfig {
    /// Absolute or cwd-relative source root.
    pub fn src_dir(&self) -> PathBuf {
        self.project_root.join(&self.src_dir)
    }

    /// Absolute or cwd-relative application module.
    pub fn app_file(&self) -> PathBuf {
        self.project_root.join(&self.app_file)
    }
}

impl WiringConfig {
    /// The strategy used for the application module.
    pub fn strategy(&self) -> Box<dyn WiringStrategy> {
        match self.strategy {
            WiringMode::Marker => Box::new(MarkerStrategy::new(&self.router_marker)),
            WiringMode::Structured => Box::new(StructuredStrategy),
        }
    }
}

impl Config {
    /// Reject values that would only fail later, mid-run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wiring.app_name.trim().is_empty() {
            return Err(ConfigError::invalid_value("wiring.app_name", "must not be empty"));
        }
        if !is_identifier(&self.wiring.app_name) || is_python_keyword(&self.wiring.app_name) {
            return Err(ConfigError::invalid_value(
                "wiring.app_name",
                format!("'{}' is not a valid Python identifier", self.wiring.app_name),
            ));
        }
        if self.wiring.strategy == WiringMode::Marker
            && !self.wiring.router_marker.trim().starts_with('#')
        {
            return Err(ConfigError::invalid_value(
                "wiring.router_marker",
                "must be a comment starting with '#'",
            ));
        }
        if self.formatter.enabled && self.formatter.command.is_empty() {
            return Err(ConfigError::invalid_value(
                "formatter.command",
                "must name a program",
            ));
        }
        Ok(())
    }
}

/// Configuration manager for loading and merging configs.
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from a file path.
    ///
    /// An explicit path must exist. Without one, `crudgen.toml` in the
    /// current directory is used when present, defaults otherwise.
    pub fn load(path: Option<&Path>) -> CliResult<Config> {
        let config_path = match path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::not_found(path.to_path_buf()).into())
            }
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(CONFIG_FILENAME),
        };

        if !config_path.exists() {
            tracing::debug!("no {} found, using defaults", CONFIG_FILENAME);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::invalid_toml(config_path.clone(), e.to_string()))?;

        tracing::debug!(path = %config_path.display(), "loaded configuration");
        Ok(config)
    }

    /// Merge CLI arguments into configuration.
    ///
    /// CLI arguments take precedence over config file values.
    pub fn merge_cli_args(mut config: Config, args: &CliArgs) -> Config {
        if let Some(ref project_root) = args.project_root {
            config.paths.project_root = project_root.clone();
        }

        if let Some(ref src_dir) = args.src_dir {
            config.paths.src_dir = src_dir.clone();
        }

        if let Some(ref app_file) = args.app_file {
            config.paths.app_file = app_file.clone();
        }

        if let Some(ref app_name) = args.app_name {
            config.wiring.app_name = app_name.clone();
        }

        if let Some(ref package) = args.package {
            config.python.package = package.clone();
        }

        if let Some(strategy) = args.wiring {
            config.wiring.strategy = strategy;
        }

        if args.no_register {
            config.wiring.register = false;
        }

        if args.no_format {
            config.formatter.enabled = false;
        }

        if let Some(use_uv) = args.use_uv {
            config.formatter.use_uv = use_uv;
        }

        config
    }
}

/// CLI arguments that can override configuration.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Project root override.
    pub project_root: Option<PathBuf>,

    /// Source directory override.
    pub src_dir: Option<PathBuf>,

    /// Application module override.
    pub app_file: Option<PathBuf>,

    /// FastAPI instance name override.
    pub app_name: Option<String>,

    /// Import package override.
    pub package: Option<String>,

    /// Wiring strategy override.
    pub wiring: Option<WiringMode>,

    /// Skip all wiring edits.
    pub no_register: bool,

    /// Skip the formatter.
    pub no_format: bool,

    /// Whether to prefix the formatter with `uv run`.
    pub use_uv: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.paths.src_dir, PathBuf::from("src"));
        assert_eq!(config.paths.app_file, PathBuf::from("src/api/app.py"));
        assert_eq!(config.python.package, "src");
        assert_eq!(config.wiring.strategy, WiringMode::Structured);
        assert_eq!(config.wiring.app_name, "app");
        assert_eq!(config.wiring.router_marker, "# crudgen: routers");
        assert!(config.wiring.register);
        assert!(config.formatter.enabled);
        assert_eq!(config.formatter.command, vec!["ruff", "check", "--fix", "."]);
        assert!(config.formatter.use_uv);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_cli_args_overrides() {
        let config = Config::default();
        let args = CliArgs {
            src_dir: Some(PathBuf::from("app")),
            package: Some("app".to_string()),
            wiring: Some(WiringMode::Marker),
            no_register: true,
            no_format: true,
            ..Default::default()
        };

        let merged = ConfigManager::merge_cli_args(config, &args);
        assert_eq!(merged.paths.src_dir, PathBuf::from("app"));
        assert_eq!(merged.python.package, "app");
        assert_eq!(merged.wiring.strategy, WiringMode::Marker);
        assert!(!merged.wiring.register);
        assert!(!merged.formatter.enabled);
    }

    #[test]
    fn test_merge_cli_args_uv_choice() {
        let config = Config::default();
        assert!(config.formatter.use_uv);

        let args = CliArgs {
            use_uv: Some(false),
            ..Default::default()
        };
        let merged = ConfigManager::merge_cli_args(config, &args);
        assert!(!merged.formatter.use_uv);

        let merged = ConfigManager::merge_cli_args(
            merged,
            &CliArgs {
                use_uv: Some(true),
                ..Default::default()
            },
        );
        assert!(merged.formatter.use_uv);

        let kept = ConfigManager::merge_cli_args(merged, &CliArgs::default());
        assert!(kept.formatter.use_uv);
    }

    #[test]
    fn test_merge_cli_args_preserves_unset() {
        let config = Config::default();
        let args = CliArgs::default();

        let merged = ConfigManager::merge_cli_args(config.clone(), &args);
        assert_eq!(merged.paths.src_dir, config.paths.src_dir);
        assert_eq!(merged.wiring.app_name, config.wiring.app_name);
        assert!(merged.wiring.register);
    }

    #[test]
    fn test_paths_resolve_against_project_root() {
        let mut config = Config::default();
        config.paths.project_root = PathBuf::from("/work/shop");
        assert_eq!(config.paths.src_dir(), PathBuf::from("/work/shop/src"));
        assert_eq!(
            config.paths.app_file(),
            PathBuf::from("/work/shop/src/api/app.py")
        );
    }

    #[test]
    fn test_parse_toml_config() {
        let toml = r##"
[paths]
src_dir = "backend"
app_file = "backend/main.py"

[python]
package = "backend"

[wiring]
strategy = "marker"
app_name = "api"
router_marker = "# routers"

[formatter]
enabled = false
command = ["black", "."]
use_uv = false
"##;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.paths.src_dir, PathBuf::from("backend"));
        assert_eq!(config.paths.project_root, PathBuf::from("."));
        assert_eq!(config.paths.app_file, PathBuf::from("backend/main.py"));
        assert_eq!(config.python.package, "backend");
        assert_eq!(config.wiring.strategy, WiringMode::Marker);
        assert_eq!(config.wiring.app_name, "api");
        assert_eq!(config.wiring.router_marker, "# routers");
        assert!(config.wiring.register);
        assert!(!config.formatter.enabled);
        assert_eq!(config.formatter.command, vec!["black", "."]);
        assert!(!config.formatter.use_uv);
        assert_eq!(config.wiring.strategy().name(), "marker");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.wiring.strategy = WiringMode::Marker;
        config.wiring.router_marker = "routers".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "wiring.router_marker"
        ));

        let mut config = Config::default();
        config.formatter.command.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_app_name_must_be_identifier() {
        for name in ["my app", "app.main", "1app", "class"] {
            let mut config = Config::default();
            config.wiring.strategy = WiringMode::Marker;
            config.wiring.app_name = name.to_string();
            assert!(
                matches!(
                    config.validate(),
                    Err(ConfigError::InvalidValue { ref key, .. }) if key == "wiring.app_name"
                ),
                "{name}"
            );
        }

        let mut config = Config::default();
        config.wiring.app_name = "application".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_default_and_explicit() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("crudgen.toml");
        let err = ConfigManager::load(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("Configuration file not found"));

        std::fs::write(&missing, "[wiring]\napp_name = \"api\"\n").unwrap();
        let config = ConfigManager::load(Some(&missing)).unwrap();
        assert_eq!(config.wiring.app_name, "api");
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crudgen.toml");
        std::fs::write(&path, "[wiring\n").unwrap();
        let err = ConfigManager::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Invalid TOML"));
    }
}
