use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Verbosity accepted by `general.log_level` and `--log-level`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Off => write!(f, "off"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

/// Contents of a `dwarfdecl.toml` file. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub reconstruct: ReconstructConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Log level filter (overridden by --log-level and RUST_LOG)
    #[serde(default)]
    pub log_level: LogLevel,
    /// Also write logs to this file (overridden by --log-file)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Output directory (overridden by --output)
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Build root used to lay out generated headers (overridden by
    /// --base-dir). Computed from the compilation units when unset.
    #[serde(default)]
    pub base_dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReconstructConfig {
    #[serde(default = "default_max_entries_per_line")]
    pub max_entries_per_line: usize,
    #[serde(default = "default_max_inline_depth")]
    pub max_inline_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CleanupConfig {
    /// Rewrite verbose standard library spellings (overridden by --no-cleanup)
    #[serde(default = "default_cleanup_enabled")]
    pub enabled: bool,
    /// Extra regex rewrites applied after the built-in ones
    #[serde(default)]
    pub replacements: Vec<Replacement>,
}

/// A user-supplied rewrite; `replacement` may refer to groups as `$1`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Replacement {
    pub pattern: String,
    pub replacement: String,
}

fn default_max_entries_per_line() -> usize {
    16
}

fn default_max_inline_depth() -> usize {
    8
}

fn default_cleanup_enabled() -> bool {
    true
}

impl Default for ReconstructConfig {
    fn default() -> Self {
        Self {
            max_entries_per_line: default_max_entries_per_line(),
            max_inline_depth: default_max_inline_depth(),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: default_cleanup_enabled(),
            replacements: Vec::new(),
        }
    }
}

impl Config {
    /// First config file found on the search path, or defaults.
    pub fn load() -> Result<Self> {
        for path in &Self::get_config_search_paths() {
            if path.exists() {
                info!("Loading configuration from: {}", path.display());
                return Self::load_from_file(path);
            }
            debug!("Configuration file not found: {}", path.display());
        }

        info!("No configuration file found, using default settings");
        Ok(Self::default())
    }

    /// Load the file named by `--config`; it must exist.
    pub fn load_with_explicit_path<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let path = config_path.as_ref();
        if !path.exists() {
            return Err(anyhow::anyhow!(
                "Specified configuration file does not exist: {}",
                path.display()
            ));
        }
        Self::load_from_file(path)
    }

    /// Read and validate one config file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read configuration file '{}': {}",
                path.display(),
                e
            )
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse TOML text; `origin` names the source in error messages.
    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Self::create_friendly_toml_error(origin, content, e))?;
        if config.reconstruct.max_entries_per_line == 0 {
            return Err(anyhow::anyhow!(
                "Invalid configuration in '{}': reconstruct.max_entries_per_line must be at least 1",
                origin
            ));
        }
        Ok(config)
    }

    /// Point at the offending line and column of a TOML error.
    fn create_friendly_toml_error(
        file_path: &str,
        content: &str,
        error: toml::de::Error,
    ) -> anyhow::Error {
        let error_msg = format!("Configuration file parsing error in '{}'", file_path);
        let suggestion = Self::get_error_suggestion(error.message());

        let Some(span) = error.span() else {
            return anyhow::anyhow!("{}\n\n{}\n\nSuggestion: {}", error_msg, error, suggestion);
        };

        let (line_num, col_num) = line_and_column(content, span.start);
        let context_line = content.lines().nth(line_num - 1).unwrap_or("");
        anyhow::anyhow!(
            "{}\n\nError at line {}, column {}:\n{}\n\n{}\n{}^\n\nSuggestion: {}",
            error_msg,
            line_num,
            col_num,
            error.message(),
            context_line,
            " ".repeat(col_num.saturating_sub(1)),
            suggestion
        )
    }

    /// Hint for the most common mistakes.
    fn get_error_suggestion(error_msg: &str) -> &'static str {
        if error_msg.contains("unknown variant") {
            "Valid log levels are: 'off', 'error', 'warn', 'info', 'debug', 'trace'"
        } else if error_msg.contains("unknown field") {
            "Check the field name spelling and ensure it's in the correct section"
        } else if error_msg.contains("invalid type") {
            "Check the value type - strings should be in quotes, numbers should not"
        } else if error_msg.contains("missing field") {
            "Each [[cleanup.replacements]] entry needs both 'pattern' and 'replacement'"
        } else {
            "Please check the configuration file syntax"
        }
    }

    /// Home directory first, then the working directory.
    fn get_config_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. ~/.dwarfdecl/config.toml (user-level config)
        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".dwarfdecl").join("config.toml"));
        }

        // 2. ./dwarfdecl.toml (project-level config)
        if let Ok(current_dir) = std::env::current_dir() {
            paths.push(current_dir.join("dwarfdecl.toml"));
        }

        paths
    }
}

/// One-based line and column of byte `offset` in `content`.
fn line_and_column(content: &str, offset: usize) -> (usize, usize) {
    let mut line_start = 0;
    let mut line_num = 1;
    for line in content.split_inclusive('\n') {
        if line_start + line.len() > offset {
            break;
        }
        line_start += line.len();
        line_num += 1;
    }
    (line_num, offset.saturating_sub(line_start) + 1)
}
