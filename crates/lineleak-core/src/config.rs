//! `lineleak.toml` model.
//!
//! ```toml
//! fail_on = "warning"
//!
//! [analyzer]
//! exclude = ["**/venv/**"]
//!
//! [rules.lineleak]
//! max_line_count = 150
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::Severity;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Lowest severity that fails the run; warnings when unset.
    pub fail_on: Option<Severity>,
    /// `[analyzer]` table.
    pub analyzer: AnalyzerConfig,
    /// `[rules.<name>]` tables, keyed by rule name.
    pub rules: HashMap<String, RuleConfig>,
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] when the file cannot be read, [`ConfigError::Parse`]
    /// when it is not a valid config.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parses a config from TOML text.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on invalid TOML or unknown `[analyzer]` keys.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// The `[rules.<name>]` table, if present.
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&RuleConfig> {
        self.rules.get(name)
    }

    /// Rules are on unless their table says `enabled = false`.
    #[must_use]
    pub fn is_rule_enabled(&self, name: &str) -> bool {
        self.rule(name).and_then(|rule| rule.enabled) != Some(false)
    }

    /// Severity override for a rule's warnings.
    #[must_use]
    pub fn rule_severity(&self, name: &str) -> Option<Severity> {
        self.rule(name)?.severity
    }

    /// Severity at or above which findings fail the run.
    #[must_use]
    pub fn fail_threshold(&self) -> Severity {
        self.fail_on.unwrap_or(Severity::Warning)
    }
}

/// `[analyzer]` table: which files get checked and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    /// Directory (or file) to check when none is given.
    pub root: PathBuf,
    /// Glob patterns of paths to skip.
    pub exclude: Vec<String>,
    /// Skip what `.gitignore` files ignore.
    pub respect_gitignore: bool,
    /// Worker threads; one per core when unset.
    pub parallelism: Option<usize>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            exclude: ["**/.venv/**", "**/venv/**", "**/__pycache__/**"]
                .into_iter()
                .map(String::from)
                .collect(),
            respect_gitignore: true,
            parallelism: None,
        }
    }
}

/// `[rules.<name>]` table.
///
/// `enabled` and `severity` are common to all rules; every other key is
/// kept in [`RuleConfig::options`] for the rule to interpret.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    /// `false` turns the rule off.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Severity given to the rule's warnings.
    #[serde(default)]
    pub severity: Option<Severity>,
    /// Rule-specific keys.
    #[serde(flatten)]
    pub options: HashMap<String, toml::Value>,
}

impl RuleConfig {
    fn option(&self, key: &str) -> Option<&toml::Value> {
        self.options.get(key)
    }

    /// Boolean option, or `default` when missing or not a boolean.
    #[must_use]
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.option(key)
            .and_then(toml::Value::as_bool)
            .unwrap_or(default)
    }

    /// Integer option, if present.
    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.option(key)?.as_integer()
    }

    /// List of strings, given either as an array or as one comma-separated
    /// string. Non-string items and blank entries are dropped.
    #[must_use]
    pub fn get_str_array(&self, key: &str) -> Vec<String> {
        let items: Vec<&str> = match self.option(key) {
            Some(toml::Value::Array(values)) => {
                values.iter().filter_map(toml::Value::as_str).collect()
            }
            Some(toml::Value::String(joined)) => joined.split(',').collect(),
            _ => Vec::new(),
        };
        items
            .into_iter()
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Errors loading a config file.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    #[diagnostic(code(lineleak::config::io))]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The file is not a valid config.
    #[error("invalid config: {0}")]
    #[diagnostic(
        code(lineleak::config::parse),
        help("see `lineleak init` for a commented example")
    )]
    Parse(#[from] toml::de::Error),
}
