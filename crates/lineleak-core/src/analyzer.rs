//! Runs rules over every source file below a root.
//!
//! Discovery walks the tree with `ignore`, files are tokenized and checked
//! on a `rayon` pool, and the findings are merged into one sorted
//! [`LintResult`].

use crate::config::Config;
use crate::context::FileContext;
use crate::rule::{Rule, RuleBox};
use crate::tokenizer::{tokenize, TokenizeError};
use crate::types::{LintResult, Severity, Violation};

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Extension of the source files the analyzer picks up.
const SOURCE_EXTENSION: &str = "py";

/// Errors that stop an analysis run.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// A file or the root could not be read.
    #[error("cannot read source: {0}")]
    Io(#[from] std::io::Error),

    /// A source file could not be tokenized.
    #[error("cannot tokenize {}: {source}", path.display())]
    Tokenize {
        /// Path to the file that failed to tokenize.
        path: PathBuf,
        /// Underlying tokenizer error.
        source: TokenizeError,
    },

    /// An exclude pattern is not a valid glob.
    #[error("invalid exclude pattern: {0}")]
    Glob(#[from] glob::PatternError),

    /// The directory walk failed.
    #[error("cannot walk source tree: {0}")]
    Walk(#[from] ignore::Error),

    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// The worker pool could not be started.
    #[error("cannot start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Collects the settings of an [`Analyzer`].
#[derive(Default)]
pub struct AnalyzerBuilder {
    root: Option<PathBuf>,
    rules: Vec<RuleBox>,
    excludes: Vec<String>,
    config: Option<Config>,
    fail_on_parse_error: bool,
    parallelism: Option<usize>,
}

impl AnalyzerBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the root directory (or single file) to analyze.
    #[must_use]
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Adds a rule to the analyzer.
    #[must_use]
    pub fn rule<R: Rule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Adds a boxed rule to the analyzer.
    #[must_use]
    pub fn rule_box(mut self, rule: RuleBox) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds an exclude glob pattern.
    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.excludes.push(pattern.into());
        self
    }

    /// Adds multiple exclude glob patterns.
    #[must_use]
    pub fn excludes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets whether to fail on tokenize errors (default: false).
    #[must_use]
    pub fn fail_on_parse_error(mut self, fail: bool) -> Self {
        self.fail_on_parse_error = fail;
        self
    }

    /// Sets the number of worker threads (default: one per core).
    #[must_use]
    pub fn parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }

    /// Resolves the root and compiles the exclude patterns.
    ///
    /// Patterns given here add to those of the config, whose defaults skip
    /// virtualenvs and bytecode caches.
    ///
    /// # Errors
    ///
    /// Returns an error if the root doesn't exist or an exclude pattern is
    /// not a valid glob.
    pub fn build(self) -> Result<Analyzer, AnalyzerError> {
        let config = self.config.unwrap_or_default();
        let root = resolve_root(self.root.unwrap_or_else(|| config.analyzer.root.clone()))?;

        let excludes = self
            .excludes
            .iter()
            .chain(&config.analyzer.exclude)
            .map(|pattern| ExcludePattern::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Analyzer {
            root,
            rules: self.rules,
            excludes,
            parallelism: self.parallelism.or(config.analyzer.parallelism),
            config,
            fail_on_parse_error: self.fail_on_parse_error,
        })
    }
}

/// Makes `root` absolute and checks that it exists.
fn resolve_root(root: PathBuf) -> Result<PathBuf, AnalyzerError> {
    let root = if root.is_absolute() {
        root
    } else {
        std::env::current_dir()?.join(root)
    };
    if root.exists() {
        Ok(root)
    } else {
        Err(AnalyzerError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", root.display()),
        )))
    }
}

/// A compiled exclude pattern.
///
/// Patterns without glob metacharacters also match as a leading path, so
/// `build` excludes everything below `build/`.
#[derive(Debug, Clone)]
struct ExcludePattern {
    raw: String,
    glob: glob::Pattern,
}

impl ExcludePattern {
    fn new(pattern: &str) -> Result<Self, glob::PatternError> {
        Ok(Self {
            raw: pattern.to_string(),
            glob: glob::Pattern::new(pattern)?,
        })
    }

    fn is_literal(&self) -> bool {
        !self.raw.contains(['*', '?', '['])
    }

    fn matches(&self, relative: &Path, absolute: &Path) -> bool {
        self.glob.matches_path(relative)
            || self.glob.matches_path(absolute)
            || (self.is_literal() && relative.starts_with(&self.raw))
    }
}

/// Runs a fixed set of rules over a source tree.
///
/// Use [`Analyzer::builder()`] to construct an instance. An analyzer can be
/// run any number of times; each run rereads the tree.
pub struct Analyzer {
    root: PathBuf,
    rules: Vec<RuleBox>,
    excludes: Vec<ExcludePattern>,
    config: Config,
    fail_on_parse_error: bool,
    parallelism: Option<usize>,
}

impl Analyzer {
    /// Creates a new builder for configuring an analyzer.
    #[must_use]
    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    /// Returns the root directory being analyzed.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the number of registered rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Checks every discovered file and returns the sorted findings.
    ///
    /// # Errors
    ///
    /// Returns an error if file discovery or reading fails, or if a file
    /// cannot be tokenized while `fail_on_parse_error` is set.
    pub fn analyze(&self) -> Result<LintResult, AnalyzerError> {
        info!("Starting analysis at {}", self.root.display());

        let files = self.discover_files()?;
        info!("Found {} Python files", files.len());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallelism.unwrap_or(0))
            .build()?;
        let outcomes: Vec<(&PathBuf, Result<Vec<Violation>, AnalyzerError>)> = pool.install(|| {
            files
                .par_iter()
                .map(|path| (path, self.analyze_file(path)))
                .collect()
        });

        let mut result = LintResult::new();
        for (path, outcome) in outcomes {
            match outcome {
                Ok(violations) => {
                    result.violations.extend(violations);
                    result.files_checked += 1;
                }
                Err(AnalyzerError::Tokenize { path, source }) => {
                    warn!("Failed to tokenize {}: {}", path.display(), source);
                    if self.fail_on_parse_error {
                        return Err(AnalyzerError::Tokenize { path, source });
                    }
                }
                Err(e) => {
                    debug!("Aborting on {}", path.display());
                    return Err(e);
                }
            }
        }

        result.sort();

        info!(
            "Checked {} files, {} findings",
            result.files_checked,
            result.violations.len()
        );

        Ok(result)
    }

    /// Runs every enabled rule over one in-memory source file.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Tokenize`] if `content` cannot be tokenized.
    pub fn analyze_source(
        &self,
        path: &Path,
        content: &str,
    ) -> Result<Vec<Violation>, AnalyzerError> {
        let tokens = tokenize(content).map_err(|source| AnalyzerError::Tokenize {
            path: path.to_path_buf(),
            source,
        })?;

        let ctx = FileContext::new(path, content, self.context_root());
        let mut violations = Vec::new();

        for rule in &self.rules {
            if !self.config.is_rule_enabled(rule.name()) {
                debug!("Skipping disabled rule: {}", rule.name());
                continue;
            }

            let rule_violations = rule.check(&ctx, &tokens);
            violations.extend(self.apply_severity_override(rule.name(), rule_violations));
        }

        Ok(violations)
    }

    fn analyze_file(&self, path: &Path) -> Result<Vec<Violation>, AnalyzerError> {
        debug!("Analyzing: {}", path.display());

        let content = std::fs::read_to_string(path)?;
        self.analyze_source(path, &content)
    }

    /// Paths are reported relative to the root, or to its parent when the
    /// root is a single file.
    fn context_root(&self) -> &Path {
        if self.root.is_file() {
            self.root.parent().unwrap_or(&self.root)
        } else {
            &self.root
        }
    }

    /// Overrides the severity of warnings; informational findings keep theirs.
    fn apply_severity_override(
        &self,
        rule_name: &str,
        mut violations: Vec<Violation>,
    ) -> Vec<Violation> {
        if let Some(severity) = self.config.rule_severity(rule_name) {
            for v in violations.iter_mut().filter(|v| v.severity > Severity::Info) {
                v.severity = severity;
            }
        }
        violations
    }

    /// Discovers all source files to analyze, sorted by path.
    fn discover_files(&self) -> Result<Vec<PathBuf>, AnalyzerError> {
        if self.root.is_file() {
            return Ok(vec![self.root.clone()]);
        }

        let respect_gitignore = self.config.analyzer.respect_gitignore;
        let mut builder = ignore::WalkBuilder::new(&self.root);
        builder
            .hidden(false)
            .git_ignore(respect_gitignore)
            .git_exclude(respect_gitignore)
            .git_global(respect_gitignore)
            .require_git(false);

        let mut files = Vec::new();
        for entry in builder.build() {
            let entry = entry?;
            let path = entry.path();

            let is_source = path.extension().and_then(|e| e.to_str()) == Some(SOURCE_EXTENSION);
            if !is_source || !path.is_file() {
                continue;
            }

            if self.should_exclude(path) {
                debug!("Excluding: {}", path.display());
                continue;
            }

            files.push(path.to_path_buf());
        }

        files.sort();
        Ok(files)
    }

    /// Checks if a path should be excluded.
    fn should_exclude(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        self.excludes
            .iter()
            .any(|pattern| pattern.matches(relative, path))
    }
}
