//! The `lineleak` rule: counts live code lines and reports files that leak
//! past the configured maximum.
//!
//! # Findings
//!
//! | Code | Severity | When |
//! |------|----------|------|
//! | `LLI200` | info | `live_code_count` is set; reported at the last token |
//! | `LLW404` | warning | logical count exceeds the maximum; reported at the leak line |
//! | `LLW405` | warning | physical count exceeds the maximum; reported at the leak line |
//!
//! # Configuration
//!
//! Read from `[rules.lineleak]`:
//!
//! - `ignore`: file names to skip entirely (default: none)
//! - `logical`: enforce against logical lines (default: false)
//! - `live_code_count`: only report counts, never warn (default: false)
//! - `max_line_count`: maximum live code lines (default: 100)

use serde::{Deserialize, Serialize};

use crate::classifier::{
    classify, AnalysisResult, ClassifierConfig, CountMode, DEFAULT_MAX_LINE_COUNT,
};
use crate::config::RuleConfig;
use crate::context::FileContext;
use crate::rule::Rule;
use crate::token::Token;
use crate::types::{Location, Severity, Violation};

/// Rule name for lineleak.
pub const NAME: &str = "lineleak";

/// Code prefix shared by all lineleak findings.
pub const CODE: &str = "LL";

/// Code of the informational live code count.
pub const LIVE_CODE_COUNT: &str = "LLI200";

/// Code of the logical line limit warning.
pub const LOGICAL_LIMIT_EXCEEDED: &str = "LLW404";

/// Code of the physical line limit warning.
pub const PHYSICAL_LIMIT_EXCEEDED: &str = "LLW405";

/// Options for the lineleak rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineleakOptions {
    /// File names the rule skips.
    pub ignore: Vec<String>,
    /// Enforce the limit against logical lines.
    pub logical: bool,
    /// Report counts instead of enforcing the limit.
    pub live_code_count: bool,
    /// Maximum live code lines.
    pub max_line_count: u32,
}

impl Default for LineleakOptions {
    fn default() -> Self {
        Self {
            ignore: Vec::new(),
            logical: false,
            live_code_count: false,
            max_line_count: DEFAULT_MAX_LINE_COUNT,
        }
    }
}

impl LineleakOptions {
    /// Reads options from a `[rules.lineleak]` table.
    ///
    /// A missing, zero, negative or oversized `max_line_count` falls back to
    /// the default.
    #[must_use]
    pub fn from_rule_config(config: &RuleConfig) -> Self {
        let mut options = Self {
            ignore: config.get_str_array("ignore"),
            logical: config.get_bool("logical", false),
            live_code_count: config.get_bool("live_code_count", false),
            max_line_count: DEFAULT_MAX_LINE_COUNT,
        };
        if let Some(max) = config.get_int("max_line_count") {
            options.set_max_line_count(max);
        }
        options
    }

    /// Sets the maximum; values that are not a positive `u32` fall back to
    /// [`DEFAULT_MAX_LINE_COUNT`].
    pub fn set_max_line_count(&mut self, max: i64) {
        self.max_line_count = u32::try_from(max)
            .ok()
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_MAX_LINE_COUNT);
    }

    /// Classifier settings derived from these options.
    #[must_use]
    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig::new()
            .logical(self.logical)
            .max_line_count(self.max_line_count)
    }
}

/// Counts live code lines of each file and flags the ones over the limit.
#[derive(Debug, Clone, Default)]
pub struct Screener {
    options: LineleakOptions,
    classifier: ClassifierConfig,
}

impl Screener {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a rule with the given options.
    #[must_use]
    pub fn with_options(options: LineleakOptions) -> Self {
        let classifier = options.classifier_config();
        Self {
            options,
            classifier,
        }
    }

    /// Returns the active options.
    #[must_use]
    pub fn options(&self) -> &LineleakOptions {
        &self.options
    }

    /// Runs the classifier over a token stream with this rule's settings.
    #[must_use]
    pub fn analyse(&self, tokens: &[Token]) -> AnalysisResult {
        classify(tokens, &self.classifier)
    }

    fn location(ctx: &FileContext, line: u32, column: u32) -> Location {
        Location::new(
            ctx.relative_path.clone(),
            line as usize,
            column as usize + 1,
        )
    }

    fn count_report(&self, ctx: &FileContext, result: &AnalysisResult) -> Violation {
        Violation::new(
            LIVE_CODE_COUNT,
            self.name(),
            Severity::Info,
            Self::location(ctx, result.last_line, result.last_column),
            format!(
                "Live code count: {} logical and {} physical lines.",
                result.logical_count, result.physical_count
            ),
        )
    }

    fn leak_warning(&self, ctx: &FileContext, leak_line: u32) -> Violation {
        let max = self.classifier.max_line_count;
        let (code, message) = match self.classifier.mode {
            CountMode::Logical => (
                LOGICAL_LIMIT_EXCEEDED,
                format!("Maximum number of logical live code lines ({max}) exceeded."),
            ),
            CountMode::Physical => (
                PHYSICAL_LIMIT_EXCEEDED,
                format!("Maximum number of physical live code lines ({max}) exceeded."),
            ),
        };
        Violation::new(
            code,
            self.name(),
            self.default_severity(),
            Self::location(ctx, leak_line, 0),
            message,
        )
    }
}

impl Rule for Screener {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Limits the number of live code lines per file"
    }

    fn check(&self, ctx: &FileContext, tokens: &[Token]) -> Vec<Violation> {
        if ctx.matches_any(&self.options.ignore) {
            tracing::debug!("Ignoring {}", ctx.relative_path.display());
            return Vec::new();
        }

        let result = self.analyse(tokens);
        tracing::trace!(
            file = %ctx.relative_path.display(),
            logical = result.logical_count,
            physical = result.physical_count,
            leak_line = ?result.leak_line,
            "classified"
        );

        if self.options.live_code_count {
            return vec![self.count_report(ctx, &result)];
        }

        match result.leak_line {
            Some(line) if result.limit_reached => vec![self.leak_warning(ctx, line)],
            _ => Vec::new(),
        }
    }
}
