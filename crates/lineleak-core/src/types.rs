//! Findings and the result of a run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How serious a finding is. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational; never fails a run on its own.
    Info,
    /// Over a limit.
    Warning,
    /// Raised to an error through configuration.
    Error,
}

impl Severity {
    /// Lowercase name, as used in output and config.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a finding is reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File path relative to the analysis root.
    pub file: PathBuf,
    /// 1-indexed line.
    pub line: usize,
    /// 1-indexed column.
    pub column: usize,
}

impl Location {
    /// Creates a location.
    #[must_use]
    pub fn new(file: PathBuf, line: usize, column: usize) -> Self {
        Self { file, line, column }
    }

    fn sort_key(&self) -> (&PathBuf, usize, usize) {
        (&self.file, self.line, self.column)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// A finding produced by a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Finding code (e.g., "LLW405").
    pub code: String,
    /// Name of the rule that produced it.
    pub rule: String,
    /// Severity after configuration overrides.
    pub severity: Severity,
    /// Where it is reported.
    pub location: Location,
    /// Human-readable message.
    pub message: String,
}

impl Violation {
    /// Creates a new violation.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        rule: impl Into<String>,
        severity: Severity,
        location: Location,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            rule: rule.into(),
            severity,
            location,
            message: message.into(),
        }
    }
}

/// `file:line:col: severity [code] message`
impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}] {}",
            self.location, self.severity, self.code, self.message
        )
    }
}

/// Number of findings per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    /// Findings at [`Severity::Error`].
    pub errors: usize,
    /// Findings at [`Severity::Warning`].
    pub warnings: usize,
    /// Findings at [`Severity::Info`].
    pub infos: usize,
}

/// Findings of one run over a set of files.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LintResult {
    /// All findings, sorted by location once the run is complete.
    pub violations: Vec<Violation>,
    /// Number of files analysed. Files that failed to tokenize are not
    /// counted.
    pub files_checked: usize,
}

impl LintResult {
    /// Creates a new empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest severity among the findings.
    #[must_use]
    pub fn max_severity(&self) -> Option<Severity> {
        self.violations.iter().map(|v| v.severity).max()
    }

    /// Whether any finding is at or above `threshold`.
    #[must_use]
    pub fn has_violations_at(&self, threshold: Severity) -> bool {
        self.max_severity().is_some_and(|max| max >= threshold)
    }

    /// Whether any finding is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.has_violations_at(Severity::Error)
    }

    /// Whether any finding is a warning or an error.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.has_violations_at(Severity::Warning)
    }

    /// Findings of exactly `severity`.
    pub fn by_severity(&self, severity: Severity) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(move |v| v.severity == severity)
    }

    /// Tallies findings per severity.
    #[must_use]
    pub fn count_by_severity(&self) -> SeverityCounts {
        self.violations
            .iter()
            .fold(SeverityCounts::default(), |mut counts, v| {
                match v.severity {
                    Severity::Error => counts.errors += 1,
                    Severity::Warning => counts.warnings += 1,
                    Severity::Info => counts.infos += 1,
                }
                counts
            })
    }

    /// Orders findings by file, line, then column.
    pub fn sort(&mut self) {
        self.violations
            .sort_by(|a, b| a.location.sort_key().cmp(&b.location.sort_key()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leak(severity: Severity, file: &str, line: usize) -> Violation {
        Violation::new(
            "LLW405",
            "lineleak",
            severity,
            Location::new(PathBuf::from(file), line, 1),
            "Maximum number of physical live code lines (100) exceeded.",
        )
    }

    #[test]
    fn violation_display_is_compact() {
        let v = leak(Severity::Warning, "pkg/mod.py", 101);
        insta::assert_snapshot!(
            v.to_string(),
            @"pkg/mod.py:101:1: warning [LLW405] Maximum number of physical live code lines (100) exceeded."
        );
    }

    #[test]
    fn severity_thresholds() {
        let mut result = LintResult::new();
        assert_eq!(result.max_severity(), None);
        assert!(!result.has_violations_at(Severity::Info));

        result.violations.push(leak(Severity::Info, "a.py", 1));
        assert!(!result.has_warnings());
        assert!(result.has_violations_at(Severity::Info));

        result.violations.push(leak(Severity::Warning, "a.py", 2));
        assert!(result.has_warnings());
        assert!(!result.has_errors());
        assert_eq!(
            result.count_by_severity(),
            SeverityCounts {
                errors: 0,
                warnings: 1,
                infos: 1
            }
        );
        assert_eq!(result.by_severity(Severity::Info).count(), 1);
    }

    #[test]
    fn sort_orders_by_file_then_line() {
        let mut result = LintResult::new();
        result.violations.push(leak(Severity::Warning, "b.py", 1));
        result.violations.push(leak(Severity::Warning, "a.py", 9));
        result.violations.push(leak(Severity::Warning, "a.py", 3));
        result.sort();

        let order: Vec<String> = result
            .violations
            .iter()
            .map(|v| v.location.to_string())
            .collect();
        assert_eq!(order, vec!["a.py:3:1", "a.py:9:1", "b.py:1:1"]);
    }
}
