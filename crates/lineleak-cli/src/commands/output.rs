//! Shared output formatting for lint results.

use anyhow::Result;
use lineleak_core::{LintResult, Severity, SeverityCounts, Violation};
use serde::Serialize;
use std::io::{self, IsTerminal, Write};

use crate::OutputFormat;

/// Print lint results to stdout in the specified format.
pub fn print(result: &LintResult, format: OutputFormat) -> Result<()> {
    let stdout = io::stdout();
    let color = stdout.is_terminal();
    let mut out = stdout.lock();
    render(result, format, color, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Writes lint results in the specified format.
pub fn render(
    result: &LintResult,
    format: OutputFormat,
    color: bool,
    out: &mut impl Write,
) -> Result<()> {
    match format {
        OutputFormat::Text => render_text(result, color, out)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &JsonReport::from(result))?;
            writeln!(out)?;
        }
        OutputFormat::Compact => {
            for violation in &result.violations {
                writeln!(out, "{violation}")?;
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    files_checked: usize,
    summary: SeverityCounts,
    violations: &'a [Violation],
}

impl<'a> From<&'a LintResult> for JsonReport<'a> {
    fn from(result: &'a LintResult) -> Self {
        Self {
            files_checked: result.files_checked,
            summary: result.count_by_severity(),
            violations: &result.violations,
        }
    }
}

fn paint(text: &str, ansi: &str, color: bool) -> String {
    if color {
        format!("\x1b[{ansi}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "31",
        Severity::Warning => "33",
        Severity::Info => "34",
    }
}

fn render_text(result: &LintResult, color: bool, out: &mut impl Write) -> io::Result<()> {
    for violation in &result.violations {
        writeln!(
            out,
            "{} {} at {}",
            violation.code, violation.rule, violation.location
        )?;
        let severity = violation.severity;
        writeln!(
            out,
            "  {}: {}\n",
            paint(severity.as_str(), severity_color(severity), color),
            violation.message
        )?;
    }

    let SeverityCounts {
        errors,
        warnings,
        infos,
    } = result.count_by_severity();
    let summary_color = match result.max_severity() {
        Some(Severity::Info) | None => "32",
        Some(worst) => severity_color(worst),
    };
    let summary = format!(
        "Found {errors} error(s), {warnings} warning(s), {infos} info(s) in {} file(s)",
        result.files_checked
    );
    writeln!(out, "{}", paint(&summary, summary_color, color))
}
