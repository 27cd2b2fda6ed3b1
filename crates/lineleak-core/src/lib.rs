//! # lineleak-core
//!
//! Live code line counting for Python sources.
//!
//! A file's live code is what remains once blank lines, comments and
//! docstrings are taken out. This crate tokenizes a file, counts its live
//! lines in one forward pass and reports the first line on which a
//! configured maximum is exceeded. It includes:
//!
//! - [`tokenize`] for turning source text into a [`Token`] stream
//! - [`classify`] for counting logical and physical live lines
//! - [`Screener`], the `lineleak` [`Rule`] built on the classifier
//! - [`Analyzer`] for running rules over a directory tree
//!
//! ## Example
//!
//! ```no_run
//! use lineleak_core::{Analyzer, LineleakOptions, Screener};
//!
//! # fn main() -> Result<(), lineleak_core::AnalyzerError> {
//! let analyzer = Analyzer::builder()
//!     .root("./src")
//!     .rule(Screener::with_options(LineleakOptions::default()))
//!     .build()?;
//!
//! let result = analyzer.analyze()?;
//! for violation in &result.violations {
//!     println!("{violation}");
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod analyzer;
mod classifier;
mod config;
mod context;
mod rule;
mod token;
mod tokenizer;
mod types;

/// The `lineleak` rule and its finding codes.
pub mod screener;

pub use analyzer::{Analyzer, AnalyzerBuilder, AnalyzerError};
pub use classifier::{
    classify, AnalysisResult, Classifier, ClassifierConfig, CountMode, DEFAULT_MAX_LINE_COUNT,
};
pub use config::{AnalyzerConfig, Config, ConfigError, RuleConfig};
pub use context::FileContext;
pub use rule::{Rule, RuleBox};
pub use screener::{LineleakOptions, Screener};
pub use token::{Position, Token, TokenKind};
pub use tokenizer::{tokenize, TokenizeError};
pub use types::{LintResult, Location, Severity, SeverityCounts, Violation};
