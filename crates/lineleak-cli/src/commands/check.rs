//! Check command implementation.

use anyhow::{anyhow, Context, Result};
use lineleak_core::{
    screener, Analyzer, AnalyzerError, Config, LineleakOptions, Screener, TokenizeError,
};
use miette::{NamedSource, Report};
use std::path::{Path, PathBuf};

use crate::config_resolver::ConfigSource;
use crate::OutputFormat;

/// Command-line values for the `lineleak` rule; set values win over the
/// config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, clap::Args)]
pub struct LineleakOverrides {
    /// Comma-separated file names to skip
    #[arg(long = "lineleak-ignore", value_delimiter = ',', value_name = "FILES")]
    pub ignore: Vec<String>,

    /// Enforce the limit against logical instead of physical lines
    #[arg(long = "lineleak-logical")]
    pub logical: bool,

    /// Report the live code count of every file instead of enforcing the limit
    #[arg(long)]
    pub live_code_count: bool,

    /// Maximum number of live code lines per file [default: 100]
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub max_line_count: Option<i64>,
}

impl LineleakOverrides {
    /// Layers these values over options read from the config file.
    #[must_use]
    pub fn apply(&self, mut options: LineleakOptions) -> LineleakOptions {
        let ignore: Vec<String> = self
            .ignore
            .iter()
            .map(String::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();
        if !ignore.is_empty() {
            options.ignore = ignore;
        }
        options.logical |= self.logical;
        options.live_code_count |= self.live_code_count;
        if let Some(max) = self.max_line_count {
            options.set_max_line_count(max);
        }
        options
    }
}

/// Arguments of `lineleak check`.
#[derive(Debug, Clone)]
pub struct CheckArgs {
    /// File or directory to analyze.
    pub path: PathBuf,
    /// How to print the findings.
    pub format: OutputFormat,
    /// Extra exclude globs.
    pub exclude: Vec<String>,
    /// Stop at the first file that cannot be tokenized.
    pub fail_on_parse_error: bool,
    /// Rule options given on the command line.
    pub overrides: LineleakOverrides,
}

/// Runs the check command.
///
/// Returns `true` when a finding reaches the configured failure threshold.
pub fn run(args: &CheckArgs, source: &ConfigSource) -> Result<bool> {
    let config = load_config(source)?;

    let options = args.overrides.apply(
        config
            .rules
            .get(screener::NAME)
            .map(LineleakOptions::from_rule_config)
            .unwrap_or_default(),
    );
    tracing::debug!(?options, "lineleak options");

    let threshold = config.fail_threshold();
    let analyzer = Analyzer::builder()
        .root(&args.path)
        .config(config)
        .excludes(args.exclude.iter().cloned())
        .fail_on_parse_error(args.fail_on_parse_error)
        .rule(Screener::with_options(options))
        .build()
        .context("Failed to build analyzer")?;

    tracing::info!(
        "Analyzing {} with {} rules",
        args.path.display(),
        analyzer.rule_count()
    );

    let result = match analyzer.analyze() {
        Ok(result) => result,
        Err(AnalyzerError::Tokenize { path, source }) => {
            return Err(report_tokenize_error(&path, source));
        }
        Err(e) => return Err(e).context("Analysis failed"),
    };

    super::output::print(&result, args.format)?;

    Ok(result.has_violations_at(threshold))
}

fn load_config(source: &ConfigSource) -> Result<Config> {
    let Some(path) = source.path() else {
        return Ok(Config::default());
    };
    tracing::info!("Using config: {source}");
    Config::from_file(path).with_context(|| format!("Failed to load config: {}", path.display()))
}

/// Prints the tokenize error against its source and returns a short error
/// for the exit path.
fn report_tokenize_error(path: &Path, error: TokenizeError) -> anyhow::Error {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let report = Report::new(error)
                .with_source_code(NamedSource::new(path.display().to_string(), content));
            eprintln!("{report:?}");
        }
        Err(_) => eprintln!("{error}"),
    }
    anyhow!("Failed to tokenize {}", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;
    use std::fs;
    use tempfile::TempDir;

    fn args(path: &Path) -> CheckArgs {
        CheckArgs {
            path: path.to_path_buf(),
            format: OutputFormat::Compact,
            exclude: Vec::new(),
            fail_on_parse_error: false,
            overrides: LineleakOverrides::default(),
        }
    }

    fn project(lines: usize) -> TempDir {
        let dir = TempDir::new().unwrap();
        let source = (1..=lines).fold(String::new(), |mut out, i| {
            let _ = writeln!(out, "value_{i} = {i}");
            out
        });
        fs::write(dir.path().join("module.py"), source).unwrap();
        dir
    }

    #[test]
    fn empty_overrides_keep_config_options() {
        let from_config = LineleakOptions {
            ignore: vec!["setup.py".to_string()],
            logical: true,
            live_code_count: false,
            max_line_count: 40,
        };
        assert_eq!(
            LineleakOverrides::default().apply(from_config.clone()),
            from_config
        );
    }

    #[test]
    fn set_overrides_win() {
        let overrides = LineleakOverrides {
            ignore: vec![" a.py".to_string(), String::new(), "b.py ".to_string()],
            logical: true,
            live_code_count: true,
            max_line_count: Some(7),
        };
        let options = overrides.apply(LineleakOptions {
            ignore: vec!["setup.py".to_string()],
            ..LineleakOptions::default()
        });
        assert_eq!(
            options,
            LineleakOptions {
                ignore: vec!["a.py".to_string(), "b.py".to_string()],
                logical: true,
                live_code_count: true,
                max_line_count: 7,
            }
        );
    }

    #[test]
    fn non_positive_maximum_means_default() {
        for max in [0, -3] {
            let overrides = LineleakOverrides {
                max_line_count: Some(max),
                ..LineleakOverrides::default()
            };
            let options = overrides.apply(LineleakOptions {
                max_line_count: 40,
                ..LineleakOptions::default()
            });
            assert_eq!(options.max_line_count, 100);
        }
    }

    #[test]
    fn leaking_project_fails() {
        let dir = project(120);
        assert!(run(&args(dir.path()), &ConfigSource::Default).unwrap());
    }

    #[test]
    fn count_only_never_fails() {
        let dir = project(120);
        let mut args = args(dir.path());
        args.overrides.live_code_count = true;
        assert!(!run(&args, &ConfigSource::Default).unwrap());
    }

    #[test]
    fn config_file_raises_the_limit_and_threshold() {
        let dir = project(120);
        let config = dir.path().join("lineleak.toml");
        fs::write(&config, "[rules.lineleak]\nmax_line_count = 200\n").unwrap();
        assert!(!run(&args(dir.path()), &ConfigSource::Project(config.clone())).unwrap());

        fs::write(&config, "fail_on = \"error\"\n").unwrap();
        assert!(!run(&args(dir.path()), &ConfigSource::Project(config)).unwrap());
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = project(1);
        let source = ConfigSource::Explicit(dir.path().join("nope.toml"));
        let err = run(&args(dir.path()), &source).unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }

    #[test]
    fn tokenize_failure_is_reported_when_requested() {
        let dir = project(1);
        fs::write(dir.path().join("broken.py"), "x = [1,\n").unwrap();
        let mut args = args(dir.path());

        assert!(!run(&args, &ConfigSource::Default).unwrap());

        args.fail_on_parse_error = true;
        let err = run(&args, &ConfigSource::Default).unwrap_err();
        assert!(err.to_string().starts_with("Failed to tokenize"));
    }
}
