//! Init command implementation.

use anyhow::{bail, Result};
use std::path::Path;

const CONFIG_FILE: &str = "lineleak.toml";

const DEFAULT_CONFIG: &str = r#"# lineleak configuration

# Severity at or above which `lineleak check` exits with status 1
# fail_on = "warning"

[analyzer]
# Root directory to analyze (default: current directory)
# root = "./src"

# Glob patterns to exclude from analysis
exclude = [
    "**/.venv/**",
    "**/venv/**",
    "**/__pycache__/**",
]

# Respect .gitignore files
respect_gitignore = true

# Worker threads (default: one per core)
# parallelism = 4

[rules.lineleak]
enabled = true
# severity = "error"  # Override the severity of limit warnings

# Maximum number of live code lines per file
max_line_count = 100

# Count statements instead of physical lines
logical = false

# Only report the live code count of every file
live_code_count = false

# File names to skip
ignore = []
"#;

/// Runs the init command.
pub fn run(force: bool) -> Result<()> {
    write_config(Path::new(CONFIG_FILE), force)?;

    println!("Created {CONFIG_FILE}");
    println!("\nNext steps:");
    println!("  1. Edit {CONFIG_FILE} to set the limit");
    println!("  2. Run: lineleak check");

    Ok(())
}

fn write_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }
    std::fs::write(path, DEFAULT_CONFIG)?;
    Ok(())
}
