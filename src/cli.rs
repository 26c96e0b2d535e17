//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

/// SectorScout - screen companies and research them with LLM agents
///
/// A ranking agent turns your criteria into a list of tickers using the
/// Sectors API, then a research agent writes a summary for each one.
///
/// Examples:
///   sectorscout
///   sectorscout --prompt "top 3 companies by revenue"
///   sectorscout --prompt "highest market cap" --parallel --output report.md
///   sectorscout --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Screening criteria. Read interactively from stdin when omitted.
    #[arg(short, long, value_name = "TEXT")]
    pub prompt: Option<String>,

    /// Chat model used by both agents
    #[arg(short, long, env = "SECTORSCOUT_MODEL")]
    pub model: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, value_name = "URL", env = "OPENAI_API_BASE")]
    pub llm_url: Option<String>,

    /// Chat request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .sectorscout.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Research all tickers concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Also write the full research report to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Report format for --output (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only, no spinner)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .sectorscout.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments, after loading `.env` if present.
    pub fn parse_args() -> Self {
        match Self::try_parse_with_env(dotenv::dotenv, std::env::args_os()) {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    /// Run `load_env` before parsing so env-backed flags see its variables.
    pub fn try_parse_with_env<F, P, I, T>(load_env: F, itr: I) -> Result<Self, clap::Error>
    where
        F: FnOnce() -> dotenv::Result<P>,
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        load_env().ok();
        Self::try_parse_from(itr)
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.llm_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("LLM URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref prompt) = self.prompt {
            if prompt.trim().is_empty() {
                return Err("Prompt must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        }
    }
}
