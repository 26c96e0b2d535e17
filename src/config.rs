//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.sectorscout.toml` files, and reading API credentials from the
//! process environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".sectorscout.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Chat model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Sectors API settings.
    #[serde(default)]
    pub sectors: SectorsConfig,

    /// Research flow settings.
    #[serde(default)]
    pub flow: FlowConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Chat model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name sent with every chat request.
    #[serde(default = "default_model")]
    pub name: String,

    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_model_timeout")]
    pub timeout_seconds: u64,

    /// Maximum model turns per agent run.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            api_base: default_api_base(),
            temperature: default_temperature(),
            timeout_seconds: default_model_timeout(),
            max_iterations: default_max_iterations(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_model_timeout() -> u64 {
    120
}

fn default_max_iterations() -> usize {
    10
}

/// Sectors API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorsConfig {
    /// API host, without trailing slash.
    #[serde(default = "default_sectors_base_url")]
    pub base_url: String,

    /// Number of companies requested from the top-companies endpoint.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_sectors_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SectorsConfig {
    fn default() -> Self {
        Self {
            base_url: default_sectors_base_url(),
            top_n: default_top_n(),
            timeout_seconds: default_sectors_timeout(),
        }
    }
}

fn default_sectors_base_url() -> String {
    "https://api.sectors.app".to_string()
}

fn default_top_n() -> usize {
    3
}

fn default_sectors_timeout() -> u64 {
    60
}

/// Research flow settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Research all tickers concurrently instead of one after another.
    #[serde(default)]
    pub parallel: bool,
}

/// API keys read from the environment. Never serialized.
#[derive(Clone, Default)]
pub struct Credentials {
    pub sectors_api_key: Option<String>,
    pub openai_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("sectors_api_key", &self.sectors_api_key.as_ref().map(|_| "<set>"))
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<set>"))
            .finish()
    }
}

impl Credentials {
    /// Read `SECTORS_API_KEY` and `OPENAI_API_KEY`.
    ///
    /// Missing keys are only warned about; the first request that needs
    /// them will fail instead.
    pub fn from_env() -> Self {
        let creds = Self {
            sectors_api_key: non_empty_var("SECTORS_API_KEY"),
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
        };

        if creds.sectors_api_key.is_none() {
            warn!("SECTORS_API_KEY is not set; Sectors API calls will be rejected");
        }
        if creds.openai_api_key.is_none() {
            warn!("OPENAI_API_KEY is not set; chat completion calls will be rejected");
        }

        creds
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = args.llm_url {
            self.model.api_base = url.trim_end_matches('/').to_string();
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }

        if args.parallel {
            self.flow.parallel = true;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.name, "gpt-4o-mini");
        assert_eq!(config.sectors.base_url, "https://api.sectors.app");
        assert_eq!(config.sectors.top_n, 3);
        assert!(!config.flow.parallel);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[model]
name = "gpt-4o"
temperature = 0.3

[sectors]
top_n = 5

[flow]
parallel = true
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.model.name, "gpt-4o");
        assert_eq!(config.model.temperature, 0.3);
        assert_eq!(config.model.api_base, "https://api.openai.com/v1");
        assert_eq!(config.sectors.top_n, 5);
        assert_eq!(config.sectors.timeout_seconds, 60);
        assert!(config.flow.parallel);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[sectors]\nbase_url = \"http://localhost:9000\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.sectors.base_url, "http://localhost:9000");
        assert_eq!(config.model.max_iterations, 10);
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[sectors\nbroken").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[model]"));
        assert!(toml_str.contains("[sectors]"));
        assert!(toml_str.contains("[flow]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.sectors.top_n, 3);
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let creds = Credentials {
            sectors_api_key: Some("secret-sectors".to_string()),
            openai_api_key: None,
        };
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("secret-sectors"));
        assert!(debug.contains("<set>"));
    }
}
