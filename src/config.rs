use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "page_grep.toml";
const ENV_PREFIX: &str = "PAGE_GREP";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub user_agent: String,
    pub fetch_timeout_secs: u64,
    pub sentiment_program: String,
    /// Passed before the text. `None` makes the text the only argument.
    pub sentiment_script: Option<String>,
    pub sentiment_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_agent: format!("page_grep/{}", env!("CARGO_PKG_VERSION")),
            fetch_timeout_secs: 30,
            sentiment_program: "python3".to_string(),
            sentiment_script: Some("sentiment_analysis.py".to_string()),
            sentiment_timeout_secs: 20,
        }
    }
}

impl Settings {
    /// Defaults, then the config file (optional unless given explicitly),
    /// then `PAGE_GREP_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let built = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to load configuration")?;
        Self::from_config(built)
    }

    fn from_config(built: Config) -> Result<Self> {
        built
            .try_deserialize()
            .context("Invalid configuration values")
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn sentiment_timeout(&self) -> Duration {
        Duration::from_secs(self.sentiment_timeout_secs)
    }
}
