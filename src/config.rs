use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::Result;
use color_eyre::eyre::{Context, eyre};
use serde::{Deserialize, Serialize};

use crate::filename::FilenameFormat;
use crate::models::{SearchMode, SearchStrategy};
use crate::services::bulk::{DEFAULT_CONCURRENCY, DEFAULT_RATE_LIMIT_BACKOFF, SchedulerConfig};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub lrclib: LrclibConfig,
    pub search: SearchConfig,
    pub batch: BatchConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LrclibConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Client-side request quota; unset means no throttling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests_per_second: Option<u32>,
}

impl Default for LrclibConfig {
    fn default() -> Self {
        Self {
            base_url: "https://lrclib.net/api".to_string(),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
            requests_per_second: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub mode: SearchMode,
    pub try_external: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let strategy = SearchStrategy::default();
        Self {
            mode: strategy.mode,
            try_external: strategy.try_external,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub concurrency: usize,
    pub rate_limit_backoff_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            rate_limit_backoff_secs: DEFAULT_RATE_LIMIT_BACKOFF.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where `.lrc` files are written; `~/` is expanded
    pub directory: String,
    pub filename_format: FilenameFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            filename_format: FilenameFormat::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Default config file location, e.g. `~/.config/lrc-finder/config.toml`
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("lrc-finder").join("config.toml"))
    }

    /// Load the default config file, falling back to defaults when it does not exist
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Write the default config to `config_path()` unless a file is already there
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path().ok_or_else(|| eyre!("No config directory available"))?;
        Self::default().write_if_absent(&path)?;
        Ok(path)
    }

    pub fn write_if_absent(&self, path: &Path) -> Result<bool> {
        if path.exists() {
            tracing::info!(path = %path.display(), "Config file already exists");
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).wrap_err("Failed to serialize config")?;
        std::fs::write(path, contents)
            .wrap_err_with(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(true)
    }

    fn validate(&self) -> Result<()> {
        if self.batch.concurrency == 0 {
            return Err(eyre!("batch.concurrency must be at least 1"));
        }
        if self.lrclib.timeout_secs == 0 {
            return Err(eyre!("lrclib.timeout_secs must be at least 1"));
        }
        Ok(())
    }

    /// Expand ~ to home directory
    fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(rest);
        }
        PathBuf::from(path)
    }

    pub fn output_directory(&self) -> PathBuf {
        Self::expand_path(&self.output.directory)
    }

    pub fn strategy(&self) -> SearchStrategy {
        SearchStrategy {
            mode: self.search.mode,
            try_external: self.search.try_external,
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            concurrency: self.batch.concurrency,
            rate_limit_backoff: Duration::from_secs(self.batch.rate_limit_backoff_secs),
            strategy: self.strategy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[search]
mode = "EXACT"

[batch]
rate_limit_backoff_secs = 30

[output]
filename_format = "title-artist"
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();

        assert_eq!(config.search.mode, SearchMode::Exact);
        assert!(config.search.try_external);
        assert_eq!(config.batch.concurrency, 3);
        assert_eq!(config.output.filename_format, FilenameFormat::TitleArtist);
        assert_eq!(config.lrclib, LrclibConfig::default());

        let scheduler = config.scheduler_config();
        assert_eq!(scheduler.rate_limit_backoff, Duration::from_secs(30));
        assert_eq!(scheduler.strategy.mode, SearchMode::Exact);
    }

    #[test]
    fn test_written_default_parses_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        assert!(Config::default().write_if_absent(&path).unwrap());
        assert!(!Config::default().write_if_absent(&path).unwrap());

        assert_eq!(Config::from_file(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "[batch]\nconcurrency = 0\n").unwrap();
        assert!(Config::from_file(&path).is_err());

        std::fs::write(&path, "[output]\nfilename_format = \"nope\"\n").unwrap();
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn test_expand_home_directory() {
        let expanded = Config::expand_path("~/lyrics");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("lyrics"));
        }
        assert_eq!(Config::expand_path("out/lyrics"), PathBuf::from("out/lyrics"));
    }
}
