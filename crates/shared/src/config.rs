//! Configuration management for the manhwa scraper.
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory settings
    pub data: DataConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Page fetcher settings
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Source selection
    #[serde(default)]
    pub sources: SourcesConfig,
}

/// Data directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root data directory path
    pub root_dir: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log directory path (relative to data directory or absolute)
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// Page fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Browser user agent sent with every request
    pub user_agent: String,

    /// Accept header
    pub accept: String,

    /// Accept-Language header
    pub accept_language: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Maximum retries for failed requests
    pub max_retries: u32,

    /// Retry delay in milliseconds (doubled on every attempt)
    pub retry_delay_ms: u64,

    /// Maximum number of requests in flight at once
    pub max_concurrent_requests: usize,

    /// Rate limiting settings
    pub rate_limit: RateLimitConfig,

    /// Send full browser navigation headers and detect Cloudflare challenges
    pub cloudflare_evasion: bool,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per second
    pub requests_per_second: f64,

    /// Maximum requests per minute
    pub requests_per_minute: u32,
}

/// Source selection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Source ids to register at startup
    pub enabled: Vec<String>,

    /// Base URL overrides keyed by source id, for sites that moved domain
    #[serde(default)]
    pub base_urls: HashMap<String, String>,

    /// Overrides for sources that serve series and chapter pages from a second host
    #[serde(default)]
    pub chapter_hosts: HashMap<String, String>,

    /// Registered sources left out of multi-source searches
    #[serde(default)]
    pub inactive: Vec<String>,
}

impl SourcesConfig {
    /// Lowercase every source id so that lookups match registry keys
    pub fn normalize_ids(&mut self) {
        for id in self.enabled.iter_mut().chain(self.inactive.iter_mut()) {
            *id = id.to_lowercase();
        }
        for map in [&mut self.base_urls, &mut self.chapter_hosts] {
            *map = std::mem::take(map)
                .into_iter()
                .map(|(id, url)| (id.to_lowercase(), url))
                .collect();
        }
    }

    /// Base URL override for `id`, ignoring case
    pub fn base_url(&self, id: &str) -> Option<&str> {
        lookup(&self.base_urls, id)
    }

    /// Chapter host override for `id`, ignoring case
    pub fn chapter_host(&self, id: &str) -> Option<&str> {
        lookup(&self.chapter_hosts, id)
    }

    pub fn is_inactive(&self, id: &str) -> bool {
        self.inactive.iter().any(|inactive| inactive.eq_ignore_ascii_case(id))
    }
}

fn lookup<'a>(map: &'a HashMap<String, String>, id: &str) -> Option<&'a str> {
    map.iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(id))
        .map(|(_, value)| value.as_str())
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8".to_string(),
            accept_language: "en-US,en;q=0.5".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            retry_delay_ms: 1000,
            max_concurrent_requests: 5,
            rate_limit: RateLimitConfig {
                requests_per_second: 2.0,
                requests_per_minute: 100,
            },
            cloudflare_evasion: true,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            enabled: vec!["asurascans".to_string(), "manganato".to_string()],
            base_urls: HashMap::new(),
            chapter_hosts: HashMap::new(),
            inactive: Vec::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig {
                root_dir: "data".to_string(),
            },
            logging: LoggingConfig {
                log_dir: "logs".to_string(),
                default_level: "info".to_string(),
                console: true,
                file: true,
                json_format: false,
            },
            fetcher: FetcherConfig::default(),
            sources: SourcesConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.sources.normalize_ids();

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration saved successfully"
        );

        Ok(())
    }

    /// Get the path for the data directory
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.root_dir)
    }

    /// Get the absolute path for the log directory
    pub fn log_dir(&self) -> PathBuf {
        let log_path = Path::new(&self.logging.log_dir);
        if log_path.is_absolute() {
            log_path.to_path_buf()
        } else {
            self.data_dir().join(log_path)
        }
    }

    /// Parse the configured default log level, falling back to INFO
    pub fn log_level(&self) -> tracing::Level {
        self.logging
            .default_level
            .parse()
            .unwrap_or(tracing::Level::INFO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.data.root_dir, "data");
        assert_eq!(config.fetcher.rate_limit.requests_per_second, 2.0);
        assert_eq!(config.fetcher.max_concurrent_requests, 5);
        assert_eq!(config.sources.enabled, vec!["asurascans", "manganato"]);
        assert!(config.sources.base_urls.is_empty());
    }

    #[test]
    fn test_save_and_load_config() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");

        let mut original_config = Config::default();
        original_config
            .sources
            .base_urls
            .insert("asurascans".to_string(), "https://asura.example".to_string());
        original_config.save(&config_path)?;

        assert!(config_path.exists());

        let loaded_config = Config::from_file(&config_path)?;
        assert_eq!(loaded_config.data.root_dir, original_config.data.root_dir);
        assert_eq!(
            loaded_config.fetcher.user_agent,
            original_config.fetcher.user_agent
        );
        assert_eq!(
            loaded_config.sources.base_urls.get("asurascans").map(String::as_str),
            Some("https://asura.example")
        );

        Ok(())
    }

    #[test]
    fn test_missing_sections_use_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[data]
root_dir = "/srv/manhwa"

[logging]
log_dir = "logs"
default_level = "debug"
console = true
file = false
json_format = false
"#,
        )?;

        let config = Config::from_file(&config_path)?;
        assert_eq!(config.fetcher.max_retries, 3);
        assert_eq!(config.sources.enabled.len(), 2);
        assert_eq!(config.log_level(), tracing::Level::DEBUG);
        assert_eq!(config.log_dir(), PathBuf::from("/srv/manhwa/logs"));

        Ok(())
    }

    #[test]
    fn test_source_ids_are_lowercased_on_load() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[data]
root_dir = "data"

[logging]
log_dir = "logs"
default_level = "info"
console = true
file = false
json_format = false

[sources]
enabled = ["AsuraScans", "Manganato"]
inactive = ["Manganato"]

[sources.base_urls]
Manganato = "https://natomanga.example"

[sources.chapter_hosts]
MANGANATO = "https://chap.natomanga.example"
"#,
        )?;

        let config = Config::from_file(&config_path)?;
        assert_eq!(config.sources.enabled, vec!["asurascans", "manganato"]);
        assert_eq!(
            config.sources.base_urls.get("manganato").map(String::as_str),
            Some("https://natomanga.example")
        );
        assert_eq!(
            config.sources.chapter_host("manganato"),
            Some("https://chap.natomanga.example")
        );
        assert!(config.sources.is_inactive("manganato"));
        assert!(!config.sources.is_inactive("asurascans"));

        Ok(())
    }

    #[test]
    fn test_source_lookups_ignore_case() {
        let mut sources = SourcesConfig::default();
        sources
            .base_urls
            .insert("Manganato".to_string(), "https://natomanga.example".to_string());

        assert_eq!(sources.base_url("manganato"), Some("https://natomanga.example"));
        assert_eq!(sources.base_url("MANGANATO"), Some("https://natomanga.example"));
        assert_eq!(sources.chapter_host("manganato"), None);
        assert_eq!(sources.base_url("asurascans"), None);
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        // Should return default config without error
        assert_eq!(config.data.root_dir, "data");
    }

    #[test]
    fn test_path_resolution() {
        let config = Config::default();

        let log_dir = config.log_dir();
        assert!(log_dir.ends_with("data/logs"));
        assert_eq!(config.log_level(), tracing::Level::INFO);
    }
}
