//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Suite filtering settings
    #[serde(default)]
    pub suite: SuiteConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Page runner settings
    #[serde(default)]
    pub page: PageConfig,

    /// Manifest fetch settings
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// Suite filtering settings
#[derive(Debug, Deserialize)]
pub struct SuiteConfig {
    /// Target suite version; pages requiring a newer version are left out
    #[serde(default = "default_version")]
    pub version: String,

    /// When set, only pages whose minimum version is at least this are kept
    #[serde(default)]
    pub min_version: Option<String>,

    /// Leave out pages marked `--slow`
    #[serde(default)]
    pub fast: bool,

    /// Reported success for pages the reporter declines to run
    #[serde(default)]
    pub allow_skip: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            min_version: None,
            fast: false,
            allow_skip: false,
        }
    }
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Timeout settings
#[derive(Debug, Deserialize)]
pub struct Timeouts {
    /// Per-page timeout, reset on every reported result
    #[serde(default = "default_page_ms")]
    pub page_ms: u64,

    /// Timeout for a single manifest fetch
    #[serde(default = "default_fetch_secs")]
    pub fetch_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            page_ms: default_page_ms(),
            fetch_secs: default_fetch_secs(),
        }
    }
}

fn default_page_ms() -> u64 {
    20_000
}
fn default_fetch_secs() -> u64 {
    30
}

impl Timeouts {
    pub fn page(&self) -> Duration {
        Duration::from_millis(self.page_ms)
    }

    pub fn fetch(&self) -> Duration {
        Duration::from_secs(self.fetch_secs)
    }
}

/// Page runner settings
///
/// The runner is launched once per page with the page URL appended to
/// `args`, and reports back over stdout.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct PageConfig {
    /// Executable used to run a single page
    #[serde(default)]
    pub command: Option<PathBuf>,

    /// Arguments placed before the page URL
    #[serde(default)]
    pub args: Vec<String>,
}

/// Manifest fetch settings
#[derive(Debug, Deserialize)]
pub struct FetchConfig {
    /// User-Agent header for HTTP manifest fetches
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    "conformance-harness".to_string()
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit path, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}
