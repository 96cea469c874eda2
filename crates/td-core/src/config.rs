//! Configuration management for taskdesk.
//!
//! Loads configuration from ${TD_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides `api_url`.
pub const API_URL_ENV: &str = "TD_API_URL";

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Merges user config values into the default template.
///
/// New comments/sections from the template stay present while the user's
/// values win.
fn merge_with_template(user_config: &str) -> Result<String> {
    use toml_edit::DocumentMut;

    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;
    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

/// Copies the user's values over the template's. All keys are top-level scalars.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    for (key, value) in source.iter() {
        if let Some(value) = value.as_value() {
            target[key] = toml_edit::Item::Value(value.clone());
        }
    }
}

pub mod paths {
    //! Path resolution for taskdesk configuration and data directories.
    //!
    //! TD_HOME resolution order:
    //! 1. TD_HOME environment variable (if set)
    //! 2. ~/.config/taskdesk (default)

    use std::path::PathBuf;

    /// Returns the taskdesk home directory.
    pub fn td_home() -> PathBuf {
        if let Ok(home) = std::env::var("TD_HOME")
            && !home.trim().is_empty()
        {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".taskdesk"),
            |h| h.join(".config").join("taskdesk"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        td_home().join("config.toml")
    }

    /// Returns the path of the persisted session token.
    pub fn session_path() -> PathBuf {
        td_home().join("session.json")
    }

    /// Returns the directory holding TUI log files.
    pub fn logs_dir() -> PathBuf {
        td_home().join("logs")
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the task service API
    pub api_url: String,

    /// Request timeout in seconds (0 disables)
    pub request_timeout_secs: u32,

    /// Directory for exports and templates (default: current directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<String>,

    /// Expire the local session when the server answers 401
    pub clear_session_on_unauthorized: bool,

    /// Default log filter (overridden by TD_LOG)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: Self::DEFAULT_API_URL.to_string(),
            request_timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            download_dir: None,
            clear_session_on_unauthorized: true,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    const DEFAULT_API_URL: &str = "http://localhost:5000/api";
    const DEFAULT_TIMEOUT_SECS: u32 = 30;

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Resolves the API base URL.
    ///
    /// Resolution order: `TD_API_URL`, then the config value. Blank values
    /// count as unset. The winner must parse as a URL.
    ///
    /// # Errors
    /// Returns an error if the resolved value is not a valid URL.
    pub fn effective_api_url(&self) -> Result<String> {
        if let Ok(env_url) = std::env::var(API_URL_ENV) {
            let trimmed = env_url.trim();
            if !trimmed.is_empty() {
                validate_url(trimmed)?;
                return Ok(trimmed.to_string());
            }
        }

        let trimmed = self.api_url.trim();
        let url = if trimmed.is_empty() {
            Self::DEFAULT_API_URL
        } else {
            trimmed
        };
        validate_url(url)?;
        Ok(url.to_string())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(u64::from(self.request_timeout_secs)))
        }
    }

    /// Directory downloads are written to. `~/` expands to the home directory.
    pub fn download_dir(&self) -> PathBuf {
        let Some(raw) = self
            .download_dir
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
        else {
            return PathBuf::from(".");
        };
        if let Some(rest) = raw.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(rest);
        }
        PathBuf::from(raw)
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Saves only the `api_url` field to the config file.
    ///
    /// # Errors
    /// Returns an error if the config cannot be read, parsed or written.
    pub fn save_api_url(url: &str) -> Result<()> {
        Self::save_api_url_to(&paths::config_path(), url)
    }

    /// Saves only the `api_url` field to a specific config file path.
    ///
    /// Creates the file with the default template if it doesn't exist.
    /// Existing user values and comments are preserved.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the file cannot be written.
    pub fn save_api_url_to(path: &Path, url: &str) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        let url = url.trim();
        validate_url(url)?;

        let contents = if path.exists() {
            let user_config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            merge_with_template(&user_config)?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        doc["api_url"] = value(url);

        Self::write_config(path, &doc.to_string())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

fn validate_url(url: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url).with_context(|| format!("Invalid API base URL: {url}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("Invalid API base URL: {url} (expected http or https)");
    }
    Ok(())
}
