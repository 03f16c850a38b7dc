//! Configuration file management for knit.
//!
//! Provides a TOML-based config file at `~/.config/knit/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use knit_core::client::ProviderConfig;
use knit_core::client::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT};

pub const API_KEY_ENV: &str = "GROQ_API_KEY";
pub const MODEL_ENV: &str = "KNIT_MODEL";
pub const BASE_URL_ENV: &str = "KNIT_BASE_URL";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub provider: ProviderSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            max_tokens: None,
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the knit config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/knit` or `~/.config/knit`,
/// on every platform.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("knit");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("knit")
}

/// Return the path to the knit config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    // The file may hold an API key.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(path)
}

/// Show the first and last four characters of a key.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct KnitConfig {
    pub provider: ProviderConfig,
}

impl KnitConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// A missing config file is not an error; a malformed one is.
    pub fn resolve(overrides: &CliOverrides) -> Result<Self> {
        let file_config = if config_path().exists() {
            Some(load_config()?)
        } else {
            None
        };
        Self::resolve_with(file_config.as_ref(), overrides)
    }

    /// Resolution against an already-loaded config file.
    ///
    /// - API key: `--api-key` > `GROQ_API_KEY` > `provider.api_key` > error
    /// - Model: `--model` > `KNIT_MODEL` > `provider.model` > default
    /// - Base URL: `--base-url` > `KNIT_BASE_URL` > `provider.base_url` > default
    /// - Temperature: `--temperature` > `provider.temperature` > default
    pub fn resolve_with(file: Option<&ConfigFile>, overrides: &CliOverrides) -> Result<Self> {
        let section = file.map(|f| f.provider.clone()).unwrap_or_default();

        let api_key = match overrides
            .api_key
            .clone()
            .or_else(|| env_var(API_KEY_ENV))
            .or(section.api_key)
        {
            Some(key) => key,
            None => bail!(
                "API key not found; set {API_KEY_ENV} or run `knit init --api-key <KEY>` to create a config file"
            ),
        };

        let model = overrides
            .model
            .clone()
            .or_else(|| env_var(MODEL_ENV))
            .unwrap_or(section.model);

        let base_url = overrides
            .base_url
            .clone()
            .or_else(|| env_var(BASE_URL_ENV))
            .unwrap_or(section.base_url);

        let temperature = overrides.temperature.unwrap_or(section.temperature);
        if !(0.0..=2.0).contains(&temperature) {
            bail!("temperature must be between 0.0 and 2.0, got {temperature}");
        }

        Ok(Self {
            provider: ProviderConfig {
                base_url,
                api_key,
                model,
                temperature,
                max_tokens: section.max_tokens,
                timeout: Duration::from_secs(section.timeout_secs),
            },
        })
    }
}

/// Read an env var, treating an empty value as unset.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
