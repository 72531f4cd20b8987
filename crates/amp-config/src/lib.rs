//! Configuration management for Amped.
//!
//! Parses `amped.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories. Without a file the
//! built-in defaults apply, including the default sanitizer registry.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `base_origin`
//! - `dimensions.user_agent`
//!
//! ## Example
//!
//! ```toml
//! base_origin = "${APP_URL:-https://example.com}"
//! debug = false
//!
//! [css]
//! path = "public/css"
//! max_size = 75000
//!
//! [dimensions]
//! cache_dir = ".amped/cache"
//!
//! [args]
//! content_max_width = 720
//!
//! [[sanitizers]]
//! stage = "image"
//! args = { align_wide_support = true }
//!
//! [[sanitizers]]
//! stage = "tag_and_attribute"
//! ```

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use amp_dimensions::Scheme;
use amp_sanitizers::{Args, StageRegistration, default_sanitizers};
use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "amped.toml";

const DAY_SECS: u64 = 24 * 60 * 60;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the base origin.
    pub base_origin: Option<String>,
    /// Override the debug flag.
    pub debug: Option<bool>,
    /// Override the dimension cache directory.
    pub cache_dir: Option<PathBuf>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Origin that root-relative URLs resolve against.
    pub base_origin: String,
    /// Transport scheme used for scheme-relative URLs.
    pub scheme: Scheme,
    /// Development mode.
    pub debug: bool,
    /// Custom CSS configuration.
    pub css: CssConfig,
    /// Dimension resolver configuration.
    pub dimensions: DimensionsConfig,
    /// Arguments passed to every stage.
    pub args: Args,
    /// Embed stages, run before the sanitizers.
    pub embeds: Vec<StageRegistration>,
    /// Sanitizer stages, in run order.
    pub sanitizers: Vec<StageRegistration>,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_origin: "http://localhost".to_owned(),
            scheme: Scheme::default(),
            debug: false,
            css: CssConfig::default(),
            dimensions: DimensionsConfig::default(),
            args: Args::new().with("content_max_width", 720),
            embeds: Vec::new(),
            sanitizers: default_sanitizers(),
            config_path: None,
        }
    }
}

/// Custom CSS configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CssConfig {
    /// Directory holding stylesheets for inlining.
    pub path: Option<PathBuf>,
    /// Largest stylesheet, in bytes, that may be inlined.
    pub max_size: u64,
}

impl Default for CssConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_size: 75_000,
        }
    }
}

/// Dimension resolver configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DimensionsConfig {
    /// Lifetime of resolved dimensions, in seconds.
    pub cache_ttl_secs: u64,
    /// Lifetime of failed lookups, in seconds.
    pub failure_ttl_secs: u64,
    /// Lifetime of in-flight fetch locks, in seconds.
    pub lock_ttl_secs: u64,
    /// Per-fetch timeout, in seconds.
    pub timeout_secs: u64,
    /// Bytes of each image read to find its size.
    pub max_probe_bytes: u64,
    /// User agent sent with fetches. Defaults to `amped, v0.1, {base_origin}`.
    pub user_agent: Option<String>,
    /// Directory of the persistent cache. In-memory when unset.
    pub cache_dir: Option<PathBuf>,
}

impl Default for DimensionsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 30 * DAY_SECS,
            failure_ttl_secs: 30 * DAY_SECS,
            lock_ttl_secs: 60,
            timeout_secs: 10,
            max_probe_bytes: amp_dimensions::DEFAULT_MAX_PROBE_BYTES,
            user_agent: None,
            cache_dir: None,
        }
    }
}

impl DimensionsConfig {
    /// Lifetime of resolved dimensions.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Lifetime of failed lookups.
    #[must_use]
    pub fn failure_ttl(&self) -> Duration {
        Duration::from_secs(self.failure_ttl_secs)
    }

    /// Lifetime of fetch locks.
    #[must_use]
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    /// Per-fetch timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`base_origin`").
        field: String,
        /// Error message (e.g., "${`APP_URL`} not set").
        message: String,
    },
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Require a numeric field to be positive.
fn require_positive(value: u64, field: &str) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Validation(format!(
            "{field} must be greater than 0"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `amped.toml` in current directory and parents,
    /// falling back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| discover_from(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(base_origin) = &settings.base_origin {
            self.base_origin.clone_from(base_origin);
        }
        if let Some(debug) = settings.debug {
            self.debug = debug;
        }
        if let Some(cache_dir) = &settings.cache_dir {
            self.dimensions.cache_dir = Some(cache_dir.clone());
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// User agent sent with dimension fetches.
    #[must_use]
    pub fn user_agent(&self) -> String {
        self.dimensions
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("amped, v0.1, {}", self.base_origin))
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_http_url(&self.base_origin, "base_origin")?;
        self.validate_dimensions()?;
        require_positive(self.css.max_size, "css.max_size")?;
        Ok(())
    }

    /// Validate dimension resolver configuration.
    fn validate_dimensions(&self) -> Result<(), ConfigError> {
        let dims = &self.dimensions;
        require_positive(dims.timeout_secs, "dimensions.timeout_secs")?;
        require_positive(dims.max_probe_bytes, "dimensions.max_probe_bytes")?;

        // A crashed fetch must unlock before its URL's cache entry could expire
        let shortest = dims.cache_ttl_secs.min(dims.failure_ttl_secs);
        if dims.lock_ttl_secs >= shortest {
            return Err(ConfigError::Validation(format!(
                "dimensions.lock_ttl_secs ({}) must be shorter than the cache TTLs ({shortest})",
                dims.lock_ttl_secs
            )));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.base_origin = expand::expand_env(&self.base_origin, "base_origin")?;
        if let Some(ref user_agent) = self.dimensions.user_agent {
            self.dimensions.user_agent =
                Some(expand::expand_env(user_agent, "dimensions.user_agent")?);
        }
        Ok(())
    }

    /// Resolve relative paths against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: &mut Option<PathBuf>| {
            if let Some(p) = path.as_mut()
                && p.is_relative()
            {
                *p = config_dir.join(&*p);
            }
        };
        resolve(&mut self.css.path);
        resolve(&mut self.dimensions.cache_dir);
    }
}

/// Search for the config file in `start` and its parents.
fn discover_from(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILENAME);
        if candidate.exists() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}
