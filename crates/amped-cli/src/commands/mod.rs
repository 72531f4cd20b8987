//! CLI command implementations.

pub(crate) mod convert;
pub(crate) mod dimensions;

pub(crate) use convert::ConvertArgs;
pub(crate) use dimensions::DimensionsArgs;

use std::path::PathBuf;

use amp_config::{CliSettings, Config};

use crate::error::CliError;
use crate::output::Output;

/// Configuration options shared by every command.
#[derive(clap::Args)]
pub(crate) struct ConfigArgs {
    /// Path to configuration file (default: auto-discover amped.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Origin used to resolve relative URLs (overrides config).
    #[arg(long)]
    base_origin: Option<String>,

    /// Directory for the persistent dimension cache (overrides config).
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Enable debug mode (overrides config).
    #[arg(long)]
    debug: bool,
}

impl ConfigArgs {
    /// Load configuration with the command-line overrides applied.
    pub(crate) fn load(&self, output: &Output) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            base_origin: self.base_origin.clone(),
            debug: self.debug.then_some(true),
            cache_dir: self.cache_dir.clone(),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        match &config.config_path {
            Some(path) => output.note(&format!("Config: {}", path.display())),
            None => output.note("Config: defaults (no amped.toml found)"),
        }
        Ok(config)
    }
}
