//! CLI error types.

use amp_config::ConfigError;
use amped::AmpedError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Amped(#[from] AmpedError),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}
