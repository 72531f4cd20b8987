//! Facade error types.

use amp_config::ConfigError;
use amp_dimensions::ResolverError;

/// Error returned by [`Amped`](crate::Amped).
#[derive(Debug, thiserror::Error)]
pub enum AmpedError {
    /// No embed or sanitizer registry has been set up.
    #[error("Amped is not configured: no embed or sanitizer registry set")]
    ConfigMissing,
    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The dimension resolver could not be built.
    #[error("dimension resolver: {0}")]
    Resolver(#[from] ResolverError),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
