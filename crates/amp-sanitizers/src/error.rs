//! Sanitizer error types.

use amp_dom::DomError;

/// Error raised while sanitizing.
///
/// Stages recover from these per node: the offending element is skipped with
/// a warning and the stage moves on. An error escaping a stage makes the
/// pipeline drop the rest of that stage and continue with the next one.
#[derive(Debug, thiserror::Error)]
pub enum SanitizeError {
    /// A structural document operation was rejected.
    #[error(transparent)]
    Dom(#[from] DomError),

    /// A stage argument has an unusable value.
    #[error("invalid argument '{key}' for stage '{stage}': {message}")]
    InvalidArg {
        /// Stage that rejected the argument.
        stage: &'static str,
        /// Argument key.
        key: String,
        /// What is wrong with the value.
        message: String,
    },
}
