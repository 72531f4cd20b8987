//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// `field` names the configuration key in error messages. Strings without
/// `${` are returned unchanged, so bare `$` signs never trigger expansion.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, LookupError> {
        std::env::var(var).map(Some).map_err(|_| LookupError {
            var_name: var.to_owned(),
        })
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.cause.var_name),
    })
}

/// Unset variable found during expansion.
struct LookupError {
    var_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_var_with_suffix() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("AMPED_TEST_HOST", "example.com");
        }
        let result = expand_env("https://${AMPED_TEST_HOST}/blog", "base_origin").unwrap();
        assert_eq!(result, "https://example.com/blog");
        unsafe {
            std::env::remove_var("AMPED_TEST_HOST");
        }
    }

    #[test]
    fn test_expand_default_when_unset() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("AMPED_TEST_UNSET");
        }
        let result = expand_env("${AMPED_TEST_UNSET:-amped}", "dimensions.user_agent").unwrap();
        assert_eq!(result, "amped");
    }

    #[test]
    fn test_expand_missing_var_names_field() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("AMPED_TEST_MISSING");
        }
        let err = expand_env("${AMPED_TEST_MISSING}", "base_origin").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        let msg = err.to_string();
        assert!(msg.contains("AMPED_TEST_MISSING"), "{msg}");
        assert!(msg.contains("base_origin"), "{msg}");
    }

    #[test]
    fn test_bare_dollar_not_expanded() {
        assert_eq!(expand_env("price $5", "x").unwrap(), "price $5");
    }
}
