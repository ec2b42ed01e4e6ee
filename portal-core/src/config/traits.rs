//! Configuration traits for validation and environment overrides.

use crate::error::ConfigError;

/// Trait for types that can be validated.
///
/// # Example
///
/// ```rust
/// use portal_core::config::Validatable;
/// use portal_core::error::ConfigError;
///
/// struct CacheConfig {
///     ttl_secs: u64,
/// }
///
/// impl Validatable for CacheConfig {
///     fn validate(&self) -> Result<(), ConfigError> {
///         if self.ttl_secs == 0 {
///             return Err(ConfigError::invalid_value("ttl_secs", "TTL cannot be 0"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Validatable {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Trait for configuration sections that accept environment variable overrides.
///
/// `prefix` is the full variable prefix for the section, for example
/// `PORTAL_TENANCY`; fields append `_<FIELD>` to it.
pub trait Configurable {
    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self, prefix: &str);

    /// Lists the environment variables this section reads.
    fn env_var_names(prefix: &str) -> Vec<String>
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestConfig {
        ttl_secs: u64,
    }

    impl Validatable for TestConfig {
        fn validate(&self) -> Result<(), ConfigError> {
            if self.ttl_secs == 0 {
                return Err(ConfigError::invalid_value("ttl_secs", "TTL cannot be 0"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_validatable() {
        assert!(TestConfig { ttl_secs: 300 }.validate().is_ok());
        let err = TestConfig { ttl_secs: 0 }.validate().unwrap_err();
        assert!(err.to_string().contains("ttl_secs"));
    }
}
