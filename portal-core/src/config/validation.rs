//! Configuration validation utilities.

use crate::error::ConfigError;

/// Result type for validation operations.
pub type ValidationResult = Result<(), ConfigError>;

/// Tracks the current section path and collects every failure, so one
/// startup run reports all misconfigured fields instead of the first.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    path: Vec<String>,
    errors: Vec<ConfigError>,
}

impl ValidationContext {
    /// Creates a new validation context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters a new section in the configuration.
    pub fn enter(&mut self, section: impl Into<String>) {
        self.path.push(section.into());
    }

    /// Exits the current section.
    pub fn exit(&mut self) {
        self.path.pop();
    }

    /// Returns the current path as a dot-separated string.
    #[must_use]
    pub fn current_path(&self) -> String {
        self.path.join(".")
    }

    /// Adds a validation error.
    pub fn add_error(&mut self, error: ConfigError) {
        self.errors.push(error);
    }

    /// Returns true if there are no validation errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the collected validation errors.
    #[must_use]
    pub fn errors(&self) -> &[ConfigError] {
        &self.errors
    }

    /// Consumes the context.
    ///
    /// A single failure is returned as-is; several are folded into
    /// [`ConfigError::ValidationFailed`].
    pub fn into_result(mut self) -> ValidationResult {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(ConfigError::ValidationFailed {
                reason: self
                    .errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            }),
        }
    }

    /// Creates a missing field error with the current path context.
    #[must_use]
    pub fn missing_field(&self, field: impl Into<String>) -> ConfigError {
        let section = (!self.path.is_empty()).then(|| self.current_path());
        ConfigError::MissingField {
            field: field.into(),
            section,
        }
    }

    /// Creates an invalid value error with the current path context.
    #[must_use]
    pub fn invalid_value(&self, field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
        let field_name = field.into();
        let full_field = if self.path.is_empty() {
            field_name
        } else {
            format!("{}.{}", self.current_path(), field_name)
        };
        ConfigError::InvalidValue {
            field: full_field,
            reason: reason.into(),
        }
    }
}

/// Fluent field checks recording into a [`ValidationContext`].
#[derive(Debug)]
pub struct Validator<'a> {
    ctx: &'a mut ValidationContext,
}

impl<'a> Validator<'a> {
    /// Creates a new validator with the given context.
    pub fn new(ctx: &'a mut ValidationContext) -> Self {
        Self { ctx }
    }

    /// Validates that a string field is not empty.
    pub fn require_non_empty(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.ctx.add_error(self.ctx.missing_field(field));
        }
        self
    }

    /// Validates that a numeric value is within a range.
    pub fn in_range<T: PartialOrd + std::fmt::Display>(
        &mut self,
        field: &str,
        value: &T,
        min: &T,
        max: &T,
    ) -> &mut Self {
        if value < min || value > max {
            self.ctx.add_error(self.ctx.invalid_value(
                field,
                format!("Value {value} must be between {min} and {max}"),
            ));
        }
        self
    }

    /// Validates that a numeric value is positive.
    pub fn positive<T: PartialOrd + Default + std::fmt::Display>(
        &mut self,
        field: &str,
        value: &T,
    ) -> &mut Self {
        if *value <= T::default() {
            self.ctx.add_error(
                self.ctx
                    .invalid_value(field, format!("Value {value} must be positive")),
            );
        }
        self
    }

    /// Validates using a custom predicate.
    pub fn custom<F>(&mut self, field: &str, predicate: F, error_msg: &str) -> &mut Self
    where
        F: FnOnce() -> bool,
    {
        if !predicate() {
            self.ctx.add_error(self.ctx.invalid_value(field, error_msg));
        }
        self
    }

    /// Validates a bare host name: lowercase, no scheme, port or path, at most 253 characters.
    pub fn valid_hostname(&mut self, field: &str, value: &str) -> &mut Self {
        let ok = !value.is_empty()
            && value.len() <= 253
            && value == value.to_ascii_lowercase()
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
        if !ok {
            self.ctx.add_error(self.ctx.invalid_value(
                field,
                format!("'{value}' must be a lowercase host name without scheme or port"),
            ));
        }
        self
    }

    /// Validates an `http://` or `https://` origin.
    pub fn valid_origin(&mut self, field: &str, value: &str) -> &mut Self {
        let rest = value
            .strip_prefix("https://")
            .or_else(|| value.strip_prefix("http://"));
        if !rest.is_some_and(|host| !host.is_empty() && !host.contains('/')) {
            self.ctx.add_error(self.ctx.invalid_value(
                field,
                format!("'{value}' must be an origin such as https://example.com"),
            ));
        }
        self
    }

    /// Validates that `value` is one of `allowed`, ignoring case.
    pub fn one_of(&mut self, field: &str, value: &str, allowed: &[&str]) -> &mut Self {
        if !allowed.iter().any(|a| a.eq_ignore_ascii_case(value)) {
            self.ctx.add_error(self.ctx.invalid_value(
                field,
                format!("'{value}' must be one of: {}", allowed.join(", ")),
            ));
        }
        self
    }
}

/// Environment variable helper for applying overrides.
///
/// Unparseable values are ignored and the configured value is kept.
pub struct EnvOverride;

impl EnvOverride {
    /// Applies an environment variable override to a string value.
    pub fn apply_string(var_name: &str, target: &mut String) {
        if let Ok(value) = std::env::var(var_name) {
            *target = value;
        }
    }

    /// Applies an environment variable override to an optional string value.
    ///
    /// An empty value clears the option.
    pub fn apply_optional_string(var_name: &str, target: &mut Option<String>) {
        if let Ok(value) = std::env::var(var_name) {
            *target = (!value.is_empty()).then_some(value);
        }
    }

    /// Applies an environment variable override to any `FromStr` value.
    pub fn apply_number<T: std::str::FromStr>(var_name: &str, target: &mut T) {
        if let Ok(value) = std::env::var(var_name)
            && let Ok(parsed) = value.trim().parse()
        {
            *target = parsed;
        }
    }

    /// Applies an environment variable override to a boolean value.
    pub fn apply_bool(var_name: &str, target: &mut bool) {
        if let Ok(value) = std::env::var(var_name) {
            match value.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => *target = true,
                "false" | "0" | "no" | "off" => *target = false,
                _ => {}
            }
        }
    }

    /// Applies a comma-separated list override, e.g. `a.ca,b.ca`.
    pub fn apply_list(var_name: &str, target: &mut Vec<String>) {
        if let Ok(value) = std::env::var(var_name) {
            *target = value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(ToString::to_string)
                .collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_context_path() {
        let mut ctx = ValidationContext::new();
        assert_eq!(ctx.current_path(), "");

        ctx.enter("tenancy");
        ctx.enter("trusted_domains");
        assert_eq!(ctx.current_path(), "tenancy.trusted_domains");

        let err = ctx.invalid_value("ttl_secs", "zero");
        assert!(err.to_string().contains("tenancy.trusted_domains.ttl_secs"));

        ctx.exit();
        ctx.exit();
        assert_eq!(ctx.current_path(), "");
    }

    #[test]
    fn test_into_result_joins_multiple_errors() {
        let mut ctx = ValidationContext::new();
        assert!(ctx.clone().into_result().is_ok());

        ctx.add_error(ConfigError::missing_field("api_domain"));
        let single = ctx.clone().into_result().unwrap_err();
        assert!(matches!(single, ConfigError::MissingField { .. }));

        ctx.add_error(ConfigError::invalid_value("port", "zero"));
        let joined = ctx.into_result().unwrap_err();
        assert!(matches!(joined, ConfigError::ValidationFailed { .. }));
        assert!(joined.to_string().contains("api_domain"));
        assert!(joined.to_string().contains("port"));
    }

    #[test]
    fn test_validator_ranges() {
        let mut ctx = ValidationContext::new();
        Validator::new(&mut ctx)
            .in_range("port", &8080, &1, &65535)
            .positive("ttl_secs", &300_u64);
        assert!(ctx.is_valid());

        let mut ctx = ValidationContext::new();
        Validator::new(&mut ctx)
            .in_range("port", &0, &1, &65535)
            .positive("ttl_secs", &0_u64);
        assert_eq!(ctx.errors().len(), 2);
    }

    #[test]
    fn test_validator_hostname() {
        let mut ctx = ValidationContext::new();
        Validator::new(&mut ctx)
            .valid_hostname("api_domain", "api.ibuyscrap.ca")
            .valid_hostname("super_admin", "localhost");
        assert!(ctx.is_valid());

        for bad in ["", "API.example.com", "https://a.ca", "a.ca:8080", "a.ca/x"] {
            let mut ctx = ValidationContext::new();
            Validator::new(&mut ctx).valid_hostname("api_domain", bad);
            assert!(!ctx.is_valid(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_validator_origin() {
        let mut ctx = ValidationContext::new();
        Validator::new(&mut ctx)
            .valid_origin("o", "https://ibuyscrap.ca")
            .valid_origin("o", "http://localhost:5173");
        assert!(ctx.is_valid());

        for bad in ["ibuyscrap.ca", "https://", "https://a.ca/path", "ftp://a.ca"] {
            let mut ctx = ValidationContext::new();
            Validator::new(&mut ctx).valid_origin("o", bad);
            assert!(!ctx.is_valid(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_validator_one_of() {
        let mut ctx = ValidationContext::new();
        Validator::new(&mut ctx).one_of("level", "INFO", &["info", "debug"]);
        assert!(ctx.is_valid());

        Validator::new(&mut ctx).one_of("level", "verbose", &["info", "debug"]);
        assert!(!ctx.is_valid());
    }

    #[test]
    fn test_env_override_list() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("PORTAL_VALIDATION_TEST_LIST", " a.ca, ,b.ca ") };
        let mut list = vec!["old".to_string()];
        EnvOverride::apply_list("PORTAL_VALIDATION_TEST_LIST", &mut list);
        assert_eq!(list, ["a.ca", "b.ca"]);
        unsafe { std::env::remove_var("PORTAL_VALIDATION_TEST_LIST") };

        let mut untouched = true;
        EnvOverride::apply_bool("PORTAL_VALIDATION_TEST_UNSET", &mut untouched);
        assert!(untouched);
    }
}
