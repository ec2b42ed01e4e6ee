//! Tenant store trait.

use crate::data::Tenant;
use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How the legacy name search compares a subdomain label with display names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameMatch {
    /// Case-insensitive equality.
    Exact,
    /// Case-insensitive substring, the historical behaviour.
    #[default]
    Contains,
}

impl NameMatch {
    /// Returns the configuration name of the mode.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Contains => "contains",
        }
    }

    /// Compares a display name with a subdomain label, ignoring ASCII case.
    #[must_use]
    pub fn matches(&self, display_name: &str, label: &str) -> bool {
        let name = display_name.to_ascii_lowercase();
        let label = label.to_ascii_lowercase();
        match self {
            Self::Exact => name == label,
            Self::Contains => !label.is_empty() && name.contains(&label),
        }
    }
}

impl std::str::FromStr for NameMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "contains" => Ok(Self::Contains),
            other => Err(format!("unknown name match mode '{other}'")),
        }
    }
}

/// Read side of the tenant store.
///
/// The resolution pipeline only ever reads; provisioning and admin tooling
/// write through their own paths. `Ok(None)` means no tenant matched and
/// `Err` means the lookup itself failed.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Finds the tenant whose canonical or custom domain equals `domain`.
    ///
    /// `domain` is already normalized. Any status may be returned.
    async fn find_by_domain(&self, domain: &str) -> Result<Option<Tenant>, StoreError>;

    /// Finds an active or trial tenant whose domain equals `name`, or whose
    /// display name matches `name` under `mode`, ignoring case.
    ///
    /// Implementations return `Ok(None)` when more than one tenant matches by
    /// name.
    async fn find_by_name_or_domain_case_insensitive(
        &self,
        name: &str,
        mode: NameMatch,
    ) -> Result<Option<Tenant>, StoreError>;

    /// Lists every active or trial tenant that has at least one domain.
    async fn list_active_or_trial_with_domains(&self) -> Result<Vec<Tenant>, StoreError>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_match_modes() {
        assert!(NameMatch::Exact.matches("Acme", "ACME"));
        assert!(!NameMatch::Exact.matches("Acme Immigration", "acme"));
        assert!(NameMatch::Contains.matches("Acme Immigration", "acme"));
        assert!(!NameMatch::Contains.matches("Acme", ""));
    }

    #[test]
    fn test_name_match_parse() {
        assert_eq!("Exact".parse::<NameMatch>(), Ok(NameMatch::Exact));
        assert_eq!(" contains ".parse::<NameMatch>(), Ok(NameMatch::Contains));
        assert!("fuzzy".parse::<NameMatch>().is_err());
        assert_eq!(NameMatch::default().as_str(), "contains");
    }
}
