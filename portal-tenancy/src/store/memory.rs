//! In-memory tenant store.
//!
//! Backs local development and tests. Records can be seeded from a YAML,
//! TOML or JSON file shaped as `tenants: [...]`.

use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use portal_core::config::ConfigLoader;
use portal_core::data::{Tenant, TenantStatus};
use portal_core::error::{ConfigError, StoreError};
use portal_core::traits::{NameMatch, TenantStore};
use portal_core::types::TenantId;
use serde::Deserialize;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    tenants: Vec<Tenant>,
}

/// Tenant store held in process memory.
///
/// Reads are lock-free; writes are serialized so the domain index never
/// points at two tenants.
#[derive(Debug, Default)]
pub struct InMemoryTenantStore {
    tenants: DashMap<TenantId, Tenant>,
    domains: DashMap<String, TenantId>,
    write_lock: Mutex<()>,
}

impl InMemoryTenantStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded from `path`.
    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let seed: SeedFile = ConfigLoader::new().load_file(path)?;
        let store = Self::new();
        for tenant in seed.tenants {
            store
                .insert(tenant)
                .map_err(|e| ConfigError::ValidationFailed {
                    reason: format!("{}: {e}", path.display()),
                })?;
        }
        info!(path = %path.display(), tenants = store.len(), "Seeded tenant store");
        Ok(store)
    }

    /// Inserts or replaces a tenant.
    ///
    /// Fails if any of its domains already belongs to another tenant.
    pub fn insert(&self, mut tenant: Tenant) -> Result<(), StoreError> {
        tenant.normalize_domains();
        let _guard = self.write_lock.lock();

        for domain in tenant.domains() {
            if let Some(owner) = self.domains.get(domain)
                && *owner != *tenant.id()
            {
                return Err(StoreError::DomainConflict {
                    domain: domain.to_string(),
                    owner: owner.to_string(),
                });
            }
        }

        if let Some((_, previous)) = self.tenants.remove(tenant.id()) {
            for domain in previous.domains() {
                self.domains.remove(domain);
            }
        }
        for domain in tenant.domains() {
            self.domains.insert(domain.to_string(), *tenant.id());
        }
        debug!(tenant_id = %tenant.id(), domain = tenant.domain(), "Stored tenant");
        self.tenants.insert(*tenant.id(), tenant);
        Ok(())
    }

    /// Changes a tenant's status. Returns false if the tenant is unknown.
    pub fn set_status(&self, id: &TenantId, status: TenantStatus) -> bool {
        let _guard = self.write_lock.lock();
        match self.tenants.get_mut(id) {
            Some(mut tenant) => {
                tenant.set_status(status);
                true
            }
            None => false,
        }
    }

    /// Removes a tenant and its domains.
    pub fn remove(&self, id: &TenantId) -> Option<Tenant> {
        let _guard = self.write_lock.lock();
        let (_, tenant) = self.tenants.remove(id)?;
        for domain in tenant.domains() {
            self.domains.remove(domain);
        }
        Some(tenant)
    }

    /// Returns a copy of a tenant record.
    #[must_use]
    pub fn get(&self, id: &TenantId) -> Option<Tenant> {
        self.tenants.get(id).map(|t| t.clone())
    }

    /// Number of stored tenants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    /// Returns true if no tenants are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }

    fn lookup_domain(&self, domain: &str) -> Option<Tenant> {
        let id = *self.domains.get(&domain.to_ascii_lowercase())?;
        self.get(&id)
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn find_by_domain(&self, domain: &str) -> Result<Option<Tenant>, StoreError> {
        Ok(self.lookup_domain(domain))
    }

    async fn find_by_name_or_domain_case_insensitive(
        &self,
        name: &str,
        mode: NameMatch,
    ) -> Result<Option<Tenant>, StoreError> {
        if let Some(tenant) = self.lookup_domain(name)
            && tenant.status().is_active_or_trial()
        {
            return Ok(Some(tenant));
        }

        let mut candidates: Vec<Tenant> = self
            .tenants
            .iter()
            .filter(|t| t.status().is_active_or_trial() && mode.matches(t.name(), name))
            .map(|t| t.clone())
            .collect();

        if candidates.len() > 1
            && let Some(pos) = candidates.iter().position(|t| t.name().eq_ignore_ascii_case(name))
        {
            // An exact display-name hit beats substring hits.
            return Ok(Some(candidates.swap_remove(pos)));
        }

        match candidates.len() {
            0 => Ok(None),
            1 => Ok(candidates.pop()),
            n => {
                warn!(name, mode = mode.as_str(), matches = n, "Ambiguous tenant name");
                Ok(None)
            }
        }
    }

    async fn list_active_or_trial_with_domains(&self) -> Result<Vec<Tenant>, StoreError> {
        Ok(self
            .tenants
            .iter()
            .filter(|t| t.status().is_active_or_trial() && !t.domain().is_empty())
            .map(|t| t.clone())
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn store() -> InMemoryTenantStore {
        let store = InMemoryTenantStore::new();
        store
            .insert(Tenant::new("Acme Immigration", "acme.example.com").with_custom_domain("visas.acme.ca"))
            .unwrap();
        store.insert(Tenant::new("Maple Law", "maple.example.com")).unwrap();
        store
            .insert(Tenant::new("Acme Legal", "acmelegal.example.com").with_status(TenantStatus::Suspended))
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_find_by_domain_any_status() {
        let store = store();
        let tenant = store.find_by_domain("VISAS.acme.ca").await.unwrap().unwrap();
        assert_eq!(tenant.name(), "Acme Immigration");

        let suspended = store.find_by_domain("acmelegal.example.com").await.unwrap().unwrap();
        assert!(suspended.status().is_suspended());
        assert!(store.find_by_domain("nobody.example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_domain_conflict_rejected() {
        let store = store();
        let err = store
            .insert(Tenant::new("Copycat", "ACME.example.com"))
            .unwrap_err();
        assert!(matches!(err, StoreError::DomainConflict { .. }));
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_replace_reindexes_domains() {
        let store = store();
        let mut tenant = store.find_by_domain("maple.example.com").await.unwrap().unwrap();
        tenant.add_custom_domain("maple.ca");
        store.insert(tenant.clone()).unwrap();
        assert!(store.find_by_domain("maple.ca").await.unwrap().is_some());

        store.remove(tenant.id()).unwrap();
        assert!(store.find_by_domain("maple.ca").await.unwrap().is_none());
        assert!(store.find_by_domain("maple.example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_name_search_modes() {
        let store = store();
        let found = store
            .find_by_name_or_domain_case_insensitive("maple", NameMatch::Contains)
            .await
            .unwrap();
        assert_eq!(found.unwrap().name(), "Maple Law");

        assert!(store
            .find_by_name_or_domain_case_insensitive("maple", NameMatch::Exact)
            .await
            .unwrap()
            .is_none());

        // Suspended "Acme Legal" is skipped, so "acme" is unambiguous.
        let found = store
            .find_by_name_or_domain_case_insensitive("acme", NameMatch::Contains)
            .await
            .unwrap();
        assert_eq!(found.unwrap().name(), "Acme Immigration");
    }

    #[tokio::test]
    async fn test_ambiguous_name_is_none() {
        let store = store();
        store.insert(Tenant::new("Acme Visa", "acmevisa.example.com")).unwrap();
        assert!(store
            .find_by_name_or_domain_case_insensitive("acme", NameMatch::Contains)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_list_excludes_inactive() {
        let store = store();
        let tenants = store.list_active_or_trial_with_domains().await.unwrap();
        assert_eq!(tenants.len(), 2);

        let id = *store.find_by_domain("maple.example.com").await.unwrap().unwrap().id();
        assert!(store.set_status(&id, TenantStatus::Cancelled));
        assert_eq!(store.list_active_or_trial_with_domains().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_seed_file() {
        let dir = std::env::temp_dir().join(format!("portal-seed-{}", TenantId::new()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tenants.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "tenants:\n  - name: Acme\n    domain: ACME.Example.com\n    status: trial\n  - name: Maple\n    domain: maple.example.com"
        )
        .unwrap();

        let store = InMemoryTenantStore::from_seed_file(&path).unwrap();
        assert_eq!(store.len(), 2);
        let acme = store.find_by_domain("acme.example.com").await.unwrap().unwrap();
        assert_eq!(acme.status(), TenantStatus::Trial);

        std::fs::remove_dir_all(dir).unwrap();
    }
}
