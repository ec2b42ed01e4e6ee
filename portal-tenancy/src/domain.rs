//! Host normalization and classification.

use crate::config::TenancyConfig;
use crate::error::{Result, TenancyError};
use std::collections::HashSet;

const MAX_HOST_LEN: usize = 253;

/// What kind of host a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainClass {
    /// Operator host, no tenant scoping.
    SuperAdmin,
    /// Public API host, no tenant.
    Api,
    /// Anything else; must map to a tenant.
    TenantCandidate,
}

/// A normalized host and its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDomain {
    domain: String,
    class: DomainClass,
}

impl ParsedDomain {
    /// Normalized host: lowercase, no port, no trailing dot.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Host classification.
    #[must_use]
    pub fn class(&self) -> DomainClass {
        self.class
    }
}

/// Turns raw `Host` / `X-Forwarded-Host` values into a [`ParsedDomain`].
#[derive(Debug, Clone)]
pub struct DomainParser {
    super_admin: HashSet<String>,
    api_domain: String,
    trust_forwarded_host: bool,
}

impl DomainParser {
    /// Creates a parser from the super-admin and API host settings.
    #[must_use]
    pub fn new(config: &TenancyConfig) -> Self {
        Self {
            super_admin: config
                .super_admin_domains
                .iter()
                .map(|d| d.to_ascii_lowercase())
                .collect(),
            api_domain: config.api_domain.to_ascii_lowercase(),
            trust_forwarded_host: config.trust_forwarded_host,
        }
    }

    /// Normalizes and classifies the request host.
    ///
    /// `forwarded` is only consulted when forwarded hosts are trusted; its
    /// first comma-separated entry wins.
    pub fn parse(&self, host: Option<&str>, forwarded: Option<&str>) -> Result<ParsedDomain> {
        let raw = if self.trust_forwarded_host
            && let Some(value) = forwarded
            && let Some(first) = value.split(',').map(str::trim).find(|v| !v.is_empty())
        {
            first
        } else {
            host.map(str::trim).unwrap_or_default()
        };

        let domain = normalize(raw)?;
        let class = if self.super_admin.contains(&domain) {
            DomainClass::SuperAdmin
        } else if domain == self.api_domain {
            DomainClass::Api
        } else {
            DomainClass::TenantCandidate
        };

        Ok(ParsedDomain { domain, class })
    }

    /// Returns true if `domain` is a configured super-admin host.
    #[must_use]
    pub fn is_super_admin(&self, domain: &str) -> bool {
        self.super_admin.contains(domain)
    }
}

fn normalize(raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Err(TenancyError::invalid_domain("missing host"));
    }
    // Room for a trailing dot and a `:65535` port.
    if raw.len() > MAX_HOST_LEN + 7 {
        return Err(too_long());
    }
    if let Some(bad) = raw
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '[' | ']' | ':')))
    {
        return Err(TenancyError::invalid_domain(format!(
            "illegal character {bad:?} in host"
        )));
    }

    let host = strip_port(raw)?;
    let host = host.strip_suffix('.').unwrap_or(host);
    if host.is_empty() {
        return Err(TenancyError::invalid_domain("empty host name"));
    }
    if host.len() > MAX_HOST_LEN {
        return Err(too_long());
    }

    Ok(host.to_ascii_lowercase())
}

fn too_long() -> TenancyError {
    TenancyError::invalid_domain(format!("host exceeds {MAX_HOST_LEN} characters"))
}

fn strip_port(raw: &str) -> Result<&str> {
    if let Some(rest) = raw.strip_prefix('[') {
        // [v6]:port
        let Some((addr, tail)) = rest.split_once(']') else {
            return Err(TenancyError::invalid_domain("unterminated IPv6 literal"));
        };
        if !tail.is_empty() {
            check_port(tail.strip_prefix(':').unwrap_or("x"))?;
        }
        return Ok(&raw[..addr.len() + 2]);
    }

    match raw.split_once(':') {
        None => Ok(raw),
        Some((host, port)) => {
            check_port(port)?;
            Ok(host)
        }
    }
}

fn check_port(port: &str) -> Result<()> {
    if !port.is_empty() && port.len() <= 5 && port.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(TenancyError::invalid_domain(format!("invalid port {port:?}")))
    }
}
