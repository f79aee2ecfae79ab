//! Credential resolution for the configured provider.
//!
//! A pure function of [`Settings`]; no caching, since settings are immutable
//! for the process lifetime.

use crate::settings::{AzureSettings, GeminiSettings, Settings};
use counsel_core::{GatewayError, ProviderKind};
use thiserror::Error;

/// Credential resolution errors. Startup-fatal.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Asked for a provider that is not the configured one.
    #[error("provider {requested} requested but {configured} is configured")]
    ProviderMismatch {
        /// The provider asked for.
        requested: ProviderKind,
        /// The provider actually configured.
        configured: ProviderKind,
    },
}

impl From<CredentialError> for GatewayError {
    fn from(err: CredentialError) -> Self {
        Self::Credential {
            message: err.to_string(),
        }
    }
}

/// A resolved credential bundle for one provider.
#[derive(Debug, Clone)]
pub enum ProviderCredentials {
    /// Azure endpoint, key, api-version, deployments.
    Azure(AzureSettings),
    /// Gemini key and model identifiers.
    Gemini(GeminiSettings),
}

impl ProviderCredentials {
    /// Which provider these credentials belong to.
    #[must_use]
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Azure(_) => ProviderKind::Azure,
            Self::Gemini(_) => ProviderKind::Gemini,
        }
    }
}

/// Resolves credential bundles against the loaded settings.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    configured: ProviderKind,
    azure: Option<AzureSettings>,
    gemini: Option<GeminiSettings>,
}

impl CredentialStore {
    /// Build a store over validated settings.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            configured: settings.provider,
            azure: settings.azure.clone(),
            gemini: settings.gemini.clone(),
        }
    }

    /// The provider the settings selected.
    #[must_use]
    pub fn configured_provider(&self) -> ProviderKind {
        self.configured
    }

    /// Resolve the credential bundle for a provider.
    ///
    /// # Errors
    /// Returns [`CredentialError::ProviderMismatch`] when the requested
    /// provider is not the configured one. The loader guarantees the
    /// configured provider's bundle is present and complete.
    pub fn resolve(&self, provider: ProviderKind) -> Result<ProviderCredentials, CredentialError> {
        if provider != self.configured {
            return Err(CredentialError::ProviderMismatch {
                requested: provider,
                configured: self.configured,
            });
        }
        match provider {
            ProviderKind::Azure => self
                .azure
                .clone()
                .map(ProviderCredentials::Azure)
                .ok_or(CredentialError::ProviderMismatch {
                    requested: provider,
                    configured: self.configured,
                }),
            ProviderKind::Gemini => self
                .gemini
                .clone()
                .map(ProviderCredentials::Gemini)
                .ok_or(CredentialError::ProviderMismatch {
                    requested: provider,
                    configured: self.configured,
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn gemini_settings() -> Settings {
        let map: HashMap<String, String> = [
            ("GOOGLE_API_KEY", "AIza-test"),
            ("GEMINI_MODEL", "gemini-1.5-flash"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Settings::from_map(&map).expect("valid settings")
    }

    #[test]
    fn test_resolve_configured_provider() {
        let store = CredentialStore::new(&gemini_settings());
        assert_eq!(store.configured_provider(), ProviderKind::Gemini);

        let creds = store.resolve(ProviderKind::Gemini).expect("resolve");
        assert_eq!(creds.kind(), ProviderKind::Gemini);
        match creds {
            ProviderCredentials::Gemini(gemini) => {
                assert_eq!(gemini.model, "gemini-1.5-flash");
            }
            ProviderCredentials::Azure(_) => unreachable!("gemini configured"),
        }
    }

    #[test]
    fn test_resolve_mismatch() {
        let store = CredentialStore::new(&gemini_settings());
        let err = store.resolve(ProviderKind::Azure).unwrap_err();
        assert!(matches!(
            err,
            CredentialError::ProviderMismatch {
                requested: ProviderKind::Azure,
                configured: ProviderKind::Gemini,
            }
        ));
    }
}
