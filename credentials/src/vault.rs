//! macOS Keychain backend.

use keyring::Entry;

use crate::error::{CredentialError, Result};
use crate::{CredentialStore, normalize};

/// Stores the token in the operating system's credential vault.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service: String,
    account: String,
}

impl KeyringCredentialStore {
    /// Create a store for the given vault service/account pair.
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, &self.account).map_err(|e| CredentialError::Vault(e.to_string()))
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn name(&self) -> &str {
        "keyring"
    }

    fn store(&self, secret: &str) -> Result<&str> {
        let secret = normalize(secret)?;
        self.entry()?
            .set_password(secret)
            .map_err(|e| CredentialError::Vault(e.to_string()))?;
        Ok(self.name())
    }

    fn get(&self) -> Result<String> {
        match self.entry()?.get_password() {
            Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            Ok(_) | Err(keyring::Error::NoEntry) => Err(CredentialError::NotConfigured),
            Err(e) => Err(CredentialError::Vault(e.to_string())),
        }
    }
}
