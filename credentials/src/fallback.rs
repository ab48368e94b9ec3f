//! Vault-first store that falls back to a file.

use tracing::{debug, warn};

use crate::CredentialStore;
use crate::error::{CredentialError, Result};

/// Prefers `primary` (a platform vault) and transparently falls back to
/// `secondary` when the vault is unavailable or holds no token.
pub struct FallbackCredentialStore<P, S> {
    primary: P,
    secondary: S,
}

impl<P: CredentialStore, S: CredentialStore> FallbackCredentialStore<P, S> {
    /// Create a fallback store.
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

impl<P: CredentialStore, S: CredentialStore> CredentialStore for FallbackCredentialStore<P, S> {
    fn name(&self) -> &str {
        self.primary.name()
    }

    fn store(&self, secret: &str) -> Result<&str> {
        match self.primary.store(secret) {
            Ok(holder) => Ok(holder),
            Err(CredentialError::EmptySecret) => Err(CredentialError::EmptySecret),
            Err(e) => {
                warn!(
                    "{} unavailable ({e}), storing token in {}",
                    self.primary.name(),
                    self.secondary.name()
                );
                self.secondary.store(secret)
            }
        }
    }

    fn get(&self) -> Result<String> {
        match self.primary.get() {
            Ok(token) => Ok(token),
            Err(e) => {
                debug!(
                    "{} has no token ({e}), trying {}",
                    self.primary.name(),
                    self.secondary.name()
                );
                self.secondary.get()
            }
        }
    }
}
