//! # Credentials
//!
//! Storage for the agent's bearer token.
//!
//! The rest of the agent depends only on the two-operation
//! [`CredentialStore`] contract. [`default_store`] picks the backend for the
//! current platform: the macOS Keychain with a permission-restricted file as
//! fallback, and the file alone everywhere else. On Windows the file lives
//! under `%ProgramData%` where the boot task's SYSTEM account can read it.

pub mod error;
pub mod fallback;
pub mod file;
#[cfg(target_os = "macos")]
pub mod vault;

pub use error::{CredentialError, Result};
pub use fallback::FallbackCredentialStore;
pub use file::FileCredentialStore;
#[cfg(target_os = "macos")]
pub use vault::KeyringCredentialStore;

/// Service name under which the token is registered in the vault.
pub const SERVICE_NAME: &str = "docsync-agent";

/// Account name under which the token is registered in the vault.
pub const ACCOUNT_NAME: &str = "ingest-token";

/// Persistence for a single opaque secret.
pub trait CredentialStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Persist `secret`, replacing any previous value.
    ///
    /// Returns the name of the backend that now holds it.
    fn store(&self, secret: &str) -> Result<&str>;

    /// Read the stored secret.
    ///
    /// Fails with [`CredentialError::NotConfigured`] if nothing was stored or
    /// the stored value is empty.
    fn get(&self) -> Result<String>;
}

/// Select the credential backend for this platform.
pub fn default_store() -> Box<dyn CredentialStore> {
    #[cfg(target_os = "macos")]
    {
        Box::new(FallbackCredentialStore::new(
            KeyringCredentialStore::new(SERVICE_NAME, ACCOUNT_NAME),
            FileCredentialStore::default_location(),
        ))
    }

    #[cfg(not(target_os = "macos"))]
    {
        Box::new(FileCredentialStore::default_location())
    }
}

/// Trim a secret and reject it if nothing is left.
pub(crate) fn normalize(secret: &str) -> Result<&str> {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return Err(CredentialError::EmptySecret);
    }
    Ok(trimmed)
}
