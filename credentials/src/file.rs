//! Token file with owner-only permissions.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CredentialError, Result};
use crate::{CredentialStore, normalize};

pub const TOKEN_FILE_NAME: &str = ".token";

/// `<ProgramData>\docsync`, with `C:\ProgramData` when the variable is unset.
#[cfg(any(windows, test))]
fn machine_dir(program_data: Option<std::ffi::OsString>) -> PathBuf {
    program_data
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\ProgramData"))
        .join("docsync")
}

/// Stores the token in a plain file readable only by the owner.
///
/// On Unix the parent directory is created `0700` and the file `0600`.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Create a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `%ProgramData%\docsync\.token` on Windows, where the boot
    /// task running as SYSTEM reads it, and `<config_dir>/docsync/.token` (or
    /// `~/.docsync/.token`) elsewhere.
    pub fn default_location() -> Self {
        #[cfg(windows)]
        let base = machine_dir(std::env::var_os("ProgramData"));

        #[cfg(not(windows))]
        let base = dirs::config_dir()
            .map(|dir| dir.join("docsync"))
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".docsync"));

        Self::new(base.join(TOKEN_FILE_NAME))
    }

    /// Path of the token file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn create_parent(&self) -> Result<()> {
        let Some(parent) = self.path.parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() {
            return Ok(());
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            fs::DirBuilder::new()
                .recursive(true)
                .mode(0o700)
                .create(parent)?;
        }

        #[cfg(not(unix))]
        fs::create_dir_all(parent)?;

        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn name(&self) -> &str {
        "file"
    }

    fn store(&self, secret: &str) -> Result<&str> {
        let secret = normalize(secret)?;
        self.create_parent()?;

        // Write atomically so a crash never leaves a truncated token behind.
        let temp_path = self.path.with_extension("tmp");
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&temp_path)?;
        file.write_all(secret.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path)?;
        debug!(path = %self.path.display(), "Stored token file");
        Ok(self.name())
    }

    fn get(&self) -> Result<String> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CredentialError::NotConfigured);
            }
            Err(e) => return Err(e.into()),
        };

        let token = contents.trim();
        if token.is_empty() {
            return Err(CredentialError::NotConfigured);
        }
        Ok(token.to_string())
    }
}
