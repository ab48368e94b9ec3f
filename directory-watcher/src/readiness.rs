//! Platform readiness check: is anyone still writing this file?

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Outcome of a readiness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The file can be handed off.
    Ready,

    /// The file exists but is presumably still being written.
    Busy,

    /// The file is gone.
    Missing,
}

/// Blocking readiness check for one path.
pub type ReadinessCheck = fn(&Path) -> Readiness;

/// Check `path` with the platform check without blocking the async runtime.
pub async fn check_readiness(path: &Path) -> Readiness {
    check_readiness_with(path, check_blocking).await
}

/// Run `check` for `path` on the blocking pool.
pub async fn check_readiness_with(path: &Path, check: ReadinessCheck) -> Readiness {
    let owned: PathBuf = path.to_path_buf();
    match tokio::task::spawn_blocking(move || check(&owned)).await {
        Ok(readiness) => readiness,
        Err(e) => {
            debug!(file = %path.display(), "Readiness check panicked: {e}");
            Readiness::Busy
        }
    }
}

/// Open-for-read succeeding is the only evidence available here; POSIX does
/// not stop other processes from keeping the file open for writing.
#[cfg(not(windows))]
pub fn check_blocking(path: &Path) -> Readiness {
    classify(std::fs::File::open(path))
}

/// Open with share mode 0: fails while any other process holds a handle.
#[cfg(windows)]
pub fn check_blocking(path: &Path) -> Readiness {
    use std::os::windows::fs::OpenOptionsExt;

    classify(
        std::fs::OpenOptions::new()
            .read(true)
            .share_mode(0)
            .open(path),
    )
}

fn classify(result: std::io::Result<std::fs::File>) -> Readiness {
    match result {
        Ok(_) => Readiness::Ready,
        Err(e) if e.kind() == ErrorKind::NotFound => Readiness::Missing,
        Err(_) => Readiness::Busy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_closed_file_is_ready() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("done.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        assert_eq!(check_readiness(&path).await, Readiness::Ready);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("gone.pdf");

        assert_eq!(check_readiness(&path).await, Readiness::Missing);
    }

    #[test]
    fn test_open_errors_other_than_not_found_mean_busy() {
        let denied = std::io::Error::from(ErrorKind::PermissionDenied);
        assert_eq!(classify(Err(denied)), Readiness::Busy);

        let gone = std::io::Error::from(ErrorKind::NotFound);
        assert_eq!(classify(Err(gone)), Readiness::Missing);
    }

    #[tokio::test]
    async fn test_custom_check_runs_off_the_runtime() {
        fn always_busy(_: &Path) -> Readiness {
            Readiness::Busy
        }

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("held.pdf");
        std::fs::write(&path, b"x").unwrap();

        assert_eq!(check_readiness_with(&path, always_busy).await, Readiness::Busy);
    }
}
