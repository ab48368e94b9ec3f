//! Moving delivered files into the processed folder.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// Move a delivered file into `processed`, prefixing its name with the
/// delivery time as `YYYYMMDD_HHMMSS_`.
///
/// Returns `Ok(None)` when no processed folder is configured. The folder is
/// created if missing. If the timestamped name is already taken a numeric
/// suffix is appended before the extension so nothing is overwritten.
pub async fn relocate_to_processed(
    source: &Path,
    processed: Option<&Path>,
) -> std::io::Result<Option<PathBuf>> {
    relocate_to_processed_at(source, processed, Local::now()).await
}

pub(crate) async fn relocate_to_processed_at(
    source: &Path,
    processed: Option<&Path>,
    now: DateTime<Local>,
) -> std::io::Result<Option<PathBuf>> {
    let Some(processed) = processed.filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(None);
    };

    tokio::fs::create_dir_all(processed).await?;

    let base = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stamped = format!("{}_{base}", now.format("%Y%m%d_%H%M%S"));

    let mut destination = processed.join(&stamped);
    let mut counter = 1;
    while tokio::fs::try_exists(&destination).await? {
        destination = processed.join(with_counter(&stamped, counter));
        counter += 1;
    }

    tokio::fs::rename(source, &destination).await?;
    Ok(Some(destination))
}

/// Name for the `counter`-th collision, counting from 1:
/// `20240101_120000_a.pdf` becomes `20240101_120000_a (1).pdf`, then `(2)`.
fn with_counter(name: &str, counter: u32) -> String {
    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => format!(
            "{} ({counter}).{}",
            stem.to_string_lossy(),
            ext.to_string_lossy()
        ),
        _ => format!("{name} ({counter})"),
    }
}
