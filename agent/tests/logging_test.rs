//! Runs in its own process: the global subscriber can only be installed once.

use docsync_agent::logging::{LOG_FILE_NAME, init_logging};
use tempfile::TempDir;

#[test]
fn test_logs_go_to_daily_file_in_log_dir() {
    let dir = TempDir::new().unwrap();
    let log_dir = dir.path().join("logs");

    let guard = init_logging(&log_dir);
    assert!(guard.is_some());
    tracing::info!(target: "docsync_agent", "hello from the agent");
    drop(guard);

    let files: Vec<_> = std::fs::read_dir(&log_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with(LOG_FILE_NAME), "unexpected log file {name}");

    let contents = std::fs::read_to_string(&files[0]).unwrap();
    assert!(contents.contains("hello from the agent"));
    assert!(!contents.contains('\u{1b}'), "file output must not contain ANSI codes");
}
