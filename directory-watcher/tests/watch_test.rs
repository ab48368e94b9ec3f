//! End-to-end tests with real filesystem notifications.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use docsync_directory_watcher::{WatchConfig, Watcher};
use docsync_queue::DurableQueue;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Poll `queue` until it holds an entry for `path`, or give up.
async fn wait_for_entry(queue: &DurableQueue, path: &Path, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if queue.get(path).await.unwrap().is_some() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

async fn start(
    temp_dir: &TempDir,
    window: Duration,
) -> (Watcher, DurableQueue, CancellationToken, tokio::task::JoinHandle<()>) {
    let queue = DurableQueue::open(temp_dir.path().join("queue.db"))
        .await
        .unwrap();
    let config = WatchConfig::new(temp_dir.path().join("inbox"))
        .with_stability_window(window)
        .with_check_interval(Duration::from_millis(50));
    let watcher = Watcher::new(config, queue.clone()).unwrap();

    let cancel = CancellationToken::new();
    let handle = {
        let watcher = watcher.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            watcher.run(cancel).await.unwrap();
        })
    };

    (watcher, queue, cancel, handle)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_new_file_is_enqueued_after_it_goes_quiet() {
    let temp_dir = TempDir::new().unwrap();
    let window = Duration::from_millis(300);
    let (watcher, queue, cancel, handle) = start(&temp_dir, window).await;

    // Give the OS watch a moment to register.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let path = watcher.root().join("invoice.pdf");
    let mut file = fs::File::create(&path).unwrap();
    file.write_all(b"%PDF-1.7 first half").unwrap();
    file.flush().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    file.write_all(b" second half").unwrap();
    drop(file);

    assert!(wait_for_entry(&queue, &path, Duration::from_secs(10)).await);
    let entry = queue.get(&path).await.unwrap().unwrap();
    assert_eq!(entry.size, b"%PDF-1.7 first half second half".len() as u64);
    assert_eq!(queue.size().await.unwrap(), 1);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_backlog_from_previous_run_is_recovered() {
    let temp_dir = TempDir::new().unwrap();
    let inbox = temp_dir.path().join("inbox");
    fs::create_dir_all(&inbox).unwrap();
    fs::write(inbox.join("left-over.docx"), b"docx").unwrap();
    fs::write(inbox.join("ignore.txt"), b"txt").unwrap();

    let (watcher, queue, cancel, handle) = start(&temp_dir, Duration::from_millis(100)).await;

    let path = watcher.root().join("left-over.docx");
    assert!(wait_for_entry(&queue, &path, Duration::from_secs(10)).await);

    // Give the checker a few more ticks; the text file must never show up.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(queue.size().await.unwrap(), 1);

    cancel.cancel();
    handle.await.unwrap();
}
