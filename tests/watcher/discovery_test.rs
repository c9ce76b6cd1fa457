//! Integration tests for worker log discovery.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use runner_agent::watcher::{FileDiscovery, SeenFiles, DEFAULT_FILE_PREFIX};
use tempfile::TempDir;

fn touch(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, "").unwrap();
}

/// Lay out a runner install with two runner directories.
fn runner_tree(root: &Path) -> Vec<PathBuf> {
    let logs = vec![
        root.join("actions-runner-1/_diag/Worker_20240305-140211-utc.log"),
        root.join("actions-runner-1/_diag/Worker_20240305-150000-utc.log"),
        root.join("actions-runner-2/_diag/Worker_20240305-141500-utc.log"),
    ];
    for log in &logs {
        touch(log);
    }
    touch(&root.join("actions-runner-1/_diag/Runner_20240305-140000-utc.log"));
    touch(&root.join("actions-runner-2/_diag/Runner_20240305-140000-utc.log"));
    touch(&root.join("actions-runner-1/_work/widgets/Worker_notes.txt.d/readme"));
    logs
}

#[test]
fn test_discovers_worker_logs_across_runners() {
    let temp_dir = TempDir::new().unwrap();
    let expected: HashSet<PathBuf> = runner_tree(temp_dir.path()).into_iter().collect();

    let mut discovery = FileDiscovery::new(DEFAULT_FILE_PREFIX);
    let found = discovery.discover(temp_dir.path()).unwrap();

    assert_eq!(found.len(), expected.len(), "no duplicates in one batch");
    assert_eq!(found.into_iter().collect::<HashSet<_>>(), expected);
    assert_eq!(discovery.seen().len(), 3);
}

#[test]
fn test_only_new_logs_on_later_scans() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    runner_tree(root);

    let mut discovery = FileDiscovery::new(DEFAULT_FILE_PREFIX);
    discovery.discover(root).unwrap();
    assert!(discovery.discover(root).unwrap().is_empty());

    let next = root.join("actions-runner-2/_diag/Worker_20240305-160000-utc.log");
    touch(&next);
    assert_eq!(discovery.discover(root).unwrap(), vec![next.clone()]);
    assert!(discovery.seen().contains(&next));
    assert!(discovery.discover(root).unwrap().is_empty());
}

#[test]
fn test_deleted_logs_stay_seen() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let log = root.join("Worker_1.log");
    touch(&log);

    let mut discovery = FileDiscovery::new(DEFAULT_FILE_PREFIX);
    discovery.discover(root).unwrap();

    std::fs::remove_file(&log).unwrap();
    assert!(discovery.discover(root).unwrap().is_empty());

    touch(&log);
    assert!(discovery.discover(root).unwrap().is_empty());
    assert_eq!(discovery.seen().len(), 1);
}
