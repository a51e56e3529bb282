use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::time::{Duration, SystemTime};

use common::file_utils::PHOTO_EXTENSIONS;
use common::test_utils::fresh_test_dir;

use super::*;
use crate::error::Error;

fn touch(path: &Path, age_secs: u64) {
    fs::write(path, b"x").unwrap();
    let mtime = SystemTime::now() - Duration::from_secs(age_secs);
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(mtime)
        .unwrap();
}

fn queue_in(name: &str) -> FileQueue {
    let queue = FileQueue::new(QueueDirs::under(&fresh_test_dir(name)), PHOTO_EXTENSIONS);
    queue.ensure_dirs().unwrap();
    queue
}

fn names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

/// Succeeds on `ok*`, fails on `bad*`, panics on `boom*`.
struct NameJob;

impl Job for NameJob {
    fn name(&self) -> &str {
        "test"
    }

    fn process(&self, input: &Path) -> crate::error::Result<Vec<PathBuf>> {
        let name = input.file_name().unwrap().to_string_lossy().into_owned();
        if name.starts_with("boom") {
            panic!("boom");
        }
        if name.starts_with("bad") {
            return Err(Error::Io {
                path: input.to_path_buf(),
                source: std::io::Error::other("rejected"),
            });
        }
        Ok(vec![input.to_path_buf()])
    }
}

fn quick() -> WorkerConfig {
    WorkerConfig {
        poll_interval_ms: 10,
        settle_delay_ms: 0,
    }
}

#[test]
fn poll_orders_by_mtime_and_filters_extensions() {
    let queue = queue_in("queue_poll");
    let inbox = &queue.dirs().inbox;
    touch(&inbox.join("newest.jpg"), 10);
    touch(&inbox.join("oldest.PNG"), 300);
    touch(&inbox.join("middle.bmp"), 100);
    touch(&inbox.join("notes.txt"), 500);

    let pending = queue.poll().unwrap();

    assert_eq!(names(&pending), ["oldest.PNG", "middle.bmp", "newest.jpg"]);
}

#[test]
fn ack_moves_to_archive_errors_and_crash() {
    let queue = queue_in("queue_ack");
    let inbox = queue.dirs().inbox.clone();
    for name in ["a.jpg", "b.jpg", "c.jpg"] {
        touch(&inbox.join(name), 0);
    }

    let done = queue.ack(&inbox.join("a.jpg"), Ack::Done).unwrap();
    let failed = queue.ack(&inbox.join("b.jpg"), Ack::Failed).unwrap();
    let crashed = queue.ack(&inbox.join("c.jpg"), Ack::Crashed).unwrap();

    assert_eq!(done, queue.dirs().archive.join("a.jpg"));
    assert_eq!(failed, queue.dirs().errors.join("b.jpg"));
    assert_eq!(crashed, queue.dirs().errors.join("CRASH_c.jpg"));
    assert!(done.exists() && failed.exists() && crashed.exists());
    assert!(queue.poll().unwrap().is_empty());
}

#[test]
fn ack_of_missing_file_is_not_fatal() {
    let queue = queue_in("queue_ack_missing");
    let ghost = queue.dirs().inbox.join("ghost.jpg");
    assert_eq!(queue.ack(&ghost, Ack::Done), None);
}

#[test]
fn run_once_routes_each_outcome() {
    let queue = queue_in("queue_run_once");
    let inbox = queue.dirs().inbox.clone();
    touch(&inbox.join("ok_1.jpg"), 30);
    touch(&inbox.join("bad_1.jpg"), 20);
    touch(&inbox.join("boom_1.jpg"), 10);
    touch(&inbox.join("ok_2.png"), 5);

    let worker = Worker::new(queue.clone(), NameJob, quick());
    let summary = worker.run_once(&AtomicBool::new(false)).unwrap();

    assert_eq!(
        summary,
        PassSummary {
            processed: 2,
            failed: 1,
            crashed: 1
        }
    );
    assert!(queue.dirs().archive.join("ok_1.jpg").exists());
    assert!(queue.dirs().archive.join("ok_2.png").exists());
    assert!(queue.dirs().errors.join("bad_1.jpg").exists());
    assert!(queue.dirs().errors.join("CRASH_boom_1.jpg").exists());
    assert!(queue.poll().unwrap().is_empty());
}

#[test]
fn stop_flag_prevents_processing() {
    let queue = queue_in("queue_stop");
    touch(&queue.dirs().inbox.join("ok.jpg"), 0);

    let worker = Worker::new(queue.clone(), NameJob, quick());
    let stop = AtomicBool::new(true);

    assert_eq!(worker.run_once(&stop).unwrap().total(), 0);
    worker.run(&stop).unwrap();
    assert_eq!(queue.poll().unwrap().len(), 1);
}

#[test]
fn worker_config_defaults() {
    let config: WorkerConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config.poll_interval(), Duration::from_millis(1000));
    assert_eq!(config.settle_delay(), Duration::from_millis(500));
}
