use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEvent {
    /// Immediate subdirectories of `parent`, delivered together.
    Batch { parent: PathBuf, dirs: Vec<PathBuf> },
    /// Every reachable directory has been listed.
    Finished { directories: usize },
}

/// A running crawl. Dropping the worker handles detaches the threads.
pub struct Crawl {
    pub events: Receiver<CrawlEvent>,
    pub workers: Vec<JoinHandle<()>>,
}

enum Job {
    Scan(PathBuf),
    Stop,
}

struct Pool {
    jobs: Sender<Job>,
    events: Sender<CrawlEvent>,
    // Directories queued or being listed.
    pending: AtomicUsize,
    listed: AtomicUsize,
    workers: usize,
}

/// Starts crawling `root` on `workers` threads and returns the event stream.
///
/// Nothing stops the crawl early. Dropping the receiver only makes the
/// remaining batches go nowhere.
pub fn spawn(root: PathBuf, workers: usize) -> Result<Crawl> {
    let workers = workers.max(1);
    let (jobs, job_rx) = unbounded();
    let (events, event_rx) = unbounded();
    let pool = Arc::new(Pool {
        jobs,
        events,
        pending: AtomicUsize::new(1),
        listed: AtomicUsize::new(0),
        workers,
    });

    // Sent before any worker exists, so the receiver is always alive here.
    let _ = pool.jobs.send(Job::Scan(root));

    let handles = (0..workers)
        .map(|n| {
            let pool = Arc::clone(&pool);
            let job_rx = job_rx.clone();
            thread::Builder::new()
                .name(format!("burrow-crawl-{n}"))
                .spawn(move || run_worker(&pool, &job_rx))
                .map_err(|err| Error::spawn("crawler", err))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Crawl {
        events: event_rx,
        workers: handles,
    })
}

fn run_worker(pool: &Pool, job_rx: &Receiver<Job>) {
    while let Ok(Job::Scan(dir)) = job_rx.recv() {
        let dirs = list_subdirectories(&dir);
        pool.listed.fetch_add(1, Ordering::Relaxed);

        if !dirs.is_empty() {
            pool.pending.fetch_add(dirs.len(), Ordering::SeqCst);
            for child in &dirs {
                let _ = pool.jobs.send(Job::Scan(child.clone()));
            }
            let _ = pool.events.send(CrawlEvent::Batch { parent: dir, dirs });
        }

        if pool.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            finish(pool);
        }
    }
}

fn finish(pool: &Pool) {
    let directories = pool.listed.load(Ordering::Relaxed);
    tracing::info!(directories, "crawl finished");
    for _ in 0..pool.workers {
        let _ = pool.jobs.send(Job::Stop);
    }
    let _ = pool.events.send(CrawlEvent::Finished { directories });
}

/// Subdirectories of `dir`, sorted. Symlinks are not followed and an
/// unreadable directory simply has no children.
pub fn list_subdirectories(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::debug!(dir = %dir.display(), %err, "skipping unreadable directory");
            return Vec::new();
        }
    };

    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    dirs.sort();
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn collect(root: &Path, workers: usize) -> (Vec<CrawlEvent>, usize) {
        let rx = spawn(root.to_path_buf(), workers).unwrap().events;
        let mut events = Vec::new();
        loop {
            match rx.recv_timeout(Duration::from_secs(10)).unwrap() {
                CrawlEvent::Finished { directories } => return (events, directories),
                event => events.push(event),
            }
        }
    }

    fn discovered(events: &[CrawlEvent], root: &Path) -> BTreeSet<String> {
        events
            .iter()
            .flat_map(|event| match event {
                CrawlEvent::Batch { dirs, .. } => dirs.clone(),
                CrawlEvent::Finished { .. } => Vec::new(),
            })
            .map(|dir| {
                dir.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }

    #[test]
    fn finds_nested_directories_and_ignores_files() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("apple/core")).unwrap();
        fs::create_dir_all(root.join("apricot")).unwrap();
        fs::create_dir_all(root.join("banana/a/b/c")).unwrap();
        fs::write(root.join("notes.txt"), "x").unwrap();
        fs::write(root.join("apple/seed.rs"), "x").unwrap();

        let (events, directories) = collect(root, 3);
        let expected: BTreeSet<String> = [
            "apple",
            "apple/core",
            "apricot",
            "banana",
            "banana/a",
            "banana/a/b",
            "banana/a/b/c",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(discovered(&events, root), expected);
        assert_eq!(directories, 8);
    }

    #[test]
    fn children_of_one_directory_arrive_as_one_batch() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        for name in ["c", "a", "b"] {
            fs::create_dir(root.join(name)).unwrap();
        }

        let (events, _) = collect(root, 2);
        assert_eq!(
            events,
            vec![CrawlEvent::Batch {
                parent: root.to_path_buf(),
                dirs: vec![root.join("a"), root.join("b"), root.join("c")],
            }]
        );
    }

    #[test]
    fn missing_root_finishes_without_batches() {
        let tmp = tempfile::tempdir().unwrap();
        let (events, directories) = collect(&tmp.path().join("gone"), 4);
        assert!(events.is_empty());
        assert_eq!(directories, 1);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_followed() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("real/inner")).unwrap();
        std::os::unix::fs::symlink(root.join("real"), root.join("link")).unwrap();
        std::os::unix::fs::symlink(root, root.join("real/loop")).unwrap();

        let (events, _) = collect(root, 2);
        let expected: BTreeSet<String> = ["real", "real/inner"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(discovered(&events, root), expected);
    }

    #[test]
    fn workers_finish_after_receiver_is_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("x/y/z")).unwrap();
        fs::create_dir_all(tmp.path().join("w/v")).unwrap();
        let Crawl { events, workers } = spawn(tmp.path().to_path_buf(), 3).unwrap();
        drop(events);

        assert_eq!(workers.len(), 3);
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        thread::spawn(move || {
            let names: Vec<String> = workers
                .into_iter()
                .map(|worker| {
                    let name = worker.thread().name().unwrap_or_default().to_string();
                    worker.join().unwrap();
                    name
                })
                .collect();
            let _ = done_tx.send(names);
        });

        let names = done_rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(names, vec!["burrow-crawl-0", "burrow-crawl-1", "burrow-crawl-2"]);
    }

    #[test]
    fn zero_workers_still_crawls() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("only")).unwrap();
        let (events, _) = collect(tmp.path(), 0);
        assert_eq!(events.len(), 1);
    }
}
