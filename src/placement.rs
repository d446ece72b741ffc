//! Placement of extracted patch contents into configuration directories.
//!
//! A patch archive unpacks into a handful of independent top-level entries
//! (extension directories, preference files). Copies are I/O bound and
//! independent, so a bounded worker pool places them in parallel; directory
//! copies merge into any pre-existing destination subtree instead of
//! replacing it.

use crate::error::{AtelierError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use walkdir::WalkDir;

/// One copy operation: a source file or directory and its final destination
/// path (for directories, the merged subtree root).
#[derive(Debug, Clone)]
pub struct CopyJob {
    pub source: PathBuf,
    pub dest: PathBuf,
}

impl CopyJob {
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
        }
    }
}

/// Worker count for a batch: twice the CPU parallelism, but never more
/// workers than jobs and never zero.
pub fn pool_size(jobs: usize) -> usize {
    let cpus = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (2 * cpus).min(jobs).max(1)
}

/// Copy a batch of independent jobs with the default pool size.
pub fn parallel_copy(jobs: &[CopyJob]) -> Result<()> {
    parallel_copy_with_workers(jobs, pool_size(jobs.len()))
}

/// Copy a set of top-level entries into one destination directory, each
/// keeping its source file name.
pub fn parallel_copy_into(items: &[PathBuf], dest_dir: &Path) -> Result<()> {
    let jobs: Vec<CopyJob> = items
        .iter()
        .filter_map(|item| {
            item.file_name()
                .map(|name| CopyJob::new(item, dest_dir.join(name)))
        })
        .collect();
    parallel_copy(&jobs)
}

/// Copy a batch with an explicit worker count.
///
/// Workers pull jobs from a shared cursor until the batch drains; a failed
/// job does not cancel the others, and the first failure is returned once
/// every worker has finished.
pub fn parallel_copy_with_workers(jobs: &[CopyJob], workers: usize) -> Result<()> {
    if jobs.is_empty() {
        return Ok(());
    }

    let workers = workers.clamp(1, jobs.len());
    tracing::debug!(jobs = jobs.len(), workers, "placing files");

    let next = AtomicUsize::new(0);
    let first_failure: Mutex<Option<AtelierError>> = Mutex::new(None);

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let index = next.fetch_add(1, Ordering::SeqCst);
                let Some(job) = jobs.get(index) else {
                    break;
                };
                if let Err(e) = run_job(job) {
                    tracing::warn!(source = %job.source.display(), error = %e, "copy failed");
                    let mut slot = first_failure.lock().unwrap_or_else(|p| p.into_inner());
                    slot.get_or_insert(e);
                }
            });
        }
    });

    match first_failure.into_inner().unwrap_or_else(|p| p.into_inner()) {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn run_job(job: &CopyJob) -> Result<()> {
    if job.source.is_dir() {
        merge_dir(&job.source, &job.dest)
    } else {
        copy_file(&job.source, &job.dest)
    }
}

/// Copy a single file, creating intermediate destination directories.
/// `fs::copy` carries permissions across where the platform supports it;
/// the modified time is restored explicitly since `fs::copy` does not.
fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| placement_failed(source, e))?;
    }
    fs::copy(source, dest).map_err(|e| placement_failed(source, e))?;
    copy_mtime(source, dest)
}

/// Carry the source's modified time over to the copied file.
fn copy_mtime(source: &Path, dest: &Path) -> Result<()> {
    let modified = fs::metadata(source)
        .and_then(|m| m.modified())
        .map_err(|e| placement_failed(source, e))?;
    let file = fs::OpenOptions::new()
        .write(true)
        .open(dest)
        .map_err(|e| placement_failed(dest, e))?;
    file.set_times(fs::FileTimes::new().set_modified(modified))
        .map_err(|e| placement_failed(dest, e))?;
    Ok(())
}

/// Recursively merge `source` into `dest`.
///
/// Pre-existing destination files whose names do not collide with source
/// entries survive; colliding files are overwritten.
pub fn merge_dir(source: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| placement_failed(source, e))?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| placement_failed(source, e))?;
        let target = dest.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| placement_failed(entry.path(), e))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| placement_failed(entry.path(), e))?;
            }
            fs::copy(entry.path(), &target).map_err(|e| placement_failed(entry.path(), e))?;
            copy_mtime(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn placement_failed(item: &Path, cause: impl std::fmt::Display) -> AtelierError {
    AtelierError::PlacementFailed {
        item: item.to_path_buf(),
        message: cause.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn pool_size_never_exceeds_job_count() {
        assert_eq!(pool_size(1), 1);
        assert_eq!(pool_size(2), 2);
        assert!(pool_size(1000) >= 1);
        assert!(pool_size(1000) <= 1000);
    }

    #[test]
    fn pool_size_is_at_least_one() {
        assert_eq!(pool_size(0), 1);
    }

    #[test]
    fn copies_n_files_for_every_worker_count() {
        let temp = TempDir::new().unwrap();
        let src_dir = temp.path().join("src");
        fs::create_dir_all(&src_dir).unwrap();

        let items: Vec<PathBuf> = (0..6)
            .map(|i| {
                let path = src_dir.join(format!("file-{}.txt", i));
                fs::write(&path, format!("contents {}", i)).unwrap();
                path
            })
            .collect();

        for workers in 1..=items.len() {
            let dest = temp.path().join(format!("dest-{}", workers));
            fs::create_dir_all(&dest).unwrap();

            let jobs: Vec<CopyJob> = items
                .iter()
                .map(|item| CopyJob::new(item, dest.join(item.file_name().unwrap())))
                .collect();
            parallel_copy_with_workers(&jobs, workers).unwrap();

            for (i, item) in items.iter().enumerate() {
                let copied = dest.join(item.file_name().unwrap());
                assert_eq!(
                    fs::read_to_string(&copied).unwrap(),
                    format!("contents {}", i),
                    "worker count {}",
                    workers
                );
            }
        }
    }

    #[test]
    fn parallel_copy_into_uses_source_names() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.py");
        let b = temp.path().join("symbols");
        fs::write(&a, "print()").unwrap();
        fs::create_dir_all(b.join("deep")).unwrap();
        fs::write(b.join("deep/s.svg"), "<svg/>").unwrap();

        let dest = temp.path().join("extensions");
        fs::create_dir_all(&dest).unwrap();
        parallel_copy_into(&[a, b], &dest).unwrap();

        assert_eq!(fs::read_to_string(dest.join("a.py")).unwrap(), "print()");
        assert_eq!(
            fs::read_to_string(dest.join("symbols/deep/s.svg")).unwrap(),
            "<svg/>"
        );
    }

    #[test]
    fn merge_keeps_non_colliding_and_overwrites_colliding() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("patch");
        let dest = temp.path().join("config");

        fs::create_dir_all(source.join("sub")).unwrap();
        fs::write(source.join("colliding.txt"), "new").unwrap();
        fs::write(source.join("sub/added.txt"), "added").unwrap();

        fs::create_dir_all(dest.join("sub")).unwrap();
        fs::write(dest.join("colliding.txt"), "old").unwrap();
        fs::write(dest.join("existing.txt"), "keep me").unwrap();
        fs::write(dest.join("sub/other.txt"), "keep me too").unwrap();

        merge_dir(&source, &dest).unwrap();

        assert_eq!(fs::read_to_string(dest.join("colliding.txt")).unwrap(), "new");
        assert_eq!(fs::read_to_string(dest.join("existing.txt")).unwrap(), "keep me");
        assert_eq!(fs::read_to_string(dest.join("sub/other.txt")).unwrap(), "keep me too");
        assert_eq!(fs::read_to_string(dest.join("sub/added.txt")).unwrap(), "added");
    }

    #[test]
    fn merge_creates_missing_destination() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("patch");
        fs::create_dir_all(source.join("a/b")).unwrap();
        fs::write(source.join("a/b/c.txt"), "deep").unwrap();

        let dest = temp.path().join("brand/new/config");
        merge_dir(&source, &dest).unwrap();

        assert_eq!(fs::read_to_string(dest.join("a/b/c.txt")).unwrap(), "deep");
    }

    #[test]
    fn one_bad_job_fails_batch_but_not_siblings() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("good.txt");
        fs::write(&good, "fine").unwrap();
        let missing = temp.path().join("missing.txt");

        let dest = temp.path().join("dest");
        fs::create_dir_all(&dest).unwrap();

        let jobs = vec![
            CopyJob::new(&good, dest.join("good.txt")),
            CopyJob::new(&missing, dest.join("missing.txt")),
        ];
        let err = parallel_copy_with_workers(&jobs, 2).unwrap_err();
        assert!(matches!(err, AtelierError::PlacementFailed { .. }));

        // The good sibling still landed.
        assert_eq!(fs::read_to_string(dest.join("good.txt")).unwrap(), "fine");
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        parallel_copy(&[]).unwrap();
    }

    #[test]
    fn file_copy_preserves_modified_time() {
        use std::time::{Duration, SystemTime};

        let temp = TempDir::new().unwrap();
        let source = temp.path().join("preferences.xml");
        fs::write(&source, "<prefs/>").unwrap();
        let old = SystemTime::now() - Duration::from_secs(3600);
        let file = fs::OpenOptions::new().write(true).open(&source).unwrap();
        file.set_times(fs::FileTimes::new().set_modified(old)).unwrap();

        let dest = temp.path().join("out/preferences.xml");
        parallel_copy(&[CopyJob::new(&source, &dest)]).unwrap();

        // Compare on-disk values so filesystem timestamp granularity
        // affects both sides equally.
        let src_mtime = fs::metadata(&source).unwrap().modified().unwrap();
        let dest_mtime = fs::metadata(&dest).unwrap().modified().unwrap();
        assert_eq!(dest_mtime, src_mtime);
    }

    #[test]
    fn merge_preserves_modified_time() {
        use std::time::{Duration, SystemTime};

        let temp = TempDir::new().unwrap();
        let source = temp.path().join("patch");
        fs::create_dir_all(source.join("2.10")).unwrap();
        let inner = source.join("2.10/gimprc");
        fs::write(&inner, "# settings").unwrap();
        let old = SystemTime::now() - Duration::from_secs(3600);
        let file = fs::OpenOptions::new().write(true).open(&inner).unwrap();
        file.set_times(fs::FileTimes::new().set_modified(old)).unwrap();

        let dest = temp.path().join("config");
        merge_dir(&source, &dest).unwrap();

        let src_mtime = fs::metadata(&inner).unwrap().modified().unwrap();
        let dest_mtime = fs::metadata(dest.join("2.10/gimprc"))
            .unwrap()
            .modified()
            .unwrap();
        assert_eq!(dest_mtime, src_mtime);
    }

    #[cfg(unix)]
    #[test]
    fn file_copy_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let source = temp.path().join("tool.py");
        fs::write(&source, "#!/usr/bin/env python3\n").unwrap();
        fs::set_permissions(&source, fs::Permissions::from_mode(0o755)).unwrap();

        let dest = temp.path().join("out/tool.py");
        parallel_copy(&[CopyJob::new(&source, &dest)]).unwrap();

        let mode = fs::metadata(&dest).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
