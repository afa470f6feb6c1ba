//! Recursive sweep of a directory tree, deleting files whose age exceeds the policy.
//!
//! A pass captures "now" once and evaluates every regular file against that
//! single horizon. Errors are contained per entry: an unreadable file or
//! subtree is logged and skipped, a failed delete is logged and left for the
//! next pass. Only a failure to open the root itself aborts a pass.

use crate::{
    clock::{Clock, SystemClock},
    error::{Result, SweeperError},
    policy::ExpiryPolicy,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};
use walkdir::WalkDir;

/// Filesystem operations the sweeper needs. The default is [`OsFs`].
pub trait SweepFs: Send + Sync + std::fmt::Debug {
    /// Modification time of the file at `path`.
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    /// Delete the file at `path`.
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// Real filesystem backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl SweepFs for OsFs {
    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

/// Counters for a single sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Regular files examined.
    pub scanned_files: usize,
    /// Files actually deleted this pass.
    pub deleted: usize,
    /// Expired files whose deletion failed (retried next pass).
    pub failed_deletions: usize,
    /// Entries skipped because their metadata or subtree could not be read.
    pub skipped_entries: usize,
}

/// Deletes expired files below a root directory.
#[derive(Clone, Debug)]
pub struct Sweeper {
    policy: ExpiryPolicy,
    clock: Arc<dyn Clock>,
    fs: Arc<dyn SweepFs>,
}

impl Sweeper {
    /// Create a sweeper using the system clock and the real filesystem.
    #[must_use]
    pub fn new(policy: ExpiryPolicy) -> Self {
        Self {
            policy,
            clock: Arc::new(SystemClock),
            fs: Arc::new(OsFs),
        }
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replace the filesystem backend.
    #[must_use]
    pub fn with_fs<F: SweepFs + 'static>(mut self, fs: F) -> Self {
        self.fs = Arc::new(fs);
        self
    }

    #[must_use]
    pub const fn policy(&self) -> &ExpiryPolicy {
        &self.policy
    }

    /// Run one blocking pass over `root`.
    ///
    /// # Errors
    /// Returns [`SweeperError::Traversal`] if `root` itself cannot be read.
    /// Failures below the root are logged and reflected in the report instead.
    pub fn sweep(&self, root: &Path) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        if self.policy.is_disabled() {
            tracing::trace!("Expiry disabled, skipping sweep of {:?}", root);
            return Ok(report);
        }

        let now = self.clock.now();

        for entry in WalkDir::new(root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    if e.depth() == 0 {
                        return Err(SweeperError::Traversal {
                            root: root.to_path_buf(),
                            reason: e.to_string(),
                        });
                    }
                    if e.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound) {
                        tracing::debug!("Entry vanished during sweep: {:?}", e.path());
                    } else {
                        tracing::warn!("Skipping unreadable entry {:?}: {}", e.path(), e);
                    }
                    report.skipped_entries += 1;
                    continue;
                }
            };

            // Directories are walked into but never removed; symlinks are left alone.
            if !entry.file_type().is_file() {
                continue;
            }

            report.scanned_files += 1;
            self.sweep_file(entry.path(), now, &mut report);
        }

        if report.deleted > 0 {
            tracing::info!(
                "Cleaned up {} expired files under {:?}",
                report.deleted,
                root
            );
        } else {
            tracing::trace!(
                "Sweep of {:?} finished: {} files scanned, nothing expired",
                root,
                report.scanned_files
            );
        }

        Ok(report)
    }

    fn sweep_file(&self, path: &Path, now: DateTime<Utc>, report: &mut SweepReport) {
        let modified = match self.fs.modified(path) {
            Ok(modified) => DateTime::<Utc>::from(modified),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("File vanished before it could be checked: {:?}", path);
                return;
            }
            Err(e) => {
                tracing::warn!("Failed to read metadata for {:?}: {}", path, e);
                report.skipped_entries += 1;
                return;
            }
        };

        if !self.policy.evaluate(modified, now).is_expired() {
            return;
        }

        match self.fs.remove_file(path) {
            Ok(()) => {
                tracing::debug!("Removed expired file: {:?}", path);
                report.deleted += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("Expired file already gone: {:?}", path);
            }
            Err(e) => {
                tracing::warn!("Failed to remove expired file {:?}: {}", path, e);
                report.failed_deletions += 1;
            }
        }
    }

    /// Run one pass on the blocking thread pool.
    ///
    /// # Errors
    /// Returns the error of [`Sweeper::sweep`], or [`SweeperError::Scheduler`]
    /// if the blocking task could not complete.
    pub async fn sweep_async(&self, root: PathBuf) -> Result<SweepReport> {
        let sweeper = self.clone();
        tokio::task::spawn_blocking(move || sweeper.sweep(&root))
            .await
            .map_err(|e| SweeperError::Scheduler {
                reason: format!("sweep task did not complete: {e}"),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::Duration as ChronoDuration;
    use filetime::FileTime;
    use std::{ffi::OsStr, time::Duration};

    fn set_age(path: &Path, now: DateTime<Utc>, age: ChronoDuration) {
        let modified = now - age;
        filetime::set_file_mtime(path, FileTime::from_unix_time(modified.timestamp(), 0)).unwrap();
    }

    fn write_aged(dir: &Path, name: &str, now: DateTime<Utc>, age: ChronoDuration) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, b"content").unwrap();
        set_age(&path, now, age);
        path
    }

    /// Fails metadata reads for one file name, delegates everything else.
    #[derive(Debug)]
    struct FailingMetadataFs {
        fail_name: &'static str,
    }

    impl SweepFs for FailingMetadataFs {
        fn modified(&self, path: &Path) -> io::Result<SystemTime> {
            if path.file_name() == Some(OsStr::new(self.fail_name)) {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "simulated metadata failure",
                ));
            }
            OsFs.modified(path)
        }

        fn remove_file(&self, path: &Path) -> io::Result<()> {
            OsFs.remove_file(path)
        }
    }

    /// Refuses every delete.
    #[derive(Debug)]
    struct FailingRemoveFs;

    impl SweepFs for FailingRemoveFs {
        fn modified(&self, path: &Path) -> io::Result<SystemTime> {
            OsFs.modified(path)
        }

        fn remove_file(&self, _path: &Path) -> io::Result<()> {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "simulated delete failure",
            ))
        }
    }

    #[test]
    fn test_expired_file_is_deleted() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempfile::tempdir()?;
        let now = Utc::now();
        let path = write_aged(temp_dir.path(), "old.txt", now, ChronoDuration::hours(2));

        let sweeper = Sweeper::new(ExpiryPolicy::from_hours(1)).with_clock(FixedClock(now));
        let report = sweeper.sweep(temp_dir.path())?;

        assert_eq!(report.deleted, 1);
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_disabled_expiry_keeps_ancient_files() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let temp_dir = tempfile::tempdir()?;
        let now = Utc::now();
        let path = write_aged(temp_dir.path(), "ancient.txt", now, ChronoDuration::hours(1000));

        let sweeper = Sweeper::new(ExpiryPolicy::disabled()).with_clock(FixedClock(now));
        let report = sweeper.sweep(temp_dir.path())?;

        assert_eq!(report.deleted, 0);
        assert!(path.exists());
        Ok(())
    }

    #[test]
    fn test_second_pass_deletes_nothing() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempfile::tempdir()?;
        let now = Utc::now();
        write_aged(temp_dir.path(), "a.txt", now, ChronoDuration::hours(3));
        write_aged(temp_dir.path(), "b.txt", now, ChronoDuration::hours(5));
        write_aged(temp_dir.path(), "fresh.txt", now, ChronoDuration::minutes(1));

        let sweeper = Sweeper::new(ExpiryPolicy::from_hours(2)).with_clock(FixedClock(now));

        let first = sweeper.sweep(temp_dir.path())?;
        assert_eq!(first.deleted, 2);
        assert_eq!(first.scanned_files, 3);

        let second = sweeper.sweep(temp_dir.path())?;
        assert_eq!(second.deleted, 0);
        assert_eq!(second.scanned_files, 1);
        Ok(())
    }

    #[test]
    fn test_metadata_failure_does_not_abort_sweep()
    -> std::result::Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempfile::tempdir()?;
        let now = Utc::now();
        let broken = write_aged(temp_dir.path(), "broken.txt", now, ChronoDuration::hours(4));
        let expired = write_aged(temp_dir.path(), "expired.txt", now, ChronoDuration::hours(4));

        let sweeper = Sweeper::new(ExpiryPolicy::from_hours(1))
            .with_clock(FixedClock(now))
            .with_fs(FailingMetadataFs {
                fail_name: "broken.txt",
            });
        let report = sweeper.sweep(temp_dir.path())?;

        assert_eq!(report.deleted, 1);
        assert_eq!(report.skipped_entries, 1);
        assert!(!expired.exists());
        assert!(broken.exists());
        Ok(())
    }

    #[test]
    fn test_failed_delete_is_retried_next_pass() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let temp_dir = tempfile::tempdir()?;
        let now = Utc::now();
        let path = write_aged(temp_dir.path(), "stuck.txt", now, ChronoDuration::hours(4));

        let failing = Sweeper::new(ExpiryPolicy::from_hours(1))
            .with_clock(FixedClock(now))
            .with_fs(FailingRemoveFs);
        let report = failing.sweep(temp_dir.path())?;
        assert_eq!(report.deleted, 0);
        assert_eq!(report.failed_deletions, 1);
        assert!(path.exists());

        let working = Sweeper::new(ExpiryPolicy::from_hours(1)).with_clock(FixedClock(now));
        assert_eq!(working.sweep(temp_dir.path())?.deleted, 1);
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_nested_files_swept_directories_kept()
    -> std::result::Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempfile::tempdir()?;
        let now = Utc::now();
        let nested = write_aged(
            temp_dir.path(),
            "deep/er/still/old.bin",
            now,
            ChronoDuration::hours(10),
        );
        let empty_dir = temp_dir.path().join("empty");
        std::fs::create_dir(&empty_dir)?;
        set_age(&empty_dir, now, ChronoDuration::hours(10));

        let sweeper = Sweeper::new(ExpiryPolicy::from_hours(1)).with_clock(FixedClock(now));
        let report = sweeper.sweep(temp_dir.path())?;

        assert_eq!(report.deleted, 1);
        assert!(!nested.exists());
        assert!(temp_dir.path().join("deep/er/still").is_dir());
        assert!(empty_dir.is_dir());
        Ok(())
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("does-not-exist");

        let sweeper = Sweeper::new(ExpiryPolicy::new(Duration::from_secs(60)));
        let result = sweeper.sweep(&missing);
        assert!(matches!(result, Err(SweeperError::Traversal { .. })));
    }

    #[tokio::test]
    async fn test_sweep_async_runs_on_blocking_pool()
    -> std::result::Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempfile::tempdir()?;
        let now = Utc::now();
        write_aged(temp_dir.path(), "old.txt", now, ChronoDuration::hours(2));

        let sweeper = Sweeper::new(ExpiryPolicy::from_hours(1)).with_clock(FixedClock(now));
        let report = sweeper.sweep_async(temp_dir.path().to_path_buf()).await?;
        assert_eq!(report.deleted, 1);
        Ok(())
    }
}
