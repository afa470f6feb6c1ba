//! Per-entry expiry labels for directory listings.
//!
//! The annotator is a read-only view of the same [`ExpiryPolicy`] the sweeper
//! applies, so a listing and a sweep evaluated at the same instant agree on
//! which files are expired.

use crate::{
    error::Result,
    policy::{ExpiryPolicy, ExpiryVerdict},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{
    cmp::Ordering,
    path::{Component, Path, PathBuf},
};

/// Presentation label for one listing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "expires_at", rename_all = "snake_case")]
pub enum ExpiryLabel {
    /// Directories, symlinks, and every file when expiry is disabled.
    NonExpiring,
    Expired,
    /// Absolute instant clients can diff against their own clock.
    ExpiresAt(DateTime<Utc>),
}

/// Metadata snapshot of one directory entry.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
    /// The sweeper never deletes symlinks, so they never expire.
    pub is_symlink: bool,
    pub size_bytes: u64,
    pub last_modified: DateTime<Utc>,
}

impl FileEntry {
    #[must_use]
    pub fn from_metadata(path: PathBuf, metadata: &std::fs::Metadata) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let last_modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| DateTime::<Utc>::from(std::time::UNIX_EPOCH));

        Self {
            path,
            name,
            is_dir: metadata.is_dir(),
            is_symlink: metadata.is_symlink(),
            size_bytes: if metadata.is_dir() { 0 } else { metadata.len() },
            last_modified,
        }
    }
}

/// A listing row ready for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct ListingEntry {
    pub name: String,
    pub href: String,
    pub is_dir: bool,
    /// `None` for directories.
    pub size_bytes: Option<u64>,
    pub last_modified: DateTime<Utc>,
    pub label: ExpiryLabel,
}

#[derive(Debug, Clone, Copy)]
pub struct ListingAnnotator {
    policy: ExpiryPolicy,
}

impl ListingAnnotator {
    #[must_use]
    pub const fn new(policy: ExpiryPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &ExpiryPolicy {
        &self.policy
    }

    /// Label one entry as of `now`.
    #[must_use]
    pub fn label_for(&self, entry: &FileEntry, now: DateTime<Utc>) -> ExpiryLabel {
        if entry.is_dir || entry.is_symlink {
            return ExpiryLabel::NonExpiring;
        }

        match self.policy.evaluate(entry.last_modified, now) {
            ExpiryVerdict::Expired => ExpiryLabel::Expired,
            ExpiryVerdict::Alive { remaining: None } => ExpiryLabel::NonExpiring,
            ExpiryVerdict::Alive { remaining: Some(_) } => self
                .policy
                .expires_at(entry.last_modified)
                .map_or(ExpiryLabel::NonExpiring, ExpiryLabel::ExpiresAt),
        }
    }

    /// Label a snapshot of the directory at `relative_dir` (relative to the
    /// served root). Directories come first, then files, each sorted by name.
    #[must_use]
    pub fn annotate(
        &self,
        mut entries: Vec<FileEntry>,
        relative_dir: &Path,
        now: DateTime<Utc>,
    ) -> Vec<ListingEntry> {
        entries.sort_by(|a, b| match (a.is_dir, b.is_dir) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => a.name.cmp(&b.name),
        });

        let base_href = directory_href(relative_dir);
        entries
            .into_iter()
            .map(|entry| {
                let label = self.label_for(&entry, now);
                let mut href = format!("{base_href}{}", urlencoding::encode(&entry.name));
                if entry.is_dir {
                    href.push('/');
                }
                ListingEntry {
                    href,
                    is_dir: entry.is_dir,
                    size_bytes: (!entry.is_dir).then_some(entry.size_bytes),
                    last_modified: entry.last_modified,
                    label,
                    name: entry.name,
                }
            })
            .collect()
    }

    /// Read `dir` and annotate its entries.
    ///
    /// Entries whose metadata cannot be read, typically because a concurrent
    /// sweep just deleted them, are left out of the listing.
    ///
    /// # Errors
    /// Returns an error if the directory itself cannot be opened or read.
    pub async fn read_directory(
        &self,
        dir: &Path,
        relative_dir: &Path,
        now: DateTime<Utc>,
    ) -> Result<Vec<ListingEntry>> {
        let mut read_dir = tokio::fs::read_dir(dir).await?;
        let mut entries = Vec::new();

        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            match entry_metadata(&path).await {
                Ok((metadata, is_symlink)) => {
                    let mut file_entry = FileEntry::from_metadata(path, &metadata);
                    file_entry.is_symlink = is_symlink;
                    entries.push(file_entry);
                }
                Err(e) => {
                    tracing::debug!("Skipping {:?} in listing: {}", path, e);
                }
            }
        }

        Ok(self.annotate(entries, relative_dir, now))
    }
}

/// Metadata of `path`, following a symlink to its target when the target
/// exists. The flag reports whether `path` itself is a symlink.
async fn entry_metadata(path: &Path) -> std::io::Result<(std::fs::Metadata, bool)> {
    let link_metadata = tokio::fs::symlink_metadata(path).await?;
    if !link_metadata.is_symlink() {
        return Ok((link_metadata, false));
    }

    match tokio::fs::metadata(path).await {
        Ok(target) => Ok((target, true)),
        // Dangling link
        Err(_) => Ok((link_metadata, true)),
    }
}

/// URL of the directory at `relative_dir`, always ending in `/`.
#[must_use]
pub fn directory_href(relative_dir: &Path) -> String {
    let mut href = String::from("/");
    for component in relative_dir.components() {
        if let Component::Normal(segment) = component {
            href.push_str(&urlencoding::encode(&segment.to_string_lossy()));
            href.push('/');
        }
    }
    href
}

/// URL of the parent of `relative_dir`, or `None` at the root.
#[must_use]
pub fn parent_href(relative_dir: &Path) -> Option<String> {
    if relative_dir.as_os_str().is_empty() {
        return None;
    }
    Some(directory_href(relative_dir.parent().unwrap_or(Path::new(""))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;

    fn file(name: &str, age: ChronoDuration, now: DateTime<Utc>) -> FileEntry {
        FileEntry {
            path: PathBuf::from(name),
            name: name.to_string(),
            is_dir: false,
            is_symlink: false,
            size_bytes: 5,
            last_modified: now - age,
        }
    }

    fn dir(name: &str, age: ChronoDuration, now: DateTime<Utc>) -> FileEntry {
        FileEntry {
            is_dir: true,
            size_bytes: 0,
            ..file(name, age, now)
        }
    }

    #[test]
    fn test_labels_follow_policy() {
        let now = Utc::now();
        let annotator = ListingAnnotator::new(ExpiryPolicy::from_hours(2));

        let old = file("old.txt", ChronoDuration::hours(3), now);
        assert_eq!(annotator.label_for(&old, now), ExpiryLabel::Expired);

        let fresh = file("fresh.txt", ChronoDuration::minutes(30), now);
        assert_eq!(
            annotator.label_for(&fresh, now),
            ExpiryLabel::ExpiresAt(fresh.last_modified + ChronoDuration::hours(2))
        );

        let old_dir = dir("archive", ChronoDuration::hours(100), now);
        assert_eq!(annotator.label_for(&old_dir, now), ExpiryLabel::NonExpiring);
    }

    #[test]
    fn test_disabled_policy_labels_nothing_expired() {
        let now = Utc::now();
        let annotator = ListingAnnotator::new(ExpiryPolicy::new(Duration::ZERO));
        let ancient = file("ancient.txt", ChronoDuration::hours(1000), now);
        assert_eq!(annotator.label_for(&ancient, now), ExpiryLabel::NonExpiring);
    }

    #[test]
    fn test_annotate_orders_and_links() {
        let now = Utc::now();
        let annotator = ListingAnnotator::new(ExpiryPolicy::from_hours(2));
        let entries = vec![
            file("zeta.txt", ChronoDuration::minutes(1), now),
            dir("beta", ChronoDuration::minutes(1), now),
            file("alpha file.txt", ChronoDuration::minutes(1), now),
            dir("alpha", ChronoDuration::minutes(1), now),
        ];

        let listing = annotator.annotate(entries, Path::new("docs"), now);
        let names: Vec<_> = listing.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["alpha", "beta", "alpha file.txt", "zeta.txt"]);

        assert_eq!(listing[0].href, "/docs/alpha/");
        assert_eq!(listing[0].size_bytes, None);
        assert_eq!(listing[2].href, "/docs/alpha%20file.txt");
        assert_eq!(listing[2].size_bytes, Some(5));
    }

    #[test]
    fn test_parent_href() {
        assert_eq!(parent_href(Path::new("")), None);
        assert_eq!(parent_href(Path::new("docs")), Some("/".to_string()));
        assert_eq!(
            parent_href(Path::new("docs/nested")),
            Some("/docs/".to_string())
        );
    }

    #[tokio::test]
    async fn test_read_directory() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempfile::tempdir()?;
        std::fs::write(temp_dir.path().join("a.txt"), "hello")?;
        std::fs::create_dir(temp_dir.path().join("sub"))?;

        let annotator = ListingAnnotator::new(ExpiryPolicy::from_hours(2));
        let listing = annotator
            .read_directory(temp_dir.path(), Path::new(""), Utc::now())
            .await?;

        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].name, "sub");
        assert_eq!(listing[0].label, ExpiryLabel::NonExpiring);
        assert_eq!(listing[1].name, "a.txt");
        assert_eq!(listing[1].size_bytes, Some(5));
        assert!(matches!(listing[1].label, ExpiryLabel::ExpiresAt(_)));
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_never_expire_and_agree_with_sweeper()
    -> std::result::Result<(), Box<dyn std::error::Error>> {
        use crate::sweeper::Sweeper;
        use filetime::FileTime;
        use std::time::SystemTime;

        let root = tempfile::tempdir()?;
        let outside = tempfile::tempdir()?;
        std::fs::create_dir(outside.path().join("shared"))?;
        std::fs::write(outside.path().join("target.txt"), "target")?;
        std::fs::write(root.path().join("stale.txt"), "stale")?;

        let linked_dir = root.path().join("linked-dir");
        let linked_file = root.path().join("linked-file");
        let dangling = root.path().join("dangling");
        std::os::unix::fs::symlink(outside.path().join("shared"), &linked_dir)?;
        std::os::unix::fs::symlink(outside.path().join("target.txt"), &linked_file)?;
        std::os::unix::fs::symlink(outside.path().join("gone"), &dangling)?;

        let old = FileTime::from_system_time(SystemTime::now() - Duration::from_secs(3 * 3600));
        filetime::set_file_mtime(root.path().join("stale.txt"), old)?;
        filetime::set_file_mtime(outside.path().join("target.txt"), old)?;
        for link in [&linked_dir, &linked_file, &dangling] {
            filetime::set_symlink_file_times(link, old, old)?;
        }

        let policy = ExpiryPolicy::from_hours(1);
        let annotator = ListingAnnotator::new(policy);
        let listing = annotator
            .read_directory(root.path(), Path::new(""), Utc::now())
            .await?;

        let linked = listing
            .iter()
            .find(|e| e.name == "linked-dir")
            .ok_or("linked-dir missing")?;
        assert!(linked.is_dir);
        assert_eq!(linked.href, "/linked-dir/");
        assert_eq!(linked.label, ExpiryLabel::NonExpiring);

        let linked_target = listing
            .iter()
            .find(|e| e.name == "linked-file")
            .ok_or("linked-file missing")?;
        assert!(!linked_target.is_dir);
        assert_eq!(linked_target.size_bytes, Some(6));
        assert_eq!(linked_target.label, ExpiryLabel::NonExpiring);

        let expired: Vec<_> = listing
            .iter()
            .filter(|e| e.label == ExpiryLabel::Expired)
            .map(|e| e.name.clone())
            .collect();
        assert_eq!(expired, ["stale.txt"]);

        let report = Sweeper::new(policy).sweep(root.path())?;
        assert_eq!(report.deleted, 1);

        // Everything labelled expired is gone; everything else is still there.
        for entry in &listing {
            let exists = std::fs::symlink_metadata(root.path().join(&entry.name)).is_ok();
            assert_eq!(
                exists,
                entry.label != ExpiryLabel::Expired,
                "listing and sweep disagree on {}",
                entry.name
            );
        }
        Ok(())
    }
}
