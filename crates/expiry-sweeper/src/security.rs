//! Path validation for requests that address files below a served root.

use crate::error::{Result, SweeperError};
use std::path::{Path, PathBuf};

/// Turn a raw (percent-encoded) URI path into a relative path below the root.
///
/// Empty and `.` segments are dropped. Any `..` segment is rejected outright,
/// as are NUL bytes and paths that are not valid UTF-8 once decoded.
pub fn clean_request_path(raw: &str) -> Result<PathBuf> {
    let decoded = urlencoding::decode(raw)
        .map_err(|_| SweeperError::path_validation(raw, "Path is not valid UTF-8"))?;

    if decoded.contains('\0') {
        return Err(SweeperError::path_validation(
            raw,
            "Path contains null bytes",
        ));
    }

    let mut cleaned = PathBuf::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(SweeperError::path_validation(
                    raw,
                    "Path contains a parent directory segment",
                ));
            }
            other => cleaned.push(other),
        }
    }

    Ok(cleaned)
}

/// Join `relative` onto `base` and make sure the result stays inside `base`.
///
/// Existing targets are canonicalized, so a symlink pointing outside the base
/// is rejected. A target that does not exist is returned as joined; callers
/// treat it as not found.
pub fn resolve_within(base: &Path, relative: &Path) -> Result<PathBuf> {
    if relative.is_absolute() {
        return Err(SweeperError::path_validation(
            relative,
            "Absolute paths not allowed",
        ));
    }

    let full_path = base.join(relative);
    if std::fs::symlink_metadata(&full_path).is_err() {
        return Ok(full_path);
    }

    let canonical_base = base.canonicalize().map_err(|e| {
        SweeperError::path_validation(base, format!("Failed to resolve base directory: {e}"))
    })?;
    let canonical_path = match full_path.canonicalize() {
        Ok(path) => path,
        // Dangling symlink or a file removed since the check above
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SweeperError::NotFound { path: full_path });
        }
        Err(e) => return Err(SweeperError::Io(e)),
    };

    if !canonical_path.starts_with(&canonical_base) {
        tracing::warn!(
            "Rejected {:?}: resolves to {:?}, outside {:?}",
            relative,
            canonical_path,
            canonical_base
        );
        return Err(SweeperError::path_validation(
            relative,
            "Path escapes served directory",
        ));
    }

    Ok(canonical_path)
}

/// Reduce a client-submitted upload file name to a safe single path component.
///
/// Browsers may send a full client-side path; only its last component is kept.
pub fn sanitize_upload_name(name: &str) -> Result<String> {
    if name.contains('\0') {
        return Err(SweeperError::path_validation(
            name,
            "File name contains null bytes",
        ));
    }

    let last = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    match last {
        "" | "." | ".." => Err(SweeperError::path_validation(
            name,
            "File name is empty or refers to a directory",
        )),
        valid => Ok(valid.to_string()),
    }
}
