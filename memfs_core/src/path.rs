//! Absolute path handling: splitting and component iteration.

use crate::error::{Error, Result};

/// Longest entry name accepted in a directory.
pub const MAX_NAME_LEN: usize = 255;

/// Split an absolute path into `(parent, name)`.
///
/// `name` is everything after the last `/`; `parent` is everything before
/// it, or `/` when the entry sits directly under the root.
///
/// ```
/// use memfs_core::split;
///
/// assert_eq!(split("/a/b.txt").unwrap(), ("/a", "b.txt"));
/// assert_eq!(split("/b.txt").unwrap(), ("/", "b.txt"));
/// assert!(split("/a/").is_err());
/// ```
pub fn split(path: &str) -> Result<(&str, &str)> {
    if !path.starts_with('/') {
        return Err(Error::invalid_path(path, "path must be absolute"));
    }
    if path.ends_with('/') {
        return Err(Error::invalid_path(path, "path must not end with '/'"));
    }

    // Leading '/' is guaranteed above, so rfind always succeeds.
    let idx = path.rfind('/').unwrap_or(0);
    let parent = match &path[..idx] {
        "" => "/",
        parent => parent,
    };
    Ok((parent, &path[idx + 1..]))
}

/// Iterate the non-empty components of an absolute path.
///
/// Repeated slashes collapse, so `"//a///b"` yields `a`, `b`.
pub fn components(path: &str) -> Result<impl Iterator<Item = &str>> {
    if !path.starts_with('/') {
        return Err(Error::invalid_path(path, "path must be absolute"));
    }
    Ok(path.split('/').filter(|c| !c.is_empty()))
}

/// Check that `name` can be stored as a directory entry.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_path(name, "name cannot be empty"));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(Error::invalid_path(
            name,
            format!("name too long: {} bytes (max {})", name.len(), MAX_NAME_LEN),
        ));
    }

    if name.contains('/') {
        return Err(Error::invalid_path(name, "name cannot contain '/'"));
    }

    if name.contains('\0') {
        return Err(Error::invalid_path(name, "name cannot contain null bytes"));
    }

    Ok(())
}
