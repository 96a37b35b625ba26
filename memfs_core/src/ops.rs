//! Path-addressed operations in the shape of filesystem syscalls.
//!
//! These compose resolution with the id-based primitives, and carry the
//! preconditions an adapter is expected to check (such as emptiness before
//! `rmdir`).

use crate::error::{Error, Result};
use crate::fs::MemFs;
use crate::node::{Attributes, DirEntry, FileId, FileKind, FileMode};
use crate::path::split;
use tracing::debug;

impl MemFs {
    /// Attributes of the object at `path`.
    pub fn getattr(&self, path: &str) -> Result<Attributes> {
        self.stat(self.resolve(path)?)
    }

    /// Entries of the directory at `path`, including "." and "..".
    pub fn readdir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let dir = self.resolve_dir(path)?;
        self.dir(dir)?
            .entries()
            .iter()
            .map(|(name, &id)| {
                Ok(DirEntry {
                    name: name.clone(),
                    id,
                    kind: self.node(id)?.kind(),
                })
            })
            .collect()
    }

    /// Create a regular file at `path`.
    pub fn mknod(&mut self, path: &str, mode: FileMode) -> Result<FileId> {
        let (parent, name) = self.parent_of(path)?;
        self.create_file(parent, name, mode)
    }

    /// Create a directory at `path`. Trailing slashes are ignored.
    pub fn mkdir(&mut self, path: &str, mode: FileMode) -> Result<FileId> {
        let path = trim_trailing_slashes(path);
        if path == "/" {
            return Err(Error::already_exists("/"));
        }
        let (parent, name) = self.parent_of(path)?;
        self.create_directory(parent, name, mode)
    }

    /// Remove the regular-file name at `path`.
    pub fn unlink(&mut self, path: &str) -> Result<()> {
        let (parent, name) = self.parent_of(path)?;
        self.remove_file(parent, name)
    }

    /// Remove the empty directory at `path`. Trailing slashes are ignored.
    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        let path = trim_trailing_slashes(path);
        if path == "/" {
            return Err(Error::invalid_path(path, "cannot remove the root directory"));
        }

        let (parent, name) = self.parent_of(path)?;
        if name == "." || name == ".." {
            return Err(Error::invalid_path(path, "cannot remove '.' or '..'"));
        }
        if let Some(target) = self.lookup(parent, name)?
            && let Some(dir) = self.node(target)?.as_dir()
            && !dir.is_empty()
        {
            return Err(Error::not_empty(path));
        }

        self.remove_directory(parent, name)?;
        debug!(path, "removed directory");
        Ok(())
    }

    /// Read from the regular file at `path`.
    pub fn read_at(&self, path: &str, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.read(self.resolve_file(path)?, buf, offset)
    }

    /// Write to the regular file at `path`.
    pub fn write_at(&mut self, path: &str, data: &[u8], offset: u64) -> Result<usize> {
        let file = self.resolve_file(path)?;
        self.write(file, data, offset)
    }

    /// Set the logical size of the regular file at `path`.
    pub fn truncate_path(&mut self, path: &str, size: u64) -> Result<()> {
        let file = self.resolve_file(path)?;
        self.truncate(file, size)
    }

    /// Set access and modification times of the object at `path`.
    pub fn utimens(&mut self, path: &str, atime: i64, mtime: i64) -> Result<()> {
        let id = self.resolve(path)?;
        self.update_times(id, atime, mtime)
    }

    /// Split `path` and resolve its parent as a directory.
    fn parent_of<'p>(&self, path: &'p str) -> Result<(FileId, &'p str)> {
        let (parent, name) = split(path)?;
        let parent = self.resolve(parent)?;
        match self.node(parent)?.kind() {
            FileKind::Directory => Ok((parent, name)),
            FileKind::RegularFile => Err(Error::not_a_directory(path)),
        }
    }
}

fn trim_trailing_slashes(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" if path.starts_with('/') => "/",
        trimmed => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FsConfig;

    fn fs() -> MemFs {
        MemFs::new(FsConfig {
            owner: 1000,
            ..FsConfig::default()
        })
    }

    #[test]
    fn test_trim_trailing_slashes() {
        assert_eq!(trim_trailing_slashes("/d/"), "/d");
        assert_eq!(trim_trailing_slashes("/d//"), "/d");
        assert_eq!(trim_trailing_slashes("/"), "/");
        assert_eq!(trim_trailing_slashes("///"), "/");
        assert_eq!(trim_trailing_slashes("d/"), "d");
    }

    #[test]
    fn test_hello_scenario() {
        let mut fs = fs();
        fs.mknod("/a.txt", 0o644).unwrap();
        assert_eq!(fs.write_at("/a.txt", b"hello\0", 0).unwrap(), 6);
        assert_eq!(fs.getattr("/a.txt").unwrap().size, 6);

        fs.link("/a.txt", "/b.txt").unwrap();
        let mut buf = [0u8; 6];
        assert_eq!(fs.read_at("/b.txt", &mut buf, 0).unwrap(), 6);
        assert_eq!(&buf, b"hello\0");
        assert_eq!(fs.getattr("/a.txt").unwrap().nlink, 2);
        assert_eq!(fs.getattr("/b.txt").unwrap().nlink, 2);

        assert_eq!(
            fs.link("/a.txt", "/b.txt"),
            Err(Error::already_exists("b.txt"))
        );
    }

    #[test]
    fn test_getattr() {
        let mut fs = fs();
        fs.mkdir("/d", 0o750).unwrap();

        let attrs = fs.getattr("/d").unwrap();
        assert_eq!(attrs.kind, FileKind::Directory);
        assert_eq!(attrs.st_mode, 0o040750);
        assert_eq!(attrs.owner, 1000);
        assert_eq!(attrs.nlink, 2);
        assert_eq!(fs.getattr("/").unwrap().nlink, 3);
        assert!(matches!(fs.getattr("/x"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_readdir() {
        let mut fs = fs();
        fs.mkdir("/d", 0o755).unwrap();
        fs.mknod("/d/f", 0o644).unwrap();
        fs.mkdir("/d/e", 0o755).unwrap();

        let entries = fs.readdir("/d").unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec![".", "..", "e", "f"]);
        assert_eq!(entries[1].id, fs.root());
        assert_eq!(entries[2].kind, FileKind::Directory);
        assert_eq!(entries[3].kind, FileKind::RegularFile);

        assert!(matches!(
            fs.readdir("/d/f"),
            Err(Error::NotADirectory { .. })
        ));
    }

    #[test]
    fn test_mknod_errors() {
        let mut fs = fs();
        fs.mknod("/f", 0o644).unwrap();

        assert_eq!(fs.mknod("/f", 0o644), Err(Error::already_exists("f")));
        assert!(matches!(
            fs.mknod("/missing/f", 0o644),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            fs.mknod("/f/g", 0o644),
            Err(Error::NotADirectory { .. })
        ));
        assert!(matches!(
            fs.mknod("/g/", 0o644),
            Err(Error::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_mkdir_trailing_slash_and_root() {
        let mut fs = fs();
        let d = fs.mkdir("/d/", 0o755).unwrap();
        assert_eq!(fs.resolve("/d").unwrap(), d);
        assert_eq!(fs.mkdir("/", 0o755), Err(Error::already_exists("/")));
    }

    #[test]
    fn test_rmdir_empty_succeeds() {
        let mut fs = fs();
        fs.mkdir("/d", 0o755).unwrap();
        fs.rmdir("/d").unwrap();

        assert!(fs.resolve("/d").is_err());
        assert_eq!(fs.getattr("/").unwrap().nlink, 2);
        assert_eq!(fs.store().len(), 1);
    }

    #[test]
    fn test_rmdir_non_empty_is_rejected() {
        let mut fs = fs();
        fs.mkdir("/d", 0o755).unwrap();
        fs.mknod("/d/x", 0o644).unwrap();

        assert_eq!(fs.rmdir("/d"), Err(Error::not_empty("/d")));
        assert!(fs.resolve("/d/x").is_ok());

        fs.unlink("/d/x").unwrap();
        fs.rmdir("/d/").unwrap();
        assert_eq!(fs.store().len(), 1);
    }

    #[test]
    fn test_rmdir_errors() {
        let mut fs = fs();
        fs.mknod("/f", 0o644).unwrap();
        fs.mkdir("/d", 0o755).unwrap();

        assert!(matches!(fs.rmdir("/"), Err(Error::InvalidPath { .. })));
        assert!(matches!(fs.rmdir("/d/."), Err(Error::InvalidPath { .. })));
        assert!(matches!(fs.rmdir("/d/.."), Err(Error::InvalidPath { .. })));
        assert!(matches!(fs.rmdir("/f"), Err(Error::NotADirectory { .. })));
        assert!(matches!(fs.rmdir("/nope"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_unlink() {
        let mut fs = fs();
        fs.mknod("/f", 0o644).unwrap();
        fs.mkdir("/d", 0o755).unwrap();

        fs.unlink("/f").unwrap();
        assert!(fs.resolve("/f").is_err());
        assert!(matches!(fs.unlink("/d"), Err(Error::TypeMismatch { .. })));
        assert!(matches!(fs.unlink("/f"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_truncate_path_and_utimens() {
        let mut fs = fs();
        fs.mknod("/f", 0o644).unwrap();
        fs.write_at("/f", b"abcdef", 0).unwrap();

        fs.truncate_path("/f", 3).unwrap();
        assert_eq!(fs.getattr("/f").unwrap().size, 3);

        fs.utimens("/f", 10, 20).unwrap();
        let attrs = fs.getattr("/f").unwrap();
        assert_eq!((attrs.atime, attrs.mtime), (10, 20));

        assert!(matches!(
            fs.truncate_path("/", 0),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_huge_sizes_fail_without_panicking() {
        let mut fs = fs();
        fs.mknod("/f", 0o644).unwrap();
        fs.write_at("/f", b"abc", 0).unwrap();

        assert!(matches!(
            fs.truncate_path("/f", 1 << 63),
            Err(Error::FileTooLarge { .. })
        ));
        assert!(matches!(
            fs.write_at("/f", b"x", 1 << 63),
            Err(Error::FileTooLarge { .. })
        ));
        assert_eq!(fs.getattr("/f").unwrap().size, 3);
    }

    #[test]
    fn test_read_at_past_end() {
        let mut fs = fs();
        fs.mknod("/f", 0o644).unwrap();
        fs.write_at("/f", b"abc", 0).unwrap();

        let mut buf = [0u8; 8];
        assert_eq!(fs.read_at("/f", &mut buf, 3).unwrap(), 0);
        assert_eq!(fs.read_at("/f", &mut buf, 1).unwrap(), 2);
    }
}
