//! The filesystem engine: directory mutation and regular-file I/O.

use crate::config::FsConfig;
use crate::error::{Error, Result};
use crate::node::{Attributes, Directory, FileId, FileKind, FileMode, Node, RegularFile};
use crate::path::validate_name;
use crate::store::ObjectStore;
use std::collections::BTreeMap;
use tracing::debug;

/// An in-memory filesystem instance.
///
/// Calls are synchronous and expect a single caller at a time; an adapter
/// serving concurrent requests must serialize access itself (for example by
/// holding the engine behind a `Mutex`).
#[derive(Debug)]
pub struct MemFs {
    config: FsConfig,
    store: ObjectStore,
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new(FsConfig::default())
    }
}

impl MemFs {
    /// Create an engine containing only the root directory.
    pub fn new(config: FsConfig) -> Self {
        let store = ObjectStore::new(config.owner, config.root_mode);
        Self { config, store }
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    /// Id of the root directory.
    pub fn root(&self) -> FileId {
        self.store.root()
    }

    /// Look up a live object by id.
    pub fn node(&self, id: FileId) -> Result<&Node> {
        self.store
            .get(id)
            .ok_or_else(|| Error::not_found(format!("#{}", id)))
    }

    /// Look up a live directory by id.
    pub fn dir(&self, id: FileId) -> Result<&Directory> {
        self.node(id)?
            .as_dir()
            .ok_or_else(|| Error::not_a_directory(format!("#{}", id)))
    }

    /// Look up a live regular file by id.
    pub fn file(&self, id: FileId) -> Result<&RegularFile> {
        let node = self.node(id)?;
        node.as_file().ok_or_else(|| {
            Error::type_mismatch(FileKind::RegularFile.as_str(), node.kind().as_str())
        })
    }

    /// Attribute snapshot of an object.
    pub fn stat(&self, id: FileId) -> Result<Attributes> {
        Ok(Attributes::from(self.node(id)?))
    }

    // --- directory capability -------------------------------------------

    /// Whether `dir` holds an entry named `name`.
    pub fn exists(&self, dir: FileId, name: &str) -> Result<bool> {
        Ok(self.dir(dir)?.exists(name))
    }

    /// Id of the entry `name` in `dir`, if any.
    pub fn lookup(&self, dir: FileId, name: &str) -> Result<Option<FileId>> {
        Ok(self.dir(dir)?.get(name))
    }

    /// Snapshot of `dir`'s entries in name order, "." and ".." included.
    pub fn list(&self, dir: FileId) -> Result<BTreeMap<String, FileId>> {
        Ok(self.dir(dir)?.entries().clone())
    }

    /// Create an empty regular file named `name` in `dir`.
    pub fn create_file(&mut self, dir: FileId, name: &str, mode: FileMode) -> Result<FileId> {
        self.check_new_entry(dir, name)?;

        let owner = self.config.owner;
        let id = self.store.insert(|id| Node::new_file(id, owner, mode));
        self.attach(dir, name, id)?;

        debug!(parent = dir, name, id, mode, "created file");
        Ok(id)
    }

    /// Create an empty directory named `name` in `dir`.
    ///
    /// The child's "." entry and the parent's gained ".." reference each
    /// add one link.
    pub fn create_directory(&mut self, dir: FileId, name: &str, mode: FileMode) -> Result<FileId> {
        self.check_new_entry(dir, name)?;

        let owner = self.config.owner;
        let id = self
            .store
            .insert(|id| Node::new_directory(id, owner, mode, Some(dir)));
        self.attach(dir, name, id)?;
        self.node_mut(dir)?.inc_links();

        debug!(parent = dir, name, id, mode, "created directory");
        Ok(id)
    }

    /// Remove the regular-file entry `name` from `dir`.
    ///
    /// The file is destroyed once no entry references it.
    pub fn remove_file(&mut self, dir: FileId, name: &str) -> Result<()> {
        let target = self.entry_for_removal(dir, name)?;
        let kind = self.node(target)?.kind();
        if kind != FileKind::RegularFile {
            return Err(Error::type_mismatch(
                FileKind::RegularFile.as_str(),
                kind.as_str(),
            ));
        }

        self.detach(dir, name, target)
    }

    /// Remove the directory entry `name` from `dir`.
    ///
    /// The directory is destroyed once nothing outside its own subtree names
    /// it: only its "." link and its subdirectories' ".." links remain.
    /// Callers check emptiness first; entries still present when the
    /// directory is destroyed are released along with it.
    pub fn remove_directory(&mut self, dir: FileId, name: &str) -> Result<()> {
        let target = self.entry_for_removal(dir, name)?;
        if self.node(target)?.kind() != FileKind::Directory {
            return Err(Error::not_a_directory(name));
        }

        self.detach(dir, name, target)
    }

    // --- regular-file capability ----------------------------------------

    /// Read from `file` at `offset` into `buf`, returning the bytes copied.
    pub fn read(&self, file: FileId, buf: &mut [u8], offset: u64) -> Result<usize> {
        Ok(self.file(file)?.read(buf, offset))
    }

    /// Write `data` into `file` at `offset`, growing it as needed.
    pub fn write(&mut self, file: FileId, data: &[u8], offset: u64) -> Result<usize> {
        let end = offset.saturating_add(data.len() as u64);
        self.check_size(end)?;

        let node = self.node_mut(file)?;
        let written = node.file_mut()?.buffer_mut().write(data, offset)?;
        node.touch_modified();

        debug!(id = file, offset, len = written, "wrote file");
        Ok(written)
    }

    /// Set the logical size of `file`.
    pub fn truncate(&mut self, file: FileId, size: u64) -> Result<()> {
        self.check_size(size)?;

        let node = self.node_mut(file)?;
        node.file_mut()?.buffer_mut().truncate(size)?;
        node.touch_modified();

        debug!(id = file, size, "truncated file");
        Ok(())
    }

    /// Set access and modification times (epoch seconds) of any object.
    pub fn update_times(&mut self, id: FileId, atime: i64, mtime: i64) -> Result<()> {
        self.node_mut(id)?.set_times(atime, mtime);
        Ok(())
    }

    // --- internals -------------------------------------------------------

    pub(crate) fn node_mut(&mut self, id: FileId) -> Result<&mut Node> {
        self.store
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("#{}", id)))
    }

    fn check_size(&self, size: u64) -> Result<()> {
        if size > self.config.max_file_size {
            return Err(Error::file_too_large(size, self.config.max_file_size));
        }
        Ok(())
    }

    /// Validate that `name` can be added to `dir`.
    pub(crate) fn check_new_entry(&self, dir: FileId, name: &str) -> Result<()> {
        validate_name(name)?;
        if self.dir(dir)?.exists(name) {
            return Err(Error::already_exists(name));
        }
        Ok(())
    }

    /// Insert an entry for `id` into `dir`. Entries are checked beforehand
    /// with [`MemFs::check_new_entry`].
    pub(crate) fn attach(&mut self, dir: FileId, name: &str, id: FileId) -> Result<()> {
        let parent = self.node_mut(dir)?;
        parent
            .as_dir_mut()
            .ok_or_else(|| Error::not_a_directory(format!("#{}", dir)))?
            .insert(name, id)?;
        parent.touch_modified();
        Ok(())
    }

    fn entry_for_removal(&self, dir: FileId, name: &str) -> Result<FileId> {
        if name == "." || name == ".." {
            return Err(Error::invalid_path(name, "cannot remove '.' or '..'"));
        }
        self.dir(dir)?
            .get(name)
            .ok_or_else(|| Error::not_found(name))
    }

    fn detach(&mut self, dir: FileId, name: &str, target: FileId) -> Result<()> {
        let parent = self.node_mut(dir)?;
        if let Some(d) = parent.as_dir_mut() {
            d.erase(name);
        }
        parent.touch_modified();
        self.store.release(target);

        debug!(parent = dir, name, id = target, "removed entry");
        Ok(())
    }
}
