//! Path resolution and hard-link creation.

use crate::error::{Error, Result};
use crate::fs::MemFs;
use crate::node::{FileId, FileKind};
use crate::path::{components, split};
use tracing::{debug, trace};

impl MemFs {
    /// Resolve an absolute path to an object id.
    ///
    /// Walks from the root one component at a time; every intermediate
    /// object must be a directory. Repeated slashes collapse. A trailing
    /// slash is accepted only when the final object is a directory.
    pub fn resolve(&self, path: &str) -> Result<FileId> {
        let mut current = self.root();

        for component in components(path)? {
            let dir = self
                .node(current)?
                .as_dir()
                .ok_or_else(|| Error::not_a_directory(path))?;
            current = dir.get(component).ok_or_else(|| Error::not_found(path))?;
            trace!(component, id = current, "resolved component");
        }

        let trailing_slash = path.len() > 1 && path.ends_with('/');
        if trailing_slash && self.node(current)?.kind() != FileKind::Directory {
            return Err(Error::not_a_directory(path));
        }

        Ok(current)
    }

    /// Resolve a path that must name a directory.
    pub fn resolve_dir(&self, path: &str) -> Result<FileId> {
        let id = self.resolve(path)?;
        match self.node(id)?.kind() {
            FileKind::Directory => Ok(id),
            FileKind::RegularFile => Err(Error::not_a_directory(path)),
        }
    }

    /// Resolve a path that must name a regular file.
    pub fn resolve_file(&self, path: &str) -> Result<FileId> {
        let id = self.resolve(path)?;
        match self.node(id)?.kind() {
            FileKind::RegularFile => Ok(id),
            kind => Err(Error::type_mismatch(
                FileKind::RegularFile.as_str(),
                kind.as_str(),
            )),
        }
    }

    /// Create a new name `to` for the regular file at `from`.
    ///
    /// Both names then address the same object; no content is copied.
    /// Returns the shared object's id.
    pub fn link(&mut self, from: &str, to: &str) -> Result<FileId> {
        let source = self.resolve(from)?;
        let kind = self.node(source)?.kind();
        if kind == FileKind::Directory {
            return Err(Error::type_mismatch(
                FileKind::RegularFile.as_str(),
                kind.as_str(),
            ));
        }

        let (parent, name) = split(to)?;
        let parent = self.resolve_dir(parent)?;
        self.check_new_entry(parent, name)?;

        self.attach(parent, name, source)?;
        let node = self.node_mut(source)?;
        node.inc_links();

        debug!(from, to, id = source, nlink = node.nlink(), "linked");
        Ok(source)
    }
}
