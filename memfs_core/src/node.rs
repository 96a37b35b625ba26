//! File objects: shared metadata plus a directory or regular-file payload.

use crate::buffer::ByteBuffer;
use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identifier assigned by the object store, monotonically increasing.
pub type FileId = u64;

/// Id of the root directory, the first object ever created.
pub const ROOT_ID: FileId = 0;

/// File mode (POSIX permission bits).
pub type FileMode = u32;

/// POSIX file type bits and common modes.
pub mod file_modes {
    use super::FileMode;

    /// Mask selecting permission, setuid/setgid and sticky bits.
    pub const PERMISSION_MASK: FileMode = 0o7777;

    /// Directory type bits.
    pub const S_IFDIR: FileMode = 0o040000;

    /// Regular file type bits.
    pub const S_IFREG: FileMode = 0o100000;

    /// Default mode for regular files.
    pub const REGULAR: FileMode = 0o644;

    /// Default mode for directories.
    pub const DIRECTORY: FileMode = 0o755;
}

/// Which capability an object implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    RegularFile,
    Directory,
}

impl FileKind {
    /// Human-readable name, used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::RegularFile => "regular file",
            FileKind::Directory => "directory",
        }
    }

    /// POSIX type bits for this kind.
    pub fn type_bits(&self) -> FileMode {
        match self {
            FileKind::RegularFile => file_modes::S_IFREG,
            FileKind::Directory => file_modes::S_IFDIR,
        }
    }
}

/// Metadata shared by every object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub owner: u32,
    pub mode: FileMode,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
    /// Number of directory entries (including "." and "..") naming this object.
    pub nlink: u64,
}

impl Metadata {
    fn new(owner: u32, mode: FileMode) -> Self {
        let now = now();
        Self {
            owner,
            mode: mode & file_modes::PERMISSION_MASK,
            atime: now,
            mtime: now,
            ctime: now,
            nlink: 1,
        }
    }
}

/// Directory payload: name to id mapping, ordered by name.
///
/// Entries hold ids, never ownership; the object store owns every node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    entries: BTreeMap<String, FileId>,
    parent: Option<FileId>,
}

impl Directory {
    /// Build the payload for directory `id`, seeded with "." and "..".
    fn new(id: FileId, parent: Option<FileId>) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(".".to_string(), id);
        if let Some(parent) = parent {
            entries.insert("..".to_string(), parent);
        }
        Self { entries, parent }
    }

    /// Whether `name` is present.
    pub fn exists(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Look up an entry by exact name.
    pub fn get(&self, name: &str) -> Option<FileId> {
        self.entries.get(name).copied()
    }

    /// All entries, including "." and "..", in name order.
    pub fn entries(&self) -> &BTreeMap<String, FileId> {
        &self.entries
    }

    /// Parent directory id; `None` for the root.
    pub fn parent(&self) -> Option<FileId> {
        self.parent
    }

    /// Number of entries, including "." and "..".
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when only "." and ".." remain.
    pub fn is_empty(&self) -> bool {
        self.entries
            .keys()
            .all(|name| name == "." || name == "..")
    }

    pub(crate) fn insert(&mut self, name: &str, id: FileId) -> Result<()> {
        if self.entries.contains_key(name) {
            return Err(Error::already_exists(name));
        }
        self.entries.insert(name.to_string(), id);
        Ok(())
    }

    pub(crate) fn erase(&mut self, name: &str) -> Option<FileId> {
        self.entries.remove(name)
    }

    pub(crate) fn into_entries(self) -> BTreeMap<String, FileId> {
        self.entries
    }
}

/// Regular file payload: byte content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegularFile {
    data: ByteBuffer,
}

impl RegularFile {
    /// Logical size in bytes.
    pub fn size(&self) -> u64 {
        self.data.size() as u64
    }

    /// Bytes allocated for content.
    pub fn capacity(&self) -> u64 {
        self.data.capacity() as u64
    }

    /// Copy content starting at `offset` into `buf`.
    pub fn read(&self, buf: &mut [u8], offset: u64) -> usize {
        self.data.read(buf, offset)
    }

    /// Whole logical content.
    pub fn contents(&self) -> &[u8] {
        self.data.as_slice()
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut ByteBuffer {
        &mut self.data
    }
}

/// Capability payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    RegularFile(RegularFile),
    Directory(Directory),
}

/// A filesystem object as held by the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: FileId,
    meta: Metadata,
    kind: NodeKind,
}

impl Node {
    /// New regular file with one link.
    pub(crate) fn new_file(id: FileId, owner: u32, mode: FileMode) -> Self {
        Self {
            id,
            meta: Metadata::new(owner, mode),
            kind: NodeKind::RegularFile(RegularFile::default()),
        }
    }

    /// New directory. Its "." entry adds a second link; the caller accounts
    /// for the parent's ".." link.
    pub(crate) fn new_directory(
        id: FileId,
        owner: u32,
        mode: FileMode,
        parent: Option<FileId>,
    ) -> Self {
        let mut meta = Metadata::new(owner, mode);
        meta.nlink += 1;
        Self {
            id,
            meta,
            kind: NodeKind::Directory(Directory::new(id, parent)),
        }
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn metadata(&self) -> &Metadata {
        &self.meta
    }

    pub fn nlink(&self) -> u64 {
        self.meta.nlink
    }

    pub fn kind(&self) -> FileKind {
        match self.kind {
            NodeKind::RegularFile(_) => FileKind::RegularFile,
            NodeKind::Directory(_) => FileKind::Directory,
        }
    }

    pub fn payload(&self) -> &NodeKind {
        &self.kind
    }

    pub fn as_dir(&self) -> Option<&Directory> {
        match &self.kind {
            NodeKind::Directory(dir) => Some(dir),
            NodeKind::RegularFile(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&RegularFile> {
        match &self.kind {
            NodeKind::RegularFile(file) => Some(file),
            NodeKind::Directory(_) => None,
        }
    }

    pub(crate) fn as_dir_mut(&mut self) -> Option<&mut Directory> {
        match &mut self.kind {
            NodeKind::Directory(dir) => Some(dir),
            NodeKind::RegularFile(_) => None,
        }
    }

    /// Mutable file payload, or `TypeMismatch` for a directory.
    pub(crate) fn file_mut(&mut self) -> Result<&mut RegularFile> {
        match &mut self.kind {
            NodeKind::RegularFile(file) => Ok(file),
            NodeKind::Directory(_) => Err(Error::type_mismatch(
                FileKind::RegularFile.as_str(),
                FileKind::Directory.as_str(),
            )),
        }
    }

    /// Link count at or below which the store destroys this object.
    ///
    /// A directory's own "." entry keeps one link alive after its last name
    /// is removed, so directories go at 1 and regular files at 0.
    pub(crate) fn reap_threshold(&self) -> u64 {
        match self.kind {
            NodeKind::RegularFile(_) => 0,
            NodeKind::Directory(_) => 1,
        }
    }

    pub(crate) fn inc_links(&mut self) {
        self.meta.nlink += 1;
        self.meta.ctime = now();
    }

    pub(crate) fn dec_links(&mut self) {
        self.meta.nlink = self.meta.nlink.saturating_sub(1);
        self.meta.ctime = now();
    }

    /// Record a content or entry-set change.
    pub(crate) fn touch_modified(&mut self) {
        let now = now();
        self.meta.mtime = now;
        self.meta.ctime = now;
    }

    pub(crate) fn set_times(&mut self, atime: i64, mtime: i64) {
        self.meta.atime = atime;
        self.meta.mtime = mtime;
        self.meta.ctime = now();
    }

    pub(crate) fn into_kind(self) -> NodeKind {
        self.kind
    }
}

/// Attribute snapshot reported to adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attributes {
    pub id: FileId,
    pub kind: FileKind,
    pub owner: u32,
    /// Permission bits only.
    pub mode: FileMode,
    /// Permission bits tagged with the POSIX type (`st_mode`).
    pub st_mode: FileMode,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
    pub nlink: u64,
    /// Logical size for files, entry count for directories.
    pub size: u64,
    /// Bytes of backing storage.
    pub allocated: u64,
}

impl From<&Node> for Attributes {
    fn from(node: &Node) -> Self {
        let meta = node.metadata();
        let kind = node.kind();
        let (size, allocated) = match node.payload() {
            NodeKind::RegularFile(file) => (file.size(), file.capacity()),
            NodeKind::Directory(dir) => (dir.len() as u64, 0),
        };

        Self {
            id: node.id(),
            kind,
            owner: meta.owner,
            mode: meta.mode,
            st_mode: kind.type_bits() | meta.mode,
            atime: meta.atime,
            mtime: meta.mtime,
            ctime: meta.ctime,
            nlink: meta.nlink,
            size,
            allocated,
        }
    }
}

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    pub name: String,
    pub id: FileId,
    pub kind: FileKind,
}

/// Current time in whole seconds since the Unix epoch.
pub(crate) fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
