//! # memfs Core
//!
//! An in-memory hierarchical filesystem engine.
//!
//! Directories and regular files live in an id-indexed object store that
//! owns every object. Directory entries refer to objects by id, so one file
//! can carry several names (hard links) and is destroyed when its last name
//! goes away. File content sits in a growable, block-aligned byte buffer.
//!
//! The engine speaks in ids and absolute paths and owns no kernel-facing
//! protocol; an adapter (FUSE, a test harness, the `memfs` CLI) translates
//! its results into whatever the outside world expects.
//!
//! ## Features
//!
//! - Absolute POSIX-style path resolution
//! - Hard links with reference-counted lifetime
//! - Byte-range read/write and truncation
//! - Owner, permission bits and access/modify/change times
//!
//! ## Example
//!
//! ```
//! use memfs_core::{FsConfig, MemFs};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut fs = MemFs::new(FsConfig::default());
//!
//! fs.mknod("/a.txt", 0o644)?;
//! fs.write_at("/a.txt", b"hello\0", 0)?;
//! fs.link("/a.txt", "/b.txt")?;
//!
//! let mut buf = [0u8; 6];
//! fs.read_at("/b.txt", &mut buf, 0)?;
//! assert_eq!(&buf, b"hello\0");
//! assert_eq!(fs.getattr("/a.txt")?.nlink, 2);
//! # Ok(())
//! # }
//! ```

mod buffer;
mod config;
mod error;
mod fs;
mod navigate;
mod node;
mod ops;
mod path;
mod store;
mod walk;

pub use buffer::{BLOCK_SIZE, ByteBuffer};
pub use config::FsConfig;
pub use error::{Error, Result};
pub use fs::MemFs;
pub use node::{
    Attributes, DirEntry, Directory, FileId, FileKind, FileMode, Metadata, Node, NodeKind,
    ROOT_ID, RegularFile, file_modes,
};
pub use path::{MAX_NAME_LEN, components, split, validate_name};
pub use store::ObjectStore;
pub use walk::{FsckReport, LinkMismatch, WalkEntry};
