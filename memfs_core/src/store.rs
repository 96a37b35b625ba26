//! Id-indexed object store owning every filesystem object.

use crate::node::{FileId, FileMode, Node, NodeKind, ROOT_ID};
use std::collections::HashMap;
use tracing::debug;

/// Sole owner of all nodes, keyed by id.
///
/// Directories refer to nodes by id only. Destruction happens in one place,
/// [`ObjectStore::release`], when a node's link count falls to its reap
/// threshold. The root is never destroyed.
#[derive(Debug)]
pub struct ObjectStore {
    next_id: FileId,
    objects: HashMap<FileId, Node>,
}

impl ObjectStore {
    /// Create a store holding only the root directory (id 0).
    pub fn new(owner: u32, root_mode: FileMode) -> Self {
        let mut store = Self {
            next_id: ROOT_ID,
            objects: HashMap::new(),
        };
        store.insert(|id| Node::new_directory(id, owner, root_mode, None));
        store
    }

    /// Id of the root directory.
    pub fn root(&self) -> FileId {
        ROOT_ID
    }

    /// Allocate the next id and store the node `build` constructs for it.
    pub(crate) fn insert(&mut self, build: impl FnOnce(FileId) -> Node) -> FileId {
        let id = self.next_id;
        self.next_id += 1;
        self.objects.insert(id, build(id));
        id
    }

    /// Destroy the node with `id`. Unknown ids and the root are ignored.
    pub(crate) fn remove(&mut self, id: FileId) -> Option<Node> {
        if id == ROOT_ID {
            return None;
        }
        self.objects.remove(&id)
    }

    pub fn get(&self, id: FileId) -> Option<&Node> {
        self.objects.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: FileId) -> Option<&mut Node> {
        self.objects.get_mut(&id)
    }

    pub fn contains(&self, id: FileId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Number of live objects, root included.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Always false: the root lives as long as the store.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterate live objects in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.objects.values()
    }

    /// Drop one directory-entry reference to `id`.
    ///
    /// When the links held from outside the node's own subtree reach its
    /// threshold the node is destroyed. A destroyed directory gives back its
    /// ".." link on the parent and every remaining entry, which may cascade
    /// into further reaping.
    pub(crate) fn release(&mut self, id: FileId) {
        let mut pending = vec![id];

        while let Some(id) = pending.pop() {
            let Some(node) = self.objects.get_mut(&id) else {
                // Parent already reaped earlier in this cascade.
                continue;
            };
            node.dec_links();

            let dead = self
                .objects
                .get(&id)
                .is_some_and(|node| self.external_links(node) <= node.reap_threshold());
            if id == ROOT_ID || !dead {
                continue;
            }

            let Some(node) = self.remove(id) else {
                continue;
            };
            debug!(id, kind = node.kind().as_str(), "reaped object");

            if let NodeKind::Directory(dir) = node.into_kind() {
                pending.extend(
                    dir.into_entries()
                        .into_iter()
                        .filter(|(name, _)| name != ".")
                        .map(|(_, child)| child),
                );
            }
        }
    }

    /// Link count minus the ".." entries of the node's own subdirectories.
    fn external_links(&self, node: &Node) -> u64 {
        let Some(dir) = node.as_dir() else {
            return node.nlink();
        };
        let subdirs = dir
            .entries()
            .iter()
            .filter(|(name, _)| *name != "." && *name != "..")
            .filter(|(_, child)| {
                self.objects
                    .get(*child)
                    .is_some_and(|n| n.as_dir().is_some())
            })
            .count() as u64;
        node.nlink().saturating_sub(subdirs)
    }
}
