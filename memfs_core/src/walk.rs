//! Tree walking and link-count consistency checking.

use crate::error::Result;
use crate::fs::MemFs;
use crate::node::{Attributes, FileId, ROOT_ID};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One object reached during a walk.
#[derive(Debug, Clone, Serialize)]
pub struct WalkEntry {
    /// Absolute path the object was reached through.
    pub path: String,
    /// Number of components below the walk's starting point.
    pub depth: usize,
    pub attrs: Attributes,
}

/// A node whose stored link count disagrees with the entries naming it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkMismatch {
    pub id: FileId,
    pub expected: u64,
    pub actual: u64,
}

/// Result of [`MemFs::fsck`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FsckReport {
    pub link_mismatches: Vec<LinkMismatch>,
    /// Live objects not reachable from the root.
    pub unreachable: Vec<FileId>,
}

impl FsckReport {
    pub fn is_clean(&self) -> bool {
        self.link_mismatches.is_empty() && self.unreachable.is_empty()
    }
}

impl MemFs {
    /// Depth-first, name-ordered walk starting at `path`.
    ///
    /// The starting object comes first at depth 0. "." and ".." are not
    /// followed. A file with several names appears once per name.
    pub fn walk(&self, path: &str) -> Result<Vec<WalkEntry>> {
        let start = self.resolve(path)?;
        let mut out = Vec::new();
        let mut stack = vec![(start, path.to_string(), 0usize)];

        while let Some((id, path, depth)) = stack.pop() {
            let node = self.node(id)?;
            if let Some(dir) = node.as_dir() {
                // Reverse so the stack pops children in name order.
                for (name, &child) in dir.entries().iter().rev() {
                    if name == "." || name == ".." {
                        continue;
                    }
                    stack.push((child, join(&path, name), depth + 1));
                }
            }
            out.push(WalkEntry {
                path,
                depth,
                attrs: Attributes::from(node),
            });
        }

        Ok(out)
    }

    /// Recount links from directory entries and find unreachable objects.
    ///
    /// The root counts one extra link for its missing ".." entry, matching
    /// the POSIX convention that the root is its own parent.
    pub fn fsck(&self) -> FsckReport {
        let mut expected: HashMap<FileId, u64> = HashMap::new();
        expected.insert(ROOT_ID, 1);
        for node in self.store().iter() {
            if let Some(dir) = node.as_dir() {
                for &target in dir.entries().values() {
                    *expected.entry(target).or_default() += 1;
                }
            }
        }

        let mut link_mismatches: Vec<_> = self
            .store()
            .iter()
            .filter_map(|node| {
                let expected = expected.get(&node.id()).copied().unwrap_or(0);
                (expected != node.nlink()).then(|| LinkMismatch {
                    id: node.id(),
                    expected,
                    actual: node.nlink(),
                })
            })
            .collect();
        link_mismatches.sort_by_key(|m| m.id);

        let reachable = self.mark_reachable();
        let mut unreachable: Vec<_> = self
            .store()
            .iter()
            .map(|node| node.id())
            .filter(|id| !reachable.contains(id))
            .collect();
        unreachable.sort_unstable();

        FsckReport {
            link_mismatches,
            unreachable,
        }
    }

    /// Ids reachable from the root through named entries.
    fn mark_reachable(&self) -> HashSet<FileId> {
        let mut reachable = HashSet::new();
        let mut pending = vec![self.root()];

        while let Some(id) = pending.pop() {
            if !reachable.insert(id) {
                continue;
            }
            if let Some(dir) = self.store().get(id).and_then(|n| n.as_dir()) {
                pending.extend(
                    dir.entries()
                        .iter()
                        .filter(|(name, _)| *name != "." && *name != "..")
                        .map(|(_, &child)| child),
                );
            }
        }

        reachable
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{}{}", parent, name)
    } else {
        format!("{}/{}", parent, name)
    }
}
