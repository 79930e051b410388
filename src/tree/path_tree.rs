// src/tree/path_tree.rs

//! Hierarchical index mapping relative file paths to their owning
//! [`PatternGroup`].
//!
//! Nodes live in an arena and address each other by index, with the parent
//! stored as a non-owning handle; this avoids owning-reference cycles between
//! parents and children. Child maps are insertion-ordered (`IndexMap`), so a
//! generation pass walks directories in the order they were first seen rather
//! than sorted order.
//!
//! The tree is not internally synchronized. A root's tree is only ever
//! touched from inside that root's exclusive section.

use indexmap::IndexMap;
use thiserror::Error;

use crate::tree::pattern_group::PatternGroup;

/// Index of a [`PatternGroup`] within a root's ordered group list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub usize);

/// Read-only classification of a path within the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Absent,
    Directory,
    File,
}

/// A path operation contradicted the tree invariants: a file used as a
/// directory, a duplicate path with a differing owner, or a rename target
/// that is already occupied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("structural conflict: {0}")]
pub struct StructuralConflict(pub String);

type NodeId = usize;

const ROOT: NodeId = 0;

/// A leaf carries a payload and no children; the root and inner nodes carry
/// children and no payload.
#[derive(Debug, Default)]
struct Node {
    parent: Option<NodeId>,
    name: String,
    payload: Option<GroupId>,
    children: IndexMap<String, NodeId>,
}

#[derive(Debug)]
pub struct PathTree {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    changed: bool,
}

impl Default for PathTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PathTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            free: Vec::new(),
            changed: false,
        }
    }

    /// Whether any structural mutation happened since the last
    /// [`generate`](PathTree::generate) pass.
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Insert a leaf for `path`, creating any missing intermediate
    /// directories, and bind it to `group`.
    ///
    /// Adding the same path with the same group again is a no-op and leaves
    /// the changed flag untouched. Adding it with a different group, or
    /// through an ancestor that is a file, is a [`StructuralConflict`].
    pub fn add_file(&mut self, path: &[String], group: GroupId) -> Result<(), StructuralConflict> {
        let Some((name, dir)) = path.split_last() else {
            return Err(StructuralConflict("cannot add the root as a file".into()));
        };

        let parent = self.ensure_directories(dir)?;

        if self.nodes[parent].payload.is_some() {
            return Err(StructuralConflict(format!(
                "cannot add '{}' as a child of file '{}'",
                join(path),
                self.nodes[parent].name
            )));
        }

        if let Some(&existing) = self.nodes[parent].children.get(name.as_str()) {
            if self.nodes[existing].payload != Some(group) {
                return Err(StructuralConflict(format!(
                    "cannot add '{}' with a different group than the existing entry",
                    join(path)
                )));
            }
            // Idempotent re-add; nothing changed.
            return Ok(());
        }

        let id = self.alloc(Node {
            parent: Some(parent),
            name: name.clone(),
            payload: Some(group),
            children: IndexMap::new(),
        });
        self.nodes[parent].children.insert(name.clone(), id);
        self.changed = true;

        Ok(())
    }

    /// Remove the node at `path` together with its subtree. Absent paths are
    /// a no-op; empty intermediate directories are pruned on the way up.
    pub fn remove_path(&mut self, path: &[String]) {
        if let Some(node) = self.detach(path) {
            self.release_subtree(node);
            self.changed = true;
        }
    }

    /// Move the node at `old_path` (file or directory, subtree included) to
    /// `new_path`.
    ///
    /// An absent `old_path` is ignored: the rename is simply unobservable.
    /// The move fails with [`StructuralConflict`] if an ancestor of
    /// `new_path` is a file or the target name is already taken.
    pub fn rename_path(
        &mut self,
        old_path: &[String],
        new_path: &[String],
    ) -> Result<(), StructuralConflict> {
        let Some(node) = self.detach(old_path) else {
            return Ok(());
        };

        let Some((name, dir)) = new_path.split_last() else {
            self.release_subtree(node);
            return Err(StructuralConflict(format!(
                "cannot move '{}' to the root",
                join(old_path)
            )));
        };

        let parent = match self.ensure_directories(dir) {
            Ok(parent) => parent,
            Err(err) => {
                self.release_subtree(node);
                return Err(err);
            }
        };

        if self.nodes[parent].payload.is_some() {
            let parent_name = self.nodes[parent].name.clone();
            self.release_subtree(node);
            return Err(StructuralConflict(format!(
                "cannot move '{}' to '{}' as a child of file '{}'",
                join(old_path),
                join(new_path),
                parent_name
            )));
        }

        if self.nodes[parent].children.contains_key(name.as_str()) {
            self.release_subtree(node);
            return Err(StructuralConflict(format!(
                "cannot move '{}' to '{}' because the target path exists",
                join(old_path),
                join(new_path)
            )));
        }

        self.nodes[node].name = name.clone();
        self.nodes[node].parent = Some(parent);
        self.nodes[parent].children.insert(name.clone(), node);
        self.changed = true;

        Ok(())
    }

    /// Classify `path` without mutating the tree.
    pub fn node_type(&self, path: &[String]) -> NodeType {
        match self.lookup(path) {
            None => NodeType::Absent,
            Some(id) if self.nodes[id].payload.is_some() => NodeType::File,
            Some(_) => NodeType::Directory,
        }
    }

    /// Produce the full generated text for this tree.
    ///
    /// Resets every group, walks the tree depth-first in child insertion
    /// order feeding each leaf's slash-joined relative path to its owning
    /// group, then concatenates the group blocks in the caller-supplied
    /// order. Clears the changed flag.
    pub fn generate(&mut self, groups: &mut [PatternGroup]) -> String {
        self.changed = false;

        for group in groups.iter_mut() {
            group.begin();
        }

        for &child in self.nodes[ROOT].children.values() {
            self.walk(child, "", groups);
        }

        let mut out = String::new();
        for group in groups.iter_mut() {
            group.finish(&mut out);
        }
        out
    }

    fn walk(&self, node: NodeId, parent_path: &str, groups: &mut [PatternGroup]) {
        let n = &self.nodes[node];

        if let Some(GroupId(group)) = n.payload {
            groups[group].add_path(&format!("{parent_path}{}", n.name));
            return;
        }

        let prefix = format!("{parent_path}{}/", n.name);
        for &child in n.children.values() {
            self.walk(child, &prefix, groups);
        }
    }

    fn lookup(&self, path: &[String]) -> Option<NodeId> {
        let mut current = ROOT;
        for part in path {
            current = *self.nodes[current].children.get(part.as_str())?;
        }
        Some(current)
    }

    /// Walk `path` creating missing directory nodes, and return the final
    /// node. Traversing through a file is a [`StructuralConflict`].
    fn ensure_directories(&mut self, path: &[String]) -> Result<NodeId, StructuralConflict> {
        let mut current = ROOT;
        for part in path {
            if self.nodes[current].payload.is_some() {
                return Err(StructuralConflict(format!(
                    "cannot use file '{}' as a directory",
                    self.nodes[current].name
                )));
            }

            let next = self.nodes[current].children.get(part.as_str()).copied();
            current = match next {
                Some(id) => id,
                None => {
                    let id = self.alloc(Node {
                        parent: Some(current),
                        name: part.clone(),
                        payload: None,
                        children: IndexMap::new(),
                    });
                    self.nodes[current].children.insert(part.clone(), id);
                    id
                }
            };
        }
        Ok(current)
    }

    /// Unlink the node at `path` from the tree and return it with its parent
    /// cleared.
    ///
    /// Ancestor directories left childless by the unlink are pruned, walking
    /// upward until the first ancestor that keeps at least one other child,
    /// or until the root; the root itself is never pruned.
    fn detach(&mut self, path: &[String]) -> Option<NodeId> {
        let target = self.lookup(path)?;
        if target == ROOT {
            return None;
        }

        let mut current = target;
        loop {
            let parent = self.nodes[current]
                .parent
                .expect("non-root node has a parent");
            if parent == ROOT || self.nodes[parent].children.len() > 1 {
                let name = self.nodes[current].name.clone();
                self.nodes[parent].children.shift_remove(name.as_str());
                break;
            }
            current = parent;
        }

        // Release the pruned chain of single-child directories above the
        // target; the target itself stays allocated for the caller.
        while current != target {
            let next = *self.nodes[current]
                .children
                .values()
                .next()
                .expect("pruned directory still holds its single child");
            self.release(current);
            current = next;
        }

        self.nodes[target].parent = None;
        Some(target)
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        self.nodes[id] = Node::default();
        self.free.push(id);
    }

    fn release_subtree(&mut self, id: NodeId) {
        let children: Vec<NodeId> = self.nodes[id].children.values().copied().collect();
        for child in children {
            self.release_subtree(child);
        }
        self.release(id);
    }
}

fn join(path: &[String]) -> String {
    path.join("/")
}
