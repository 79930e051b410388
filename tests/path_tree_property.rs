//! Property test replaying random add/remove/rename sequences against a
//! reference set-of-paths model and comparing classification afterwards.

use std::collections::HashMap;

use proptest::prelude::*;

use cmakewatch::tree::{GroupId, NodeType, PathTree};

/// Reference model: a flat map of file paths to group indices. Directories
/// exist implicitly as proper prefixes of files, which mirrors the tree's
/// invariant that every inner node has at least one file below it.
#[derive(Debug, Default, Clone)]
struct ModelIndex {
    files: HashMap<Vec<String>, usize>,
}

impl ModelIndex {
    fn classify(&self, path: &[String]) -> NodeType {
        if self.files.contains_key(path) {
            return NodeType::File;
        }
        if path.is_empty() {
            return NodeType::Directory;
        }
        if self
            .files
            .keys()
            .any(|f| f.len() > path.len() && f.starts_with(path))
        {
            return NodeType::Directory;
        }
        NodeType::Absent
    }

    fn add(&mut self, path: &[String], group: usize) -> Result<(), ()> {
        for cut in 1..path.len() {
            if self.files.contains_key(&path[..cut]) {
                return Err(());
            }
        }
        match self.classify(path) {
            NodeType::File => {
                if self.files[path] == group {
                    Ok(())
                } else {
                    Err(())
                }
            }
            NodeType::Directory => Err(()),
            NodeType::Absent => {
                self.files.insert(path.to_vec(), group);
                Ok(())
            }
        }
    }

    fn remove(&mut self, path: &[String]) {
        if path.is_empty() {
            return;
        }
        self.files
            .retain(|f, _| !(f.as_slice() == path || (f.len() > path.len() && f.starts_with(path))));
    }

    /// Mirrors the tree's rename: the old subtree is detached first, then
    /// conflicts against what remains make the moved entries vanish (the
    /// engine rebuilds from a rescan after any conflict anyway).
    fn rename(&mut self, old: &[String], new: &[String]) -> Result<(), ()> {
        if old.is_empty() || self.classify(old) == NodeType::Absent {
            return Ok(());
        }

        let moved: Vec<(Vec<String>, usize)> = self
            .files
            .iter()
            .filter(|(f, _)| f.as_slice() == old || (f.len() > old.len() && f.starts_with(old)))
            .map(|(f, g)| (f.clone(), *g))
            .collect();
        self.remove(old);

        if new.is_empty() {
            return Err(());
        }
        for cut in 1..new.len() {
            if self.files.contains_key(&new[..cut]) {
                return Err(());
            }
        }
        if self.classify(new) != NodeType::Absent {
            return Err(());
        }

        for (path, group) in moved {
            let mut target = new.to_vec();
            target.extend_from_slice(&path[old.len()..]);
            self.files.insert(target, group);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Op {
    Add(Vec<String>, usize),
    Remove(Vec<String>),
    Rename(Vec<String>, Vec<String>),
}

fn segment() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c"]).prop_map(String::from)
}

fn path() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(segment(), 1..=3)
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (path(), 0..3usize).prop_map(|(p, g)| Op::Add(p, g)),
        path().prop_map(Op::Remove),
        (path(), path()).prop_map(|(o, n)| Op::Rename(o, n)),
    ]
}

/// Every path over the segment alphabet up to the given depth.
fn all_paths(depth: usize) -> Vec<Vec<String>> {
    let mut paths: Vec<Vec<String>> = vec![Vec::new()];
    let mut result = Vec::new();
    for _ in 0..depth {
        let mut next = Vec::new();
        for prefix in &paths {
            for seg in ["a", "b", "c"] {
                let mut p = prefix.clone();
                p.push(seg.to_string());
                next.push(p);
            }
        }
        result.extend(next.iter().cloned());
        paths = next;
    }
    result
}

proptest! {
    #[test]
    fn classification_matches_reference_model(ops in prop::collection::vec(op(), 1..40)) {
        let mut tree = PathTree::new();
        let mut model = ModelIndex::default();

        for op in &ops {
            match op {
                Op::Add(path, group) => {
                    let tree_ok = tree.add_file(path, GroupId(*group)).is_ok();
                    let model_ok = model.add(path, *group).is_ok();
                    prop_assert_eq!(tree_ok, model_ok, "add {:?} disagreed", path);
                }
                Op::Remove(path) => {
                    tree.remove_path(path);
                    model.remove(path);
                }
                Op::Rename(old, new) => {
                    let tree_ok = tree.rename_path(old, new).is_ok();
                    let model_ok = model.rename(old, new).is_ok();
                    prop_assert_eq!(tree_ok, model_ok, "rename {:?} -> {:?} disagreed", old, new);
                }
            }
        }

        // Renames can push paths deeper than the generated ones; probing to
        // twice the generator depth catches everything reachable.
        for probe in all_paths(6) {
            prop_assert_eq!(
                tree.node_type(&probe),
                model.classify(&probe),
                "classification of {:?} disagreed",
                probe
            );
        }
    }
}
