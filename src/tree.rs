//! Tree lookups
//!
//! Two depth conventions live side by side here and must stay separate:
//! [`build_depth_map`] counts the root as depth 0, while
//! [`find_optimal_path_length`] counts the root as path node 1. The
//! directness and lostness formulas are calibrated against the latter.

use crate::types::TreeNode;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Result of searching the tree for a node id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathLookup<T> {
    Found(T),
    NotFound,
}

impl<T> PathLookup<T> {
    /// Convert into an `Option`
    pub fn found(self) -> Option<T> {
        match self {
            PathLookup::Found(value) => Some(value),
            PathLookup::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, PathLookup::Found(_))
    }

    /// Return the found value or `default`
    pub fn unwrap_or(self, default: T) -> T {
        self.found().unwrap_or(default)
    }
}

/// Map every node id to its depth, root = 0.
///
/// Duplicate ids keep the depth of the last occurrence in pre-order.
pub fn build_depth_map(root: &TreeNode) -> HashMap<String, usize> {
    let mut depths = HashMap::new();
    visit_preorder(root, 0, &mut |node, depth| {
        depths.insert(node.id.clone(), depth);
    });
    depths
}

/// Number of nodes on the path from the root to `target_id`, root = 1.
///
/// Returns the first pre-order match.
pub fn find_optimal_path_length(root: &TreeNode, target_id: &str) -> PathLookup<usize> {
    fn search(node: &TreeNode, target_id: &str, depth: usize) -> Option<usize> {
        if node.id == target_id {
            return Some(depth);
        }
        node.children
            .iter()
            .find_map(|child| search(child, target_id, depth + 1))
    }

    match search(root, target_id, 1) {
        Some(length) => PathLookup::Found(length),
        None => PathLookup::NotFound,
    }
}

/// Label of the first pre-order node with id `target_id`
pub fn find_node_label<'a>(root: &'a TreeNode, target_id: &str) -> PathLookup<&'a str> {
    fn search<'a>(node: &'a TreeNode, target_id: &str) -> Option<&'a str> {
        if node.id == target_id {
            return Some(node.label.as_str());
        }
        node.children
            .iter()
            .find_map(|child| search(child, target_id))
    }

    match search(root, target_id) {
        Some(label) => PathLookup::Found(label),
        None => PathLookup::NotFound,
    }
}

/// Shortest optimal path length over all acceptable target nodes.
///
/// Unresolvable ids count as infinitely far away. Falls back to 1 when no id
/// resolves or the minimum comes out as 0; neither happens with valid data.
pub fn task_optimal_path_length(root: &TreeNode, expected_node_ids: &[String]) -> usize {
    let shortest = expected_node_ids
        .iter()
        .filter_map(|id| find_optimal_path_length(root, id).found())
        .min();

    match shortest {
        Some(0) | None => 1,
        Some(length) => length,
    }
}

/// Borrowed view over a tree answering path and label queries
#[derive(Debug, Clone, Copy)]
pub struct PathFinder<'a> {
    root: &'a TreeNode,
}

impl<'a> PathFinder<'a> {
    pub fn new(root: &'a TreeNode) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &'a TreeNode {
        self.root
    }

    pub fn optimal_path_length(&self, node_id: &str) -> PathLookup<usize> {
        find_optimal_path_length(self.root, node_id)
    }

    pub fn task_optimal_path_length(&self, expected_node_ids: &[String]) -> usize {
        task_optimal_path_length(self.root, expected_node_ids)
    }

    /// Label of `node_id`, or the id itself when it is not in the tree
    pub fn label_or_id<'b>(&self, node_id: &'b str) -> &'b str
    where
        'a: 'b,
    {
        find_node_label(self.root, node_id).unwrap_or(node_id)
    }

    /// Resolved labels of `node_ids` joined by ", "
    pub fn joined_labels(&self, node_ids: &[String]) -> String {
        node_ids
            .iter()
            .map(|id| self.label_or_id(id))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Summary statistics of a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    pub node_count: usize,
    /// Deepest node, root = 0
    pub max_depth: usize,
}

/// Lookup tables built once per study
#[derive(Debug, Clone, Default)]
pub struct TreeIndex {
    depths: HashMap<String, usize>,
    labels: HashMap<String, String>,
    duplicate_ids: Vec<String>,
    node_count: usize,
    max_depth: usize,
}

impl TreeIndex {
    /// Index the tree in one pre-order pass. Duplicate ids: last one wins.
    pub fn build(root: &TreeNode) -> Self {
        let mut index = Self::default();
        let mut seen = HashSet::new();

        visit_preorder(root, 0, &mut |node, depth| {
            index.node_count += 1;
            index.max_depth = index.max_depth.max(depth);
            if !seen.insert(node.id.clone()) && !index.duplicate_ids.contains(&node.id) {
                index.duplicate_ids.push(node.id.clone());
            }
            index.depths.insert(node.id.clone(), depth);
            index.labels.insert(node.id.clone(), node.label.clone());
        });

        index
    }

    /// Depth of `node_id`, root = 0
    pub fn depth(&self, node_id: &str) -> Option<usize> {
        self.depths.get(node_id).copied()
    }

    pub fn label(&self, node_id: &str) -> Option<&str> {
        self.labels.get(node_id).map(String::as_str)
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.depths.contains_key(node_id)
    }

    pub fn depths(&self) -> &HashMap<String, usize> {
        &self.depths
    }

    /// Ids that occur more than once, in first-seen order
    pub fn duplicate_ids(&self) -> &[String] {
        &self.duplicate_ids
    }

    pub fn stats(&self) -> TreeStats {
        TreeStats {
            node_count: self.node_count,
            max_depth: self.max_depth,
        }
    }
}

fn visit_preorder<F>(node: &TreeNode, depth: usize, visit: &mut F)
where
    F: FnMut(&TreeNode, usize),
{
    visit(node, depth);
    for child in &node.children {
        visit_preorder(child, depth + 1, visit);
    }
}
