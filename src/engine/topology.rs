//! Topology builder: turns the directed parent -> child edge set into an
//! adjacency structure and validates the forest invariant before any
//! traversal is allowed to run.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// A single directed pipe adjacency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub parent_id: String,
    pub child_id: String,
}

impl Edge {
    pub fn new(parent_id: impl Into<String>, child_id: impl Into<String>) -> Self {
        Self {
            parent_id: parent_id.into(),
            child_id: child_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("sensor '{child}' has multiple parents ('{first}' and '{second}')")]
    MultipleParents {
        child: String,
        first: String,
        second: String,
    },
    #[error("cycle through sensor '{0}'")]
    CycleDetected(String),
}

/// Validated sensor forest. Construction fails on any multi-parent node or
/// cycle, so holders of a `Topology` may traverse without revisit checks
/// beyond a plain visited set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    /// parent -> children, children in ascending id order.
    children: BTreeMap<String, Vec<String>>,
    /// child -> its single parent.
    parents: HashMap<String, String>,
    /// Nodes that appear as a child of no edge, ascending.
    roots: Vec<String>,
}

impl Topology {
    /// Build and validate a topology from the full edge set.
    ///
    /// # Errors
    ///
    /// `MultipleParents` if any node is the child of two edges,
    /// `CycleDetected` if following edges revisits a node. Both are
    /// reported before any traversal so malformed input can never cause
    /// unbounded recursion.
    pub fn from_edges<'a, I>(edges: I) -> Result<Self, TopologyError>
    where
        I: IntoIterator<Item = &'a Edge>,
    {
        let mut children: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut parents: HashMap<String, String> = HashMap::new();

        for edge in edges {
            if edge.parent_id == edge.child_id {
                return Err(TopologyError::CycleDetected(edge.parent_id.clone()));
            }
            if let Some(existing) = parents.get(&edge.child_id) {
                if *existing != edge.parent_id {
                    return Err(TopologyError::MultipleParents {
                        child: edge.child_id.clone(),
                        first: existing.clone(),
                        second: edge.parent_id.clone(),
                    });
                }
                // duplicate edge, ignore
                continue;
            }
            parents.insert(edge.child_id.clone(), edge.parent_id.clone());
            children
                .entry(edge.parent_id.clone())
                .or_default()
                .insert(edge.child_id.clone());
        }

        let nodes: BTreeSet<&String> = children
            .keys()
            .chain(children.values().flatten())
            .collect();

        let roots: Vec<String> = nodes
            .iter()
            .filter(|n| !parents.contains_key(n.as_str()))
            .map(|n| (*n).clone())
            .collect();

        // With at most one parent per node, every node reachable from a
        // root is cycle-free; anything unreachable sits on a rootless loop.
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = roots.iter().map(String::as_str).collect();
        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            if let Some(kids) = children.get(node) {
                stack.extend(kids.iter().map(String::as_str));
            }
        }
        if visited.len() != nodes.len() {
            if let Some(stranded) = nodes.iter().find(|n| !visited.contains(n.as_str())) {
                return Err(TopologyError::CycleDetected(name_cycle_member(
                    stranded.as_str(),
                    &parents,
                )));
            }
        }

        Ok(Self {
            children: children
                .into_iter()
                .map(|(parent, kids)| (parent, kids.into_iter().collect()))
                .collect(),
            parents,
            roots,
        })
    }

    /// Traversal start points, in ascending id order.
    #[must_use]
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Direct children of `id`, in ascending id order.
    #[must_use]
    pub fn children_of(&self, id: &str) -> &[String] {
        self.children.get(id).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.parents.get(id).map(String::as_str)
    }

    /// Root of the sub-tree containing `id`, or `None` if the sensor does
    /// not participate in any edge.
    #[must_use]
    pub fn root_of<'a>(&'a self, id: &'a str) -> Option<&'a str> {
        if !self.contains(id) {
            return None;
        }
        let mut node = id;
        while let Some(parent) = self.parent_of(node) {
            node = parent;
        }
        Some(node)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.parents.contains_key(id) || self.children.contains_key(id)
    }

    /// Number of distinct sensors appearing in the edge set.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.parents.len() + self.roots.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.parents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Walk parent pointers from a stranded node until one repeats; that node
/// is definitely on the cycle (the stranded node itself may only hang off
/// of it).
fn name_cycle_member(start: &str, parents: &HashMap<String, String>) -> String {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut node = start;
    while seen.insert(node) {
        match parents.get(node) {
            Some(parent) => node = parent.as_str(),
            None => break,
        }
    }
    node.to_string()
}
