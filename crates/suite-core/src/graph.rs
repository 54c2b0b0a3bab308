//! Directed acyclic graph over named components.
//!
//! Nodes live in a flat name-keyed table; edges are stored as name pairs
//! (dependency adjacency plus its dependent inverse), never as references
//! between live objects. Construction is fail-fast: a component that cannot
//! be added leaves the graph exactly as it was.

use crate::error::GraphError;
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Default)]
struct NodeEntry {
    /// Edges into this node: names this component depends on
    deps: Vec<String>,
    /// Edges out of this node: names depending on this component
    dependents: Vec<String>,
}

/// Dependency graph encoding "must finish before" between named components
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: HashMap<String, NodeEntry>,
    /// Declaration order of the surviving nodes
    order: Vec<String>,
}

impl DependencyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a whole graph from `(name, dependencies)` entries in
    /// declaration order. On error nothing is registered.
    pub fn build(entries: &[(String, Vec<String>)]) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        for (name, deps) in entries {
            graph.add_component(name, deps)?;
        }
        debug!(
            "Built dependency graph: {} components, {} edges",
            graph.len(),
            graph.edge_count()
        );
        Ok(graph)
    }

    /// Register one component and its dependency edges.
    ///
    /// Enforced in order: the name must be new, every dependency must
    /// already be registered (forward references are rejected), and no
    /// edge may close a cycle. The node is inserted before its edges are
    /// checked, so a self-dependency is reported as a cycle rather than
    /// an unknown dependency.
    pub fn add_component(&mut self, name: &str, dependencies: &[String]) -> Result<(), GraphError> {
        if self.nodes.contains_key(name) {
            return Err(GraphError::DuplicateComponent(name.to_string()));
        }

        self.nodes.insert(name.to_string(), NodeEntry::default());
        self.order.push(name.to_string());

        for dep in dependencies {
            if !self.nodes.contains_key(dep) {
                self.drop_node(name);
                return Err(GraphError::UnknownDependency {
                    component: name.to_string(),
                    dependency: dep.clone(),
                });
            }
        }

        let mut added: Vec<&String> = Vec::new();
        for dep in dependencies {
            if added.iter().any(|d| *d == dep) {
                continue;
            }
            // Edge dep -> name closes a cycle iff dep is reachable from name.
            if self.reachable(name, dep) {
                for undone in added {
                    if let Some(entry) = self.nodes.get_mut(undone) {
                        entry.dependents.retain(|n| n != name);
                    }
                }
                self.drop_node(name);
                return Err(GraphError::CycleDetected {
                    from: dep.clone(),
                    to: name.to_string(),
                });
            }
            if let Some(entry) = self.nodes.get_mut(dep) {
                entry.dependents.push(name.to_string());
            }
            if let Some(entry) = self.nodes.get_mut(name) {
                entry.deps.push(dep.clone());
            }
            added.push(dep);
        }
        Ok(())
    }

    /// Remove a node and every edge touching it. Returns false when the
    /// name is not present.
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(entry) = self.nodes.remove(name) else {
            return false;
        };
        for dep in &entry.deps {
            if let Some(d) = self.nodes.get_mut(dep) {
                d.dependents.retain(|n| n != name);
            }
        }
        for child in &entry.dependents {
            if let Some(c) = self.nodes.get_mut(child) {
                c.deps.retain(|n| n != name);
            }
        }
        self.order.retain(|n| n != name);
        true
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node names in declaration order
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.order
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.deps.len()).sum()
    }

    /// Edges into `name`: the components it depends on
    #[must_use]
    pub fn parents_of(&self, name: &str) -> Option<&[String]> {
        self.nodes.get(name).map(|n| n.deps.as_slice())
    }

    /// Edges out of `name`: the components depending on it
    #[must_use]
    pub fn children_of(&self, name: &str) -> Option<&[String]> {
        self.nodes.get(name).map(|n| n.dependents.as_slice())
    }

    /// Full map of every node to its parents
    #[must_use]
    pub fn parents_map(&self) -> HashMap<String, Vec<String>> {
        self.nodes
            .iter()
            .map(|(name, entry)| (name.clone(), entry.deps.clone()))
            .collect()
    }

    /// Nodes with no remaining unsatisfied dependencies, in declaration
    /// order. These form the next executable layer.
    #[must_use]
    pub fn roots(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|name| {
                self.nodes
                    .get(name.as_str())
                    .is_some_and(|n| n.deps.is_empty())
            })
            .cloned()
            .collect()
    }

    /// Depth-first walk along dependent edges; true when `target` can be
    /// reached from `start` (a node always reaches itself).
    fn reachable(&self, start: &str, target: &str) -> bool {
        if start == target {
            return true;
        }
        let mut stack: Vec<&str> = vec![start];
        let mut visited: HashSet<&str> = HashSet::new();
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(entry) = self.nodes.get(current) {
                for child in &entry.dependents {
                    if child == target {
                        return true;
                    }
                    stack.push(child);
                }
            }
        }
        false
    }

    fn drop_node(&mut self, name: &str) {
        self.nodes.remove(name);
        self.order.retain(|n| n != name);
    }
}
