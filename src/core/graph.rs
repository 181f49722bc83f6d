//! Dependency graph between declared local libraries
//!
//! Handles discovering internal edges from manifests and computing a
//! processing order. Only edges between declared libraries are kept;
//! registry dependencies never appear in the graph.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::core::manifest::PackageManifest;
use crate::core::project::Project;

/// Unit of scheduling work for one declared library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNode {
    /// Package name
    pub name: String,
    /// Absolute source directory
    pub source_dir: PathBuf,
    /// Other declared libraries this one depends on, in manifest order
    pub depends_on: Vec<String>,
}

impl TaskNode {
    /// Node without edges
    pub fn new(name: impl Into<String>, source_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source_dir: source_dir.into(),
            depends_on: Vec::new(),
        }
    }

    /// Add edges
    #[must_use]
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(deps.into_iter().map(Into::into));
        self
    }
}

/// Build task nodes for every declared dependency of `project`
///
/// A library whose manifest is missing or unreadable gets no edges.
pub fn build_task_nodes(project: &Project) -> Vec<TaskNode> {
    let declared: Vec<(String, PathBuf)> = project
        .dependencies()
        .iter()
        .map(|dep| (dep.name.clone(), project.source_dir(dep)))
        .collect();

    build_nodes_from(&declared, |dir| match PackageManifest::load(dir) {
        Ok(manifest) => manifest,
        Err(e) => {
            tracing::debug!("{e}; assuming no local dependencies");
            None
        }
    })
}

/// Build task nodes from `(name, source_dir)` pairs with a manifest loader
pub fn build_nodes_from<F>(declared: &[(String, PathBuf)], load: F) -> Vec<TaskNode>
where
    F: Fn(&std::path::Path) -> Option<PackageManifest>,
{
    let names: HashSet<&str> = declared.iter().map(|(name, _)| name.as_str()).collect();

    declared
        .iter()
        .map(|(name, dir)| {
            let depends_on = load(dir)
                .map(|manifest| {
                    manifest
                        .combined_dependency_names()
                        .into_iter()
                        .filter(|dep| *dep != name.as_str() && names.contains(dep))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            TaskNode {
                name: name.clone(),
                source_dir: dir.clone(),
                depends_on,
            }
        })
        .collect()
}

/// An edge removed to break a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedEdge {
    /// Dependent
    pub from: String,
    /// Dependency that was already on the traversal stack
    pub to: String,
}

/// Processing order plus the acyclic edge set it was computed from
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    order: Vec<String>,
    edges: HashMap<String, Vec<String>>,
    dropped: Vec<DroppedEdge>,
}

impl ExecutionPlan {
    /// Compute the plan for `nodes`
    ///
    /// Depth-first over declaration order, emitting dependencies before
    /// dependents. An edge back into a node still on the stack closes a
    /// cycle; it is dropped and traversal continues.
    pub fn new(nodes: &[TaskNode]) -> Self {
        let adjacency: HashMap<&str, &[String]> = nodes
            .iter()
            .map(|n| (n.name.as_str(), n.depends_on.as_slice()))
            .collect();

        let mut plan = Self::default();
        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();

        for node in nodes {
            plan.visit(&node.name, &adjacency, &mut visited, &mut on_stack);
        }

        plan
    }

    fn visit<'a>(
        &mut self,
        node: &'a str,
        adjacency: &HashMap<&'a str, &'a [String]>,
        visited: &mut HashSet<&'a str>,
        on_stack: &mut HashSet<&'a str>,
    ) {
        if visited.contains(node) {
            return;
        }
        visited.insert(node);
        on_stack.insert(node);

        let mut kept = Vec::new();
        for dep in adjacency.get(node).copied().unwrap_or_default() {
            let dep = dep.as_str();
            if !adjacency.contains_key(dep) {
                continue;
            }
            if on_stack.contains(dep) {
                tracing::warn!("Circular dependency: ignoring edge {node} -> {dep}");
                self.dropped.push(DroppedEdge {
                    from: node.to_string(),
                    to: dep.to_string(),
                });
                continue;
            }
            self.visit(dep, adjacency, visited, on_stack);
            kept.push(dep.to_string());
        }

        on_stack.remove(node);
        self.edges.insert(node.to_string(), kept);
        self.order.push(node.to_string());
    }

    /// Names in processing order
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Edges that survived cycle breaking
    pub fn dependencies(&self, name: &str) -> &[String] {
        self.edges.get(name).map_or(&[], Vec::as_slice)
    }

    /// Edges removed to break cycles
    pub fn dropped(&self) -> &[DroppedEdge] {
        &self.dropped
    }

    /// Number of tasks
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether there is nothing to do
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Human-readable order and edges
    pub fn format(&self) -> String {
        if self.is_empty() {
            return "No local dependencies declared".to_string();
        }

        let mut output = String::from("Processing order:\n");
        for (i, name) in self.order.iter().enumerate() {
            let deps = self.dependencies(name);
            if deps.is_empty() {
                output.push_str(&format!("  {}. {name}\n", i + 1));
            } else {
                output.push_str(&format!("  {}. {name} (after {})\n", i + 1, deps.join(", ")));
            }
        }
        for edge in &self.dropped {
            output.push_str(&format!(
                "\n⚠ Circular dependency: ignored {} -> {}",
                edge.from, edge.to
            ));
        }
        output
    }
}
