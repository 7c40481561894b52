//! Dependency records and the results of resolving them.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::core::source::Source;

/// A single dependency entry after manifest-level override merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub source: Source,
    pub defines: Vec<String>,
    pub build_cmd: Option<String>,
    pub include_dirs: Option<Vec<PathBuf>>,
    pub lib_dirs: Option<Vec<PathBuf>>,
    pub libs: Option<Vec<String>>,
    /// Names of sibling dependencies this one needs bridged into its
    /// build environment.
    pub extra_dependencies: Vec<String>,
}

/// The computed result of resolving and building one dependency node.
#[derive(Debug, Clone)]
pub struct DependencyMetadata {
    pub include_dirs: Vec<PathBuf>,
    pub static_lib_paths: Vec<PathBuf>,
    pub runtime_lib_paths: Vec<PathBuf>,
    /// Git commit SHA, URL hash, or the literal "local".
    pub resolved: String,
}

/// A node in the resolved dependency DAG.
#[derive(Debug, Clone)]
pub struct ResolvedNode {
    pub name: String,
    pub dependency: Dependency,
    pub path: PathBuf,
    pub children: Vec<usize>,
    /// Git commit SHA, URL hash, or the literal "local", as returned by
    /// the fetch that produced `path`.
    pub resolved: String,
    pub metadata: Option<DependencyMetadata>,
}

/// Arena of resolved nodes plus a name index, as recommended for a graph
/// where diamond dependencies legally share children.
#[derive(Debug, Default, Clone)]
pub struct ResolvedGraph {
    pub nodes: Vec<ResolvedNode>,
    pub by_name: HashMap<String, usize>,
}

impl ResolvedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedNode> {
        self.by_name.get(name).map(|&i| &self.nodes[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ResolvedNode> {
        if let Some(&i) = self.by_name.get(name) {
            Some(&mut self.nodes[i])
        } else {
            None
        }
    }
}
