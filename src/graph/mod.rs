//! Walks the transitive dependency graph in topological order, fetching
//! each node and detecting cycles and version conflicts.
//!
//! Nodes live in an arena (`ResolvedGraph::nodes`) indexed by name
//! (`ResolvedGraph::by_name`) rather than behind owned parent/child
//! pointers, because diamond dependencies are legal whenever `source`
//! matches and must share one on-disk entry.

use std::collections::HashSet;
use std::path::Path;

use crate::core::dependency::{Dependency, ResolvedGraph, ResolvedNode};
use crate::core::source::BuildProfile;
use crate::error::{FlappyError, GraphError};
use crate::manifest::{Manifest, MANIFEST_NAME};
use crate::sources;

pub struct ResolveContext<'a> {
    pub cache_root: &'a Path,
    pub profile: BuildProfile,
    pub arch: &'a str,
    pub compiler: &'a str,
}

struct Resolver<'a> {
    ctx: ResolveContext<'a>,
    graph: ResolvedGraph,
    ancestors: Vec<String>,
}

/// Resolve `roots` (the manifest's top-level `[dependencies]`) into a
/// fully-populated arena in topological (leaf-first) order.
pub fn resolve(roots: &[Dependency], ctx: ResolveContext) -> Result<ResolvedGraph, FlappyError> {
    let mut resolver = Resolver {
        ctx,
        graph: ResolvedGraph::new(),
        ancestors: Vec::new(),
    };
    resolver.resolve_scope(roots)?;
    Ok(resolver.graph)
}

impl<'a> Resolver<'a> {
    fn resolve_scope(&mut self, scope: &[Dependency]) -> Result<(), FlappyError> {
        for dep in scope {
            self.resolve_one(dep, scope)?;
        }
        Ok(())
    }

    fn resolve_one(&mut self, dep: &Dependency, scope: &[Dependency]) -> Result<(), FlappyError> {
        if let Some(existing) = self.graph.get(&dep.name) {
            if existing.dependency.source.conflicts_with(&dep.source) {
                return Err(GraphError::Conflict {
                    name: dep.name.clone(),
                    a: existing.dependency.source.clone(),
                    b: dep.source.clone(),
                }
                .into());
            }
            return Ok(());
        }

        if self.ancestors.contains(&dep.name) {
            let mut path = self.ancestors.clone();
            path.push(dep.name.clone());
            return Err(GraphError::Cycle {
                path: path.join(" -> "),
            }
            .into());
        }

        self.ancestors.push(dep.name.clone());

        let fetched = sources::fetch(
            self.ctx.cache_root,
            &dep.name,
            &dep.source,
            self.ctx.profile,
            self.ctx.arch,
            self.ctx.compiler,
        )?;

        let native_sub_deps = read_sub_manifest_dependencies(&fetched.dir, self.ctx.profile);

        let bridged: Vec<Dependency> = dep
            .extra_dependencies
            .iter()
            .filter_map(|name| scope.iter().find(|d| &d.name == name).cloned())
            .collect();

        let mut children_scope: Vec<Dependency> = native_sub_deps;
        let mut seen: HashSet<String> = children_scope.iter().map(|d| d.name.clone()).collect();
        for b in bridged {
            if seen.insert(b.name.clone()) {
                children_scope.push(b);
            }
        }

        self.resolve_scope(&children_scope)?;

        let children = children_scope
            .iter()
            .filter_map(|d| self.graph.by_name.get(&d.name).copied())
            .collect();

        self.ancestors.pop();

        let node = ResolvedNode {
            name: dep.name.clone(),
            dependency: dep.clone(),
            path: fetched.dir,
            children,
            resolved: fetched.resolved,
            metadata: None,
        };
        let index = self.graph.nodes.len();
        self.graph.nodes.push(node);
        self.graph.by_name.insert(dep.name.clone(), index);

        Ok(())
    }
}

/// Read a fetched dependency's own manifest (if it has one), for
/// recursion into its native sub-dependencies. A dependency without a
/// manifest (a raw third-party library) simply has no native children.
fn read_sub_manifest_dependencies(dir: &Path, profile: BuildProfile) -> Vec<Dependency> {
    let manifest_path = dir.join(MANIFEST_NAME);
    if !manifest_path.exists() {
        return Vec::new();
    }
    match Manifest::load(&manifest_path, profile, None) {
        Ok(manifest) => manifest.dependencies,
        Err(err) => {
            crate::util::logging::warn(
                "Skipping",
                format!("malformed sub-manifest at {}: {err}", manifest_path.display()),
            );
            Vec::new()
        }
    }
}

/// Leaf-first build order. Arena insertion order is already topological
/// because a node is only pushed once every child it depends on has been
/// pushed (see `resolve_one`).
pub fn topological_order(graph: &ResolvedGraph) -> Vec<usize> {
    (0..graph.nodes.len()).collect()
}
