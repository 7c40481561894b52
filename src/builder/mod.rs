//! Ties the dependency builder, main build orchestrator, and compile-DB
//! generator into one project build: resolve the graph, build every
//! dependency in topological order, build the project's own sources,
//! then write `compile_commands.json`.

pub mod compiledb;
pub mod dependency_builder;
pub mod orchestrator;

use std::path::Path;

use crate::core::dependency::{DependencyMetadata, ResolvedGraph};
use crate::core::source::BuildProfile;
use crate::error::FlappyError;
use crate::graph::{self, ResolveContext};
use crate::manifest::Manifest;
use crate::toolchain;
use crate::util::fs::link_package;
use crate::util::paths::global_cache_root;
use dependency_builder::DependencyBuildEnv;
use orchestrator::BuildOutcome;

pub struct ProjectBuildOutcome {
    pub main: BuildOutcome,
    pub tests: Option<BuildOutcome>,
    pub graph: ResolvedGraph,
}

/// Build the project rooted at `manifest_path`: resolve its dependency
/// graph, build every node in topological order, build the project's own
/// sources, and emit `compile_commands.json`.
pub fn run(
    manifest_path: &Path,
    profile: BuildProfile,
    target_profile: Option<&str>,
    run_tests: bool,
) -> Result<ProjectBuildOutcome, FlappyError> {
    let manifest = Manifest::load(manifest_path, profile, target_profile)?;
    let cache_root = global_cache_root();

    let ctx = ResolveContext {
        cache_root: &cache_root,
        profile,
        arch: &manifest.build.arch,
        compiler: &manifest.build.compiler,
    };
    let mut resolved = graph::resolve(&manifest.dependencies, ctx)?;
    let order = graph::topological_order(&resolved);

    let packages_dir = manifest.manifest_dir.join("packages");
    for &i in &order {
        let node = &resolved.nodes[i];
        if let Err(err) = link_package(&packages_dir, &node.name, &node.path) {
            crate::util::logging::warn("Link", format!("{} -> {}: {err}", node.name, node.path.display()));
        }
    }

    let build_env = DependencyBuildEnv {
        compiler: &manifest.build.compiler,
        family: toolchain::classify(&manifest.build.compiler),
        profile,
        arch: &manifest.build.arch,
    };
    dependency_builder::build_all(&mut resolved, &order, &build_env)?;

    let dep_metadata: Vec<DependencyMetadata> = order
        .iter()
        .filter_map(|&i| resolved.nodes[i].metadata.clone())
        .collect();

    let main = orchestrator::build(&manifest, &dep_metadata, profile)?;

    let tests = if run_tests {
        orchestrator::build_tests(&manifest, &dep_metadata, profile, &main)?
    } else {
        None
    };

    let mut records = main.records.clone();
    if let Some(t) = &tests {
        records.extend(t.records.clone());
    }
    let compiledb_path = manifest.manifest_dir.join("compile_commands.json");
    compiledb::write(&compiledb_path, &records)?;

    Ok(ProjectBuildOutcome {
        main,
        tests,
        graph: resolved,
    })
}
