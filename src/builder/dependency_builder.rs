//! Picks a build strategy for each resolved dependency node and applies
//! an incremental-skip gate before invoking it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::core::dependency::{DependencyMetadata, ResolvedGraph, ResolvedNode};
use crate::core::source::BuildProfile;
use crate::error::{BuildError, FlappyError, IoError};
use crate::manifest::{Manifest, MANIFEST_NAME};
use crate::toolchain::Family;
use crate::util::fs::{ensure_dir, glob_files};
use crate::util::hash::Fingerprint;
use crate::util::process::ProcessBuilder;

const BUILD_STATE_FILE: &str = ".flappy_build_state";

pub struct DependencyBuildEnv<'a> {
    pub compiler: &'a str,
    pub family: Family,
    pub profile: BuildProfile,
    pub arch: &'a str,
}

/// Build every node in `order` (leaf-first), accumulating each one's
/// `DependencyMetadata` and exposing it to the environment of the nodes
/// that come after it.
pub fn build_all(
    graph: &mut ResolvedGraph,
    order: &[usize],
    env: &DependencyBuildEnv,
) -> Result<(), FlappyError> {
    let mut resolved: HashMap<String, DependencyMetadata> = HashMap::new();

    for &index in order {
        let node = graph.nodes[index].clone();
        let children_metadata: Vec<DependencyMetadata> = node
            .children
            .iter()
            .filter_map(|&child_idx| graph.nodes[child_idx].metadata.clone())
            .collect();
        let metadata = build_one(&node, &resolved, &children_metadata, env)?;
        resolved.insert(node.name.clone(), metadata.clone());
        graph.nodes[index].metadata = Some(metadata);
    }
    Ok(())
}

fn build_one(
    node: &ResolvedNode,
    siblings: &HashMap<String, DependencyMetadata>,
    children_metadata: &[DependencyMetadata],
    env: &DependencyBuildEnv,
) -> Result<DependencyMetadata, FlappyError> {
    let dep_env = injected_env(node, siblings, env);

    if let Some(build_cmd) = node.dependency.build_cmd.as_deref() {
        run_custom_build_cmd(node, build_cmd, &dep_env, env)?;
    } else if node.path.join(MANIFEST_NAME).exists() {
        build_as_subproject(node, children_metadata, env)?;
    } else if has_external_meta_build(&node.path) {
        run_cmake(node, &dep_env, env)?;
    } else {
        crate::util::logging::action("Skipping", format!("{} (headers-only)", node.name));
    }

    compute_metadata(node)
}

/// Strategy 1: a custom `build_cmd`, gated by a hash of
/// `(git_commit, build_cmd, defines)` stored in `.flappy_build_state`.
fn run_custom_build_cmd(
    node: &ResolvedNode,
    build_cmd: &str,
    dep_env: &[(String, String)],
    env: &DependencyBuildEnv,
) -> Result<(), FlappyError> {
    let mut fp = Fingerprint::new();
    fp.update_str(&node.resolved);
    fp.update_str(build_cmd);
    for define in &node.dependency.defines {
        fp.update_str(define);
    }
    let hash = fp.finish();

    let state_path = node.path.join(BUILD_STATE_FILE);
    if std::fs::read_to_string(&state_path)
        .map(|existing| existing.trim() == hash)
        .unwrap_or(false)
    {
        crate::util::logging::action("Skipping", format!("{} (up to date)", node.name));
        return Ok(());
    }

    crate::util::logging::action("Building", &node.name);
    run_shell(build_cmd, &node.path, dep_env, env)?;

    std::fs::write(&state_path, &hash).map_err(|source| {
        FlappyError::Io(IoError::Copy {
            from: state_path.clone(),
            to: state_path.clone(),
            source,
        })
    })?;
    Ok(())
}

/// Strategy 2: the dependency is itself a flappy project. Its own
/// incremental logic (per-file mtime checks) handles re-entrancy, so the
/// recursive build always runs; only its own dependency graph is
/// suppressed, since the parent graph already resolved it.
fn build_as_subproject(
    node: &ResolvedNode,
    children_metadata: &[DependencyMetadata],
    env: &DependencyBuildEnv,
) -> Result<(), FlappyError> {
    let manifest_path = node.path.join(MANIFEST_NAME);
    let manifest = Manifest::load(&manifest_path, env.profile, None)?;
    crate::util::logging::action("Building", format!("{} (subproject)", node.name));
    crate::builder::orchestrator::build(&manifest, children_metadata, env.profile)?;
    Ok(())
}

fn has_external_meta_build(dir: &Path) -> bool {
    dir.join("CMakeLists.txt").exists()
}

/// Strategy 3: drive an external meta-build (CMake) into an isolated
/// per-profile build directory, skipping when a library already exists
/// there.
fn run_cmake(
    node: &ResolvedNode,
    dep_env: &[(String, String)],
    env: &DependencyBuildEnv,
) -> Result<(), FlappyError> {
    let build_dir = node.path.join("build").join(env.profile.as_str());
    ensure_dir(&build_dir)?;

    if library_already_built(&build_dir) {
        crate::util::logging::action("Skipping", format!("{} (already built)", node.name));
        return Ok(());
    }

    crate::util::logging::action("Configuring", &node.name);
    let mut configure = ProcessBuilder::new("cmake")
        .arg("-S")
        .arg(&node.path)
        .arg("-B")
        .arg(&build_dir)
        .arg(format!("-DCMAKE_BUILD_TYPE={}", cmake_build_type(env.profile)))
        .arg(format!("-DCMAKE_CXX_COMPILER={}", env.compiler));
    for (key, value) in dep_env {
        configure = configure.env(key, value);
    }
    configure.exec_and_check()?;

    crate::util::logging::action("Building", &node.name);
    let mut build = ProcessBuilder::new("cmake")
        .arg("--build")
        .arg(&build_dir);
    for (key, value) in dep_env {
        build = build.env(key, value);
    }
    build.exec_and_check()?;
    Ok(())
}

fn cmake_build_type(profile: BuildProfile) -> &'static str {
    match profile {
        BuildProfile::Debug => "Debug",
        BuildProfile::Release => "Release",
    }
}

fn library_already_built(build_dir: &Path) -> bool {
    let patterns = library_globs();
    !glob_files(build_dir, &patterns).is_empty()
}

fn run_shell(
    command: &str,
    cwd: &Path,
    dep_env: &[(String, String)],
    env: &DependencyBuildEnv,
) -> Result<(), BuildError> {
    let mut pb = shell_command(command).cwd(cwd);
    pb = pb.env("CC", env.compiler).env("CXX", env.compiler);
    for (key, value) in dep_env {
        pb = pb.env(key, value);
    }
    pb.exec_and_check()?;
    Ok(())
}

#[cfg(unix)]
fn shell_command(command: &str) -> ProcessBuilder {
    ProcessBuilder::new("sh").args(["-c", command])
}

#[cfg(windows)]
fn shell_command(command: &str) -> ProcessBuilder {
    ProcessBuilder::new("cmd").args(["/C", command])
}

/// Build the environment exposed to a dependency's own build: `CC`/`CXX`,
/// one `FLAPPY_DEP_<NAME>_INCLUDE`/`_LIB` pair per already-resolved
/// sibling, and the toolchain-appropriate search-path variable prepended
/// with those same paths.
fn injected_env(
    node: &ResolvedNode,
    siblings: &HashMap<String, DependencyMetadata>,
    env: &DependencyBuildEnv,
) -> Vec<(String, String)> {
    let mut out = vec![
        ("CC".to_string(), env.compiler.to_string()),
        ("CXX".to_string(), env.compiler.to_string()),
    ];

    let mut include_accum: Vec<String> = Vec::new();
    let mut lib_accum: Vec<String> = Vec::new();

    // Only siblings named in this node's own `extra_dependencies` are
    // exposed — bridging is explicit, not ambient.
    for name in &node.dependency.extra_dependencies {
        let Some(meta) = siblings.get(name) else {
            continue;
        };
        let upper = name.to_uppercase();
        let include_joined = join_paths(&meta.include_dirs);
        let lib_joined = join_paths(&meta.static_lib_paths);
        out.push((format!("FLAPPY_DEP_{upper}_INCLUDE"), include_joined.clone()));
        out.push((format!("FLAPPY_DEP_{upper}_LIB"), lib_joined.clone()));
        include_accum.extend(meta.include_dirs.iter().map(|p| p.display().to_string()));
        lib_accum.extend(meta.static_lib_paths.iter().map(|p| p.display().to_string()));
    }

    if !include_accum.is_empty() || !lib_accum.is_empty() {
        match env.family {
            Family::Msvc => {
                out.push(("INCLUDE".to_string(), prepend(";", &include_accum, "INCLUDE")));
                out.push(("LIB".to_string(), prepend(";", &lib_accum, "LIB")));
            }
            Family::Gcc | Family::Clang => {
                out.push(("CPATH".to_string(), prepend(":", &include_accum, "CPATH")));
                out.push((
                    "LIBRARY_PATH".to_string(),
                    prepend(":", &lib_accum, "LIBRARY_PATH"),
                ));
            }
        }
    }

    out
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn prepend(sep: &str, new_paths: &[String], existing_var: &str) -> String {
    let existing = std::env::var(existing_var).unwrap_or_default();
    if existing.is_empty() {
        new_paths.join(sep)
    } else {
        format!("{}{sep}{existing}", new_paths.join(sep))
    }
}

/// Compute a node's `DependencyMetadata`: explicit manifest fields verbatim
/// when present, else standard-location discovery.
fn compute_metadata(node: &ResolvedNode) -> Result<DependencyMetadata, FlappyError> {
    let dep = &node.dependency;

    let include_dirs = match &dep.include_dirs {
        Some(dirs) => dirs.iter().map(|d| node.path.join(d)).collect(),
        None => discover_include_dirs(&node.path),
    };

    let static_lib_paths = match (&dep.lib_dirs, &dep.libs) {
        (Some(dirs), Some(libs)) => explicit_libs(&node.path, dirs, libs),
        _ => discover_static_libs(&node.path),
    };

    let runtime_lib_paths = discover_runtime_libs(&node.path);

    Ok(DependencyMetadata {
        include_dirs,
        static_lib_paths,
        runtime_lib_paths,
        resolved: node.resolved.clone(),
    })
}

fn explicit_libs(base: &Path, dirs: &[PathBuf], libs: &[String]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for dir in dirs {
        let dir = base.join(dir);
        for lib in libs {
            out.push(dir.join(lib));
        }
    }
    out
}

fn discover_include_dirs(base: &Path) -> Vec<PathBuf> {
    for candidate in [base.join("dist").join("include"), base.join("include")] {
        if candidate.is_dir() {
            return vec![candidate];
        }
    }
    Vec::new()
}

fn discover_static_libs(base: &Path) -> Vec<PathBuf> {
    let dist_lib = base.join("dist").join("lib");
    if dist_lib.is_dir() {
        return glob_files(&dist_lib, &["*".to_string()]);
    }
    glob_files(base, &static_lib_globs())
}

fn discover_runtime_libs(base: &Path) -> Vec<PathBuf> {
    glob_files(base, &runtime_lib_globs())
}

fn static_lib_globs() -> Vec<String> {
    if cfg!(target_os = "windows") {
        vec!["**/*.lib".to_string()]
    } else {
        vec!["**/*.a".to_string(), "**/*.so".to_string(), "**/*.dylib".to_string()]
    }
}

fn runtime_lib_globs() -> Vec<String> {
    vec![
        "**/*.dll".to_string(),
        "**/*.so".to_string(),
        "**/*.dylib".to_string(),
    ]
}

fn library_globs() -> Vec<String> {
    if cfg!(target_os = "windows") {
        vec!["*.lib".to_string()]
    } else {
        vec!["*.a".to_string(), "*.so".to_string(), "*.dylib".to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dependency::Dependency;
    use crate::core::source::Source;
    use tempfile::TempDir;

    fn node_with(build_cmd: Option<&str>, path: &Path) -> ResolvedNode {
        ResolvedNode {
            name: "dep".to_string(),
            dependency: Dependency {
                name: "dep".to_string(),
                source: Source::Local { path: path.to_path_buf() },
                defines: vec![],
                build_cmd: build_cmd.map(str::to_string),
                include_dirs: None,
                lib_dirs: None,
                libs: None,
                extra_dependencies: vec![],
            },
            path: path.to_path_buf(),
            children: vec![],
            resolved: "local".to_string(),
            metadata: None,
        }
    }

    #[test]
    fn second_run_of_an_unchanged_build_cmd_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let marker = tmp.path().join("ran");
        let cmd = format!("touch {}", marker.display());
        let node = node_with(Some(&cmd), tmp.path());
        let env = DependencyBuildEnv {
            compiler: "g++",
            family: Family::Gcc,
            profile: BuildProfile::Debug,
            arch: "x64",
        };

        run_custom_build_cmd(&node, &cmd, &[], &env).unwrap();
        assert!(marker.exists());
        std::fs::remove_file(&marker).unwrap();

        run_custom_build_cmd(&node, &cmd, &[], &env).unwrap();
        assert!(!marker.exists(), "unchanged build_cmd must be skipped");
    }

    #[test]
    fn discover_include_dirs_prefers_dist_include() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("dist").join("include")).unwrap();
        std::fs::create_dir_all(tmp.path().join("include")).unwrap();
        let dirs = discover_include_dirs(tmp.path());
        assert_eq!(dirs, vec![tmp.path().join("dist").join("include")]);
    }

    #[test]
    fn injected_env_exposes_only_bridged_siblings() {
        let tmp = TempDir::new().unwrap();
        let mut node = node_with(None, tmp.path());
        node.dependency.extra_dependencies = vec!["openssl".to_string()];

        let mut siblings = HashMap::new();
        siblings.insert(
            "openssl".to_string(),
            DependencyMetadata {
                include_dirs: vec![PathBuf::from("/opt/openssl/include")],
                static_lib_paths: vec![PathBuf::from("/opt/openssl/lib/libssl.a")],
                runtime_lib_paths: vec![],
                resolved: "local".to_string(),
            },
        );
        siblings.insert(
            "unrelated".to_string(),
            DependencyMetadata {
                include_dirs: vec![PathBuf::from("/opt/unrelated/include")],
                static_lib_paths: vec![],
                runtime_lib_paths: vec![],
                resolved: "local".to_string(),
            },
        );

        let env = DependencyBuildEnv {
            compiler: "g++",
            family: Family::Gcc,
            profile: BuildProfile::Debug,
            arch: "x64",
        };
        let vars = injected_env(&node, &siblings, &env);
        assert!(vars
            .iter()
            .any(|(k, v)| k == "FLAPPY_DEP_OPENSSL_INCLUDE" && v.contains("openssl")));
        assert!(!vars.iter().any(|(k, _)| k == "FLAPPY_DEP_UNRELATED_INCLUDE"));
    }
}
