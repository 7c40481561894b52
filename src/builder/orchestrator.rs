//! Discovers sources, compiles them in parallel with per-file
//! incremental skip, links or archives the result, and copies runtime
//! artifacts alongside it.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::builder::compiledb::CompileRecord;
use crate::core::dependency::DependencyMetadata;
use crate::core::source::BuildProfile;
use crate::error::{BuildError, FlappyError};
use crate::manifest::{Language, Manifest, TargetKind};
use crate::toolchain::shim::{filter_banner, CommandTransformer, IdentityTransformer, MsvcShimTransformer};
use crate::toolchain::{self, ArchiveInput, CommandSpec, CompileInput, Family, LinkInput, Toolchain};
use crate::util::fs::{ensure_dir, glob_files, is_up_to_date, mtime, relative_path};
use crate::util::process::ProcessBuilder;

pub struct BuildOutcome {
    pub output: PathBuf,
    pub objects: Vec<PathBuf>,
    pub compiled: Vec<PathBuf>,
    pub linked: bool,
    pub records: Vec<CompileRecord>,
}

/// Build the project's own sources against already-resolved `dependencies`.
pub fn build(
    manifest: &Manifest,
    dependencies: &[DependencyMetadata],
    profile: BuildProfile,
) -> Result<BuildOutcome, FlappyError> {
    let root = &manifest.manifest_dir;
    let toolchain = toolchain::for_compiler(&manifest.build.compiler);
    let transformer = transformer_for(&manifest.build.compiler, &manifest.build.arch)?;
    let obj_dir = root
        .join("obj")
        .join(&manifest.build.arch)
        .join(profile.as_str());

    let include_dirs: Vec<PathBuf> = dependencies
        .iter()
        .flat_map(|d| d.include_dirs.iter().cloned())
        .collect();

    let (modules, impls) = discover_sources(root, manifest.build.language);

    let mut compiled = Vec::new();
    let mut records = Vec::new();
    let mut objects = Vec::new();

    // Interface/module units complete before any implementation unit
    // begins; within each group, compilation fans out in parallel.
    for group in [&modules, &impls] {
        let planned: Vec<(PathBuf, PathBuf)> = group
            .iter()
            .map(|source| {
                let object = object_path(root, &obj_dir, source, toolchain.family());
                (source.clone(), object)
            })
            .collect();

        let outcomes: Vec<Result<(PathBuf, PathBuf, CommandSpec, bool), FlappyError>> = planned
            .par_iter()
            .map(|(source, object)| {
                compile_unit(
                    source,
                    object,
                    manifest,
                    profile,
                    &include_dirs,
                    toolchain.as_ref(),
                    transformer.as_ref(),
                )
            })
            .collect();

        for outcome in outcomes {
            let (source, object, spec, did_compile) = outcome?;
            if did_compile {
                compiled.push(object.clone());
            }
            records.push(CompileRecord {
                directory: root.clone(),
                command: display_invocation(&spec),
                file: source,
            });
            objects.push(object);
        }
    }

    let (output, linked) = link_or_archive(
        manifest,
        &objects,
        dependencies,
        profile,
        toolchain.as_ref(),
        transformer.as_ref(),
    )?;

    copy_runtime_artifacts(&output, dependencies, manifest.build.kind)?;

    Ok(BuildOutcome {
        output,
        objects,
        compiled,
        linked,
        records,
    })
}

/// Build the project's `[test]` target, if declared. When the main
/// artifact is a static library, it is linked into the test binary
/// automatically.
pub fn build_tests(
    manifest: &Manifest,
    dependencies: &[DependencyMetadata],
    profile: BuildProfile,
    main_outcome: &BuildOutcome,
) -> Result<Option<BuildOutcome>, FlappyError> {
    let Some(test) = &manifest.test else {
        return Ok(None);
    };

    let root = &manifest.manifest_dir;
    let toolchain = toolchain::for_compiler(&manifest.build.compiler);
    let transformer = transformer_for(&manifest.build.compiler, &manifest.build.arch)?;
    let obj_dir = root
        .join("obj")
        .join("test")
        .join(&manifest.build.arch)
        .join(profile.as_str());

    let include_dirs: Vec<PathBuf> = dependencies
        .iter()
        .flat_map(|d| d.include_dirs.iter().cloned())
        .collect();

    let sources = glob_files(root, &test.sources);
    let planned: Vec<(PathBuf, PathBuf)> = sources
        .iter()
        .map(|source| {
            let flat_name = source
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| source.clone());
            let ext = if toolchain.family() == Family::Msvc { "obj" } else { "o" };
            let object = obj_dir.join(format!("{}.{ext}", flat_name.display()));
            (source.clone(), object)
        })
        .collect();

    let test_manifest = TestManifestView {
        language: manifest.build.language,
        standard: &manifest.build.standard,
        arch: &manifest.build.arch,
        defines: &test.defines,
        flags: &test.flags,
    };

    let outcomes: Vec<Result<(PathBuf, PathBuf, CommandSpec, bool), FlappyError>> = planned
        .par_iter()
        .map(|(source, object)| {
            compile_test_unit(
                source,
                object,
                &test_manifest,
                profile,
                &include_dirs,
                toolchain.as_ref(),
                transformer.as_ref(),
            )
        })
        .collect();

    let mut compiled = Vec::new();
    let mut records = Vec::new();
    let mut objects = Vec::new();
    for outcome in outcomes {
        let (source, object, spec, did_compile) = outcome?;
        if did_compile {
            compiled.push(object.clone());
        }
        records.push(CompileRecord {
            directory: root.clone(),
            command: display_invocation(&spec),
            file: source,
        });
        objects.push(object);
    }

    if matches!(manifest.build.kind, TargetKind::Static) {
        objects.push(main_outcome.output.clone());
    }

    let lib_dirs: Vec<PathBuf> = dependencies
        .iter()
        .flat_map(|d| {
            d.static_lib_paths
                .iter()
                .filter_map(|p| p.parent().map(Path::to_path_buf))
        })
        .collect();
    let libs = dependency_lib_names(dependencies);

    let output = object_suffixed(&test.output, TargetKind::Exe, toolchain.family());
    ensure_dir(output.parent().unwrap_or(Path::new(".")))?;

    crate::util::logging::action("Linking", output.display());
    let input = LinkInput {
        objects: &objects,
        lib_dirs: &lib_dirs,
        libs: &libs,
        output: &output,
        shared: false,
        profile,
        arch: &manifest.build.arch,
        flags: &test.flags,
    };
    let spec = transformer.transform(toolchain.link(&input));
    run(&spec)?;

    Ok(Some(BuildOutcome {
        output,
        objects,
        compiled,
        linked: true,
        records,
    }))
}

struct TestManifestView<'a> {
    language: Language,
    standard: &'a str,
    arch: &'a str,
    defines: &'a [String],
    flags: &'a [String],
}

fn compile_test_unit(
    source: &Path,
    object: &Path,
    view: &TestManifestView,
    profile: BuildProfile,
    include_dirs: &[PathBuf],
    toolchain: &dyn Toolchain,
    transformer: &dyn CommandTransformer,
) -> Result<(PathBuf, PathBuf, CommandSpec, bool), FlappyError> {
    let up_to_date = is_up_to_date(object, [source.to_path_buf()]);
    let input = CompileInput {
        source,
        object,
        language: view.language,
        standard: view.standard,
        profile,
        arch: view.arch,
        include_dirs,
        defines: view.defines,
        flags: view.flags,
    };
    let spec = transformer.transform(toolchain.compile(&input));

    if up_to_date {
        return Ok((source.to_path_buf(), object.to_path_buf(), spec, false));
    }

    ensure_dir(object.parent().unwrap_or(Path::new(".")))?;
    crate::util::logging::action("Compiling", source.display());
    run(&spec)?;
    Ok((source.to_path_buf(), object.to_path_buf(), spec, true))
}

/// Source discovery: files under `src/` matching the language's
/// extensions, split into (module units, implementation units).
fn discover_sources(root: &Path, language: Language) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut modules = Vec::new();
    let mut impls = Vec::new();
    for ext in language.source_extensions() {
        let pattern = format!("src/**/*.{ext}");
        let files = glob_files(root, &[pattern]);
        if language.is_module_unit(ext) {
            modules.extend(files);
        } else {
            impls.extend(files);
        }
    }
    modules.sort();
    impls.sort();
    (modules, impls)
}

fn object_path(root: &Path, obj_dir: &Path, source: &Path, family: Family) -> PathBuf {
    let rel = relative_path(&root.join("src"), source);
    let ext = if family == Family::Msvc { "obj" } else { "o" };
    obj_dir.join(format!("{}.{ext}", rel.display()))
}

fn compile_unit(
    source: &Path,
    object: &Path,
    manifest: &Manifest,
    profile: BuildProfile,
    include_dirs: &[PathBuf],
    toolchain: &dyn Toolchain,
    transformer: &dyn CommandTransformer,
) -> Result<(PathBuf, PathBuf, CommandSpec, bool), FlappyError> {
    let up_to_date = is_up_to_date(object, [source.to_path_buf()]);
    let input = CompileInput {
        source,
        object,
        language: manifest.build.language,
        standard: &manifest.build.standard,
        profile,
        arch: &manifest.build.arch,
        include_dirs,
        defines: &manifest.build.defines,
        flags: &manifest.build.flags,
    };
    let spec = transformer.transform(toolchain.compile(&input));

    if up_to_date {
        return Ok((source.to_path_buf(), object.to_path_buf(), spec, false));
    }

    ensure_dir(object.parent().unwrap_or(Path::new(".")))?;
    crate::util::logging::action("Compiling", source.display());
    run(&spec)?;
    Ok((source.to_path_buf(), object.to_path_buf(), spec, true))
}

fn link_or_archive(
    manifest: &Manifest,
    objects: &[PathBuf],
    dependencies: &[DependencyMetadata],
    profile: BuildProfile,
    toolchain: &dyn Toolchain,
    transformer: &dyn CommandTransformer,
) -> Result<(PathBuf, bool), FlappyError> {
    let family = toolchain.family();
    let output = object_suffixed(&manifest.build.output, manifest.build.kind, family);
    ensure_dir(output.parent().unwrap_or(Path::new(".")))?;

    // The up-to-date check covers both object files and resolved
    // dependency libraries, so a dependency rebuild forces a relink even
    // when none of this target's own objects changed.
    let latest_input = objects
        .iter()
        .filter_map(|o| mtime(o))
        .chain(
            dependencies
                .iter()
                .flat_map(|d| &d.static_lib_paths)
                .filter_map(|p| mtime(p)),
        )
        .max();
    let up_to_date = match (mtime(&output), latest_input) {
        (Some(out_t), Some(in_t)) => out_t >= in_t,
        (Some(_), None) => true,
        _ => false,
    };
    if up_to_date {
        return Ok((output, false));
    }

    crate::util::logging::action("Linking", output.display());

    let lib_dirs: Vec<PathBuf> = dependencies
        .iter()
        .flat_map(|d| {
            d.static_lib_paths
                .iter()
                .filter_map(|p| p.parent().map(Path::to_path_buf))
        })
        .collect();
    let libs = dependency_lib_names(dependencies);

    let spec = match manifest.build.kind {
        TargetKind::Static => {
            let input = ArchiveInput {
                objects,
                output: &output,
            };
            toolchain.archive(&input)
        }
        TargetKind::Exe | TargetKind::Shared => {
            let input = LinkInput {
                objects,
                lib_dirs: &lib_dirs,
                libs: &libs,
                output: &output,
                shared: matches!(manifest.build.kind, TargetKind::Shared),
                profile,
                arch: &manifest.build.arch,
                flags: &manifest.build.flags,
            };
            toolchain.link(&input)
        }
    };
    let spec = transformer.transform(spec);
    run(&spec)?;
    Ok((output, true))
}

fn dependency_lib_names(dependencies: &[DependencyMetadata]) -> Vec<String> {
    dependencies
        .iter()
        .flat_map(|d| &d.static_lib_paths)
        .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .map(|stem| match stem.strip_prefix("lib") {
            Some(rest) => rest.to_string(),
            None => stem,
        })
        .collect()
}

fn object_suffixed(base: &Path, kind: TargetKind, family: Family) -> PathBuf {
    let suffix: &str = match kind {
        TargetKind::Exe => {
            if cfg!(target_os = "windows") {
                "exe"
            } else {
                ""
            }
        }
        TargetKind::Static => {
            if family == Family::Msvc {
                "lib"
            } else {
                "a"
            }
        }
        TargetKind::Shared => {
            if cfg!(target_os = "windows") {
                "dll"
            } else if cfg!(target_os = "macos") {
                "dylib"
            } else {
                "so"
            }
        }
    };
    if suffix.is_empty() {
        base.to_path_buf()
    } else {
        base.with_extension(suffix)
    }
}

fn copy_runtime_artifacts(
    output: &Path,
    dependencies: &[DependencyMetadata],
    kind: TargetKind,
) -> Result<(), FlappyError> {
    if !matches!(kind, TargetKind::Exe | TargetKind::Shared) {
        return Ok(());
    }
    let out_dir = output.parent().unwrap_or(Path::new("."));
    for dep in dependencies {
        for runtime_lib in &dep.runtime_lib_paths {
            if let Some(name) = runtime_lib.file_name() {
                let dst = out_dir.join(name);
                crate::util::fs::copy_file_if_newer(runtime_lib, &dst)?;
            }
        }
    }
    Ok(())
}

fn transformer_for(
    compiler: &str,
    arch: &str,
) -> Result<Box<dyn CommandTransformer>, FlappyError> {
    match toolchain::classify(compiler) {
        Family::Msvc => Ok(Box::new(MsvcShimTransformer::discover(arch)?)),
        Family::Gcc | Family::Clang => Ok(Box::new(IdentityTransformer)),
    }
}

fn run(spec: &CommandSpec) -> Result<(), BuildError> {
    let mut pb = ProcessBuilder::new(&spec.program).args(&spec.args);
    for (key, value) in &spec.env {
        pb = pb.env(key, value);
    }
    let output = pb.exec_and_check()?;
    let stdout = filter_banner(&String::from_utf8_lossy(&output.stdout));
    if !stdout.is_empty() {
        crate::util::logging::action("Output", stdout);
    }
    Ok(())
}

/// Render a `CommandSpec` as the single-line shell invocation recorded in
/// the compilation database.
pub fn display_invocation(spec: &CommandSpec) -> String {
    let mut parts = vec![spec.program.display().to_string()];
    parts.extend(spec.args.iter().cloned());
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_suffixed_picks_platform_native_extension() {
        let p = object_suffixed(Path::new("bin/hello"), TargetKind::Static, Family::Gcc);
        assert_eq!(p, PathBuf::from("bin/hello.a"));

        let p = object_suffixed(Path::new("bin/hello"), TargetKind::Static, Family::Msvc);
        assert_eq!(p, PathBuf::from("bin/hello.lib"));
    }

    #[test]
    fn object_path_mirrors_relative_source_tree() {
        let root = Path::new("/proj");
        let source = Path::new("/proj/src/utils/math.cpp");
        let obj_dir = Path::new("/proj/obj/x64/debug");
        let object = object_path(root, obj_dir, source, Family::Gcc);
        assert_eq!(
            object,
            PathBuf::from("/proj/obj/x64/debug/utils/math.cpp.o")
        );
    }
}
