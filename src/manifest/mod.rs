//! Parses `flappy.toml` and produces a deterministic effective
//! configuration for the current invocation by merging the base /
//! mode / profile / platform layers of the `[build]` and
//! `[dependencies.*]` tables.

mod merge;
mod types;

pub use types::{Build, Language, Manifest, Package, Platform, TargetKind, Test};

use std::path::{Path, PathBuf};

use toml::Value;

use crate::core::dependency::Dependency;
use crate::core::source::{BuildProfile, Source};
use crate::error::{ConfigError, FlappyError, ManifestError};
use merge::{subtable, BuildFields, DependencyFields};
use types::require_field;

pub const MANIFEST_NAME: &str = "flappy.toml";

impl Manifest {
    /// Load and resolve a manifest from `path`, for the given build mode
    /// and optional custom profile name.
    pub fn load(
        path: &Path,
        mode: BuildProfile,
        profile: Option<&str>,
    ) -> Result<Manifest, FlappyError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let root: toml::Table = toml::from_str(&contents).map_err(|source| ManifestError::Toml {
            path: path.to_path_buf(),
            source,
        })?;

        let manifest_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let package = parse_package(&root)?;
        let (build, _) = resolve_build(&root, mode, profile, Platform::current())?;
        let test = parse_test(&root)?;
        let dependencies = parse_dependencies(&root, mode, &manifest_dir)?;

        Ok(Manifest {
            package,
            build,
            test,
            dependencies,
            manifest_dir,
        })
    }
}

fn parse_package(root: &toml::Table) -> Result<Package, ManifestError> {
    let table = subtable(root, "package").ok_or_else(|| ManifestError::MissingField {
        field: "package".to_string(),
    })?;
    let name = table
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| ManifestError::MissingField {
            field: "package.name".to_string(),
        })?
        .to_string();
    let version = table
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or("0.1.0")
        .to_string();
    let authors = table
        .get("authors")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(Package {
        name,
        version,
        authors,
    })
}

fn parse_test(root: &toml::Table) -> Result<Option<Test>, ManifestError> {
    let Some(table) = subtable(root, "test") else {
        return Ok(None);
    };
    let sources = table
        .get("sources")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let output = table
        .get("output")
        .and_then(Value::as_str)
        .ok_or_else(|| ManifestError::MissingField {
            field: "test.output".to_string(),
        })?;
    let defines = table
        .get("defines")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    let flags = table
        .get("flags")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    Ok(Some(Test {
        sources,
        output: PathBuf::from(output),
        defines,
        flags,
    }))
}

/// Merge the `[build]` table's base / mode / profile / platform layers
/// into an effective `Build`.
fn resolve_build(
    root: &toml::Table,
    mode: BuildProfile,
    profile: Option<&str>,
    platform: Platform,
) -> Result<(Build, bool), FlappyError> {
    let empty = toml::Table::new();
    let build_table = subtable(root, "build").unwrap_or(&empty);
    let mode_key = mode.as_str();
    let platform_key = platform.as_str();

    let mut fields = BuildFields::default();
    let mut is_profile_defined = false;

    // Layer 1: base.
    fields.apply_layer(build_table);

    // Layer 2: [build.<mode>].
    if let Some(t) = subtable(build_table, mode_key) {
        fields.apply_layer(t);
    }

    if let Some(profile_name) = profile {
        // Layer 3: [build.<profile>]. A profile name that matches no
        // table is a user typo, not a silent no-op.
        let profile_table = subtable(build_table, profile_name).ok_or_else(|| {
            ConfigError::UnknownProfile {
                profile: profile_name.to_string(),
            }
        })?;
        is_profile_defined = true;
        fields.apply_layer(profile_table);

        // Layer 4: [build.<profile>.<mode>].
        if let Some(t) = subtable(profile_table, mode_key) {
            fields.apply_layer(t);
        }

        // Layer 5: [build.<profile>.<platform>].
        if let Some(platform_table) = subtable(profile_table, platform_key) {
            is_profile_defined = true;
            fields.apply_layer(platform_table);

            // Layer 6: [build.<profile>.<platform>.<mode>].
            if let Some(t) = subtable(platform_table, mode_key) {
                fields.apply_layer(t);
            }
        }
    } else {
        // Layer 5: [build.<platform>].
        if let Some(platform_table) = subtable(build_table, platform_key) {
            is_profile_defined = true;
            fields.apply_layer(platform_table);

            // Layer 6: [build.<platform>.<mode>].
            if let Some(t) = subtable(platform_table, mode_key) {
                fields.apply_layer(t);
            }
        }
    }

    let compiler = require_field(fields.compiler, "build.compiler")?;
    let language_str = require_field(fields.language, "build.language")?;
    let language = Language::parse(&language_str).ok_or_else(|| ManifestError::MissingField {
        field: format!("build.language (unrecognised `{language_str}`)"),
    })?;
    let standard = require_field(fields.standard, "build.standard")?;
    let output = require_field(fields.output, "build.output")?;
    let arch = require_field(fields.arch, "build.arch")?;
    let kind_str = require_field(fields.kind, "build.type")?;
    let kind = TargetKind::parse(&kind_str).ok_or_else(|| ManifestError::MissingField {
        field: format!("build.type (unrecognised `{kind_str}`)"),
    })?;

    Ok((
        Build {
            compiler,
            language,
            standard,
            output: PathBuf::from(output),
            arch,
            kind,
            defines: fields.defines,
            flags: fields.flags,
            is_profile_defined,
        },
        is_profile_defined,
    ))
}

/// Merge `[dependencies.<name>]`'s base / mode / platform / platform.mode
/// layers into a `Dependency` for every declared dependency.
fn parse_dependencies(
    root: &toml::Table,
    mode: BuildProfile,
    manifest_dir: &Path,
) -> Result<Vec<Dependency>, ManifestError> {
    let Some(deps_table) = subtable(root, "dependencies") else {
        return Ok(Vec::new());
    };

    let platform = Platform::current();
    let mode_key = mode.as_str();
    let platform_key = platform.as_str();

    let mut out = Vec::new();
    for (name, value) in deps_table {
        let Some(base) = value.as_table() else {
            continue;
        };

        let mut fields = DependencyFields::default();
        fields.apply_layer(base);

        if let Some(t) = subtable(base, mode_key) {
            fields.apply_layer(t);
        }
        if let Some(platform_table) = subtable(base, platform_key) {
            fields.apply_layer(platform_table);
            if let Some(t) = subtable(platform_table, mode_key) {
                fields.apply_layer(t);
            }
        }

        let found = [fields.git.is_some(), fields.url.is_some(), fields.path.is_some()]
            .iter()
            .filter(|b| **b)
            .count();
        if found != 1 {
            return Err(ManifestError::InvalidDependencySource {
                name: name.clone(),
                found,
            });
        }

        let source = if let Some(url) = fields.git {
            Source::Git { url, tag: fields.tag }
        } else if let Some(url) = fields.url {
            Source::Http { url }
        } else {
            let path = fields.path.expect("exactly one source field set");
            Source::Local {
                path: manifest_dir.join(path),
            }
        };

        out.push(Dependency {
            name: name.clone(),
            source,
            defines: fields.defines,
            build_cmd: fields.build_cmd,
            include_dirs: fields
                .include_dirs
                .map(|dirs| dirs.into_iter().map(PathBuf::from).collect()),
            lib_dirs: fields
                .lib_dirs
                .map(|dirs| dirs.into_iter().map(PathBuf::from).collect()),
            libs: fields.libs,
            extra_dependencies: fields.extra_dependencies,
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_manifest(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join(MANIFEST_NAME);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn minimal_manifest_resolves() {
        let tmp = TempDir::new().unwrap();
        let path = write_manifest(
            tmp.path(),
            r#"
            [package]
            name = "hello"

            [build]
            compiler = "g++"
            language = "c++"
            standard = "c++17"
            output = "bin/hello"
            arch = "x64"
            type = "exe"
            "#,
        );

        let manifest = Manifest::load(&path, BuildProfile::Debug, None).unwrap();
        assert_eq!(manifest.package.name, "hello");
        assert_eq!(manifest.build.compiler, "g++");
        assert_eq!(manifest.build.standard, "c++17");
        assert!(!manifest.build.is_profile_defined);
    }

    #[test]
    fn override_merge_appends_lists_and_tracks_profile_defined() {
        let tmp = TempDir::new().unwrap();
        let path = write_manifest(
            tmp.path(),
            r#"
            [package]
            name = "hello"

            [build]
            compiler = "g++"
            language = "c++"
            standard = "c++17"
            output = "bin/hello"
            arch = "x64"
            type = "exe"
            defines = ["A"]

            [build.release]
            defines = ["B"]

            [build.windows]
            defines = ["C"]
            "#,
        );

        let debug_linux = Manifest::load(&path, BuildProfile::Debug, None).unwrap();
        assert_eq!(debug_linux.build.defines, vec!["A".to_string()]);
        assert!(!debug_linux.build.is_profile_defined);

        if Platform::current() == Platform::Windows {
            let release_windows = Manifest::load(&path, BuildProfile::Release, None).unwrap();
            assert_eq!(
                release_windows.build.defines,
                vec!["A".to_string(), "B".to_string(), "C".to_string()]
            );
            assert!(release_windows.build.is_profile_defined);
        }
    }

    #[test]
    fn dependency_requires_exactly_one_source() {
        let tmp = TempDir::new().unwrap();
        let path = write_manifest(
            tmp.path(),
            r#"
            [package]
            name = "hello"

            [build]
            compiler = "g++"
            language = "c++"
            standard = "c++17"
            output = "bin/hello"
            arch = "x64"
            type = "exe"

            [dependencies.fmt]
            git = "https://example.com/fmt.git"
            url = "https://example.com/fmt.tar.gz"
            "#,
        );

        let err = Manifest::load(&path, BuildProfile::Debug, None).unwrap_err();
        assert!(matches!(
            err,
            FlappyError::Manifest(ManifestError::InvalidDependencySource { .. })
        ));
    }

    #[test]
    fn unknown_profile_name_is_a_config_error() {
        let tmp = TempDir::new().unwrap();
        let path = write_manifest(
            tmp.path(),
            r#"
            [package]
            name = "hello"

            [build]
            compiler = "g++"
            language = "c++"
            standard = "c++17"
            output = "bin/hello"
            arch = "x64"
            type = "exe"
            "#,
        );

        let err = Manifest::load(&path, BuildProfile::Debug, Some("typo-d-profile")).unwrap_err();
        assert!(matches!(
            err,
            FlappyError::Config(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn bridging_fields_parse() {
        let tmp = TempDir::new().unwrap();
        let path = write_manifest(
            tmp.path(),
            r#"
            [package]
            name = "app"

            [build]
            compiler = "g++"
            language = "c++"
            standard = "c++17"
            output = "bin/app"
            arch = "x64"
            type = "exe"

            [dependencies.curl]
            git = "https://example.com/curl.git"
            build_cmd = "make"
            extra_dependencies = ["openssl"]

            [dependencies.openssl]
            git = "https://example.com/openssl.git"
            build_cmd = "make"
            "#,
        );

        let manifest = Manifest::load(&path, BuildProfile::Debug, None).unwrap();
        let curl = manifest
            .dependencies
            .iter()
            .find(|d| d.name == "curl")
            .unwrap();
        assert_eq!(curl.extra_dependencies, vec!["openssl".to_string()]);
    }
}
