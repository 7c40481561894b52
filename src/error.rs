//! Error taxonomy for the build system.
//!
//! Each variant below corresponds to one failure category a caller needs
//! to distinguish; all are fatal unless noted on the variant itself.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::source::Source;

/// Errors raised while parsing or resolving a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest not found at {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read manifest at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("dependency `{name}` must specify exactly one of git/url/path, found {found}")]
    InvalidDependencySource { name: String, found: usize },

    #[error("required build field `{field}` is missing after override resolution")]
    MissingField { field: String },
}

/// Errors raised while resolving the transitive dependency graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("dependency cycle detected: {path}")]
    Cycle { path: String },

    #[error("conflicting sources for dependency `{name}`: {a:?} vs {b:?}")]
    Conflict { name: String, a: Source, b: Source },
}

/// Errors raised while fetching a dependency's source tree.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("git clone of {url} failed: {source}")]
    GitClone {
        url: String,
        #[source]
        source: git2::Error,
    },

    #[error("git checkout of {reference} in {path} failed: {source}")]
    GitCheckout {
        reference: String,
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("http request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("local dependency path does not exist: {path}")]
    LocalNotFound { path: PathBuf },

    #[error("failed to write cache entry at {path}: {source}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while compiling, archiving, or linking.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("`{command}` exited with {code:?}\n{stderr}")]
    ChildProcessFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to locate a toolchain bootstrap for MSVC: {reason}")]
    ToolchainBootstrap { reason: String },
}

/// Filesystem errors from directory/file operations outside the build
/// graph proper (cache layout, runtime-artifact copying). Most are
/// surfaced as fatal, except link creation, which the caller downgrades
/// to a warning.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create link {path} -> {target}: {source}")]
    Link {
        path: PathBuf,
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while resolving the effective configuration for an
/// invocation (profile selection, platform defaults).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("requested profile `{profile}` does not exist")]
    UnknownProfile { profile: String },

    #[error("no configuration available for the current platform")]
    NoPlatformConfig,
}

/// Top-level error type unifying the taxonomy above.
#[derive(Debug, Error)]
pub enum FlappyError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, FlappyError>;
