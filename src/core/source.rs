//! The three-way dependency source variant and the build-profile tag.
//!
//! A tagged enum is the natural fit for a heterogeneous source: each
//! variant carries exactly the fields its fetch strategy needs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where a dependency's source tree comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Git { url: String, tag: Option<String> },
    Http { url: String },
    Local { path: PathBuf },
}

impl Source {
    pub fn kind(&self) -> &'static str {
        match self {
            Source::Git { .. } => "git",
            Source::Http { .. } => "http",
            Source::Local { .. } => "local",
        }
    }

    /// Whether two sources are equal for the purposes of the strict
    /// conflict policy (same variant, same identifying fields).
    pub fn conflicts_with(&self, other: &Source) -> bool {
        self != other
    }
}

/// Debug or Release; selects flag presets and the cache/object partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildProfile::Debug => "debug",
            BuildProfile::Release => "release",
        }
    }
}

impl std::fmt::Display for BuildProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
