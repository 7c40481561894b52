//! Maps a dependency specification to an on-disk directory under the
//! profile-partitioned global cache.

pub mod cache;
pub mod git;
pub mod http;
pub mod local;

use std::path::{Path, PathBuf};

use crate::core::source::{BuildProfile, Source};
use crate::error::FetchError;

pub struct Fetched {
    pub dir: PathBuf,
    pub resolved: String,
}

/// Fetch `source` for `name`, returning the absolute directory containing
/// its source tree and a resolved identifier (commit SHA, URL hash, or
/// `"local"`).
pub fn fetch(
    cache_root: &Path,
    name: &str,
    source: &Source,
    profile: BuildProfile,
    arch: &str,
    compiler: &str,
) -> Result<Fetched, FetchError> {
    match source {
        Source::Local { path } => {
            let dir = local::fetch(path)?;
            Ok(Fetched {
                dir,
                resolved: local::RESOLVED_LOCAL.to_string(),
            })
        }
        Source::Git { url, tag } => {
            let key = cache::cache_key(name, source, profile, arch, compiler);
            let dir = cache::cache_dir_for(cache_root, &key);
            crate::util::logging::action("Fetching", format!("{name} ({url})"));
            let result = git::fetch(url, tag.as_deref(), &dir)?;
            Ok(Fetched {
                dir,
                resolved: result.resolved,
            })
        }
        Source::Http { url } => {
            let key = cache::cache_key(name, source, profile, arch, compiler);
            let dir = cache::cache_dir_for(cache_root, &key);
            crate::util::logging::action("Fetching", format!("{name} ({url})"));
            let result = http::fetch(url, &dir, name)?;
            Ok(Fetched {
                dir: result.file_path.parent().unwrap_or(&dir).to_path_buf(),
                resolved: result.resolved,
            })
        }
    }
}
