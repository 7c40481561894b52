//! Cache-key computation and the on-disk cache layout.

use std::path::PathBuf;

use crate::core::source::{BuildProfile, Source};
use crate::util::hash::{fnv1a32, sanitize_for_path};

/// `<name>@<version_or_HEAD>_<url_fnv1a32>_<profile>_<arch>_<safe_compiler>`
///
/// Local sources never go through the cache; callers should special-case
/// `Source::Local` before calling this.
pub fn cache_key(
    name: &str,
    source: &Source,
    profile: BuildProfile,
    arch: &str,
    compiler: &str,
) -> String {
    let (version_or_head, url) = match source {
        Source::Git { url, tag } => (tag.clone().unwrap_or_else(|| "HEAD".to_string()), url.clone()),
        Source::Http { url } => ("HEAD".to_string(), url.clone()),
        Source::Local { path } => ("local".to_string(), path.display().to_string()),
    };

    let url_hash = fnv1a32(&url);
    let safe_compiler = sanitize_for_path(compiler);

    format!(
        "{name}@{version_or_head}_{url_hash:08x}_{profile}_{arch}_{safe_compiler}",
        profile = profile.as_str(),
    )
}

/// Directory under the global cache root for a given cache key.
pub fn cache_dir_for(cache_root: &std::path::Path, key: &str) -> PathBuf {
    cache_root.join(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_stable_for_identical_inputs() {
        let src = Source::Git {
            url: "https://example.com/fmt.git".to_string(),
            tag: Some("11.0.2".to_string()),
        };
        let a = cache_key("fmt", &src, BuildProfile::Debug, "x64", "g++");
        let b = cache_key("fmt", &src, BuildProfile::Debug, "x64", "g++");
        assert_eq!(a, b);
    }

    #[test]
    fn cache_key_differs_across_profiles() {
        let src = Source::Git {
            url: "https://example.com/fmt.git".to_string(),
            tag: Some("11.0.2".to_string()),
        };
        let debug = cache_key("fmt", &src, BuildProfile::Debug, "x64", "g++");
        let release = cache_key("fmt", &src, BuildProfile::Release, "x64", "g++");
        assert_ne!(debug, release);
    }
}
