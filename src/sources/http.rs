//! HTTP fetch strategy. Single-file downloads only: the `url_fnv1a32`
//! key component already distinguishes variants of the same name, and
//! unpacking archives is not supported.

use std::path::{Path, PathBuf};

use crate::error::FetchError;
use crate::util::hash::fnv1a32;

pub struct HttpFetchResult {
    pub file_path: PathBuf,
    pub resolved: String,
}

pub fn fetch(url: &str, dest_dir: &Path, name: &str) -> Result<HttpFetchResult, FetchError> {
    if dest_dir.exists() {
        let file_path = existing_file(dest_dir, url, name);
        return Ok(HttpFetchResult {
            file_path,
            resolved: resolved_id(url),
        });
    }

    std::fs::create_dir_all(dest_dir).map_err(|source| FetchError::CacheWrite {
        path: dest_dir.to_path_buf(),
        source,
    })?;

    let file_name = basename_for(url, name);
    let file_path = dest_dir.join(&file_name);

    let result = download(url, &file_path);
    if result.is_err() {
        let _ = std::fs::remove_dir_all(dest_dir);
    }
    result?;

    Ok(HttpFetchResult {
        file_path,
        resolved: resolved_id(url),
    })
}

fn download(url: &str, file_path: &Path) -> Result<(), FetchError> {
    let response = reqwest::blocking::get(url).map_err(|source| FetchError::Http {
        url: url.to_string(),
        source,
    })?;
    let response = response.error_for_status().map_err(|source| FetchError::Http {
        url: url.to_string(),
        source,
    })?;
    let bytes = response.bytes().map_err(|source| FetchError::Http {
        url: url.to_string(),
        source,
    })?;
    std::fs::write(file_path, &bytes).map_err(|source| FetchError::CacheWrite {
        path: file_path.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn basename_for(url: &str, name: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segs| segs.next_back().map(str::to_string))
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("{name}.h"))
}

fn existing_file(dest_dir: &Path, url: &str, name: &str) -> PathBuf {
    let expected = dest_dir.join(basename_for(url, name));
    if expected.exists() {
        return expected;
    }
    // Directory exists from a prior fetch with a different basename
    // resolution; fall back to whatever single file is present.
    std::fs::read_dir(dest_dir)
        .ok()
        .and_then(|mut entries| entries.find_map(|e| e.ok().map(|e| e.path())))
        .unwrap_or(expected)
}

fn resolved_id(url: &str) -> String {
    format!("{:08x}", fnv1a32(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basename_falls_back_to_dependency_name_for_trailing_slash_urls() {
        assert_eq!(basename_for("https://example.com/", "fmt"), "fmt.h");
    }

    #[test]
    fn basename_extracts_final_path_segment() {
        assert_eq!(
            basename_for("https://example.com/pkg/zlib.h", "fmt"),
            "zlib.h"
        );
    }
}
