//! Filesystem helpers shared by the fetcher, builder, and compile-db
//! generator.

use std::fs;
use std::path::{Path, PathBuf};

use glob::glob;

use crate::error::IoError;

/// Ensure a directory exists, creating it (and parents) if necessary.
pub fn ensure_dir(path: &Path) -> Result<(), IoError> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|source| IoError::CreateDir {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Copy `src` to `dst` if `dst` is missing or older than `src`.
pub fn copy_file_if_newer(src: &Path, dst: &Path) -> Result<bool, IoError> {
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }

    let needs_copy = match (mtime(dst), mtime(src)) {
        (Some(dst_time), Some(src_time)) => src_time > dst_time,
        _ => true,
    };

    if needs_copy {
        fs::copy(src, dst).map_err(|source| IoError::Copy {
            from: src.to_path_buf(),
            to: dst.to_path_buf(),
            source,
        })?;
    }
    Ok(needs_copy)
}

/// Modification time, or `None` if the path doesn't exist.
pub fn mtime(path: &Path) -> Option<std::time::SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// True iff `output` exists and is newer than every path in `inputs`.
pub fn is_up_to_date(output: &Path, inputs: impl IntoIterator<Item = PathBuf>) -> bool {
    let Some(output_time) = mtime(output) else {
        return false;
    };
    for input in inputs {
        match mtime(&input) {
            Some(t) if t <= output_time => continue,
            _ => return false,
        }
    }
    true
}

/// Find files matching glob patterns relative to a base directory.
pub fn glob_files(base: &Path, patterns: &[String]) -> Vec<PathBuf> {
    let mut results = Vec::new();
    for pattern in patterns {
        let full_pattern = base.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();
        let Ok(paths) = glob(&pattern_str) else {
            continue;
        };
        for entry in paths {
            match entry {
                Ok(path) if path.is_file() => results.push(path),
                Ok(_) => {}
                Err(e) => tracing::warn!("glob error: {e}"),
            }
        }
    }
    results.sort();
    results.dedup();
    results
}

/// Relative path from `base` to `path`, falling back to `path` itself
/// when no relative path exists (e.g. different drives on Windows).
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Create or repoint `<packages_dir>/<name>` as a junction/symbolic link
/// to `target` (the dependency's current cache entry). Repoints an
/// existing entry by removing it first, so switching profiles or cache
/// keys updates the link rather than leaving it stale.
pub fn link_package(packages_dir: &Path, name: &str, target: &Path) -> Result<(), IoError> {
    ensure_dir(packages_dir)?;
    let link_path = packages_dir.join(name);

    let to_io_err = |source: std::io::Error| IoError::Link {
        path: link_path.clone(),
        target: target.to_path_buf(),
        source,
    };

    if fs::symlink_metadata(&link_path).is_ok() {
        remove_existing_link(&link_path).map_err(to_io_err)?;
    }
    create_symlink(target, &link_path).map_err(to_io_err)
}

fn remove_existing_link(link: &Path) -> std::io::Result<()> {
    let meta = fs::symlink_metadata(link)?;
    if meta.file_type().is_symlink() {
        if meta.is_dir() {
            fs::remove_dir(link)
        } else {
            fs::remove_file(link)
        }
    } else if meta.is_dir() {
        fs::remove_dir_all(link)
    } else {
        fs::remove_file(link)
    }
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    // A junction would survive without admin rights, but std has no
    // junction API; a directory symlink is the closest best-effort
    // approximation available here.
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_target: &Path, _link: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "package linking is not supported on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn glob_files_matches_extension() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("main.c"), "int main(void){return 0;}").unwrap();
        fs::write(src.join("readme.txt"), "readme").unwrap();

        let files = glob_files(tmp.path(), &["src/**/*.c".to_string()]);
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn is_up_to_date_detects_stale_output() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("a.c");
        let output = tmp.path().join("a.o");
        fs::write(&input, "x").unwrap();
        assert!(!is_up_to_date(&output, vec![input.clone()]));

        fs::write(&output, "obj").unwrap();
        assert!(is_up_to_date(&output, vec![input]));
    }

    #[cfg(unix)]
    #[test]
    fn link_package_creates_and_repoints_symlink() {
        let tmp = TempDir::new().unwrap();
        let packages_dir = tmp.path().join("packages");
        let target_a = tmp.path().join("cache/fmt-a");
        let target_b = tmp.path().join("cache/fmt-b");
        fs::create_dir_all(&target_a).unwrap();
        fs::create_dir_all(&target_b).unwrap();

        link_package(&packages_dir, "fmt", &target_a).unwrap();
        let link = packages_dir.join("fmt");
        assert_eq!(fs::read_link(&link).unwrap(), target_a);

        link_package(&packages_dir, "fmt", &target_b).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), target_b);
    }
}
