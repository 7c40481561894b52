//! Local path dependency strategy: existence check only, bypassing the
//! cache entirely.

use std::path::{Path, PathBuf};

use crate::error::FetchError;

pub fn fetch(path: &Path) -> Result<PathBuf, FetchError> {
    if !path.exists() {
        return Err(FetchError::LocalNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(path.to_path_buf())
}

pub const RESOLVED_LOCAL: &str = "local";
