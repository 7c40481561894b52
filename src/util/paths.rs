//! Global cache root resolution, by hand rather than via a
//! platform-directories crate, since the precedence is fixed:
//! `%APPDATA%/flappy/cache` on Windows, else
//! `$XDG_CACHE_HOME/flappy/cache` or `$HOME/.cache/flappy/cache`.

use std::env;
use std::path::PathBuf;

pub fn global_cache_root() -> PathBuf {
    if cfg!(target_os = "windows") {
        if let Ok(appdata) = env::var("APPDATA") {
            return PathBuf::from(appdata).join("flappy").join("cache");
        }
    }

    if let Ok(xdg) = env::var("XDG_CACHE_HOME") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg).join("flappy").join("cache");
        }
    }

    if let Ok(home) = env::var("HOME") {
        return PathBuf::from(home).join(".cache").join("flappy").join("cache");
    }

    // Last resort: relative to the current directory. Should not be hit
    // outside of a sandboxed/minimal environment where neither HOME nor
    // XDG_CACHE_HOME is set.
    PathBuf::from(".flappy-cache")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xdg_cache_home_takes_precedence_over_home() {
        env::set_var("XDG_CACHE_HOME", "/tmp/xdg");
        env::set_var("HOME", "/tmp/home");
        let root = global_cache_root();
        env::remove_var("XDG_CACHE_HOME");
        if !cfg!(target_os = "windows") {
            assert_eq!(root, PathBuf::from("/tmp/xdg/flappy/cache"));
        }
    }
}
