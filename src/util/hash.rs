//! Hashing utilities: SHA-256 for build-state fingerprints, FNV-1a/32
//! for cache keys.

use sha2::{Digest, Sha256};

/// A hasher for building fingerprints from multiple components, used for
/// the `.flappy_build_state` hash over `(git_commit, build_cmd, defines)`.
#[derive(Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    pub fn new() -> Self {
        Fingerprint {
            hasher: Sha256::new(),
        }
    }

    pub fn update_str(&mut self, s: &str) -> &mut Self {
        self.hasher.update(s.as_bytes());
        self.hasher.update(b"\0");
        self
    }

    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

/// 32-bit FNV-1a, used for the `url_fnv1a32` component of a cache key.
pub fn fnv1a32(data: &str) -> u32 {
    const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
    const FNV_PRIME: u32 = 0x0100_0193;

    let mut hash = FNV_OFFSET_BASIS;
    for byte in data.as_bytes() {
        hash ^= *byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Sanitize an identifier (a compiler path, a URL) into a filesystem-safe
/// token for use inside a cache key.
pub fn sanitize_for_path(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
