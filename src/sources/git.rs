//! Git fetch strategy.
//!
//! A re-fetch is a no-op once the checkout directory exists: unlike a
//! long-lived developer checkout, the cache entry is immutable once
//! created for a given cache key, so there is nothing to update.

use std::path::Path;

use git2::Repository;

use crate::error::FetchError;

/// Result of fetching a git dependency: the checkout directory already
/// existed or was freshly cloned, and the resolved commit SHA.
pub struct GitFetchResult {
    pub resolved: String,
}

pub fn fetch(url: &str, tag: Option<&str>, dest: &Path) -> Result<GitFetchResult, FetchError> {
    if dest.exists() {
        let repo = Repository::open(dest).map_err(|source| FetchError::GitCheckout {
            reference: tag.unwrap_or("HEAD").to_string(),
            path: dest.to_path_buf(),
            source,
        })?;
        return Ok(GitFetchResult {
            resolved: head_commit(&repo)?,
        });
    }

    let repo = Repository::clone(url, dest).map_err(|source| FetchError::GitClone {
        url: url.to_string(),
        source,
    })?;

    if let Some(tag) = tag {
        checkout_tag(&repo, tag, dest)?;
    }

    Ok(GitFetchResult {
        resolved: head_commit(&repo)?,
    })
}

fn checkout_tag(repo: &Repository, tag: &str, dest: &Path) -> Result<(), FetchError> {
    let object = repo
        .revparse_single(tag)
        .map_err(|source| FetchError::GitCheckout {
            reference: tag.to_string(),
            path: dest.to_path_buf(),
            source,
        })?;
    repo.checkout_tree(&object, None)
        .map_err(|source| FetchError::GitCheckout {
            reference: tag.to_string(),
            path: dest.to_path_buf(),
            source,
        })?;
    repo.set_head_detached(object.id())
        .map_err(|source| FetchError::GitCheckout {
            reference: tag.to_string(),
            path: dest.to_path_buf(),
            source,
        })?;
    Ok(())
}

fn head_commit(repo: &Repository) -> Result<String, FetchError> {
    let head = repo.head().map_err(|source| FetchError::GitCheckout {
        reference: "HEAD".to_string(),
        path: repo.path().to_path_buf(),
        source,
    })?;
    let commit = head.peel_to_commit().map_err(|source| FetchError::GitCheckout {
        reference: "HEAD".to_string(),
        path: repo.path().to_path_buf(),
        source,
    })?;
    Ok(commit.id().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// A re-fetch against an existing directory must not touch the
    /// network or re-clone; this models the directory with a bare repo
    /// stub rather than exercising a real network clone.
    #[test]
    fn refetch_is_a_noop_when_directory_exists() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("repo");
        let repo = Repository::init(&dest).unwrap();
        let sig = repo.signature().unwrap_or_else(|_| {
            git2::Signature::now("test", "test@example.com").unwrap()
        });
        {
            let tree_id = {
                let mut index = repo.index().unwrap();
                index.write_tree().unwrap()
            };
            let tree = repo.find_tree(tree_id).unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
                .unwrap();
        }

        let result = fetch("unused", None, &dest).unwrap();
        assert_eq!(result.resolved.len(), 40);
    }
}
