//! Repository source: turns a URL into a local working copy.
//!
//! Clones are shallow and land in `<repos.cache_dir>/<repo_id>`. A previous
//! working copy for the same URL is removed first so an analysis always sees
//! the current default branch. Clone failures (network, auth, not found)
//! propagate to the caller.

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Deterministic short identifier for a repository URL.
///
/// Surrounding whitespace is ignored; everything else, including a trailing
/// `.git`, is significant.
pub fn repo_id(repo_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(repo_url.trim().as_bytes());
    format!("{:x}", hasher.finalize())[..12].to_string()
}

/// Whether `s` looks like something `git clone` accepts rather than a repo id.
///
/// Repo ids never contain `/`, so any path-like input counts. The id is
/// derived from the exact text, so `github.com/org/repo` and
/// `https://github.com/org/repo` name different repositories.
pub fn looks_like_url(s: &str) -> bool {
    let s = s.trim();
    s.contains('/') || s.starts_with("git@") || s.contains("://")
}

/// Working copy location for `repo_url` under `cache_dir`.
pub fn working_copy_path(cache_dir: &Path, repo_url: &str) -> PathBuf {
    cache_dir.join(repo_id(repo_url))
}

/// Clone `repo_url` into `cache_dir` and return the working copy root.
pub fn clone_repo(repo_url: &str, cache_dir: &Path) -> Result<PathBuf> {
    let repo_url = repo_url.trim();
    if repo_url.is_empty() {
        bail!("Repository URL must not be empty");
    }
    if repo_url.starts_with('-') {
        bail!("Repository URL must not start with '-': {}", repo_url);
    }

    let dest = working_copy_path(cache_dir, repo_url);
    remove_working_copy(&dest)?;
    std::fs::create_dir_all(cache_dir)
        .with_context(|| format!("Failed to create cache directory: {}", cache_dir.display()))?;

    tracing::info!(url = repo_url, dest = %dest.display(), "cloning repository");

    let output = Command::new("git")
        .args(["clone", "--depth", "1", "--quiet", "--"])
        .arg(repo_url)
        .arg(&dest)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .with_context(|| "Failed to execute 'git clone'. Is git installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git clone failed: {}", stderr.trim());
    }

    Ok(dest)
}

/// Delete a working copy if it exists.
pub fn remove_working_copy(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove working copy: {}", path.display()))?;
    }
    Ok(())
}
