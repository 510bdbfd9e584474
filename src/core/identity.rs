//! Project identity resolution.
//!
//! Decisions are scoped to a project, not a working directory. The root is
//! the enclosing git work tree when there is one, otherwise the directory
//! itself, and the project id is a short hash of the normalized root path.
//! Sibling checkouts of the same repository therefore hash to different
//! ids, while every subdirectory of one checkout shares an id.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Hex characters kept from the digest.
pub const PROJECT_ID_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectIdentity {
    /// 16 lowercase hex chars, a truncated SHA-256 of the root path.
    pub project_id: String,
    pub root: PathBuf,
}

/// Resolves identity for the project containing `dir`. Infallible: when
/// git is absent or `dir` is not inside a work tree, `dir` itself is the
/// root.
pub fn resolve_identity(dir: &Path) -> ProjectIdentity {
    let root = git_toplevel(dir).unwrap_or_else(|| dir.to_path_buf());
    let normalized = normalize_root(&root);
    ProjectIdentity { project_id: hash_project_root(&normalized), root: PathBuf::from(&normalized) }
}

fn git_toplevel(dir: &Path) -> Option<PathBuf> {
    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .current_dir(dir)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let trimmed = stdout.trim();
    if trimmed.is_empty() { None } else { Some(PathBuf::from(trimmed)) }
}

/// Absolute path with forward slashes, so the id is stable across the
/// separator styles git and the OS may report.
fn normalize_root(root: &Path) -> String {
    let absolute = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    absolute.to_string_lossy().replace('\\', "/")
}

pub fn hash_project_root(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..PROJECT_ID_LEN].to_string()
}
