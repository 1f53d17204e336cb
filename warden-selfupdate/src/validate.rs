//! Diff parsing, path allowlist enforcement, dry-apply, and deterministic
//! replay (the `validate` stage of §4.9).

use crate::config::SelfUpdateConfig;
use crate::git::{self, ScratchWorktree};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use warden_domain::PatchFailureCode;

/// Splits one unified diff covering multiple files into per-file chunks,
/// each starting at its own `--- a/...` header.
pub fn split_file_diffs(diff: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for line in diff.lines() {
        if line.starts_with("--- ") && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Extracts the `b/<path>` target path from one file's unified-diff chunk.
pub fn touched_path(chunk: &str) -> Option<String> {
    for line in chunk.lines() {
        if let Some(rest) = line.strip_prefix("+++ ") {
            let path = rest.strip_prefix("b/").unwrap_or(rest).trim();
            if path != "/dev/null" {
                return Some(path.to_string());
            }
        }
    }
    None
}

/// Whether every path in `paths` resolves under `repo_root` (no `..`
/// escapes) and matches one of `allowlist`'s prefixes.
pub fn all_paths_allowed(paths: &[String], allowlist: &[String]) -> bool {
    paths.iter().all(|p| {
        !p.contains("..") && allowlist.iter().any(|prefix| p.starts_with(prefix.as_str()))
    })
}

/// Outcome of a successful `validate` stage.
pub struct ValidationOutcome {
    /// The distinct files this patch touches.
    pub touched_files: Vec<String>,
}

/// Parses, path-checks, dry-applies, and deterministically replays `diff`
/// against `baseline_ref`. `unique` disambiguates the two scratch
/// worktrees the replay check spins up.
pub async fn validate_patch(
    cfg: &SelfUpdateConfig,
    baseline_ref: &str,
    diff: &str,
    unique: &str,
) -> Result<ValidationOutcome, PatchFailureCode> {
    if diff.trim().is_empty() {
        return Err(PatchFailureCode::PatchParse);
    }
    let chunks = split_file_diffs(diff);
    if chunks.is_empty() {
        return Err(PatchFailureCode::PatchParse);
    }

    let mut touched_files = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        if diffy::Patch::from_str(chunk).is_err() {
            return Err(PatchFailureCode::PatchParse);
        }
        match touched_path(chunk) {
            Some(path) => touched_files.push(path),
            None => return Err(PatchFailureCode::PatchParse),
        }
    }

    if !all_paths_allowed(&touched_files, &cfg.path_allowlist) {
        return Err(PatchFailureCode::PathDenied);
    }

    let first_hash = dry_apply_and_hash(cfg, baseline_ref, diff, &touched_files, &format!("{unique}-a"))
        .await
        .map_err(|_| PatchFailureCode::ApplyConflict)?;
    let second_hash = dry_apply_and_hash(cfg, baseline_ref, diff, &touched_files, &format!("{unique}-b"))
        .await
        .map_err(|_| PatchFailureCode::ApplyConflict)?;

    if first_hash != second_hash {
        return Err(PatchFailureCode::ReplayMismatch);
    }

    Ok(ValidationOutcome { touched_files })
}

/// Checks out `baseline_ref` into a scratch worktree, applies `diff`, and
/// returns a content hash of every file in `touched_files` afterward.
async fn dry_apply_and_hash(
    cfg: &SelfUpdateConfig,
    baseline_ref: &str,
    diff: &str,
    touched_files: &[String],
    unique: &str,
) -> Result<u64, git::GitError> {
    let worktree = ScratchWorktree::checkout(cfg, baseline_ref, unique).await?;
    let result = git::apply(cfg, &worktree.path, diff).await;
    if result.is_err() {
        let _ = worktree.cleanup(cfg).await;
        return result.map(|_| 0);
    }

    let mut hasher = DefaultHasher::new();
    for path in touched_files {
        let full = worktree.path.join(path);
        let contents = tokio::fs::read(&full).await.unwrap_or_default();
        path.hash(&mut hasher);
        contents.hash(&mut hasher);
    }
    let digest = hasher.finish();
    worktree.cleanup(cfg).await?;
    Ok(digest)
}
