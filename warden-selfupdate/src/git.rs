//! Shells out to the system `git` binary for worktree, apply, commit, and
//! revert operations. Grounded on driving external processes from an
//! async daemon loop via `tokio::process::Command`.

use crate::config::SelfUpdateConfig;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// A `git` invocation failed; carries stderr for diagnosis.
#[derive(Debug, thiserror::Error)]
#[error("git {args:?} failed (status {status}): {stderr}")]
pub struct GitError {
    /// The arguments passed to `git`, for logging.
    pub args: Vec<String>,
    /// The process exit status, or -1 if it could not be determined.
    pub status: i32,
    /// Captured stderr.
    pub stderr: String,
}

async fn run(cfg: &SelfUpdateConfig, cwd: &Path, args: &[&str]) -> Result<String, GitError> {
    let output = Command::new(&cfg.git_binary)
        .args(args)
        .current_dir(cwd)
        .output()
        .await
        .map_err(|e| GitError {
            args: args.iter().map(|s| s.to_string()).collect(),
            status: -1,
            stderr: e.to_string(),
        })?;
    if !output.status.success() {
        return Err(GitError {
            args: args.iter().map(|s| s.to_string()).collect(),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Checks out `baseline_ref` into a fresh worktree at `dest`.
pub async fn add_worktree(cfg: &SelfUpdateConfig, dest: &Path, baseline_ref: &str) -> Result<(), GitError> {
    let dest_str = dest.to_string_lossy().into_owned();
    run(
        cfg,
        &cfg.repo_root,
        &["worktree", "add", "--detach", dest_str.as_str(), baseline_ref],
    )
    .await?;
    Ok(())
}

/// Removes a worktree created by [`add_worktree`].
pub async fn remove_worktree(cfg: &SelfUpdateConfig, dest: &Path) -> Result<(), GitError> {
    let dest_str = dest.to_string_lossy().into_owned();
    run(cfg, &cfg.repo_root, &["worktree", "remove", "--force", dest_str.as_str()]).await?;
    Ok(())
}

/// Validates that `diff` applies cleanly in `worktree` without touching
/// any files on disk.
pub async fn check_apply(cfg: &SelfUpdateConfig, worktree: &Path, diff: &str) -> Result<(), GitError> {
    apply_via_stdin(cfg, worktree, diff, &["apply", "--check", "-"]).await
}

/// Applies `diff` in `worktree`, mutating files on disk.
pub async fn apply(cfg: &SelfUpdateConfig, worktree: &Path, diff: &str) -> Result<(), GitError> {
    apply_via_stdin(cfg, worktree, diff, &["apply", "-"]).await
}

async fn apply_via_stdin(
    cfg: &SelfUpdateConfig,
    worktree: &Path,
    diff: &str,
    args: &[&str],
) -> Result<(), GitError> {
    use std::process::Stdio;
    use tokio::io::AsyncWriteExt;

    let mut child = Command::new(&cfg.git_binary)
        .args(args)
        .current_dir(worktree)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| GitError {
            args: args.iter().map(|s| s.to_string()).collect(),
            status: -1,
            stderr: e.to_string(),
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(diff.as_bytes()).await;
    }

    let output = child.wait_with_output().await.map_err(|e| GitError {
        args: args.iter().map(|s| s.to_string()).collect(),
        status: -1,
        stderr: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(GitError {
            args: args.iter().map(|s| s.to_string()).collect(),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}

/// Creates branch `auto/<trace_id>`, commits everything, and returns the
/// branch name.
pub async fn create_branch_and_commit(
    cfg: &SelfUpdateConfig,
    trace_id: &str,
    timestamp: &str,
) -> Result<String, GitError> {
    let branch = format!("auto/{timestamp}-{trace_id}");
    run(cfg, &cfg.repo_root, &["checkout", "-b", branch.as_str()]).await?;
    run(cfg, &cfg.repo_root, &["add", "-A"]).await?;
    let message = format!("self-update: apply patch for trace {trace_id}");
    run(cfg, &cfg.repo_root, &["commit", "-m", message.as_str()]).await?;
    Ok(branch)
}

/// Reverts the repository to `known_good_ref`, discarding the applied
/// branch's changes.
pub async fn revert_to(cfg: &SelfUpdateConfig, known_good_ref: &str) -> Result<(), GitError> {
    run(cfg, &cfg.repo_root, &["checkout", known_good_ref]).await?;
    run(cfg, &cfg.repo_root, &["reset", "--hard", known_good_ref]).await?;
    Ok(())
}

/// Runs the configured restart command.
pub async fn restart(cfg: &SelfUpdateConfig) -> Result<(), GitError> {
    let Some((program, rest)) = cfg.restart_command.split_first() else {
        return Ok(());
    };
    Command::new(program)
        .args(rest)
        .current_dir(&cfg.repo_root)
        .output()
        .await
        .map_err(|e| GitError {
            args: cfg.restart_command.clone(),
            status: -1,
            stderr: e.to_string(),
        })?;
    Ok(())
}

/// A scratch worktree, removed on drop via a best-effort async cleanup
/// the caller must still await explicitly (Drop cannot run async code).
pub struct ScratchWorktree {
    /// Path to the checked-out worktree.
    pub path: PathBuf,
}

impl ScratchWorktree {
    /// Checks out `baseline_ref` under a fresh temp directory inside
    /// `tempfile`'s managed temp root, returning the worktree handle.
    pub async fn checkout(cfg: &SelfUpdateConfig, baseline_ref: &str, unique: &str) -> Result<Self, GitError> {
        let path = std::env::temp_dir().join(format!("warden-selfupdate-{unique}"));
        add_worktree(cfg, &path, baseline_ref).await?;
        Ok(Self { path })
    }

    /// Removes this worktree from disk and from git's worktree registry.
    pub async fn cleanup(self, cfg: &SelfUpdateConfig) -> Result<(), GitError> {
        remove_worktree(cfg, &self.path).await
    }
}
