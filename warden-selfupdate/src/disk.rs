//! Disk-mirrored `state.json`/`log.jsonl` per trace_id, written before the
//! corresponding event is considered committed (§4.9). Mirrors the
//! directory-per-id persisted-state layout this workspace already uses
//! for audit-shaped records.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use warden_domain::{PatchRecord, PatchState};

/// Errors writing or reading the disk mirror.
#[derive(Debug, thiserror::Error)]
pub enum DiskError {
    /// An I/O operation on the mirror directory failed.
    #[error("self-update disk mirror I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// `state.json` could not be (de)serialized.
    #[error("self-update disk mirror serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

fn trace_dir(root: &Path, trace_id: &str) -> PathBuf {
    root.join(trace_id)
}

/// Overwrites `state.json` for this patch's current snapshot.
pub async fn write_state(root: &Path, record: &PatchRecord) -> Result<(), DiskError> {
    let dir = trace_dir(root, record.trace_id.as_str());
    tokio::fs::create_dir_all(&dir).await?;
    let body = serde_json::to_vec_pretty(record)?;
    tokio::fs::write(dir.join("state.json"), body).await?;
    Ok(())
}

/// Reads back a previously written `state.json`, if present. Used at
/// startup to reconcile disk state with the last committed event.
pub async fn read_state(root: &Path, trace_id: &str) -> Result<Option<PatchRecord>, DiskError> {
    let path = trace_dir(root, trace_id).join("state.json");
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// One appended transition line in `log.jsonl`.
#[derive(serde::Serialize)]
struct LogLine<'a> {
    state: PatchState,
    at: DateTime<Utc>,
    trace_id: &'a str,
}

/// Appends one transition record to `log.jsonl`.
pub async fn append_log(root: &Path, trace_id: &str, state: PatchState, at: DateTime<Utc>) -> Result<(), DiskError> {
    let dir = trace_dir(root, trace_id);
    tokio::fs::create_dir_all(&dir).await?;
    let mut line = serde_json::to_vec(&LogLine { state, at, trace_id })?;
    line.push(b'\n');
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("log.jsonl"))
        .await?;
    file.write_all(&line).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use warden_domain::{EvidencePacket, TraceId};

    #[tokio::test]
    async fn state_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let record = PatchRecord::propose(
            TraceId::generate(),
            "abc123".into(),
            EvidencePacket {
                file_refs: vec!["a.rs".into()],
                line_refs: BTreeMap::from([("a.rs".to_string(), vec![(1, 2)])]),
                policy_refs: vec!["R7".into()],
                invariant_checks: vec!["inv-4".into()],
            },
            "diff".into(),
        );
        write_state(dir.path(), &record).await.unwrap();
        let loaded = read_state(dir.path(), record.trace_id.as_str()).await.unwrap().unwrap();
        assert_eq!(loaded.state, record.state);
        assert_eq!(loaded.trace_id, record.trace_id);
    }

    #[tokio::test]
    async fn missing_state_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = read_state(dir.path(), "trc_does_not_exist").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn log_lines_append() {
        let dir = tempfile::tempdir().unwrap();
        append_log(dir.path(), "trc_x", PatchState::Proposed, Utc::now()).await.unwrap();
        append_log(dir.path(), "trc_x", PatchState::Validated, Utc::now()).await.unwrap();
        let contents = tokio::fs::read_to_string(dir.path().join("trc_x").join("log.jsonl"))
            .await
            .unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
