//! File-based message queue conventions.
//!
//! The coordinator exchanges envelopes with the tuning server through
//! files in its codegen directory: inbound point requests are named
//! `candidate.<step>`, outbound results `code_complete.<step>`, and
//! the out-of-band initialization message uses step `-1`.

use std::path::{Path, PathBuf};

use codegen_core::{codec, CoordinatorError, Message, Result};

/// Inbound point-request file prefix.
pub const CANDIDATE_PREFIX: &str = "candidate";

/// Outbound result file prefix.
pub const RESULT_PREFIX: &str = "code_complete";

/// Step number reserved for the initialization message.
pub const INIT_STEP: i64 = -1;

pub fn candidate_path(dir: &Path, step: i64) -> PathBuf {
    dir.join(format!("{CANDIDATE_PREFIX}.{step}"))
}

pub fn result_path(dir: &Path, step: i64) -> PathBuf {
    dir.join(format!("{RESULT_PREFIX}.{step}"))
}

/// Returns true once a queue file is ready to consume: a regular file
/// with at least one byte. Zero-size files are writes still in flight.
pub fn file_ready(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.len() > 0,
        Err(_) => false,
    }
}

/// Reads and decodes one envelope from a queue file.
pub async fn read_message(path: &Path) -> Result<Message> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| CoordinatorError::io_with_source(path, "failed to read queue file", e))?;
    codec::decode(&bytes)
}

/// Encodes and writes one envelope to a queue file.
pub async fn write_message(path: &Path, message: &Message) -> Result<()> {
    let bytes = codec::encode(message)?;
    tokio::fs::write(path, &bytes)
        .await
        .map_err(|e| CoordinatorError::io_with_source(path, "failed to write queue file", e))
}

/// Removes stale candidate files from a directory, preserving the
/// initialization file if one is present. Returns the number of files
/// removed.
pub async fn sweep_candidates(dir: &Path) -> Result<usize> {
    let init_name = format!("{CANDIDATE_PREFIX}.{INIT_STEP}");
    let mut removed = 0;

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| CoordinatorError::io_with_source(dir, "failed to read queue directory", e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| CoordinatorError::io_with_source(dir, "failed to read queue directory", e))?
    {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name == init_name {
            continue;
        }
        if name.starts_with(CANDIDATE_PREFIX) {
            if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                tracing::warn!(path = %entry.path().display(), "failed to remove stale file: {e}");
                continue;
            }
            removed += 1;
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegen_core::{MessageBody, PointMessage, PointValue};

    #[test]
    fn test_paths() {
        let dir = Path::new("/tmp/q");
        assert_eq!(candidate_path(dir, 3), PathBuf::from("/tmp/q/candidate.3"));
        assert_eq!(
            candidate_path(dir, INIT_STEP),
            PathBuf::from("/tmp/q/candidate.-1")
        );
        assert_eq!(
            result_path(dir, 0),
            PathBuf::from("/tmp/q/code_complete.0")
        );
    }

    #[test]
    fn test_file_ready() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candidate.0");
        assert!(!file_ready(&path));

        // A zero-size file is a write still in flight.
        std::fs::write(&path, b"").unwrap();
        assert!(!file_ready(&path));

        std::fs::write(&path, b"x").unwrap();
        assert!(file_ready(&path));

        assert!(!file_ready(dir.path()));
    }

    #[tokio::test]
    async fn test_write_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = candidate_path(dir.path(), 0);
        let message = Message::request(MessageBody::Point(PointMessage::new(vec![
            PointValue::Int(3),
            PointValue::Real(1.5),
        ])));

        write_message(&path, &message).await.unwrap();
        let decoded = read_message(&path).await.unwrap();
        assert_eq!(decoded, message);
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_message(&candidate_path(dir.path(), 9)).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::Io { .. }));
    }

    #[tokio::test]
    async fn test_sweep_preserves_init_and_results() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(candidate_path(dir.path(), 0), b"stale").unwrap();
        std::fs::write(candidate_path(dir.path(), 7), b"stale").unwrap();
        std::fs::write(candidate_path(dir.path(), INIT_STEP), b"init").unwrap();
        std::fs::write(result_path(dir.path(), 0), b"result").unwrap();

        let removed = sweep_candidates(dir.path()).await.unwrap();
        assert_eq!(removed, 2);
        assert!(candidate_path(dir.path(), INIT_STEP).exists());
        assert!(result_path(dir.path(), 0).exists());
        assert!(!candidate_path(dir.path(), 0).exists());
        assert!(!candidate_path(dir.path(), 7).exists());
    }
}
