use crate::persistence::TranscriptSink;
use crate::types::{AppError, Message, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Appends one JSON line per message to `<dir>/<session_id>.jsonl`.
#[derive(Debug, Clone)]
pub struct JsonlTranscriptSink {
    dir: PathBuf,
}

impl JsonlTranscriptSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the transcript of a session
    pub fn transcript_path(&self, session_id: &str) -> Result<PathBuf> {
        let valid = !session_id.is_empty()
            && session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(AppError::Validation(format!(
                "invalid session id for transcript: {}",
                session_id
            )));
        }
        Ok(self.dir.join(format!("{}.jsonl", session_id)))
    }

    /// Read a transcript back, oldest message first
    pub async fn load(&self, session_id: &str) -> Result<Vec<Message>> {
        let path = self.transcript_path(session_id)?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read {}: {}", path.display(), e)))?;

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .map_err(|e| AppError::Internal(format!("Corrupt transcript line: {}", e)))
            })
            .collect()
    }
}

#[async_trait]
impl TranscriptSink for JsonlTranscriptSink {
    async fn record(&self, session_id: &str, message: &Message) -> Result<()> {
        let path = self.transcript_path(session_id)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create transcript dir: {}", e)))?;

        let mut line = serde_json::to_string(message)
            .map_err(|e| AppError::Internal(format!("Failed to encode message: {}", e)))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to open {}: {}", path.display(), e)))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write transcript: {}", e)))?;
        file.flush()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to flush transcript: {}", e)))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "jsonl"
    }
}
