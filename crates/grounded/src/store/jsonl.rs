use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::base::ConversationStore;
use crate::models::message::Message;

const EXTENSION: &str = "jsonl";

/// One `<thread>.jsonl` file per conversation, one serialized message per line.
///
/// Thread ids are percent-encoded into file names so any opaque id maps to a
/// single file inside `dir`.
pub struct JsonlStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create store directory {}", dir.display()))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn thread_path(&self, thread_id: &str) -> Result<PathBuf> {
        if thread_id.is_empty() {
            return Err(anyhow!("Thread id must not be empty"));
        }
        Ok(self
            .dir
            .join(format!("{}.{}", urlencoding::encode(thread_id), EXTENSION)))
    }
}

#[async_trait]
impl ConversationStore for JsonlStore {
    async fn get_or_create(&self, thread_id: &str) -> Result<bool> {
        let path = self.thread_path(thread_id)?;
        let _guard = self.write_lock.lock().await;
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(_) => {
                tracing::debug!(thread_id, "created conversation file");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to create {}", path.display())),
        }
    }

    async fn get_history(&self, thread_id: &str) -> Result<Vec<Message>> {
        let path = self.thread_path(thread_id)?;
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(i, line)| {
                serde_json::from_str::<Message>(line).with_context(|| {
                    format!("Corrupt message on line {} of {}", i + 1, path.display())
                })
            })
            .collect()
    }

    async fn append_all(&self, thread_id: &str, messages: Vec<Message>) -> Result<()> {
        let path = self.thread_path(thread_id)?;
        let mut lines = String::new();
        for message in &messages {
            lines.push_str(&serde_json::to_string(message)?);
            lines.push('\n');
        }
        if lines.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        file.write_all(lines.as_bytes())
            .await
            .with_context(|| format!("Failed to append to {}", path.display()))?;
        file.flush().await?;
        Ok(())
    }

    async fn thread_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(urlencoding::decode(stem)?.into_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
