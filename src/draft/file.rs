//! Local draft files.
//!
//! One gzip-compressed Automerge file per job: `{dir}/{hex(job_id)}.handover`.
//! The stem is the hex of the id's UTF-8 bytes, so any id maps to a distinct
//! file on every filesystem and the id can be read back from the name.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::compression::{compress, maybe_decompress};
use super::DraftStore;
use crate::error::HandoverResult;

/// Extension of local draft files.
pub const DRAFT_EXTENSION: &str = "handover";

/// Draft store backed by a directory.
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the draft file for a job.
    pub fn path_for(&self, job_id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", hex::encode(job_id), DRAFT_EXTENSION))
    }

    /// Job ids of every draft in the directory, sorted.
    pub async fn list_job_ids(&self) -> HandoverResult<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DRAFT_EXTENSION) {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()).and_then(job_id_from_stem) {
                Some(id) => ids.push(id),
                None => debug!(path = %path.display(), "skipping draft with unreadable name"),
            }
        }
        ids.sort();
        Ok(ids)
    }
}

fn job_id_from_stem(stem: &str) -> Option<String> {
    let bytes = hex::decode(stem).ok()?;
    String::from_utf8(bytes).ok()
}

#[async_trait]
impl DraftStore for FileDraftStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn save(&self, job_id: &str, draft: &[u8]) -> HandoverResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(job_id);
        let tmp = path.with_extension(format!("{}.tmp", DRAFT_EXTENSION));
        tokio::fs::write(&tmp, compress(draft)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn load(&self, job_id: &str) -> HandoverResult<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(job_id)).await {
            Ok(bytes) => Ok(Some(maybe_decompress(bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, job_id: &str) -> HandoverResult<()> {
        match tokio::fs::remove_file(self.path_for(job_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
