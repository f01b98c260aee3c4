//! Draft persistence.
//!
//! A draft is the saved Automerge document of an in-progress inspection,
//! keyed by job id. Stores are interchangeable behind [`DraftStore`]; the
//! session writes to a remote store and a local fallback through the
//! debounced [`AutoSaver`].

pub mod autosave;
pub mod compression;
#[cfg(not(target_arch = "wasm32"))]
pub mod file;
#[cfg(feature = "remote")]
pub mod remote;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{HandoverError, HandoverResult};

pub use autosave::AutoSaver;
#[cfg(not(target_arch = "wasm32"))]
pub use file::FileDraftStore;
#[cfg(feature = "remote")]
pub use remote::RemoteClient;

/// Key-value persistence for drafts.
#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Stores the draft for a job, replacing any previous one.
    async fn save(&self, job_id: &str, draft: &[u8]) -> HandoverResult<()>;

    /// Loads the draft for a job. Absence is not an error.
    async fn load(&self, job_id: &str) -> HandoverResult<Option<Vec<u8>>>;

    /// Removes the draft for a job. Removing a missing draft succeeds.
    async fn delete(&self, job_id: &str) -> HandoverResult<()>;
}

/// In-process draft store.
///
/// Can be switched offline to simulate connectivity loss.
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    name: String,
    drafts: Mutex<HashMap<String, Vec<u8>>>,
    writes: Mutex<HashMap<String, usize>>,
    offline: AtomicBool,
}

impl MemoryDraftStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// While offline every operation fails with a storage error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of successful saves for a job.
    pub fn write_count(&self, job_id: &str) -> usize {
        self.writes.lock().get(job_id).copied().unwrap_or(0)
    }

    /// Current draft for a job, bypassing the offline switch.
    pub fn get(&self, job_id: &str) -> Option<Vec<u8>> {
        self.drafts.lock().get(job_id).cloned()
    }

    fn check_online(&self) -> HandoverResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(HandoverError::storage(format!("{} is offline", self.name)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn save(&self, job_id: &str, draft: &[u8]) -> HandoverResult<()> {
        self.check_online()?;
        self.drafts.lock().insert(job_id.to_string(), draft.to_vec());
        *self.writes.lock().entry(job_id.to_string()).or_insert(0) += 1;
        Ok(())
    }

    async fn load(&self, job_id: &str) -> HandoverResult<Option<Vec<u8>>> {
        self.check_online()?;
        Ok(self.drafts.lock().get(job_id).cloned())
    }

    async fn delete(&self, job_id: &str) -> HandoverResult<()> {
        self.check_online()?;
        self.drafts.lock().remove(job_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryDraftStore::new("memory");
        assert_eq!(store.load("job-1").await.unwrap(), None);

        store.save("job-1", b"v1").await.unwrap();
        store.save("job-1", b"v2").await.unwrap();
        assert_eq!(store.load("job-1").await.unwrap(), Some(b"v2".to_vec()));
        assert_eq!(store.write_count("job-1"), 2);

        store.delete("job-1").await.unwrap();
        store.delete("job-1").await.unwrap();
        assert_eq!(store.load("job-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_offline() {
        let store = MemoryDraftStore::new("remote");
        store.set_offline(true);
        let err = store.save("job-1", b"v1").await.unwrap_err();
        assert!(matches!(err, HandoverError::Storage(_)));
        assert_eq!(store.write_count("job-1"), 0);

        store.set_offline(false);
        store.save("job-1", b"v1").await.unwrap();
        assert_eq!(store.get("job-1"), Some(b"v1".to_vec()));
    }
}
