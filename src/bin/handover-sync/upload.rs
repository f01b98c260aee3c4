//! Upload orchestration

use handover::draft::remote::{ClientError, RemoteClient};
use handover::{DraftStore, FileDraftStore, HandoverError, InspectionManager, WorkflowConfig};
use std::time::Duration;
use tracing::{debug, warn};

/// Upload errors
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Client error: {0}")]
    Client(#[from] ClientError),
    #[error("Draft error: {0}")]
    Draft(#[from] HandoverError),
    #[error("Draft is for job '{0}'")]
    WrongJob(String),
}

/// Options shared by every upload
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub retries: u32,
    pub backoff: Duration,
    pub force: bool,
    pub prune: bool,
}

/// Result of a single draft upload
#[derive(Debug)]
pub struct UploadResult {
    pub job_id: String,
    pub success: bool,
    pub skipped: bool,
    pub error: Option<String>,
    pub size: usize,
    pub attempts: u32,
}

impl UploadResult {
    fn new(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            success: false,
            skipped: false,
            error: None,
            size: 0,
            attempts: 0,
        }
    }
}

/// Delay before retry `attempt` (1-based): base, 2x base, 4x base, ...
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
}

/// Reads a draft and returns it with its `last_updated`.
fn decode(job_id: &str, bytes: &[u8]) -> Result<i64, UploadError> {
    let mut manager = InspectionManager::from_bytes(bytes, WorkflowConfig::default())?;
    let state = manager.get_state()?;
    if state.job_id != job_id {
        return Err(UploadError::WrongJob(state.job_id));
    }
    Ok(state.last_updated)
}

/// Upload a single local draft
pub async fn upload_draft(
    client: &RemoteClient,
    store: &FileDraftStore,
    job_id: &str,
    options: &UploadOptions,
) -> UploadResult {
    let mut result = UploadResult::new(job_id);

    // 1. Read local draft
    let bytes = match store.load(job_id).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            result.error = Some("Draft disappeared".to_string());
            return result;
        }
        Err(e) => {
            result.error = Some(format!("Failed to read draft: {}", e));
            return result;
        }
    };
    result.size = bytes.len();

    // 2. Validate it is a draft for this job
    let local_updated = match decode(job_id, &bytes) {
        Ok(updated) => updated,
        Err(e) => {
            result.error = Some(format!("Invalid draft: {}", e));
            return result;
        }
    };

    // 3. Never replace a newer remote draft unless forced
    if !options.force {
        match client.get_draft(job_id).await {
            Ok(Some(remote)) => match decode(job_id, &remote) {
                Ok(remote_updated) if remote_updated >= local_updated => {
                    debug!(job_id, remote_updated, local_updated, "remote draft is current");
                    result.success = true;
                    result.skipped = true;
                    return result;
                }
                Ok(_) => {}
                Err(e) => warn!(job_id, error = %e, "remote draft unreadable; replacing it"),
            },
            Ok(None) => {}
            Err(e) => warn!(job_id, error = %e, "could not fetch remote draft; uploading anyway"),
        }
    }

    // 4. Upload with retries
    loop {
        result.attempts += 1;
        match client.put_draft(job_id, bytes.clone()).await {
            Ok(()) => break,
            Err(e) if result.attempts <= options.retries => {
                let delay = backoff_delay(options.backoff, result.attempts);
                warn!(job_id, attempt = result.attempts, error = %e, ?delay, "upload failed; retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                result.error = Some(format!("Upload failed after {} attempts: {}", result.attempts, e));
                return result;
            }
        }
    }

    // 5. Remove the local copy if asked
    if options.prune {
        if let Err(e) = store.delete(job_id).await {
            warn!(job_id, error = %e, "uploaded but could not prune local draft");
        }
    }

    result.success = true;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 4), Duration::from_secs(4));
    }

    #[test]
    fn test_decode_rejects_other_job() {
        let mut manager = InspectionManager::new(
            "job-2",
            handover::HandoverKind::Delivery,
            WorkflowConfig::default(),
        )
        .unwrap();
        let bytes = manager.save();
        assert!(decode("job-2", &bytes).is_ok());
        assert!(matches!(decode("job-1", &bytes), Err(UploadError::WrongJob(id)) if id == "job-2"));
    }
}
