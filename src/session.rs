//! A driver's open inspection: state, auto-save and submission.
//!
//! `InspectionSession` owns the [`InspectionManager`] for one job and the
//! [`AutoSaver`] that mirrors it to the draft stores. Every edit that
//! changes the document schedules a snapshot; submission from the signature step hands the
//! finished record to a [`Submitter`] and clears the drafts.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::WorkflowConfig;
use crate::draft::compression::maybe_decompress;
use crate::draft::{AutoSaver, DraftStore};
use crate::error::{HandoverError, HandoverResult};
use crate::inspection::{
    predicate, HandoverKind, InspectionManager, InspectionRecord, Section, Step,
};
use crate::photo::PhotoSource;

/// Receives finished inspections (the jobs API in production).
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, job_id: &str, record: &InspectionRecord) -> HandoverResult<()>;
}

/// One job's inspection as the driver works through it.
pub struct InspectionSession {
    job_id: String,
    manager: InspectionManager,
    saver: AutoSaver,
    remote: Arc<dyn DraftStore>,
    local: Arc<dyn DraftStore>,
    submitted: bool,
}

impl InspectionSession {
    /// Opens the inspection for a job.
    ///
    /// Both stores are read and the draft with the latest `last_updated`
    /// wins, so edits saved only locally while offline are not lost. Missing,
    /// unreadable or foreign drafts are skipped; with none left the
    /// inspection starts empty.
    pub async fn open(
        job_id: &str,
        kind: HandoverKind,
        config: WorkflowConfig,
        remote: Arc<dyn DraftStore>,
        local: Arc<dyn DraftStore>,
    ) -> HandoverResult<Self> {
        let from_remote = load_draft(remote.as_ref(), job_id, &config).await;
        let from_local = load_draft(local.as_ref(), job_id, &config).await;

        let manager = match (from_remote, from_local) {
            (Some((r, r_updated)), Some((l, l_updated))) => {
                // Local is always written after remote, so it wins ties.
                if l_updated >= r_updated {
                    info!(job_id, "resuming local draft");
                    l
                } else {
                    info!(job_id, "resuming remote draft");
                    r
                }
            }
            (Some((r, _)), None) => {
                info!(job_id, "resuming remote draft");
                r
            }
            (None, Some((l, _))) => {
                info!(job_id, "resuming local draft");
                l
            }
            (None, None) => {
                info!(job_id, kind = %kind, "starting new inspection");
                InspectionManager::new(job_id, kind, config.clone())?
            }
        };

        let saver = AutoSaver::spawn(job_id, remote.clone(), local.clone(), config.autosave_delay());

        Ok(Self {
            job_id: job_id.to_string(),
            manager,
            saver,
            remote,
            local,
            submitted: false,
        })
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// The underlying manager, for reads.
    ///
    /// Changes made through this reference are not scheduled for saving;
    /// use [`edit`](Self::edit) for those.
    pub fn manager(&mut self) -> &mut InspectionManager {
        &mut self.manager
    }

    /// Runs a driver action and schedules an auto-save if it changed the
    /// document.
    ///
    /// The save is scheduled even when the action fails part way, since the
    /// steps it completed before the error are already in the document.
    /// Actions that only move the damage capture along write nothing.
    pub fn edit<F, T>(&mut self, f: F) -> HandoverResult<T>
    where
        F: FnOnce(&mut InspectionManager) -> HandoverResult<T>,
    {
        if self.submitted {
            return Err(HandoverError::AlreadySubmitted(self.job_id.clone()));
        }
        let before = self.manager.heads();
        let out = f(&mut self.manager);
        if self.manager.heads() != before {
            self.saver.schedule(self.manager.save());
        }
        out
    }

    /// Takes a photo and appends it to a section.
    pub async fn capture_photo(
        &mut self,
        source: &dyn PhotoSource,
        section: Section,
    ) -> HandoverResult<()> {
        let photo = source.capture().await?;
        self.edit(|m| m.add_photo(section, photo))
    }

    /// Takes a photo for the damage marker being captured.
    pub async fn capture_damage_photo(&mut self, source: &dyn PhotoSource) -> HandoverResult<()> {
        let photo = source.capture().await?;
        self.edit(|m| m.add_damage_photo(photo))
    }

    /// Writes any pending snapshot now.
    pub async fn flush(&self) {
        self.saver.flush().await;
    }

    /// Submits the finished inspection from the signature step.
    ///
    /// On failure nothing is cleared and the driver can retry. On success the
    /// drafts are deleted and the record is returned for the completion
    /// screen.
    pub async fn submit(&mut self, submitter: &dyn Submitter) -> HandoverResult<InspectionRecord> {
        if self.submitted {
            return Err(HandoverError::AlreadySubmitted(self.job_id.clone()));
        }
        if self.manager.cursor()?.step != Some(Step::Signature) {
            return Err(HandoverError::NotOnStep(Step::Signature));
        }
        let state = self.manager.get_state()?;
        if !predicate::is_step_satisfied(Step::Signature, &state, self.manager.config()) {
            return Err(HandoverError::StepIncomplete(Step::Signature));
        }

        let record = self.manager.to_record()?;
        submitter.submit(&self.job_id, &record).await?;

        // Drain the save task before deleting so no write lands afterwards.
        self.saver.discard();
        self.saver.flush().await;
        for store in [&self.remote, &self.local] {
            if let Err(e) = store.delete(&self.job_id).await {
                warn!(job_id = %self.job_id, store = store.name(), error = %e, "failed to clear draft");
            }
        }
        self.submitted = true;
        info!(
            job_id = %self.job_id,
            markers = record.markers.len(),
            photos = record.photo_count(),
            "inspection submitted"
        );
        Ok(record)
    }

    /// Saves the final state (unless submitted) and stops the save task.
    pub async fn close(mut self) {
        if !self.submitted {
            self.saver.schedule(self.manager.save());
        }
        debug!(job_id = %self.job_id, "closing inspection");
        self.saver.shutdown().await;
    }
}

/// Loads and validates one store's draft, with its `last_updated`.
async fn load_draft(
    store: &dyn DraftStore,
    job_id: &str,
    config: &WorkflowConfig,
) -> Option<(InspectionManager, i64)> {
    let bytes = match store.load(job_id).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return None,
        Err(e) => {
            warn!(job_id, store = store.name(), error = %e, "could not load draft");
            return None;
        }
    };

    let decoded = maybe_decompress(bytes)
        .map_err(HandoverError::from)
        .and_then(|bytes| InspectionManager::from_bytes(&bytes, config.clone()));
    let mut manager = match decoded {
        Ok(manager) => manager,
        Err(e) => {
            warn!(job_id, store = store.name(), error = %e, "ignoring corrupt draft");
            return None;
        }
    };

    match manager.get_state() {
        Ok(state) if state.job_id == job_id => Some((manager, state.last_updated)),
        Ok(state) => {
            let e = HandoverError::job_mismatch(job_id, state.job_id);
            warn!(store = store.name(), error = %e, "ignoring draft");
            None
        }
        Err(e) => {
            warn!(job_id, store = store.name(), error = %e, "ignoring corrupt draft");
            None
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::MemoryDraftStore;
    use crate::inspection::{InspectionRoot, PhotoRef};
    use parking_lot::Mutex;
    use std::time::Duration;

    struct Stores {
        remote: Arc<MemoryDraftStore>,
        local: Arc<MemoryDraftStore>,
    }

    impl Stores {
        fn new() -> Self {
            Self {
                remote: Arc::new(MemoryDraftStore::new("remote")),
                local: Arc::new(MemoryDraftStore::new("local")),
            }
        }

        async fn open(&self, job_id: &str) -> InspectionSession {
            InspectionSession::open(
                job_id,
                HandoverKind::Collection,
                WorkflowConfig::default(),
                self.remote.clone(),
                self.local.clone(),
            )
            .await
            .unwrap()
        }
    }

    fn draft(job_id: &str, notes: &str, last_updated: i64) -> Vec<u8> {
        let mut root = InspectionRoot::new(job_id, HandoverKind::Collection);
        root.other.notes = notes.to_string();
        root.last_updated = last_updated;
        InspectionManager::from_state(root, WorkflowConfig::default())
            .unwrap()
            .save()
    }

    fn notes(session: &mut InspectionSession) -> String {
        session.manager().get_state().unwrap().other.notes
    }

    #[derive(Default)]
    struct RecordingSubmitter {
        fail: bool,
        received: Mutex<Vec<InspectionRecord>>,
    }

    #[async_trait]
    impl Submitter for RecordingSubmitter {
        async fn submit(&self, _job_id: &str, record: &InspectionRecord) -> HandoverResult<()> {
            if self.fail {
                return Err(HandoverError::submission("503 Service Unavailable"));
            }
            self.received.lock().push(record.clone());
            Ok(())
        }
    }

    struct FixedCamera(Option<&'static str>);

    #[async_trait]
    impl PhotoSource for FixedCamera {
        async fn capture(&self) -> HandoverResult<PhotoRef> {
            self.0
                .map(PhotoRef::from)
                .ok_or_else(|| HandoverError::photo("camera unavailable"))
        }
    }

    async fn signed_session(stores: &Stores) -> InspectionSession {
        let mut session = stores.open("job-1").await;
        session
            .edit(|m| {
                m.open_step(Step::Signature)?;
                m.set_customer_signature("data:image/png;base64,Yw==")?;
                m.set_driver_signature("data:image/png;base64,ZA==")
            })
            .unwrap();
        session.flush().await;
        session
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_without_drafts_starts_empty() {
        let stores = Stores::new();
        let mut session = stores.open("job-1").await;
        let state = session.manager().get_state().unwrap();
        assert_eq!(state.job_id, "job-1");
        assert!(state.cursor.is_overview());
        assert_eq!(state.marker_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_prefers_newest_draft() {
        let stores = Stores::new();
        stores.remote.save("job-1", &draft("job-1", "remote", 100)).await.unwrap();
        stores.local.save("job-1", &draft("job-1", "local", 200)).await.unwrap();
        assert_eq!(notes(&mut stores.open("job-1").await), "local");

        stores.remote.save("job-1", &draft("job-1", "remote", 300)).await.unwrap();
        assert_eq!(notes(&mut stores.open("job-1").await), "remote");
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_skips_bad_drafts() {
        let stores = Stores::new();
        stores.remote.save("job-1", b"garbage").await.unwrap();
        stores.local.save("job-1", &draft("job-1", "local", 1)).await.unwrap();
        assert_eq!(notes(&mut stores.open("job-1").await), "local");

        // A draft for another job is never adopted.
        stores.local.save("job-1", &draft("job-9", "foreign", 1)).await.unwrap();
        let mut session = stores.open("job-1").await;
        assert_eq!(notes(&mut session), "");
        assert_eq!(session.manager().job_id().unwrap(), "job-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_with_remote_offline_uses_local() {
        let stores = Stores::new();
        stores.local.save("job-1", &draft("job-1", "offline edits", 5)).await.unwrap();
        stores.remote.set_offline(true);
        assert_eq!(notes(&mut stores.open("job-1").await), "offline edits");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_write_once_with_final_state() {
        let stores = Stores::new();
        let mut session = stores.open("job-1").await;

        for i in 1..=5 {
            session.edit(|m| m.set_notes(&format!("note {}", i))).unwrap();
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(stores.remote.write_count("job-1"), 1);
        let saved = stores.remote.get("job-1").unwrap();
        let mut restored = InspectionManager::from_bytes(&saved, WorkflowConfig::default()).unwrap();
        assert_eq!(restored.get_state().unwrap().other.notes, "note 5");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_edit_schedules_nothing() {
        let stores = Stores::new();
        let mut session = stores.open("job-1").await;
        assert!(session.edit(|m| m.advance()).is_err());
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(stores.local.write_count("job-1"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partly_applied_edit_is_saved() {
        let stores = Stores::new();
        let mut session = stores.open("job-1").await;
        let result = session.edit(|m| {
            m.add_photo(Section::Front, "front.jpg")?;
            m.open_step(Step::Exterior)?;
            m.advance()
        });
        assert!(matches!(result, Err(HandoverError::StepIncomplete(_))));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(stores.remote.write_count("job-1"), 1);
        assert_eq!(stores.local.write_count("job-1"), 1);

        session.close().await;
        let mut reopened = stores.open("job-1").await;
        let state = reopened.manager().get_state().unwrap();
        assert_eq!(state.section_photos(Section::Front), ["front.jpg".to_string()]);
        assert_eq!(state.cursor.step, Some(Step::Exterior));
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_steps_schedule_nothing() {
        let stores = Stores::new();
        let mut session = stores.open("job-1").await;
        session
            .edit(|m| {
                m.mark_damage(Section::Rear, crate::inspection::MarkerPosition::new(20.0, 30.0))?;
                m.add_damage_photo("rear-dent.jpg")?;
                m.continue_damage()
            })
            .unwrap();

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(stores.remote.write_count("job-1"), 0);
        assert_eq!(stores.local.write_count("job-1"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reopen_restores_saved_work() {
        let stores = Stores::new();
        let mut session = stores.open("job-1").await;
        session
            .edit(|m| {
                m.open_step(Step::Exterior)?;
                m.open_sub_section(Section::Roof)?;
                m.add_photo(Section::Roof, "roof.jpg")
            })
            .unwrap();
        session.close().await;

        let mut reopened = stores.open("job-1").await;
        let state = reopened.manager().get_state().unwrap();
        assert_eq!(state.cursor.sub_section, Some(Section::Roof));
        assert_eq!(state.section_photos(Section::Roof), ["roof.jpg".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_photo_failure_appends_nothing() {
        let stores = Stores::new();
        let mut session = stores.open("job-1").await;

        session.capture_photo(&FixedCamera(Some("front.jpg")), Section::Front).await.unwrap();
        let err = session.capture_photo(&FixedCamera(None), Section::Front).await;
        assert!(matches!(err, Err(HandoverError::Photo(_))));
        assert_eq!(session.manager().section_photos(Section::Front).unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_requires_signature_step() {
        let stores = Stores::new();
        let mut session = stores.open("job-1").await;
        let submitter = RecordingSubmitter::default();

        assert!(matches!(
            session.submit(&submitter).await,
            Err(HandoverError::NotOnStep(Step::Signature))
        ));
        session.edit(|m| m.open_step(Step::Signature)).unwrap();
        assert!(matches!(
            session.submit(&submitter).await,
            Err(HandoverError::StepIncomplete(Step::Signature))
        ));
        assert!(submitter.received.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_submission_keeps_everything() {
        let stores = Stores::new();
        let mut session = signed_session(&stores).await;
        let submitter = RecordingSubmitter {
            fail: true,
            ..Default::default()
        };

        assert!(matches!(
            session.submit(&submitter).await,
            Err(HandoverError::Submission(_))
        ));
        assert!(!session.is_submitted());
        assert!(stores.remote.get("job-1").is_some());
        assert!(stores.local.get("job-1").is_some());
        assert!(session.manager().get_state().unwrap().signatures.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_submission_clears_drafts() {
        let stores = Stores::new();
        let mut session = signed_session(&stores).await;
        session.edit(|m| m.set_notes("pending edit")).unwrap();
        let submitter = RecordingSubmitter::default();

        let record = session.submit(&submitter).await.unwrap();
        assert_eq!(record.job_id, "job-1");
        assert_eq!(submitter.received.lock().len(), 1);
        assert!(session.is_submitted());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(stores.remote.get("job-1"), None);
        assert_eq!(stores.local.get("job-1"), None);

        assert!(matches!(
            session.edit(|m| m.set_notes("late")),
            Err(HandoverError::AlreadySubmitted(_))
        ));
        session.close().await;
        assert_eq!(stores.local.get("job-1"), None);
    }
}
