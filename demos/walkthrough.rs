//! End-to-end collection inspection.
//!
//! Walks one job through every step, loses connectivity halfway, reopens the
//! session from the drafts and submits.
//!
//! Run with: cargo run --example walkthrough

use async_trait::async_trait;
use handover::{
    DamageType, DraftStore, HandoverKind, HandoverResult, InspectionRecord, InspectionSession,
    MarkerPosition, MemoryDraftStore, Section, Severity, Step, Submitter, TyreCondition,
    WorkflowConfig,
};
use std::sync::Arc;
use std::time::Duration;

const JOB: &str = "job-1042";

struct PrintSubmitter;

#[async_trait]
impl Submitter for PrintSubmitter {
    async fn submit(&self, job_id: &str, record: &InspectionRecord) -> HandoverResult<()> {
        println!(
            "  submitted {}: {} photos, {} markers",
            job_id,
            record.photo_count(),
            record.markers.len()
        );
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> HandoverResult<()> {
    println!("========================================");
    println!(" Handover walkthrough ({})", JOB);
    println!("========================================\n");

    let remote = Arc::new(MemoryDraftStore::new("remote"));
    let local = Arc::new(MemoryDraftStore::new("local"));
    let config = WorkflowConfig::default().with_autosave_delay(Duration::from_millis(200));

    // -------------------------------------------------------------------------
    // 1. Documentation and exterior
    // -------------------------------------------------------------------------
    let mut session = InspectionSession::open(
        JOB,
        HandoverKind::Collection,
        config.clone(),
        remote.clone(),
        local.clone(),
    )
    .await?;

    session.edit(|m| {
        m.open_step(Step::Documentation)?;
        m.set_v5_document(Some(true))?;
        m.set_service_documents(Some(true))?;
        m.set_locking_wheel_nut(Some(false))?;
        m.advance()
    })?;
    println!("Documentation done");

    for section in Section::EXTERIOR {
        session.edit(|m| m.add_photo(*section, format!("{}.jpg", section)))?;
    }
    let marker = session.edit(|m| {
        m.mark_damage(Section::DriverSide, MarkerPosition::from_tap(120.0, 80.0, 400.0, 200.0))?;
        m.add_damage_photo("driver-door-scratch.jpg")?;
        m.continue_damage()?;
        m.choose_damage_type(DamageType::Scratch)?;
        m.choose_damage_size(Severity::Moderate)?;
        m.set_damage_description("Rear door, 10cm")?;
        m.complete_damage()
    })?;
    println!(
        "Marker #{} on {} at ({:.0}%, {:.0}%)",
        marker.number, marker.section, marker.position.x, marker.position.y
    );
    session.edit(|m| m.advance())?;
    session.flush().await;
    println!("Exterior done; remote draft written");

    // -------------------------------------------------------------------------
    // 2. Connectivity drops during wheels
    // -------------------------------------------------------------------------
    remote.set_offline(true);
    for wheel in Section::WHEELS {
        session.edit(|m| {
            m.add_photo(*wheel, format!("{}.jpg", wheel))?;
            m.set_tyre_condition(*wheel, Some(TyreCondition::Good))
        })?;
    }
    session.close().await;
    println!("Wheels done offline; only the local draft has them\n");

    // -------------------------------------------------------------------------
    // 3. Reopen: the newer local draft wins
    // -------------------------------------------------------------------------
    remote.set_offline(false);
    let mut session =
        InspectionSession::open(JOB, HandoverKind::Collection, config, remote.clone(), local.clone())
            .await?;
    let statuses = session.manager().step_statuses()?;
    for (step, status) in &statuses {
        println!("  {:<14} {:?}", step.as_str(), status);
    }

    session.edit(|m| {
        m.open_step(Step::Interior)?;
        for section in Section::INTERIOR {
            m.add_photo(*section, format!("{}.jpg", section))?;
        }
        m.advance()?;
        m.set_mileage(Some(48_210))?;
        m.set_keys_count(Some(2))?;
        m.advance()?;
        m.set_customer_signature("data:image/png;base64,Y3VzdG9tZXI=")?;
        m.set_driver_signature("data:image/png;base64,ZHJpdmVy")?;
        m.set_customer_name(Some("A. Customer"))
    })?;

    // -------------------------------------------------------------------------
    // 4. Submit
    // -------------------------------------------------------------------------
    println!();
    let record = session.submit(&PrintSubmitter).await?;
    session.close().await;

    let drafts_left = remote.load(JOB).await?.is_some() || local.load(JOB).await?.is_some();
    println!("  completed_at: {}", record.completed_at);
    println!("  drafts left:  {}", drafts_left);
    Ok(())
}
