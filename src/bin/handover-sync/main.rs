//! Draft sync CLI tool
//!
//! Uploads inspection drafts saved locally while the device was offline.
//!
//! Usage:
//!   handover-sync --base-url https://api.example.com --token "..." [OPTIONS]

mod upload;

use clap::Parser;
use handover::{FileDraftStore, RemoteClient};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "handover-sync",
    about = "Upload local inspection drafts to the jobs API",
    version
)]
struct Args {
    /// Backend API base URL
    #[arg(short = 'b', long, env = "HANDOVER_API_URL")]
    base_url: String,

    /// Auth token (or set HANDOVER_TOKEN env var)
    #[arg(short = 't', long, env = "HANDOVER_TOKEN", default_value = "")]
    token: String,

    /// Read auth token from file
    #[arg(long)]
    token_file: Option<PathBuf>,

    /// Directory holding local drafts
    #[arg(short = 'd', long, env = "HANDOVER_DRAFT_DIR", default_value = "drafts")]
    draft_dir: PathBuf,

    /// Specific job IDs to upload
    #[arg(short = 'i', long)]
    ids: Vec<String>,

    /// List drafts without uploading
    #[arg(long)]
    dry_run: bool,

    /// Retries per draft after a failed upload
    #[arg(long, default_value_t = 3)]
    retry: u32,

    /// Base delay between retries, in milliseconds (doubles each retry)
    #[arg(long, default_value_t = 500)]
    backoff_ms: u64,

    /// Upload even when the remote draft is newer
    #[arg(long)]
    force: bool,

    /// Delete local drafts once uploaded
    #[arg(long)]
    prune: bool,

    /// Stop on first error
    #[arg(long)]
    abort_on_error: bool,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Resolve token
    let token = if let Some(token_file) = &args.token_file {
        std::fs::read_to_string(token_file)?.trim().to_string()
    } else {
        args.token.clone()
    };

    if token.is_empty() {
        anyhow::bail!("Auth token is required. Use --token or set HANDOVER_TOKEN env var.");
    }

    let store = FileDraftStore::new(&args.draft_dir);
    let client = RemoteClient::new(&args.base_url, &token)?;

    // Resolve target IDs
    let local_ids = store.list_job_ids().await?;
    println!("Found {} local drafts in {}", local_ids.len(), args.draft_dir.display());

    let mut target_ids = if args.ids.is_empty() {
        local_ids.clone()
    } else {
        args.ids.clone()
    };
    if !args.ids.is_empty() {
        let original_count = target_ids.len();
        target_ids.retain(|id| local_ids.contains(id));
        if target_ids.len() < original_count {
            println!(
                "Warning: {} of {} specified IDs have no local draft",
                original_count - target_ids.len(),
                original_count
            );
        }
    }

    // Dry run - just list
    if args.dry_run {
        println!("\nDry run - {} drafts would be uploaded:", target_ids.len());
        for id in &target_ids {
            println!("  {}", store.path_for(id).display());
        }
        return Ok(());
    }

    if target_ids.is_empty() {
        println!("No drafts to upload.");
        return Ok(());
    }

    let options = upload::UploadOptions {
        retries: args.retry,
        backoff: Duration::from_millis(args.backoff_ms),
        force: args.force,
        prune: args.prune,
    };

    // Progress bar
    let pb = ProgressBar::new(target_ids.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("=>-"),
    );

    let mut results = Vec::new();
    for id in &target_ids {
        pb.set_message(id.clone());

        let result = upload::upload_draft(&client, &store, id, &options).await;

        if args.verbose || !result.success {
            if result.skipped {
                pb.println(format!("SKIP: {} - remote draft is current", result.job_id));
            } else if result.success {
                pb.println(format!(
                    "OK: {} - {} bytes ({} attempt{})",
                    result.job_id,
                    result.size,
                    result.attempts,
                    if result.attempts == 1 { "" } else { "s" }
                ));
            } else {
                pb.println(format!(
                    "FAIL: {} - {}",
                    result.job_id,
                    result.error.as_deref().unwrap_or("Unknown error")
                ));
            }
        }

        if args.abort_on_error && !result.success {
            pb.finish_with_message("Aborted on error");
            return Err(anyhow::anyhow!(
                "Sync aborted: {}",
                result.error.unwrap_or_default()
            ));
        }

        results.push(result);
        pb.inc(1);
    }

    pb.finish_with_message("Done");

    // Summary
    let uploaded = results.iter().filter(|r| r.success && !r.skipped).count();
    let skipped = results.iter().filter(|r| r.skipped).count();
    let failed = results.iter().filter(|r| !r.success).count();
    let total_bytes: usize = results
        .iter()
        .filter(|r| r.success && !r.skipped)
        .map(|r| r.size)
        .sum();

    println!("\n========================================");
    println!("Sync Summary:");
    println!("========================================");
    println!("  Uploaded: {}", uploaded);
    println!("  Skipped:  {}", skipped);
    println!("  Failed:   {}", failed);
    println!("  Total:    {}", results.len());
    println!();
    println!("  Uploaded size: {} bytes", total_bytes);

    if failed > 0 {
        println!("\nFailed drafts:");
        for r in results.iter().filter(|r| !r.success) {
            println!("  {} - {}", r.job_id, r.error.as_deref().unwrap_or("Unknown"));
        }
        std::process::exit(1);
    }

    Ok(())
}
