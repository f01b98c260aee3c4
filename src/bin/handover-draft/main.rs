//! CLI tool to inspect and convert inspection drafts.
//!
//! Usage:
//!   handover-draft show job-1042.handover
//!   handover-draft export job-1042.handover [--output record.json]
//!   handover-draft import state.json [--output job-1042.handover] [--validate]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use handover::draft::compression::{compress, maybe_decompress};
use handover::draft::file::DRAFT_EXTENSION;
use handover::{InspectionManager, InspectionRoot, StepStatus, WorkflowConfig};

#[derive(Parser, Debug)]
#[command(
    name = "handover-draft",
    about = "Inspect and convert vehicle inspection drafts",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Workflow policy as JSON (e.g. '{"require_other_notes": true}')
    #[arg(long, global = true)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print progress and step badges of a draft
    Show {
        /// Draft file (gzip or plain Automerge)
        draft: PathBuf,
    },

    /// Write the finished-record JSON for a draft
    Export {
        draft: PathBuf,

        /// Output file path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a JSON workflow state into a draft file
    Import {
        /// JSON file holding an inspection state
        input: PathBuf,

        /// Output file path (defaults to input path with .handover extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Validate output by hydrating back to structs
        #[arg(long, default_value = "false")]
        validate: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config: WorkflowConfig = match &args.config {
        Some(json) => serde_json::from_str(json).context("Invalid --config JSON")?,
        None => WorkflowConfig::default(),
    };

    match args.command {
        Command::Show { draft } => show(&draft, config),
        Command::Export { draft, output } => export(&draft, output.as_deref(), config),
        Command::Import {
            input,
            output,
            validate,
        } => import(&input, output, validate, config),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_draft(path: &Path, config: WorkflowConfig) -> Result<InspectionManager> {
    let raw = std::fs::read(path)
        .with_context(|| format!("Failed to read draft {}", path.display()))?;
    let bytes = maybe_decompress(raw).context("Failed to decompress draft")?;
    InspectionManager::from_bytes(&bytes, config).context("Failed to load draft document")
}

fn show(path: &Path, config: WorkflowConfig) -> Result<()> {
    let mut manager = load_draft(path, config)?;
    let state = manager.get_state().context("Failed to hydrate draft")?;
    let summary = manager.summary().context("Failed to build summary")?;

    println!("Job:      {} ({})", summary.job_id, summary.kind);
    match (state.cursor.step, state.cursor.sub_section) {
        (Some(step), Some(section)) => println!("Cursor:   {} / {}", step, section),
        (Some(step), None) => println!("Cursor:   {}", step),
        (None, _) => println!("Cursor:   overview"),
    }
    println!();
    for (step, status) in &summary.steps {
        let badge = match status {
            StepStatus::Complete => "✓",
            StepStatus::Continue => "→",
            StepStatus::NotStarted => " ",
        };
        println!("  [{}] {}", badge, step);
    }
    println!();
    println!("  Steps complete: {}/{}", summary.completed_steps, summary.steps.len());
    println!("  Photos:         {}", summary.photo_count);
    println!("  Markers:        {}", summary.marker_count);
    for (severity, count) in &summary.markers_by_severity {
        println!("    {:<10} {}", severity.as_str(), count);
    }

    let incomplete = summary.incomplete_sections();
    if !incomplete.is_empty() {
        println!();
        println!("Sections still needing photos:");
        for section in incomplete {
            println!("  {}", section);
        }
    }
    Ok(())
}

fn export(path: &Path, output: Option<&Path>, config: WorkflowConfig) -> Result<()> {
    let mut manager = load_draft(path, config)?;
    let record = manager.to_record().context("Failed to build record")?;
    let json = serde_json::to_string_pretty(&record).context("Failed to serialize record")?;

    match output {
        Some(out) => {
            std::fs::write(out, json).context("Failed to write output file")?;
            eprintln!("Exported {} → {}", path.display(), out.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn import(
    input: &Path,
    output: Option<PathBuf>,
    validate: bool,
    config: WorkflowConfig,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }

    let json = std::fs::read_to_string(input).context("Failed to read input file")?;
    let root: InspectionRoot = serde_json::from_str(&json).context("Failed to parse JSON")?;
    if root.job_id.trim().is_empty() {
        anyhow::bail!("Input state has no job_id");
    }
    let job_id = root.job_id.clone();
    let marker_count = root.marker_count();

    let mut manager = InspectionManager::from_state(root, config.clone())
        .context("Failed to build Automerge document")?;
    let binary = manager.save();

    if validate {
        let mut loaded = InspectionManager::from_bytes(&binary, config)
            .context("Failed to load binary for validation")?;
        let hydrated = loaded
            .get_state()
            .context("Failed to hydrate for validation")?;
        if hydrated.marker_count() != marker_count {
            anyhow::bail!(
                "Validation failed: marker count mismatch (expected {}, got {})",
                marker_count,
                hydrated.marker_count()
            );
        }
        println!("✓ Validation passed!");
    }

    let output_path = output.unwrap_or_else(|| input.with_extension(DRAFT_EXTENSION));
    let compressed = compress(&binary).context("Failed to compress draft")?;
    std::fs::write(&output_path, &compressed).context("Failed to write output file")?;

    println!(
        "Imported job {} ({} markers): {} → {} ({} bytes)",
        job_id,
        marker_count,
        input.display(),
        output_path.display(),
        compressed.len()
    );
    Ok(())
}
