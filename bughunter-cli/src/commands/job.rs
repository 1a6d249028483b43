//! Job command handlers
//!
//! Handles submitting repositories, following a job while it runs, and
//! inspecting finished jobs (details, logs, patch).

use anyhow::{Context, Result, bail};
use bughunter_client::BughunterClient;
use bughunter_core::domain::job::{Job, JobStatus};
use clap::Subcommand;
use colored::*;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::id_resolver::resolve_job_id;
use crate::types::IdOrPrefix;

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// Submit a repository and follow the job until it finishes
    Run {
        /// Git URL of the repository to remediate
        repo_url: String,

        /// Return right after submission instead of waiting
        #[arg(long)]
        no_wait: bool,

        /// Write the resulting patch to this file
        #[arg(long)]
        patch_out: Option<PathBuf>,
    },
    /// List all jobs
    List,
    /// Get job details
    Get {
        /// Job ID or unambiguous prefix
        id: String,

        /// Print the raw JSON snapshot
        #[arg(long)]
        json: bool,
    },
    /// Print job logs
    Logs {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// Print or save the job's patch
    Patch {
        /// Job ID or unambiguous prefix
        id: String,

        /// Write the patch to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Stop a running job
    Terminate {
        /// Job ID or unambiguous prefix
        id: String,
    },
}

/// Handle job commands
///
/// Routes job subcommands to their respective handlers.
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let client = BughunterClient::new(&config.server_url);

    match command {
        JobCommands::Run {
            repo_url,
            no_wait,
            patch_out,
        } => run_job(&client, config, &repo_url, no_wait, patch_out).await,
        JobCommands::List => list_jobs(&client).await,
        JobCommands::Get { id, json } => get_job(&client, &id, json).await,
        JobCommands::Logs { id } => get_job_logs(&client, &id).await,
        JobCommands::Patch { id, out } => get_job_patch(&client, &id, out).await,
        JobCommands::Terminate { id } => terminate_job(&client, &id).await,
    }
}

/// Submit a job and poll it to completion, streaming new log lines
async fn run_job(
    client: &BughunterClient,
    config: &Config,
    repo_url: &str,
    no_wait: bool,
    patch_out: Option<PathBuf>,
) -> Result<()> {
    let job = client
        .start_job(repo_url)
        .await
        .context("Failed to submit job")?;

    println!("{} Job {} submitted", "✓".green(), job.id.to_string().cyan());

    if no_wait {
        return Ok(());
    }

    let mut printed = 0;
    let mut last_status = None;
    let job = client
        .wait_for_job(job.id, config.poll_interval, |job| {
            if last_status != Some(job.status) {
                println!("{} {}", "▸".cyan(), colorize_status(job.status));
                last_status = Some(job.status);
            }
            for line in job.logs.iter().skip(printed) {
                println!("  {}", line.dimmed());
            }
            printed = printed.max(job.logs.len());
        })
        .await?;

    println!();
    print_job_details(&job);

    if let (Some(path), Some(patch)) = (patch_out, &job.patch) {
        write_patch(&path, patch)?;
    }

    if job.status != JobStatus::Done {
        bail!("Job {} ended {}", job.id, job.status);
    }
    Ok(())
}

/// List all jobs
async fn list_jobs(client: &BughunterClient) -> Result<()> {
    let jobs = client.list_jobs().await?;

    if jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
    } else {
        println!("{}", format!("Found {} job(s):", jobs.len()).bold());
        println!();
        for job in jobs {
            print_job_summary(&job);
        }
    }

    Ok(())
}

/// Get and display a single job
async fn get_job(client: &BughunterClient, id: &str, json: bool) -> Result<()> {
    let uuid = resolve_job_id(client, &IdOrPrefix::parse(id)).await?;
    let job = client.get_job(uuid).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&job)?);
    } else {
        print_job_details(&job);
    }

    Ok(())
}

/// Get and display job logs
async fn get_job_logs(client: &BughunterClient, id: &str) -> Result<()> {
    let uuid = resolve_job_id(client, &IdOrPrefix::parse(id)).await?;
    let job = client.get_job(uuid).await?;

    println!("{}", format!("Logs for job {}:", uuid).bold());
    println!("{}", "─".repeat(80).dimmed());
    for line in &job.logs {
        println!("{}", line);
    }
    println!("{}", "─".repeat(80).dimmed());

    Ok(())
}

async fn get_job_patch(client: &BughunterClient, id: &str, out: Option<PathBuf>) -> Result<()> {
    let uuid = resolve_job_id(client, &IdOrPrefix::parse(id)).await?;
    let job = client.get_job(uuid).await?;

    match (&job.patch, out) {
        (None, _) => {
            let note = if job.is_terminal() {
                "Job produced no patch."
            } else {
                "Job has not produced a patch yet."
            };
            println!("{}", note.yellow());
        }
        (Some(patch), Some(path)) => write_patch(&path, patch)?,
        (Some(patch), None) => print!("{}", patch),
    }

    Ok(())
}

async fn terminate_job(client: &BughunterClient, id: &str) -> Result<()> {
    let uuid = resolve_job_id(client, &IdOrPrefix::parse(id)).await?;

    match client.terminate_job(uuid).await {
        Ok(job) => {
            println!("{} Job {} {}", "✓".green(), job.id, colorize_status(job.status));
            Ok(())
        }
        Err(e) if e.is_conflict() => {
            println!("{} {}", "⚠".yellow(), e);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn write_patch(path: &Path, patch: &str) -> Result<()> {
    std::fs::write(path, patch)
        .with_context(|| format!("Failed to write patch to {}", path.display()))?;
    println!("{} Patch written to {}", "✓".green(), path.display());
    Ok(())
}

/// Print a one-job summary for listings
fn print_job_summary(job: &Job) {
    println!("  {} Job {}", "▸".cyan(), job.id.to_string().dimmed());
    println!("    Repository: {}", job.repo_url);
    println!("    Status:     {}", colorize_status(job.status));
    println!(
        "    Created:    {}",
        job.created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

/// Print detailed job information
fn print_job_details(job: &Job) {
    println!("{}", "Job Details:".bold());
    println!("  ID:         {}", job.id.to_string().cyan());
    println!("  Repository: {}", job.repo_url);
    println!("  Status:     {}", colorize_status(job.status));
    println!("  Created:    {}", job.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  Log lines:  {}", job.logs.len());

    match &job.patch {
        Some(patch) => println!(
            "  Patch:      {} ({} lines)",
            "yes".green(),
            patch.lines().count()
        ),
        None => println!("  Patch:      {}", "none".dimmed()),
    }

    if job.status == JobStatus::Failed {
        if let Some(last) = job.logs.last() {
            println!("\n{}", "Error:".bold());
            println!("{}", last.red());
        }
    }
}

/// Colorize job status for display
fn colorize_status(status: JobStatus) -> ColoredString {
    let status_str = status.as_str();
    match status {
        JobStatus::Queued => status_str.yellow(),
        JobStatus::Cloning | JobStatus::Linting | JobStatus::Testing | JobStatus::Fixing => {
            status_str.cyan()
        }
        JobStatus::Done => status_str.green(),
        JobStatus::Failed => status_str.red(),
        JobStatus::Terminated => status_str.dimmed(),
    }
}
