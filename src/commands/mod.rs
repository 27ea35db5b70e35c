pub mod align;
pub mod batch;
pub mod clean;
pub mod config;
pub mod qc;

use crate::api::JobService;
use crate::config::EngineConfig;
use crate::jobs::{JobDescriptor, JobState, JobStatus};
use crate::utils::progress_bar_builder::ProgressBarBuilder;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Options shared by every subcommand.
pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub results_dir: Option<PathBuf>,
    pub quiet: bool,
}

impl RunOptions {
    pub fn load_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => EngineConfig::load(),
        };
        if let Some(dir) = &self.results_dir {
            config.results_dir = dir.clone();
        }
        Ok(config)
    }
}

/// Submit jobs, follow them to completion and print each final status as
/// JSON. Fails when any job ended in FAILURE.
pub fn run_jobs(options: &RunOptions, descriptors: Vec<JobDescriptor>) -> Result<Vec<JobStatus>> {
    let config = options.load_config()?;
    let service = JobService::start(&config)?;

    let mut submitted = Vec::with_capacity(descriptors.len());
    for (idx, descriptor) in descriptors.into_iter().enumerate() {
        let job_type = descriptor.job_type;
        let job_id = service
            .submit(descriptor)
            .with_context(|| format!("Job {} ({}) was rejected", idx + 1, job_type))?;
        submitted.push(job_id);
    }

    let mut statuses = Vec::with_capacity(submitted.len());
    for job_id in &submitted {
        let spinner = ProgressBarBuilder::new(format!("Job {} queued", job_id))
            .hidden(options.quiet)
            .build()?;
        let status = service.wait(job_id, POLL_INTERVAL, |status| {
            let detail = status.progress_message.as_deref().unwrap_or("");
            spinner.set_message(format!("{} {} {}", status.job_type, status.state, detail));
        })?;
        spinner.finish_and_clear();

        println!("{}", serde_json::to_string_pretty(&status)?);
        statuses.push(status);
    }

    service.shutdown()?;

    let failed = statuses
        .iter()
        .filter(|s| s.state == JobState::Failure)
        .count();
    if failed > 0 {
        bail!("{} of {} job(s) failed", failed, statuses.len());
    }
    Ok(statuses)
}

pub(crate) fn require_file(path: &Path, what: &str) -> Result<()> {
    if !path.is_file() {
        bail!("{} not found: {}", what, path.display());
    }
    Ok(())
}
