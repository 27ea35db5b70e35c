use super::{EngineError, EngineResult};
use crate::alignment::AlignmentOrchestrator;
use crate::config::EngineConfig;
use crate::export::{self, ArtifactKind, ArtifactLayout, ResultDocument};
use crate::jobs::{
    Executor, InMemoryJobStore, JobDescriptor, JobId, JobState, JobStatus, JobStore, WorkerPool,
};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Entry point for submitting jobs and observing them.
pub struct JobService {
    store: Arc<dyn JobStore>,
    layout: ArtifactLayout,
    pool: WorkerPool,
}

impl JobService {
    /// Start a service backed by the in-memory job store.
    pub fn start(config: &EngineConfig) -> EngineResult<Self> {
        Self::with_store(config, Arc::new(InMemoryJobStore::new()))
    }

    pub fn with_store(config: &EngineConfig, store: Arc<dyn JobStore>) -> EngineResult<Self> {
        config.validate()?;
        let layout = ArtifactLayout::new(&config.results_dir);
        let alignment = AlignmentOrchestrator::new(
            config.toolset(),
            config.alignment_settings(),
            layout.clone(),
        );
        let executor = Arc::new(Executor::new(Arc::clone(&store), layout.clone(), alignment));
        let pool = WorkerPool::new(executor, config.workers)?;
        info!(
            "Job service started with {} workers, results under {}",
            pool.num_workers(),
            layout.root().display()
        );
        Ok(Self { store, layout, pool })
    }

    /// Validate and queue a job. The returned id is immediately visible as
    /// PENDING; invalid descriptors are rejected without creating a job.
    pub fn submit(&self, descriptor: JobDescriptor) -> EngineResult<JobId> {
        descriptor.validate()?;
        let job_id = self.store.submit(descriptor.job_type);
        info!("Submitted {} job {}", descriptor.job_type, job_id);
        self.pool.dispatch(job_id, descriptor)?;
        Ok(job_id)
    }

    pub fn get_status(&self, job_id: &JobId) -> EngineResult<JobStatus> {
        Ok(self.store.get(job_id)?.status())
    }

    /// Poll until the job is terminal, reporting each observed change.
    pub fn wait(
        &self,
        job_id: &JobId,
        poll_interval: Duration,
        mut on_update: impl FnMut(&JobStatus),
    ) -> EngineResult<JobStatus> {
        let mut last: Option<(JobState, Option<String>)> = None;
        loop {
            let status = self.get_status(job_id)?;
            let observed = (status.state, status.progress_message.clone());
            if last.as_ref() != Some(&observed) {
                on_update(&status);
                last = Some(observed);
            }
            if status.is_terminal() {
                return Ok(status);
            }
            thread::sleep(poll_interval);
        }
    }

    /// Path of a downloadable artifact of a known job.
    pub fn artifact_path(&self, job_id: &JobId, kind: ArtifactKind) -> EngineResult<PathBuf> {
        self.store.get(job_id)?;
        self.layout.resolve(job_id, kind)
    }

    /// Persisted result document of a finished job.
    pub fn load_result(&self, job_id: &JobId) -> EngineResult<ResultDocument> {
        let job = self.store.get(job_id)?;
        if job.state != JobState::Success {
            return Err(EngineError::not_found(format!(
                "job {} has no result (state {})",
                job_id, job.state
            )));
        }
        export::load_result(&self.layout, job_id)
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Stop accepting jobs and wait for queued ones to finish.
    pub fn shutdown(self) -> EngineResult<usize> {
        let executed = self.pool.finish()?;
        info!("Job service stopped after {} jobs", executed);
        Ok(executed)
    }
}
