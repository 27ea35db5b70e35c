use super::{JobDescriptor, JobId, JobLease, JobParameters, JobResult, JobStore, StateUpdate};
use crate::alignment::AlignmentOrchestrator;
use crate::api::{EngineError, EngineResult};
use crate::cleaning;
use crate::export::{self, ArtifactLayout};
use crate::qc;
use crate::sequence_processor::{FastqReader, ProcessingStats};
use log::{error, info, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Runs claimed jobs to a terminal state. Every failure, including a
/// panic inside a pipeline, ends as a FAILURE record rather than escaping.
pub struct Executor {
    store: Arc<dyn JobStore>,
    layout: ArtifactLayout,
    alignment: AlignmentOrchestrator,
}

/// Publishes progress for the job the lease belongs to.
struct ProgressReporter<'a> {
    store: &'a dyn JobStore,
    lease: &'a JobLease,
}

impl ProgressReporter<'_> {
    fn publish(&self, message: impl Into<String>) {
        if let Err(e) = self
            .store
            .advance(self.lease, StateUpdate::Progress(message.into()))
        {
            warn!("Dropped progress update for job {}: {}", self.lease.job_id(), e);
        }
    }

    fn reads(&self, stats: &ProcessingStats) {
        self.publish(format!("Processed {} reads", stats.processed));
    }
}

impl Executor {
    pub fn new(store: Arc<dyn JobStore>, layout: ArtifactLayout, alignment: AlignmentOrchestrator) -> Self {
        Self {
            store,
            layout,
            alignment,
        }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Claim a PENDING job and run it. Errors are only returned when the job
    /// could not be claimed or its terminal state could not be recorded.
    pub fn execute(&self, job_id: &JobId, descriptor: &JobDescriptor) -> EngineResult<()> {
        let lease = self.store.claim(job_id)?;
        info!("Started {} job {}", descriptor.job_type, job_id);

        let reporter = ProgressReporter {
            store: self.store.as_ref(),
            lease: &lease,
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run_pipeline(job_id, descriptor, &reporter)
        }))
        .unwrap_or_else(|payload| Err(EngineError::internal(panic_message(payload))));

        let outcome = outcome.and_then(|result| {
            export::persist_result(&self.layout, job_id, &result)?;
            Ok(result)
        });

        match outcome {
            Ok(result) => {
                info!("{} job {} succeeded", descriptor.job_type, job_id);
                self.store.advance(&lease, StateUpdate::Success(result))
            }
            Err(e) => {
                error!("{} job {} failed: {}", descriptor.job_type, job_id, e);
                self.store.advance(&lease, StateUpdate::Failure(e))
            }
        }
    }

    fn run_pipeline(
        &self,
        job_id: &JobId,
        descriptor: &JobDescriptor,
        reporter: &ProgressReporter<'_>,
    ) -> EngineResult<JobResult> {
        descriptor.validate()?;
        let inputs = &descriptor.input_paths;

        match &descriptor.parameters {
            JobParameters::Qc => {
                let report = qc::run_qc(
                    &inputs[0],
                    inputs.get(1).map(|p| p.as_path()),
                    &mut |stats| reporter.reads(stats),
                )?;
                Ok(JobResult::Qc(report))
            }
            JobParameters::Clean(params) => {
                let reader = FastqReader::open(&inputs[0])?;
                let result = cleaning::clean(reader, params, &mut |stats| reporter.reads(stats))?;
                export::write_cleaned_reads(&self.layout, job_id, &result)?;
                Ok(JobResult::Clean(result))
            }
            JobParameters::Align(params) => {
                let result = self.alignment.run(job_id, inputs, params, &mut |stage| {
                    reporter.publish(stage.status_message())
                })?;
                Ok(JobResult::Align(result))
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let detail = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    format!("job panicked: {}", detail)
}
