use super::{Job, JobId, JobState, JobType, StateUpdate};
use crate::api::{EngineError, EngineResult};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

/// Proof of ownership over a started job. Only the holder may advance it,
/// and it cannot be cloned, so a job has at most one writer.
#[derive(Debug)]
pub struct JobLease {
    job_id: JobId,
    token: Uuid,
}

impl JobLease {
    /// Mint a lease for a job. Store implementations call this from `claim`.
    pub fn issue(job_id: JobId) -> Self {
        Self {
            job_id,
            token: Uuid::new_v4(),
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }
}

/// Authoritative record of job state, shared between the submitter, the
/// workers and status readers.
pub trait JobStore: Send + Sync {
    /// Register a new job in the PENDING state.
    fn submit(&self, job_type: JobType) -> JobId;

    /// Move a PENDING job to STARTED and hand out its only lease.
    fn claim(&self, job_id: &JobId) -> EngineResult<JobLease>;

    fn advance(&self, lease: &JobLease, update: StateUpdate) -> EngineResult<()>;

    /// Snapshot of the current record.
    fn get(&self, job_id: &JobId) -> EngineResult<Job>;
}

struct Entry {
    job: Job,
    lease: Option<Uuid>,
}

/// Process-local store. Records live for the lifetime of the process.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Arc<Mutex<Entry>>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, job_id: &JobId) -> EngineResult<Arc<Mutex<Entry>>> {
        let jobs = self
            .jobs
            .read()
            .map_err(|_| EngineError::internal("job table lock poisoned"))?;
        jobs.get(job_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("unknown job id '{}'", job_id)))
    }

    pub fn len(&self) -> usize {
        self.jobs.read().map(|jobs| jobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl JobStore for InMemoryJobStore {
    fn submit(&self, job_type: JobType) -> JobId {
        let id = JobId::new();
        let entry = Arc::new(Mutex::new(Entry {
            job: Job::new(id, job_type),
            lease: None,
        }));
        // A poisoned table still holds consistent entries; keep serving it.
        let mut jobs = self.jobs.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        jobs.insert(id, entry);
        debug!("Registered {} job {}", job_type, id);
        id
    }

    fn claim(&self, job_id: &JobId) -> EngineResult<JobLease> {
        let entry = self.entry(job_id)?;
        let mut entry = entry
            .lock()
            .map_err(|_| EngineError::internal("job lock poisoned"))?;
        if entry.job.state != JobState::Pending {
            return Err(EngineError::InvalidTransition {
                from: entry.job.state.to_string(),
                to: JobState::Started.to_string(),
            });
        }

        entry.job.apply(StateUpdate::Started)?;
        let lease = JobLease::issue(*job_id);
        entry.lease = Some(lease.token);
        Ok(lease)
    }

    fn advance(&self, lease: &JobLease, update: StateUpdate) -> EngineResult<()> {
        if matches!(update, StateUpdate::Started) {
            return Err(EngineError::internal("jobs are started through claim"));
        }
        let entry = self.entry(&lease.job_id)?;
        let mut entry = entry
            .lock()
            .map_err(|_| EngineError::internal("job lock poisoned"))?;
        if entry.lease != Some(lease.token) {
            return Err(EngineError::internal(format!(
                "lease does not own job {}",
                lease.job_id
            )));
        }
        entry.job.apply(update)
    }

    fn get(&self, job_id: &JobId) -> EngineResult<Job> {
        let entry = self.entry(job_id)?;
        let entry = entry
            .lock()
            .map_err(|_| EngineError::internal("job lock poisoned"))?;
        Ok(entry.job.clone())
    }
}
