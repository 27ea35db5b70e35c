//! Job records, their lifecycle, and execution.
//!
//! ```text
//! PENDING -> STARTED -> PROGRESS* -> SUCCESS | FAILURE
//! ```
//!
//! Transitions never go backwards and a terminal job never changes again.

pub mod descriptor;
pub mod executor;
pub mod pool;
pub mod store;

pub use descriptor::{JobDescriptor, JobParameters};
pub use executor::Executor;
pub use pool::WorkerPool;
pub use store::{InMemoryJobStore, JobLease, JobStore};

use crate::alignment::AlignmentResult;
use crate::api::{EngineError, EngineResult};
use crate::cleaning::CleaningResult;
use crate::qc::QcReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque job identifier. Always a UUID, so it is safe as a path component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        JobId(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for JobId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(JobId)
            .map_err(|_| EngineError::not_found(format!("unknown job id '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobType {
    Qc,
    Clean,
    Align,
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobType::Qc => "QC",
            JobType::Clean => "CLEAN",
            JobType::Align => "ALIGN",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    Pending,
    Started,
    Progress,
    Success,
    Failure,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Success | JobState::Failure)
    }

    pub fn can_transition_to(&self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Pending, Started)
                | (Started, Progress)
                | (Started, Success)
                | (Started, Failure)
                | (Progress, Progress)
                | (Progress, Success)
                | (Progress, Failure)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobState::Pending => "PENDING",
            JobState::Started => "STARTED",
            JobState::Progress => "PROGRESS",
            JobState::Success => "SUCCESS",
            JobState::Failure => "FAILURE",
        })
    }
}

/// Terminal payload of a successful job, tagged with the job type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "job_type")]
pub enum JobResult {
    #[serde(rename = "QC")]
    Qc(QcReport),
    #[serde(rename = "CLEAN")]
    Clean(CleaningResult),
    #[serde(rename = "ALIGN")]
    Align(AlignmentResult),
}

impl JobResult {
    pub fn job_type(&self) -> JobType {
        match self {
            JobResult::Qc(_) => JobType::Qc,
            JobResult::Clean(_) => JobType::Clean,
            JobResult::Align(_) => JobType::Align,
        }
    }
}

/// A state change requested by the owning executor.
#[derive(Debug, Clone)]
pub enum StateUpdate {
    Started,
    Progress(String),
    Success(JobResult),
    Failure(EngineError),
}

impl StateUpdate {
    pub fn target_state(&self) -> JobState {
        match self {
            StateUpdate::Started => JobState::Started,
            StateUpdate::Progress(_) => JobState::Progress,
            StateUpdate::Success(_) => JobState::Success,
            StateUpdate::Failure(_) => JobState::Failure,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub job_type: JobType,
    pub state: JobState,
    pub progress_message: Option<String>,
    pub result: Option<JobResult>,
    pub error: Option<EngineError>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: JobId, job_type: JobType) -> Self {
        let now = Utc::now();
        Job {
            id,
            job_type,
            state: JobState::Pending,
            progress_message: None,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an update, refusing anything that would move backwards or
    /// leave a terminal state.
    pub fn apply(&mut self, update: StateUpdate) -> EngineResult<()> {
        let next = update.target_state();
        if !self.state.can_transition_to(next) {
            return Err(EngineError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }

        match update {
            StateUpdate::Started => {}
            StateUpdate::Progress(message) => self.progress_message = Some(message),
            StateUpdate::Success(result) => {
                if result.job_type() != self.job_type {
                    return Err(EngineError::internal(format!(
                        "{} job cannot complete with a {} result",
                        self.job_type,
                        result.job_type()
                    )));
                }
                self.result = Some(result);
            }
            StateUpdate::Failure(error) => self.error = Some(error),
        }

        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn status(&self) -> JobStatus {
        JobStatus {
            id: self.id,
            job_type: self.job_type,
            state: self.state,
            progress_message: self.progress_message.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }
}

/// What the status interface returns for a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobStatus {
    pub id: JobId,
    pub job_type: JobType,
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EngineError>,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
