use super::JobType;
use crate::alignment::AlignmentParams;
use crate::api::{EngineError, EngineResult};
use crate::cleaning::CleaningParams;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Type-specific parameters of a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum JobParameters {
    Qc,
    Clean(CleaningParams),
    Align(AlignmentParams),
}

impl JobParameters {
    pub fn job_type(&self) -> JobType {
        match self {
            JobParameters::Qc => JobType::Qc,
            JobParameters::Clean(_) => JobType::Clean,
            JobParameters::Align(_) => JobType::Align,
        }
    }
}

/// Everything needed to run one job, as submitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobDescriptor {
    pub job_type: JobType,
    pub input_paths: Vec<PathBuf>,
    pub parameters: JobParameters,
}

impl JobDescriptor {
    pub fn qc(input1: impl Into<PathBuf>, input2: Option<PathBuf>) -> Self {
        let mut input_paths = vec![input1.into()];
        input_paths.extend(input2);
        Self {
            job_type: JobType::Qc,
            input_paths,
            parameters: JobParameters::Qc,
        }
    }

    pub fn clean(input: impl Into<PathBuf>, params: CleaningParams) -> Self {
        Self {
            job_type: JobType::Clean,
            input_paths: vec![input.into()],
            parameters: JobParameters::Clean(params),
        }
    }

    pub fn align(reads: Vec<PathBuf>, params: AlignmentParams) -> Self {
        Self {
            job_type: JobType::Align,
            input_paths: reads,
            parameters: JobParameters::Align(params),
        }
    }

    /// Structural checks done at submission, before anything is queued.
    pub fn validate(&self) -> EngineResult<()> {
        if self.parameters.job_type() != self.job_type {
            return Err(EngineError::validation(format!(
                "{} job submitted with {} parameters",
                self.job_type,
                self.parameters.job_type()
            )));
        }

        let inputs = self.input_paths.len();
        let (min, max) = match self.job_type {
            JobType::Qc => (1, 2),
            JobType::Clean => (1, 1),
            JobType::Align => (1, 2),
        };
        if inputs < min || inputs > max {
            return Err(EngineError::validation(format!(
                "{} job takes {} input file(s), got {}",
                self.job_type,
                if min == max { min.to_string() } else { format!("{} to {}", min, max) },
                inputs
            )));
        }
        if self.input_paths.iter().any(|p| p.as_os_str().is_empty()) {
            return Err(EngineError::validation("input path must not be empty"));
        }

        match &self.parameters {
            JobParameters::Qc => Ok(()),
            JobParameters::Clean(params) => params.validate(),
            JobParameters::Align(params) => params.validate(),
        }
    }
}
