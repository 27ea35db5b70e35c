pub mod artifacts;

pub use artifacts::{ArtifactKind, ArtifactLayout};

use crate::api::{EngineError, EngineResult};
use crate::jobs::{JobId, JobResult, JobType};
use chrono::{DateTime, Utc};
use log::info;
use serde::de::{Deserializer, Error};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Persisted record of a successful job, written as `<job_id>.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultDocument {
    pub job_id: JobId,
    #[serde(serialize_with = "serialize_datetime", deserialize_with = "deserialize_datetime")]
    pub created_at: DateTime<Utc>,
    pub tool_version: String,

    #[serde(flatten)]
    pub result: JobResult,
}

impl ResultDocument {
    pub fn new(job_id: JobId, result: JobResult) -> Self {
        Self {
            job_id,
            created_at: Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            result,
        }
    }

    pub fn job_type(&self) -> JobType {
        self.result.job_type()
    }
}

fn serialize_datetime<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&date.to_rfc3339())
}

fn deserialize_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(D::Error::custom)
}

/// Write the result document for a job, creating its directory.
pub fn persist_result(
    layout: &ArtifactLayout,
    job_id: &JobId,
    result: &JobResult,
) -> EngineResult<PathBuf> {
    layout.ensure_job_dir(job_id)?;
    let path = layout.result_document(job_id);
    let document = ResultDocument::new(*job_id, result.clone());

    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, &document)?;
    writer.flush()?;

    info!("Wrote {} result for job {} to {}", document.job_type(), job_id, path.display());
    Ok(path)
}

pub fn load_result(layout: &ArtifactLayout, job_id: &JobId) -> EngineResult<ResultDocument> {
    let path = layout.result_document(job_id);
    if !path.is_file() {
        return Err(EngineError::not_found(format!(
            "no result document for job {}",
            job_id
        )));
    }
    let content = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write surviving reads of a cleaning job as FASTQ.
pub fn write_cleaned_reads(
    layout: &ArtifactLayout,
    job_id: &JobId,
    result: &crate::cleaning::CleaningResult,
) -> EngineResult<PathBuf> {
    layout.ensure_job_dir(job_id)?;
    let path = layout.cleaned_reads(job_id);
    let mut writer = BufWriter::new(File::create(&path)?);
    for read in &result.cleaned_reads {
        writer.write_all(read.to_fastq().as_bytes())?;
    }
    writer.flush()?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::{CleaningResult, CleaningSummary};
    use crate::sequence_processor::Read;
    use tempfile::tempdir;

    fn clean_result() -> JobResult {
        JobResult::Clean(CleaningResult {
            summary: CleaningSummary {
                reads_processed: 2,
                reads_passed: 1,
                reads_discarded: 1,
                ..Default::default()
            },
            cleaned_reads: vec![Read::new("r1", "ACGT", "IIII")],
        })
    }

    #[test]
    fn test_document_is_flat_and_tagged() {
        let id = JobId::new();
        let doc = ResultDocument::new(id, clean_result());
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["job_id"], id.to_string());
        assert_eq!(json["job_type"], "CLEAN");
        assert_eq!(json["tool_version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(json["summary"]["reads_passed"], 1);
        assert_eq!(json["cleaned_data"], "@r1\nACGT\n+\nIIII\n");
        assert!(json["created_at"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_persist_and_load() {
        let tmp = tempdir().unwrap();
        let layout = ArtifactLayout::new(tmp.path());
        let id = JobId::new();

        let path = persist_result(&layout, &id, &clean_result()).unwrap();
        assert_eq!(path, layout.result_document(&id));

        let loaded = load_result(&layout, &id).unwrap();
        assert_eq!(loaded.job_id, id);
        assert_eq!(loaded.job_type(), JobType::Clean);
        match loaded.result {
            JobResult::Clean(result) => assert_eq!(result.cleaned_reads.len(), 1),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_missing_document_is_not_found() {
        let tmp = tempdir().unwrap();
        let layout = ArtifactLayout::new(tmp.path());
        let err = load_result(&layout, &JobId::new()).unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_cleaned_reads_file() {
        let tmp = tempdir().unwrap();
        let layout = ArtifactLayout::new(tmp.path());
        let id = JobId::new();
        let result = CleaningResult {
            summary: CleaningSummary::default(),
            cleaned_reads: vec![Read::new("a", "AC", "II"), Read::new("b", "GT", "##")],
        };
        let path = write_cleaned_reads(&layout, &id, &result).unwrap();
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "@a\nAC\n+\nII\n@b\nGT\n+\n##\n"
        );
    }
}
