use crate::api::{EngineError, EngineResult};
use crate::jobs::JobId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Downloadable files a finished job can leave behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Alignment,
    AlignmentIndex,
    Variants,
    CleanedReads,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Alignment => "alignment",
            ArtifactKind::AlignmentIndex => "alignment_index",
            ArtifactKind::Variants => "variants",
            ArtifactKind::CleanedReads => "cleaned_reads",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alignment" => Ok(ArtifactKind::Alignment),
            "alignment_index" => Ok(ArtifactKind::AlignmentIndex),
            "variants" => Ok(ArtifactKind::Variants),
            "cleaned_reads" => Ok(ArtifactKind::CleanedReads),
            other => Err(EngineError::validation(format!(
                "unknown artifact '{}', expected one of: alignment, alignment_index, variants, cleaned_reads",
                other
            ))),
        }
    }
}

/// Naming scheme for everything a job writes under the results root:
///
/// ```text
/// <root>/<job_id>/<job_id>.json
/// <root>/<job_id>/<job_id>.bam
/// <root>/<job_id>/<job_id>.sorted.bam
/// <root>/<job_id>/<job_id>.sorted.bam.bai
/// <root>/<job_id>/<job_id>.vcf
/// <root>/<job_id>/<job_id>.cleaned.fastq
/// ```
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn job_dir(&self, job_id: &JobId) -> PathBuf {
        self.root.join(job_id.to_string())
    }

    pub fn ensure_job_dir(&self, job_id: &JobId) -> EngineResult<PathBuf> {
        let dir = self.job_dir(job_id);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn file(&self, job_id: &JobId, suffix: &str) -> PathBuf {
        self.job_dir(job_id).join(format!("{}{}", job_id, suffix))
    }

    pub fn result_document(&self, job_id: &JobId) -> PathBuf {
        self.file(job_id, ".json")
    }

    pub fn filtered_alignment(&self, job_id: &JobId) -> PathBuf {
        self.file(job_id, ".bam")
    }

    pub fn sorted_alignment(&self, job_id: &JobId) -> PathBuf {
        self.file(job_id, ".sorted.bam")
    }

    pub fn alignment_index(&self, job_id: &JobId) -> PathBuf {
        self.file(job_id, ".sorted.bam.bai")
    }

    pub fn variants(&self, job_id: &JobId) -> PathBuf {
        self.file(job_id, ".vcf")
    }

    pub fn cleaned_reads(&self, job_id: &JobId) -> PathBuf {
        self.file(job_id, ".cleaned.fastq")
    }

    pub fn path_for(&self, job_id: &JobId, kind: ArtifactKind) -> PathBuf {
        match kind {
            ArtifactKind::Alignment => self.sorted_alignment(job_id),
            ArtifactKind::AlignmentIndex => self.alignment_index(job_id),
            ArtifactKind::Variants => self.variants(job_id),
            ArtifactKind::CleanedReads => self.cleaned_reads(job_id),
        }
    }

    /// Path of an artifact that actually exists on disk.
    pub fn resolve(&self, job_id: &JobId, kind: ArtifactKind) -> EngineResult<PathBuf> {
        let path = self.path_for(job_id, kind);
        if path.is_file() {
            Ok(path)
        } else {
            Err(EngineError::not_found(format!(
                "no {} artifact for job {}",
                kind, job_id
            )))
        }
    }
}

/// File name component of a path, for embedding in result documents.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_layout_keeps_everything_under_job_dir() {
        let layout = ArtifactLayout::new("/data/results");
        let id = JobId::new();
        let dir = layout.job_dir(&id);
        for path in [
            layout.result_document(&id),
            layout.filtered_alignment(&id),
            layout.sorted_alignment(&id),
            layout.alignment_index(&id),
            layout.variants(&id),
            layout.cleaned_reads(&id),
        ] {
            assert_eq!(path.parent(), Some(dir.as_path()));
            assert!(file_name(&path).starts_with(&id.to_string()));
        }
        assert!(file_name(&layout.alignment_index(&id)).ends_with(".sorted.bam.bai"));
    }

    #[test]
    fn test_resolve_requires_existing_file() {
        let tmp = tempdir().unwrap();
        let layout = ArtifactLayout::new(tmp.path());
        let id = JobId::new();

        let err = layout.resolve(&id, ArtifactKind::Variants).unwrap_err();
        assert_eq!(err.kind(), "not_found");

        layout.ensure_job_dir(&id).unwrap();
        fs::write(layout.variants(&id), "##fileformat=VCFv4.2\n").unwrap();
        assert_eq!(
            layout.resolve(&id, ArtifactKind::Variants).unwrap(),
            layout.variants(&id)
        );
    }

    #[test]
    fn test_artifact_kind_parsing() {
        assert_eq!(
            "alignment_index".parse::<ArtifactKind>().unwrap(),
            ArtifactKind::AlignmentIndex
        );
        assert_eq!("bam".parse::<ArtifactKind>().unwrap_err().kind(), "validation");
    }
}
