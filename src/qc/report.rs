use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QcReport {
    pub file1: FileQcReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file2: Option<FileQcReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<Comparison>,
}

/// Quality and composition summary of a single input file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileQcReport {
    pub summary: QcSummary,
    /// Per-read GC percentage, in input order
    pub gc_content_distribution: Vec<f64>,
    /// One entry per position reached by at least one read, 1-based, ascending
    pub per_position_quality: Vec<PositionQuality>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QcSummary {
    pub total_reads: u64,
    pub avg_gc_content: f64,
    pub avg_read_length: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PositionQuality {
    pub position: usize,
    pub mean: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Comparison {
    pub gc_content_difference: f64,
    pub quality_similarity_index: f64,
}

impl FileQcReport {
    pub fn mean_quality_curve(&self) -> Vec<f64> {
        self.per_position_quality.iter().map(|p| p.mean).collect()
    }
}
