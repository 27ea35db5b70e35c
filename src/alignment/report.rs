use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlignmentResult {
    pub reference_name: String,
    /// Percent of reads mapped, 0..=100
    pub alignment_rate: f64,
    pub variant_calling_performed: bool,
    pub variant_stats: VariantStats,
    pub artifacts: AlignmentArtifacts,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum VariantStats {
    Called { total_variants: u64 },
    Skipped { message: String },
    NotRequested {},
}

/// File names inside the job's result directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlignmentArtifacts {
    pub filtered_alignment: String,
    pub sorted_alignment: String,
    pub alignment_index: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<String>,
}
