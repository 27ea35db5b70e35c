use serde::{Deserialize, Serialize};
use std::fmt;

/// Orchestrator stages in execution order. `Failed` is reachable from any
/// stage; nothing follows `Done` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlignmentStage {
    Preparing,
    Indexing,
    Aligning,
    Sorting,
    Stats,
    Gate,
    VariantCalling,
    Done,
    Failed,
}

impl AlignmentStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlignmentStage::Preparing => "PREPARING",
            AlignmentStage::Indexing => "INDEXING",
            AlignmentStage::Aligning => "ALIGNING",
            AlignmentStage::Sorting => "SORTING",
            AlignmentStage::Stats => "STATS",
            AlignmentStage::Gate => "GATE",
            AlignmentStage::VariantCalling => "VARIANT_CALLING",
            AlignmentStage::Done => "DONE",
            AlignmentStage::Failed => "FAILED",
        }
    }

    /// Human-readable status published when the stage starts.
    pub fn status_message(&self) -> &'static str {
        match self {
            AlignmentStage::Preparing => "Preparing analysis...",
            AlignmentStage::Indexing => "Indexing reference genome...",
            AlignmentStage::Aligning => "Aligning reads...",
            AlignmentStage::Sorting => "Sorting and indexing alignments...",
            AlignmentStage::Stats => "Calculating alignment stats...",
            AlignmentStage::Gate => "Checking alignment rate...",
            AlignmentStage::VariantCalling => "Calling variants...",
            AlignmentStage::Done => "Alignment complete",
            AlignmentStage::Failed => "Alignment failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AlignmentStage::Done | AlignmentStage::Failed)
    }

    /// Forward-only. VARIANT_CALLING may be skipped, going GATE -> DONE.
    pub fn can_advance_to(&self, next: AlignmentStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == AlignmentStage::Failed {
            return true;
        }
        use AlignmentStage::*;
        matches!(
            (self, next),
            (Preparing, Indexing)
                | (Indexing, Aligning)
                | (Aligning, Sorting)
                | (Sorting, Stats)
                | (Stats, Gate)
                | (Gate, VariantCalling)
                | (Gate, Done)
                | (VariantCalling, Done)
        )
    }
}

impl fmt::Display for AlignmentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
