pub(crate) mod processor;
pub(crate) mod sequence;
pub(crate) mod stats;

pub use processor::SequenceProcessor;
pub use sequence::{phred, Read};
pub use stats::ProcessingStats;
