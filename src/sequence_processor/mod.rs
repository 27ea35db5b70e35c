pub mod core;
pub mod readers;

// Re-export commonly used items
pub use self::core::{ProcessingStats, Read, SequenceProcessor};
pub use readers::FastqReader;
