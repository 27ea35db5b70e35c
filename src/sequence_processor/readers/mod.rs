mod fastq;

pub use fastq::{FastqReader, PROGRESS_INTERVAL};
