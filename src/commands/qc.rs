use super::{require_file, run_jobs, RunOptions};
use crate::jobs::JobDescriptor;
use anyhow::Result;
use std::path::PathBuf;

pub fn run(options: &RunOptions, file1: PathBuf, file2: Option<PathBuf>) -> Result<()> {
    require_file(&file1, "FASTQ file")?;
    if let Some(file2) = &file2 {
        require_file(file2, "FASTQ file")?;
    }
    run_jobs(options, vec![JobDescriptor::qc(file1, file2)])?;
    Ok(())
}
