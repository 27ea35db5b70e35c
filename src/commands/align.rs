use super::{require_file, run_jobs, RunOptions};
use crate::alignment::AlignmentParams;
use crate::jobs::JobDescriptor;
use anyhow::Result;
use std::path::PathBuf;

pub fn run(
    options: &RunOptions,
    reference: PathBuf,
    reads1: PathBuf,
    reads2: Option<PathBuf>,
    run_variant_calling: bool,
    min_mapping_quality: u8,
) -> Result<()> {
    require_file(&reference, "Reference")?;
    require_file(&reads1, "Reads")?;
    let mut reads = vec![reads1];
    if let Some(reads2) = reads2 {
        require_file(&reads2, "Reads")?;
        reads.push(reads2);
    }

    let params = AlignmentParams {
        reference,
        run_variant_calling,
        min_mapping_quality,
    };
    run_jobs(options, vec![JobDescriptor::align(reads, params)])?;
    Ok(())
}
