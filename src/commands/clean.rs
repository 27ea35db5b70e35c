use super::{require_file, run_jobs, RunOptions};
use crate::cleaning::CleaningParams;
use crate::export::{ArtifactKind, ArtifactLayout};
use crate::jobs::JobDescriptor;
use anyhow::Result;
use std::path::PathBuf;

pub fn run(options: &RunOptions, file: PathBuf, params: CleaningParams) -> Result<()> {
    require_file(&file, "FASTQ file")?;
    let statuses = run_jobs(options, vec![JobDescriptor::clean(file, params)])?;

    if !options.quiet {
        let config = options.load_config()?;
        let layout = ArtifactLayout::new(&config.results_dir);
        for status in &statuses {
            if let Ok(path) = layout.resolve(&status.id, ArtifactKind::CleanedReads) {
                eprintln!("Cleaned reads written to {}", path.display());
            }
        }
    }
    Ok(())
}
