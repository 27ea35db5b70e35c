use super::{run_jobs, RunOptions};
use crate::jobs::{JobDescriptor, JobParameters};
use anyhow::{bail, Context, Result};
use log::info;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Read a manifest: a JSON array of job descriptors. Relative input paths
/// are resolved against the manifest's directory.
pub fn read_manifest(manifest: &Path) -> Result<Vec<JobDescriptor>> {
    let file = File::open(manifest)
        .with_context(|| format!("Failed to open manifest {}", manifest.display()))?;
    let mut descriptors: Vec<JobDescriptor> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse manifest {}", manifest.display()))?;

    let base = manifest.parent().unwrap_or_else(|| Path::new("."));
    for descriptor in &mut descriptors {
        for path in &mut descriptor.input_paths {
            *path = resolve(base, path);
        }
        if let JobParameters::Align(params) = &mut descriptor.parameters {
            params.reference = resolve(base, &params.reference);
        }
    }
    Ok(descriptors)
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}

pub fn run(options: &RunOptions, manifest: PathBuf) -> Result<()> {
    let descriptors = read_manifest(&manifest)?;
    if descriptors.is_empty() {
        bail!("Manifest {} lists no jobs", manifest.display());
    }
    info!("Running {} job(s) from {}", descriptors.len(), manifest.display());
    run_jobs(options, descriptors)?;
    Ok(())
}
