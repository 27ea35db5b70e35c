//! Reference alignment and variant calling driven through external tools.
//!
//! The orchestrator walks a fixed stage sequence, publishing each stage as
//! it starts, and leaves every intermediate file under the job's result
//! directory:
//!
//! 1. PREPARING: validate inputs, create the job directory, probe the tools
//! 2. INDEXING: `bwa index <ref>`
//! 3. ALIGNING: `bwa mem | samtools view -b -q <minq> -` into `<job>.bam`
//! 4. SORTING: `samtools sort`, then `samtools index`
//! 5. STATS: `samtools flagstat` parsed into an alignment rate
//! 6. GATE: low alignment rates skip variant calling
//! 7. VARIANT_CALLING: `freebayes -f <ref>` into `<job>.vcf`

pub mod flagstat;
pub mod report;
pub mod stage;

pub use report::{AlignmentArtifacts, AlignmentResult, VariantStats};
pub use stage::AlignmentStage;

use crate::api::{EngineError, EngineResult};
use crate::export::artifacts::file_name;
use crate::export::ArtifactLayout;
use crate::jobs::JobId;
use crate::utils::external_tools::{check_tool, run_tool, ProcessPipeline, StdoutTarget, ToolCommand};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const LOW_ALIGNMENT_MESSAGE: &str = "Alignment rate was too low to perform variant calling.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlignmentParams {
    pub reference: PathBuf,
    #[serde(default)]
    pub run_variant_calling: bool,
    /// Reads below this MAPQ are dropped before sorting
    #[serde(default)]
    pub min_mapping_quality: u8,
}

impl AlignmentParams {
    pub fn validate(&self) -> EngineResult<()> {
        if self.reference.as_os_str().is_empty() {
            return Err(EngineError::validation("alignment requires a reference path"));
        }
        Ok(())
    }
}

/// Commands used to launch each external tool. Extra leading arguments are
/// kept, so a tool may be a wrapper such as `sh /path/to/script`.
#[derive(Debug, Clone)]
pub struct ToolSet {
    pub bwa: ToolCommand,
    pub samtools: ToolCommand,
    pub freebayes: ToolCommand,
}

impl Default for ToolSet {
    fn default() -> Self {
        Self {
            bwa: ToolCommand::new("bwa"),
            samtools: ToolCommand::new("samtools"),
            freebayes: ToolCommand::new("freebayes"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlignmentSettings {
    /// Minimum alignment rate (percent) required to call variants
    pub gate_threshold: f64,
    pub threads: u32,
    /// Per-command limit; `None` waits indefinitely
    pub stage_timeout: Option<Duration>,
}

impl Default for AlignmentSettings {
    fn default() -> Self {
        Self {
            gate_threshold: 1.0,
            threads: 4,
            stage_timeout: Some(Duration::from_secs(3600)),
        }
    }
}

/// Enforces the forward-only stage order and publishes each new stage.
struct StageTracker<'a> {
    current: AlignmentStage,
    on_stage: &'a mut dyn FnMut(AlignmentStage),
}

impl<'a> StageTracker<'a> {
    fn start(on_stage: &'a mut dyn FnMut(AlignmentStage)) -> Self {
        on_stage(AlignmentStage::Preparing);
        Self {
            current: AlignmentStage::Preparing,
            on_stage,
        }
    }

    fn enter(&mut self, next: AlignmentStage) -> EngineResult<()> {
        if !self.current.can_advance_to(next) {
            return Err(EngineError::InvalidTransition {
                from: self.current.to_string(),
                to: next.to_string(),
            });
        }
        debug!("Alignment stage {} -> {}", self.current, next);
        self.current = next;
        (self.on_stage)(next);
        Ok(())
    }
}

pub struct AlignmentOrchestrator {
    tools: ToolSet,
    settings: AlignmentSettings,
    layout: ArtifactLayout,
}

impl AlignmentOrchestrator {
    pub fn new(tools: ToolSet, settings: AlignmentSettings, layout: ArtifactLayout) -> Self {
        Self {
            tools,
            settings,
            layout,
        }
    }

    /// Run every stage for one job. A failing tool aborts the run with the
    /// stage name attached to the error; `on_stage` sees FAILED last.
    pub fn run(
        &self,
        job_id: &JobId,
        reads: &[PathBuf],
        params: &AlignmentParams,
        on_stage: &mut dyn FnMut(AlignmentStage),
    ) -> EngineResult<AlignmentResult> {
        let mut tracker = StageTracker::start(on_stage);
        match self.run_stages(&mut tracker, job_id, reads, params) {
            Ok(result) => {
                tracker.enter(AlignmentStage::Done)?;
                info!(
                    "Alignment of job {} complete: {:.2}% mapped, variant calling {}",
                    job_id,
                    result.alignment_rate,
                    if result.variant_calling_performed { "performed" } else { "not performed" }
                );
                Ok(result)
            }
            Err(e) => {
                let stage = tracker.current;
                warn!("Alignment of job {} failed during {}", job_id, stage);
                // Failed is reachable from every non-terminal stage
                let _ = tracker.enter(AlignmentStage::Failed);
                Err(e.with_stage(stage.as_str()))
            }
        }
    }

    fn run_stages(
        &self,
        tracker: &mut StageTracker<'_>,
        job_id: &JobId,
        reads: &[PathBuf],
        params: &AlignmentParams,
    ) -> EngineResult<AlignmentResult> {
        let timeout = self.settings.stage_timeout;
        let reference = params.reference.as_path();

        self.prepare(job_id, reads, params)?;
        let filtered = self.layout.filtered_alignment(job_id);
        let sorted = self.layout.sorted_alignment(job_id);
        let sorted_index = self.layout.alignment_index(job_id);

        tracker.enter(AlignmentStage::Indexing)?;
        run_tool(
            &self.tools.bwa.clone().arg("index").arg(reference),
            StdoutTarget::Capture,
            timeout,
        )?;

        tracker.enter(AlignmentStage::Aligning)?;
        let aligner = self
            .tools
            .bwa
            .clone()
            .arg("mem")
            .arg("-t")
            .arg(self.settings.threads.to_string())
            .arg(reference)
            .args(reads);
        let filter = self
            .tools
            .samtools
            .clone()
            .arg("view")
            .arg("-b")
            .arg("-q")
            .arg(params.min_mapping_quality.to_string())
            .arg("-");
        ProcessPipeline::new(aligner, filter).run(&filtered, timeout)?;
        if fs::metadata(&filtered)?.len() == 0 {
            return Err(EngineError::empty_result(format!(
                "alignment produced no output in {}",
                filtered.display()
            )));
        }

        tracker.enter(AlignmentStage::Sorting)?;
        run_tool(
            &self.tools.samtools.clone().arg("sort").arg("-o").arg(&sorted).arg(&filtered),
            StdoutTarget::Capture,
            timeout,
        )?;
        run_tool(
            &self.tools.samtools.clone().arg("index").arg(&sorted),
            StdoutTarget::Capture,
            timeout,
        )?;

        tracker.enter(AlignmentStage::Stats)?;
        let flagstat = run_tool(
            &self.tools.samtools.clone().arg("flagstat").arg(&sorted),
            StdoutTarget::Capture,
            timeout,
        )?;
        let alignment_rate = flagstat::parse_alignment_rate(&flagstat.stdout_text());
        info!("Job {} alignment rate: {:.2}%", job_id, alignment_rate);

        tracker.enter(AlignmentStage::Gate)?;
        let mut artifacts = AlignmentArtifacts {
            filtered_alignment: file_name(&filtered),
            sorted_alignment: file_name(&sorted),
            alignment_index: file_name(&sorted_index),
            variants: None,
        };

        let (variant_calling_performed, variant_stats) = if alignment_rate
            < self.settings.gate_threshold
        {
            warn!(
                "Alignment rate {:.2}% is below {:.2}%, skipping variant calling",
                alignment_rate, self.settings.gate_threshold
            );
            (
                false,
                VariantStats::Skipped {
                    message: LOW_ALIGNMENT_MESSAGE.to_string(),
                },
            )
        } else if params.run_variant_calling {
            tracker.enter(AlignmentStage::VariantCalling)?;
            let vcf = self.layout.variants(job_id);
            run_tool(
                &self.tools.freebayes.clone().arg("-f").arg(reference).arg(&sorted),
                StdoutTarget::File(&vcf),
                timeout,
            )?;
            let total_variants = count_variant_records(&vcf)?;
            info!("Job {} called {} variants", job_id, total_variants);
            artifacts.variants = Some(file_name(&vcf));
            (true, VariantStats::Called { total_variants })
        } else {
            (false, VariantStats::NotRequested {})
        };

        Ok(AlignmentResult {
            reference_name: file_name(reference),
            alignment_rate,
            variant_calling_performed,
            variant_stats,
            artifacts,
        })
    }

    fn prepare(&self, job_id: &JobId, reads: &[PathBuf], params: &AlignmentParams) -> EngineResult<()> {
        if reads.is_empty() || reads.len() > 2 {
            return Err(EngineError::validation(format!(
                "alignment takes one or two read files, got {}",
                reads.len()
            )));
        }
        params.validate()?;
        if !params.reference.is_file() {
            return Err(EngineError::input(format!(
                "reference not found: {}",
                params.reference.display()
            )));
        }
        for path in reads {
            if !path.is_file() {
                return Err(EngineError::input(format!("reads not found: {}", path.display())));
            }
        }

        self.layout.ensure_job_dir(job_id)?;

        let timeout = self.settings.stage_timeout;
        check_tool(&self.tools.bwa, timeout)?;
        check_tool(&self.tools.samtools, timeout)?;
        if params.run_variant_calling {
            check_tool(&self.tools.freebayes, timeout)?;
        }
        Ok(())
    }
}

/// Number of lines in a VCF file that do not start with `#`.
pub fn count_variant_records(path: &Path) -> EngineResult<u64> {
    let reader = BufReader::new(File::open(path)?);
    let mut count = 0;
    for line in reader.lines() {
        let line = line?;
        if !line.starts_with('#') {
            count += 1;
        }
    }
    Ok(count)
}
