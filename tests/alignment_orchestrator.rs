#![cfg(unix)]

mod common;

use common::{FakeBehavior, FakeTools};
use seqlab_jobs::alignment::{
    AlignmentOrchestrator, AlignmentParams, AlignmentSettings, AlignmentStage, VariantStats,
    LOW_ALIGNMENT_MESSAGE,
};
use seqlab_jobs::export::ArtifactLayout;
use seqlab_jobs::jobs::JobId;
use seqlab_jobs::EngineError;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    tools: FakeTools,
    layout: ArtifactLayout,
    reference: PathBuf,
    reads: Vec<PathBuf>,
}

fn fixture(behavior: FakeBehavior) -> Fixture {
    let dir = TempDir::new().unwrap();
    let tools = FakeTools::install(dir.path(), behavior);
    let layout = ArtifactLayout::new(dir.path().join("results"));
    let reference = common::reference(dir.path());
    let reads = vec![common::reads(dir.path(), "r1.fastq")];
    Fixture {
        _dir: dir,
        tools,
        layout,
        reference,
        reads,
    }
}

fn orchestrator(fx: &Fixture, settings: AlignmentSettings) -> AlignmentOrchestrator {
    AlignmentOrchestrator::new(fx.tools.toolset(), settings, fx.layout.clone())
}

fn params(fx: &Fixture, run_variant_calling: bool) -> AlignmentParams {
    AlignmentParams {
        reference: fx.reference.clone(),
        run_variant_calling,
        min_mapping_quality: 20,
    }
}

#[test]
fn full_run_calls_variants() {
    let fx = fixture(FakeBehavior::default());
    let job_id = JobId::new();
    let mut stages = Vec::new();

    let result = orchestrator(&fx, AlignmentSettings::default())
        .run(&job_id, &fx.reads, &params(&fx, true), &mut |s| stages.push(s))
        .unwrap();

    assert_eq!(result.reference_name, "genome.fa");
    assert_eq!(result.alignment_rate, 90.0);
    assert!(result.variant_calling_performed);
    assert_eq!(result.variant_stats, VariantStats::Called { total_variants: 2 });
    assert_eq!(
        stages,
        vec![
            AlignmentStage::Preparing,
            AlignmentStage::Indexing,
            AlignmentStage::Aligning,
            AlignmentStage::Sorting,
            AlignmentStage::Stats,
            AlignmentStage::Gate,
            AlignmentStage::VariantCalling,
            AlignmentStage::Done,
        ]
    );

    assert!(fx.layout.filtered_alignment(&job_id).is_file());
    assert!(fx.layout.sorted_alignment(&job_id).is_file());
    assert!(fx.layout.alignment_index(&job_id).is_file());
    assert!(fx.layout.variants(&job_id).is_file());
    assert_eq!(
        result.artifacts.variants.as_deref(),
        Some(format!("{}.vcf", job_id).as_str())
    );

    // the aligner output made it through the filter into the sorted file
    let sorted = fs::read_to_string(fx.layout.sorted_alignment(&job_id)).unwrap();
    assert!(sorted.contains("chr1"));

    let mem_args = fs::read_to_string(&fx.tools.bwa_log).unwrap();
    assert_eq!(
        mem_args.trim(),
        format!("-t 4 {} {}", fx.reference.display(), fx.reads[0].display())
    );
}

#[test]
fn low_alignment_rate_skips_variant_calling() {
    let fx = fixture(FakeBehavior {
        mapped_percent: "0.50",
        ..Default::default()
    });
    let job_id = JobId::new();
    let mut stages = Vec::new();

    let result = orchestrator(&fx, AlignmentSettings::default())
        .run(&job_id, &fx.reads, &params(&fx, true), &mut |s| stages.push(s))
        .unwrap();

    assert_eq!(result.alignment_rate, 0.5);
    assert!(!result.variant_calling_performed);
    assert_eq!(
        result.variant_stats,
        VariantStats::Skipped {
            message: LOW_ALIGNMENT_MESSAGE.to_string()
        }
    );
    assert!(!stages.contains(&AlignmentStage::VariantCalling));
    assert_eq!(stages.last(), Some(&AlignmentStage::Done));
    assert!(!fx.layout.variants(&job_id).exists());
    assert!(result.artifacts.variants.is_none());

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["variant_stats"]["message"], LOW_ALIGNMENT_MESSAGE);
}

#[test]
fn unparseable_flagstat_means_zero_rate_and_no_calling() {
    let fx = fixture(FakeBehavior {
        omit_mapped_line: true,
        ..Default::default()
    });
    let job_id = JobId::new();
    let mut stages = Vec::new();

    let result = orchestrator(&fx, AlignmentSettings::default())
        .run(&job_id, &fx.reads, &params(&fx, true), &mut |s| stages.push(s))
        .unwrap();

    assert_eq!(result.alignment_rate, 0.0);
    assert!(!result.variant_calling_performed);
    assert_eq!(
        result.variant_stats,
        VariantStats::Skipped {
            message: LOW_ALIGNMENT_MESSAGE.to_string()
        }
    );
    assert!(!stages.contains(&AlignmentStage::VariantCalling));
    assert!(!fx.layout.variants(&job_id).exists());
}

#[test]
fn variant_calling_not_requested() {
    let fx = fixture(FakeBehavior::default());
    let job_id = JobId::new();

    let result = orchestrator(&fx, AlignmentSettings::default())
        .run(&job_id, &fx.reads, &params(&fx, false), &mut |_| {})
        .unwrap();

    assert!(!result.variant_calling_performed);
    assert_eq!(result.variant_stats, VariantStats::NotRequested {});
    assert!(!fx.layout.variants(&job_id).exists());
}

#[test]
fn paired_reads_are_passed_to_the_aligner() {
    let fx = fixture(FakeBehavior::default());
    let mut reads = fx.reads.clone();
    reads.push(common::reads(fx.reference.parent().unwrap(), "r2.fastq"));
    let settings = AlignmentSettings {
        threads: 2,
        ..Default::default()
    };

    orchestrator(&fx, settings)
        .run(&JobId::new(), &reads, &params(&fx, false), &mut |_| {})
        .unwrap();

    let mem_args = fs::read_to_string(&fx.tools.bwa_log).unwrap();
    assert_eq!(
        mem_args.trim(),
        format!(
            "-t 2 {} {} {}",
            fx.reference.display(),
            reads[0].display(),
            reads[1].display()
        )
    );
}

#[test]
fn failing_tool_reports_stage_and_stderr() {
    let fx = fixture(FakeBehavior {
        fail_sort: true,
        ..Default::default()
    });
    let mut stages = Vec::new();

    let err = orchestrator(&fx, AlignmentSettings::default())
        .run(&JobId::new(), &fx.reads, &params(&fx, true), &mut |s| stages.push(s))
        .unwrap_err();

    match &err {
        EngineError::ExternalTool {
            command,
            exit_code,
            stderr,
            stage,
        } => {
            assert!(command.contains("sort -o"));
            assert_eq!(*exit_code, Some(1));
            assert!(stderr.contains("truncated file"));
            assert_eq!(stage.as_deref(), Some("SORTING"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(err.to_string().starts_with("[SORTING] Command failed with exit code 1."));
    assert_eq!(stages.last(), Some(&AlignmentStage::Failed));
    assert!(!stages.contains(&AlignmentStage::Stats));
}

#[test]
fn hung_tool_times_out() {
    let fx = fixture(FakeBehavior {
        slow_index_secs: Some(30),
        ..Default::default()
    });
    let settings = AlignmentSettings {
        stage_timeout: Some(Duration::from_secs(1)),
        ..Default::default()
    };

    let started = std::time::Instant::now();
    let err = orchestrator(&fx, settings)
        .run(&JobId::new(), &fx.reads, &params(&fx, false), &mut |_| {})
        .unwrap_err();

    assert_eq!(err.kind(), "timeout");
    assert!(started.elapsed() < Duration::from_secs(20));
}

#[test]
fn missing_tool_fails_in_preparing() {
    let fx = fixture(FakeBehavior::default());
    let mut tools = fx.tools.toolset();
    tools.bwa = seqlab_jobs::utils::external_tools::ToolCommand::new("/nonexistent/bwa");
    let orchestrator = AlignmentOrchestrator::new(tools, AlignmentSettings::default(), fx.layout.clone());

    let err = orchestrator
        .run(&JobId::new(), &fx.reads, &params(&fx, false), &mut |_| {})
        .unwrap_err();
    match err {
        EngineError::ExternalTool {
            exit_code, stage, ..
        } => {
            assert_eq!(exit_code, None);
            assert_eq!(stage.as_deref(), Some("PREPARING"));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn hung_preflight_is_bounded_by_stage_timeout() {
    let fx = fixture(FakeBehavior::default());
    let mut tools = fx.tools.toolset();
    tools.bwa = seqlab_jobs::utils::external_tools::ToolCommand::new("sh")
        .arg("-c")
        .arg("sleep 10");
    let settings = AlignmentSettings {
        stage_timeout: Some(Duration::from_millis(500)),
        ..Default::default()
    };
    let orchestrator = AlignmentOrchestrator::new(tools, settings, fx.layout.clone());
    let mut stages = Vec::new();

    let started = std::time::Instant::now();
    let err = orchestrator
        .run(&JobId::new(), &fx.reads, &params(&fx, false), &mut |s| stages.push(s))
        .unwrap_err();

    assert_eq!(err.kind(), "timeout");
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(stages, vec![AlignmentStage::Preparing, AlignmentStage::Failed]);
}
