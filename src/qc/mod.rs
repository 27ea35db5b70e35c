//! Streaming quality-control aggregation.
//!
//! A single pass over a read stream produces read count, mean GC content,
//! mean read length, the per-read GC distribution and per-position quality
//! quartiles. Two files can be compared on GC content and on the shape of
//! their per-position mean quality curves.

pub mod aggregator;
pub mod report;

pub use aggregator::{gc_content, quantile_sorted, QcAggregator};
pub use report::{Comparison, FileQcReport, PositionQuality, QcReport, QcSummary};

use crate::api::EngineResult;
use crate::sequence_processor::{FastqReader, ProcessingStats};
use crate::utils::round_to;
use log::info;
use std::path::Path;

/// Aggregate one read stream.
pub fn analyze(
    reader: FastqReader,
    on_progress: &mut dyn FnMut(&ProcessingStats),
) -> EngineResult<FileQcReport> {
    let mut aggregator = QcAggregator::new();
    let source = reader.path().display().to_string();
    let stats = reader.read_sequences(&mut aggregator, on_progress)?;
    info!("QC aggregated {} reads ({} bases) from {}", stats.processed, stats.bases, source);
    aggregator.into_report()
}

/// Aggregate two streams and compare them.
pub fn analyze_pair(
    reader1: FastqReader,
    reader2: FastqReader,
    on_progress: &mut dyn FnMut(&ProcessingStats),
) -> EngineResult<QcReport> {
    let file1 = analyze(reader1, on_progress)?;
    let file2 = analyze(reader2, on_progress)?;
    let comparison = compare(&file1, &file2);
    Ok(QcReport {
        file1,
        file2: Some(file2),
        comparison: Some(comparison),
    })
}

/// Open and analyze one or two files.
pub fn run_qc(
    path1: &Path,
    path2: Option<&Path>,
    on_progress: &mut dyn FnMut(&ProcessingStats),
) -> EngineResult<QcReport> {
    let reader1 = FastqReader::open(path1)?;
    match path2 {
        Some(path2) => {
            let reader2 = FastqReader::open(path2)?;
            analyze_pair(reader1, reader2, on_progress)
        }
        None => Ok(QcReport {
            file1: analyze(reader1, on_progress)?,
            file2: None,
            comparison: None,
        }),
    }
}

/// `gc_content_difference = |gc1 - gc2|`; `quality_similarity_index =
/// max(0, 100 - 5 * MAE)` over the mean-quality curves truncated to the
/// shorter one. With no overlapping positions the MAE is taken as 0.
pub fn compare(file1: &FileQcReport, file2: &FileQcReport) -> Comparison {
    let gc_diff = (file1.summary.avg_gc_content - file2.summary.avg_gc_content).abs();

    let curve1 = file1.mean_quality_curve();
    let curve2 = file2.mean_quality_curve();
    let overlap = curve1.len().min(curve2.len());
    let mae = if overlap == 0 {
        0.0
    } else {
        curve1
            .iter()
            .zip(curve2.iter())
            .map(|(a, b)| (a - b).abs())
            .sum::<f64>()
            / overlap as f64
    };

    Comparison {
        gc_content_difference: round_to(gc_diff, 2),
        quality_similarity_index: round_to((100.0 - 5.0 * mae).max(0.0), 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(avg_gc: f64, means: &[f64]) -> FileQcReport {
        FileQcReport {
            summary: QcSummary {
                total_reads: 1,
                avg_gc_content: avg_gc,
                avg_read_length: means.len() as f64,
            },
            gc_content_distribution: vec![avg_gc],
            per_position_quality: means
                .iter()
                .enumerate()
                .map(|(i, &m)| PositionQuality {
                    position: i + 1,
                    mean: m,
                    q1: m,
                    median: m,
                    q3: m,
                })
                .collect(),
        }
    }

    #[test]
    fn test_compare_truncates_to_shorter_curve() {
        let a = report(40.0, &[30.0, 30.0, 30.0, 10.0]);
        let b = report(45.5, &[28.0, 32.0]);
        let cmp = compare(&a, &b);
        assert_eq!(cmp.gc_content_difference, 5.5);
        // MAE = 2 over the first two positions
        assert_eq!(cmp.quality_similarity_index, 90.0);
    }

    #[test]
    fn test_similarity_floors_at_zero() {
        let a = report(50.0, &[40.0]);
        let b = report(50.0, &[0.0]);
        assert_eq!(compare(&a, &b).quality_similarity_index, 0.0);
    }
}
