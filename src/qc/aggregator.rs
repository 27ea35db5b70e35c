use super::report::{FileQcReport, PositionQuality, QcSummary};
use crate::api::{EngineError, EngineResult};
use crate::sequence_processor::core::{phred, Read, SequenceProcessor};
use crate::utils::round_to;

/// Streaming accumulator for one file. Keeps every score seen at each
/// position because exact quartiles need the full sample.
#[derive(Debug, Default)]
pub struct QcAggregator {
    total_reads: u64,
    total_length: u64,
    gc_sum: f64,
    gc_distribution: Vec<f64>,
    position_scores: Vec<Vec<i16>>,
}

impl QcAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_reads(&self) -> u64 {
        self.total_reads
    }

    pub fn into_report(self) -> EngineResult<FileQcReport> {
        if self.total_reads == 0 {
            return Err(EngineError::input("empty input: no valid FASTQ reads were found"));
        }

        let n = self.total_reads as f64;
        let per_position_quality = self
            .position_scores
            .into_iter()
            .enumerate()
            .filter(|(_, scores)| !scores.is_empty())
            .map(|(idx, mut scores)| {
                scores.sort_unstable();
                let sum: i64 = scores.iter().map(|&s| i64::from(s)).sum();
                PositionQuality {
                    position: idx + 1,
                    mean: sum as f64 / scores.len() as f64,
                    q1: quantile_sorted(&scores, 0.25),
                    median: quantile_sorted(&scores, 0.5),
                    q3: quantile_sorted(&scores, 0.75),
                }
            })
            .collect();

        Ok(FileQcReport {
            summary: QcSummary {
                total_reads: self.total_reads,
                avg_gc_content: round_to(self.gc_sum / n, 2),
                avg_read_length: round_to(self.total_length as f64 / n, 2),
            },
            gc_content_distribution: self.gc_distribution,
            per_position_quality,
        })
    }
}

impl SequenceProcessor for QcAggregator {
    fn process_sequence(&mut self, read: &Read) -> EngineResult<()> {
        self.total_reads += 1;
        self.total_length += read.len() as u64;

        let gc = gc_content(&read.seq);
        self.gc_sum += gc;
        self.gc_distribution.push(gc);

        if self.position_scores.len() < read.qual.len() {
            self.position_scores.resize_with(read.qual.len(), Vec::new);
        }
        for (slot, &q) in self.position_scores.iter_mut().zip(read.qual.iter()) {
            slot.push(phred(q));
        }

        Ok(())
    }
}

/// Percentage of G/C bases; 0 for an empty sequence.
pub fn gc_content(seq: &[u8]) -> f64 {
    if seq.is_empty() {
        return 0.0;
    }
    let gc = seq.iter().filter(|&&b| b == b'G' || b == b'C').count();
    100.0 * gc as f64 / seq.len() as f64
}

/// Linear-interpolation quantile over an ascending slice, using the
/// midpoint plotting position `h = n*p + 1/2` (1-based). For [10,20,30,40]
/// this gives q1 = 15, median = 25, q3 = 35.
pub fn quantile_sorted(sorted: &[i16], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => f64::from(sorted[0]),
        n => {
            let h = (n as f64 * p + 0.5).clamp(1.0, n as f64);
            let lo = h.floor() as usize;
            let frac = h - lo as f64;
            let lower = f64::from(sorted[lo - 1]);
            if lo >= n {
                lower
            } else {
                lower + frac * (f64::from(sorted[lo]) - lower)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gc_content_of_acgt_is_fifty_percent() {
        assert_eq!(gc_content(b"ACGT"), 50.0);
        assert_eq!(gc_content(b""), 0.0);
        assert_eq!(gc_content(b"GGCC"), 100.0);
        // lowercase is not counted
        assert_eq!(gc_content(b"gcAT"), 0.0);
    }

    #[test]
    fn test_quartiles_of_four_scores() {
        let scores = [10, 20, 30, 40];
        assert_eq!(quantile_sorted(&scores, 0.25), 15.0);
        assert_eq!(quantile_sorted(&scores, 0.5), 25.0);
        assert_eq!(quantile_sorted(&scores, 0.75), 35.0);
    }

    #[test]
    fn test_quantile_edges() {
        assert_eq!(quantile_sorted(&[7], 0.25), 7.0);
        assert_eq!(quantile_sorted(&[10, 20], 0.25), 10.0);
        assert_eq!(quantile_sorted(&[10, 20], 0.5), 15.0);
        assert_eq!(quantile_sorted(&[10, 20], 0.75), 20.0);
        assert_eq!(quantile_sorted(&[1, 2, 3], 0.5), 2.0);
    }

    #[test]
    fn test_positions_cover_longest_read() {
        let mut agg = QcAggregator::new();
        // '+' = 10, '5' = 20, '?' = 30, 'I' = 40
        agg.process_sequence(&Read::new("a", "ACGT", "++++")).unwrap();
        agg.process_sequence(&Read::new("b", "AC", "55")).unwrap();
        agg.process_sequence(&Read::new("c", "ACGTA", "?????")).unwrap();
        agg.process_sequence(&Read::new("d", "A", "I")).unwrap();

        let report = agg.into_report().unwrap();
        assert_eq!(report.summary.total_reads, 4);
        assert_eq!(report.summary.avg_read_length, 3.0);
        assert_eq!(report.per_position_quality.len(), 5);

        let first = report.per_position_quality[0];
        assert_eq!(first.position, 1);
        assert_eq!(first.mean, 25.0);
        assert_eq!(first.q1, 15.0);
        assert_eq!(first.median, 25.0);
        assert_eq!(first.q3, 35.0);

        let last = report.per_position_quality[4];
        assert_eq!(last.position, 5);
        assert_eq!(last.mean, 30.0);
    }

    #[test]
    fn test_empty_aggregator_fails() {
        let err = QcAggregator::new().into_report().unwrap_err();
        assert_eq!(err.kind(), "input");
        assert!(err.to_string().contains("empty input"));
    }
}
