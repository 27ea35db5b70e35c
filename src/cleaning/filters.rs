use super::report::DiscardReason;
use crate::sequence_processor::Read;
use seahash::SeaHasher;
use std::collections::HashSet;
use std::hash::BuildHasherDefault;

pub const WINDOW_SIZE: usize = 4;
const LOW_COMPLEXITY_SHARE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOutcome {
    Keep,
    /// Rejected, with the offending magnitude where the reason tracks one
    Discard(DiscardReason, Option<f64>),
}

/// One stage of the cleaning chain. Stages may shorten the read in place.
pub trait ReadFilter {
    fn name(&self) -> &'static str;
    fn apply(&mut self, read: &mut Read) -> FilterOutcome;
}

/// Rejects exact repeats of a sequence already seen in this run.
#[derive(Default)]
pub struct Deduplicate {
    seen: HashSet<Vec<u8>, BuildHasherDefault<SeaHasher>>,
}

impl ReadFilter for Deduplicate {
    fn name(&self) -> &'static str {
        "deduplicate"
    }

    fn apply(&mut self, read: &mut Read) -> FilterOutcome {
        if self.seen.contains(&read.seq) {
            FilterOutcome::Discard(DiscardReason::Duplicate, None)
        } else {
            self.seen.insert(read.seq.clone());
            FilterOutcome::Keep
        }
    }
}

pub struct AdapterTrim {
    adapter: Vec<u8>,
}

impl AdapterTrim {
    pub fn new(adapter: &str) -> Self {
        Self {
            adapter: adapter.as_bytes().to_vec(),
        }
    }
}

impl ReadFilter for AdapterTrim {
    fn name(&self) -> &'static str {
        "adapter_trim"
    }

    fn apply(&mut self, read: &mut Read) -> FilterOutcome {
        if let Some(pos) = find_subsequence(&read.seq, &self.adapter) {
            read.truncate(pos);
        }
        FilterOutcome::Keep
    }
}

/// Truncates before the first 4-base window whose mean Phred score is
/// below the threshold. A read left empty is a quality failure.
pub struct QualityTrim {
    threshold: f64,
}

impl QualityTrim {
    pub fn new(threshold: u8) -> Self {
        Self {
            threshold: f64::from(threshold),
        }
    }
}

impl ReadFilter for QualityTrim {
    fn name(&self) -> &'static str {
        "quality_trim"
    }

    fn apply(&mut self, read: &mut Read) -> FilterOutcome {
        let keep = sliding_window_cut(&read.qual, self.threshold);
        read.truncate(keep);
        if read.is_empty() {
            FilterOutcome::Discard(DiscardReason::QualityFailed, None)
        } else {
            FilterOutcome::Keep
        }
    }
}

pub struct LengthFilter {
    min_length: usize,
    max_length: usize,
}

impl LengthFilter {
    pub fn new(min_length: usize, max_length: usize) -> Self {
        Self {
            min_length,
            max_length,
        }
    }
}

impl ReadFilter for LengthFilter {
    fn name(&self) -> &'static str {
        "length"
    }

    fn apply(&mut self, read: &mut Read) -> FilterOutcome {
        let len = read.len();
        if len < self.min_length {
            FilterOutcome::Discard(DiscardReason::TooShort, Some(len as f64))
        } else if len > self.max_length {
            FilterOutcome::Discard(DiscardReason::TooLong, Some(len as f64))
        } else {
            FilterOutcome::Keep
        }
    }
}

pub struct AmbiguousBaseFilter {
    max_n_percent: f64,
}

impl AmbiguousBaseFilter {
    pub fn new(max_n_percent: f64) -> Self {
        Self { max_n_percent }
    }
}

impl ReadFilter for AmbiguousBaseFilter {
    fn name(&self) -> &'static str {
        "ambiguous_bases"
    }

    fn apply(&mut self, read: &mut Read) -> FilterOutcome {
        let pct = n_percent(&read.seq);
        if pct > self.max_n_percent {
            FilterOutcome::Discard(DiscardReason::TooManyN, Some(pct))
        } else {
            FilterOutcome::Keep
        }
    }
}

pub struct ComplexityFilter;

impl ReadFilter for ComplexityFilter {
    fn name(&self) -> &'static str {
        "complexity"
    }

    fn apply(&mut self, read: &mut Read) -> FilterOutcome {
        if is_low_complexity(&read.seq) {
            FilterOutcome::Discard(DiscardReason::LowComplexity, None)
        } else {
            FilterOutcome::Keep
        }
    }
}

/// Number of leading bases to keep. Reads shorter than one window are
/// never trimmed.
pub fn sliding_window_cut(qual: &[u8], threshold: f64) -> usize {
    if qual.len() < WINDOW_SIZE {
        return qual.len();
    }
    for (start, window) in qual.windows(WINDOW_SIZE).enumerate() {
        let sum: i32 = window.iter().map(|&q| i32::from(q) - 33).sum();
        if (sum as f64 / WINDOW_SIZE as f64) < threshold {
            return start;
        }
    }
    qual.len()
}

/// Percentage of `N` bases; 0 for an empty sequence.
pub fn n_percent(seq: &[u8]) -> f64 {
    if seq.is_empty() {
        return 0.0;
    }
    let n = seq.iter().filter(|&&b| b == b'N').count();
    100.0 * n as f64 / seq.len() as f64
}

/// At most two distinct symbols with the most common one above half the
/// read. Empty sequences count as low complexity.
pub fn is_low_complexity(seq: &[u8]) -> bool {
    if seq.is_empty() {
        return true;
    }
    let mut counts = [0usize; 256];
    let mut distinct = 0;
    for &b in seq {
        if counts[b as usize] == 0 {
            distinct += 1;
            if distinct > 2 {
                return false;
            }
        }
        counts[b as usize] += 1;
    }
    let top = counts.iter().copied().max().unwrap_or(0);
    top as f64 / seq.len() as f64 > LOW_COMPLEXITY_SHARE
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
