//! Ordered read-cleaning filter chain.
//!
//! Each read runs through the stages in a fixed order and the first stage
//! that rejects it decides its only discard reason:
//!
//! 1. deduplication (optional)
//! 2. adapter trim (shortens, never rejects)
//! 3. 4-base sliding-window quality trim
//! 4. length bounds
//! 5. ambiguous-base percentage
//! 6. low-complexity (optional)

pub mod filters;
pub mod report;

pub use filters::{FilterOutcome, ReadFilter};
pub use report::{CleaningResult, CleaningSummary, DiscardReason, DiscardReasons, DiscardStat};

use crate::api::{EngineError, EngineResult};
use crate::sequence_processor::{FastqReader, ProcessingStats, Read, SequenceProcessor};
use filters::{
    AdapterTrim, AmbiguousBaseFilter, ComplexityFilter, Deduplicate, LengthFilter, QualityTrim,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CleaningParams {
    /// Adapter to cut at; empty disables adapter trimming
    #[serde(default)]
    pub adapter: String,
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: u8,
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_max_n_percent")]
    pub max_n_percent: f64,
    #[serde(default)]
    pub deduplicate: bool,
    #[serde(default)]
    pub filter_complexity: bool,
}

fn default_quality_threshold() -> u8 {
    20
}

fn default_min_length() -> usize {
    50
}

fn default_max_length() -> usize {
    150
}

fn default_max_n_percent() -> f64 {
    10.0
}

impl Default for CleaningParams {
    fn default() -> Self {
        Self {
            adapter: String::new(),
            quality_threshold: default_quality_threshold(),
            min_length: default_min_length(),
            max_length: default_max_length(),
            max_n_percent: default_max_n_percent(),
            deduplicate: false,
            filter_complexity: false,
        }
    }
}

impl CleaningParams {
    pub fn validate(&self) -> EngineResult<()> {
        if self.min_length > self.max_length {
            return Err(EngineError::validation(format!(
                "min_length ({}) is greater than max_length ({})",
                self.min_length, self.max_length
            )));
        }
        if !(0.0..=100.0).contains(&self.max_n_percent) {
            return Err(EngineError::validation(format!(
                "max_n_percent must be within 0..=100, got {}",
                self.max_n_percent
            )));
        }
        if !self.adapter.is_ascii() {
            return Err(EngineError::validation("adapter must be an ASCII sequence"));
        }
        Ok(())
    }
}

/// Runs every read through the filter chain and keeps the survivors.
pub struct CleaningPipeline {
    chain: Vec<Box<dyn ReadFilter>>,
    summary: CleaningSummary,
    cleaned: Vec<Read>,
}

impl CleaningPipeline {
    pub fn new(params: &CleaningParams) -> EngineResult<Self> {
        params.validate()?;

        let mut chain: Vec<Box<dyn ReadFilter>> = Vec::with_capacity(6);
        if params.deduplicate {
            chain.push(Box::new(Deduplicate::default()));
        }
        if !params.adapter.is_empty() {
            chain.push(Box::new(AdapterTrim::new(&params.adapter)));
        }
        chain.push(Box::new(QualityTrim::new(params.quality_threshold)));
        chain.push(Box::new(LengthFilter::new(params.min_length, params.max_length)));
        chain.push(Box::new(AmbiguousBaseFilter::new(params.max_n_percent)));
        if params.filter_complexity {
            chain.push(Box::new(ComplexityFilter));
        }

        debug!(
            "Cleaning chain: {}",
            chain.iter().map(|f| f.name()).collect::<Vec<_>>().join(" -> ")
        );

        Ok(Self {
            chain,
            summary: CleaningSummary::default(),
            cleaned: Vec::new(),
        })
    }

    /// Outcome for one read; survivors are appended to the cleaned output.
    pub fn process(&mut self, read: &Read) -> FilterOutcome {
        self.summary.reads_processed += 1;

        let mut working = read.clone();
        for filter in self.chain.iter_mut() {
            if let FilterOutcome::Discard(reason, magnitude) = filter.apply(&mut working) {
                self.summary.discard_reasons.record(reason, magnitude);
                self.summary.reads_discarded += 1;
                return FilterOutcome::Discard(reason, magnitude);
            }
        }

        self.summary.reads_passed += 1;
        self.cleaned.push(working);
        FilterOutcome::Keep
    }

    pub fn summary(&self) -> &CleaningSummary {
        &self.summary
    }

    pub fn into_result(self) -> CleaningResult {
        CleaningResult {
            summary: self.summary,
            cleaned_reads: self.cleaned,
        }
    }
}

impl SequenceProcessor for CleaningPipeline {
    fn process_sequence(&mut self, read: &Read) -> EngineResult<()> {
        self.process(read);
        Ok(())
    }

    fn finalize(&mut self) -> EngineResult<()> {
        let discarded = self.summary.discard_reasons.total();
        if self.summary.reads_passed + discarded != self.summary.reads_processed {
            return Err(EngineError::internal(format!(
                "cleaning tally mismatch: {} passed + {} discarded != {} processed",
                self.summary.reads_passed, discarded, self.summary.reads_processed
            )));
        }
        Ok(())
    }
}

/// Clean one read stream.
pub fn clean(
    reader: FastqReader,
    params: &CleaningParams,
    on_progress: &mut dyn FnMut(&ProcessingStats),
) -> EngineResult<CleaningResult> {
    let mut pipeline = CleaningPipeline::new(params)?;
    let source = reader.path().display().to_string();
    reader.read_sequences(&mut pipeline, on_progress)?;

    let summary = pipeline.summary();
    info!(
        "Cleaned {}: {} processed, {} passed, {} discarded",
        source, summary.reads_processed, summary.reads_passed, summary.reads_discarded
    );
    Ok(pipeline.into_result())
}
