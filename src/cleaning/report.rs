use crate::sequence_processor::Read;
use crate::utils::round_to;
use bio::io::fastq;
use serde::de::{Deserializer, Error};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    Duplicate,
    QualityFailed,
    TooShort,
    TooLong,
    TooManyN,
    LowComplexity,
}

impl DiscardReason {
    pub const ALL: [DiscardReason; 6] = [
        DiscardReason::Duplicate,
        DiscardReason::QualityFailed,
        DiscardReason::TooShort,
        DiscardReason::TooLong,
        DiscardReason::TooManyN,
        DiscardReason::LowComplexity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscardReason::Duplicate => "duplicate",
            DiscardReason::QualityFailed => "quality_failed",
            DiscardReason::TooShort => "too_short",
            DiscardReason::TooLong => "too_long",
            DiscardReason::TooManyN => "too_many_n",
            DiscardReason::LowComplexity => "low_complexity",
        }
    }
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Count of reads rejected for one reason, with the mean offending value
/// (length in bp or N percentage) where the reason has one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DiscardStat {
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_value: Option<f64>,
    #[serde(skip)]
    magnitude_sum: f64,
}

impl DiscardStat {
    fn record(&mut self, magnitude: Option<f64>) {
        self.count += 1;
        if let Some(value) = magnitude {
            self.magnitude_sum += value;
            self.average_value = Some(round_to(self.magnitude_sum / self.count as f64, 1));
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DiscardReasons {
    pub duplicate: DiscardStat,
    pub quality_failed: DiscardStat,
    pub too_short: DiscardStat,
    pub too_long: DiscardStat,
    pub too_many_n: DiscardStat,
    pub low_complexity: DiscardStat,
}

impl DiscardReasons {
    pub fn get(&self, reason: DiscardReason) -> &DiscardStat {
        match reason {
            DiscardReason::Duplicate => &self.duplicate,
            DiscardReason::QualityFailed => &self.quality_failed,
            DiscardReason::TooShort => &self.too_short,
            DiscardReason::TooLong => &self.too_long,
            DiscardReason::TooManyN => &self.too_many_n,
            DiscardReason::LowComplexity => &self.low_complexity,
        }
    }

    fn get_mut(&mut self, reason: DiscardReason) -> &mut DiscardStat {
        match reason {
            DiscardReason::Duplicate => &mut self.duplicate,
            DiscardReason::QualityFailed => &mut self.quality_failed,
            DiscardReason::TooShort => &mut self.too_short,
            DiscardReason::TooLong => &mut self.too_long,
            DiscardReason::TooManyN => &mut self.too_many_n,
            DiscardReason::LowComplexity => &mut self.low_complexity,
        }
    }

    pub fn record(&mut self, reason: DiscardReason, magnitude: Option<f64>) {
        self.get_mut(reason).record(magnitude);
    }

    pub fn total(&self) -> u64 {
        DiscardReason::ALL.iter().map(|&r| self.get(r).count).sum()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CleaningSummary {
    pub reads_processed: u64,
    pub reads_passed: u64,
    pub reads_discarded: u64,
    pub discard_reasons: DiscardReasons,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CleaningResult {
    pub summary: CleaningSummary,
    /// Surviving reads in input order; embedded as FASTQ text when persisted.
    #[serde(
        rename = "cleaned_data",
        serialize_with = "serialize_fastq",
        deserialize_with = "deserialize_fastq"
    )]
    pub cleaned_reads: Vec<Read>,
}

impl CleaningResult {
    pub fn cleaned_fastq(&self) -> String {
        self.cleaned_reads.iter().map(Read::to_fastq).collect()
    }
}

fn serialize_fastq<S>(reads: &[Read], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let text: String = reads.iter().map(Read::to_fastq).collect();
    serializer.serialize_str(&text)
}

fn deserialize_fastq<'de, D>(deserializer: D) -> Result<Vec<Read>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    fastq::Reader::new(text.as_bytes())
        .records()
        .map(|record| {
            let record = record.map_err(D::Error::custom)?;
            let title = match record.desc() {
                Some(desc) => format!("{} {}", record.id(), desc),
                None => record.id().to_string(),
            };
            Ok(Read::new(title, record.seq(), record.qual()))
        })
        .collect()
}
