//! Alignment-rate extraction from the stats tool's text summary.
//!
//! Accepted input, searched in order:
//!
//! 1. `<float>% mapped`, where `<float>` is `digit+ '.' digit+`
//!    immediately followed by `%`, one space and the word `mapped`.
//! 2. a samtools flagstat line `<int> + <int> mapped (<float>%`, whose
//!    label is exactly `mapped` (not `primary mapped`).
//!
//! The first match wins. No match yields 0.0. Values are clamped to 0..=100.

const PERCENT_MARKER: &str = "% mapped";

pub fn parse_alignment_rate(text: &str) -> f64 {
    percent_then_marker(text)
        .or_else(|| flagstat_mapped_line(text))
        .map(|rate| rate.clamp(0.0, 100.0))
        .unwrap_or(0.0)
}

fn percent_then_marker(text: &str) -> Option<f64> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find(PERCENT_MARKER) {
        let marker_at = search_from + offset;
        if let Some(value) = trailing_float(&text[..marker_at]) {
            return Some(value);
        }
        search_from = marker_at + PERCENT_MARKER.len();
    }
    None
}

/// `digits.digits` at the very end of `prefix`.
fn trailing_float(prefix: &str) -> Option<f64> {
    let bytes = prefix.as_bytes();
    let mut end = bytes.len();
    let frac_start = bytes[..end]
        .iter()
        .rposition(|b| !b.is_ascii_digit())
        .map_or(0, |p| p + 1);
    if frac_start == end || frac_start == 0 || bytes[frac_start - 1] != b'.' {
        return None;
    }
    end = frac_start - 1;
    let int_start = bytes[..end]
        .iter()
        .rposition(|b| !b.is_ascii_digit())
        .map_or(0, |p| p + 1);
    if int_start == end {
        return None;
    }
    prefix[int_start..].parse().ok()
}

fn flagstat_mapped_line(text: &str) -> Option<f64> {
    text.lines().find_map(|line| {
        let (counts, rest) = line.split_once(" mapped (")?;
        let mut parts = counts.trim().split(" + ");
        let passed = parts.next()?;
        let failed = parts.next()?;
        if parts.next().is_some() || !is_uint(passed) || !is_uint(failed) {
            return None;
        }
        let pct = rest.split('%').next()?;
        trailing_float(pct).filter(|_| pct.bytes().all(|b| b.is_ascii_digit() || b == b'.'))
    })
}

fn is_uint(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
