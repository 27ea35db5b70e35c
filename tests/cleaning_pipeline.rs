use seqlab_jobs::cleaning::{clean, CleaningParams, DiscardReason};
use seqlab_jobs::qc::run_qc;
use seqlab_jobs::sequence_processor::{FastqReader, ProcessingStats};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn record(name: &str, seq: &str, qual_char: char) -> String {
    format!("@{}\n{}\n+\n{}\n", name, seq, qual_char.to_string().repeat(seq.len()))
}

fn mixed_reads(dir: &TempDir) -> PathBuf {
    let mut content = String::new();
    content.push_str(&record("keep_plain", "ACGTACGTAC", 'I'));
    content.push_str(&record("dup", "ACGTACGTAC", 'I'));
    content.push_str(&record("keep_adapter", "ACGTTAGATCGGTT", 'I'));
    content.push_str(&record("bad_quality", "TTGCATGCAA", '#'));
    content.push_str(&record("short", "ACG", 'I'));
    content.push_str(&record("long", "ACGTACGTACGTACG", 'I'));
    content.push_str(&record("ambiguous", "NNNACGTACG", 'I'));
    content.push_str(&record("repeat", "AAAAAAAAAA", 'I'));
    content.push_str(&record("all_adapter", "AGATCGGACG", 'I'));

    let path = dir.path().join("mixed.fastq");
    fs::write(&path, content).unwrap();
    path
}

fn params() -> CleaningParams {
    CleaningParams {
        adapter: "AGATCGG".to_string(),
        quality_threshold: 20,
        min_length: 5,
        max_length: 12,
        max_n_percent: 20.0,
        deduplicate: true,
        filter_complexity: true,
    }
}

#[test]
fn every_read_is_counted_once() {
    let dir = TempDir::new().unwrap();
    let reader = FastqReader::open(&mixed_reads(&dir)).unwrap();
    let result = clean(reader, &params(), &mut |_: &ProcessingStats| {}).unwrap();
    let summary = &result.summary;
    let reasons = &summary.discard_reasons;

    assert_eq!(summary.reads_processed, 9);
    assert_eq!(summary.reads_passed, 2);
    assert_eq!(summary.reads_discarded, 7);
    assert_eq!(summary.reads_passed + reasons.total(), summary.reads_processed);

    assert_eq!(reasons.duplicate.count, 1);
    assert_eq!(reasons.quality_failed.count, 2);
    assert_eq!(reasons.too_short.count, 1);
    assert_eq!(reasons.too_short.average_value, Some(3.0));
    assert_eq!(reasons.too_long.count, 1);
    assert_eq!(reasons.too_long.average_value, Some(15.0));
    assert_eq!(reasons.too_many_n.count, 1);
    assert_eq!(reasons.too_many_n.average_value, Some(30.0));
    assert_eq!(reasons.low_complexity.count, 1);
    for reason in DiscardReason::ALL {
        assert!(reasons.get(reason).count <= 2, "{} over-counted", reason);
    }

    let titles: Vec<&str> = result.cleaned_reads.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["keep_plain", "keep_adapter"]);
    assert_eq!(result.cleaned_reads[1].seq, b"ACGTT");
    assert_eq!(result.cleaned_reads[1].qual, b"IIIII");
}

#[test]
fn cleaned_output_feeds_back_into_qc() {
    let dir = TempDir::new().unwrap();
    let reader = FastqReader::open(&mixed_reads(&dir)).unwrap();
    let result = clean(reader, &params(), &mut |_: &ProcessingStats| {}).unwrap();

    let cleaned = dir.path().join("cleaned.fastq");
    fs::write(&cleaned, result.cleaned_fastq()).unwrap();

    let report = run_qc(&cleaned, None, &mut |_: &ProcessingStats| {}).unwrap();
    assert_eq!(report.file1.summary.total_reads, result.summary.reads_passed);
    assert_eq!(report.file1.summary.avg_read_length, 7.5);
}

#[test]
fn result_json_shape() {
    let dir = TempDir::new().unwrap();
    let reader = FastqReader::open(&mixed_reads(&dir)).unwrap();
    let result = clean(reader, &params(), &mut |_: &ProcessingStats| {}).unwrap();

    let json = serde_json::to_value(&result).unwrap();
    let reasons = &json["summary"]["discard_reasons"];
    assert_eq!(reasons["too_short"]["count"], 1);
    assert_eq!(reasons["too_short"]["average_value"], 3.0);
    assert!(reasons["duplicate"].get("average_value").is_none());
    assert!(json["cleaned_data"]
        .as_str()
        .unwrap()
        .starts_with("@keep_plain\nACGTACGTAC\n+\n"));
}

#[test]
fn defaults_discard_short_reads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("short.fastq");
    fs::write(&path, record("r", "ACGTACGT", 'I')).unwrap();

    let result = clean(
        FastqReader::open(&path).unwrap(),
        &CleaningParams::default(),
        &mut |_: &ProcessingStats| {},
    )
    .unwrap();
    assert_eq!(result.summary.reads_passed, 0);
    assert_eq!(result.summary.discard_reasons.too_short.count, 1);
    assert!(result.cleaned_fastq().is_empty());
}
