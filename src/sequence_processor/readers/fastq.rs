use crate::api::{EngineError, EngineResult};
use crate::sequence_processor::core::{ProcessingStats, Read, SequenceProcessor};
use bio::io::fastq;
use log::debug;
use niffler::get_reader;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Reads between progress callbacks.
pub const PROGRESS_INTERVAL: u64 = 10_000;

type Records = fastq::Records<BufReader<Box<dyn io::Read>>>;

/// Lazy FASTQ record stream. Compression is detected from the leading
/// bytes of the file, never from its extension.
pub struct FastqReader {
    path: PathBuf,
    records: Records,
}

impl FastqReader {
    pub fn open(path: &Path) -> EngineResult<Self> {
        let file = File::open(path).map_err(|e| {
            EngineError::input(format!("cannot open {}: {}", path.display(), e))
        })?;
        let is_empty = file
            .metadata()
            .map(|m| m.len() == 0)
            .map_err(|e| EngineError::input(format!("cannot stat {}: {}", path.display(), e)))?;

        // niffler refuses to sniff a zero-length stream; an empty file is
        // simply a stream with no records.
        let (inner_reader, compression): (Box<dyn io::Read>, _) = if is_empty {
            (Box::new(io::empty()), niffler::compression::Format::No)
        } else {
            get_reader(Box::new(file)).map_err(|e| {
                EngineError::input(format!("cannot decode {}: {}", path.display(), e))
            })?
        };

        debug!("Reading {} ({:?} compression)", path.display(), compression);

        let reader = fastq::Reader::from_bufread(BufReader::with_capacity(1024 * 1024, inner_reader));
        Ok(Self {
            path: path.to_path_buf(),
            records: reader.records(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drive `processor` over every record, reporting progress every
    /// [`PROGRESS_INTERVAL`] reads.
    pub fn read_sequences<P: SequenceProcessor>(
        self,
        processor: &mut P,
        on_progress: &mut dyn FnMut(&ProcessingStats),
    ) -> EngineResult<ProcessingStats> {
        let mut stats = ProcessingStats::default();

        for read in self {
            let read = read?;
            processor.process_sequence(&read)?;
            stats.record(read.len());

            if stats.processed % PROGRESS_INTERVAL == 0 {
                on_progress(&stats);
            }
        }

        processor.finalize()?;
        Ok(stats)
    }

    fn convert(&self, record: fastq::Record) -> Read {
        let title = match record.desc() {
            Some(desc) => format!("{} {}", record.id(), desc),
            None => record.id().to_string(),
        };
        Read {
            title,
            seq: record.seq().to_vec(),
            qual: record.qual().to_vec(),
        }
    }
}

impl Iterator for FastqReader {
    type Item = EngineResult<Read>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.records.next()? {
            Ok(record) if record.seq().len() != record.qual().len() => {
                Some(Err(EngineError::input(format!(
                    "malformed FASTQ in {}: record '{}' has {} bases but {} quality scores",
                    self.path.display(),
                    record.id(),
                    record.seq().len(),
                    record.qual().len()
                ))))
            }
            Ok(record) => Some(Ok(self.convert(record))),
            Err(e) => Some(Err(EngineError::input(format!(
                "malformed FASTQ in {}: {}",
                self.path.display(),
                e
            )))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_plain(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_reads_plain_records_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_plain(
            dir.path(),
            "reads.fq",
            "@r1 lane=1\nACGT\n+\nIIII\n@r2\nGG\n+\n!!\n",
        );

        let reads: Vec<Read> = FastqReader::open(&path)
            .unwrap()
            .collect::<EngineResult<Vec<_>>>()
            .unwrap();

        assert_eq!(reads.len(), 2);
        assert_eq!(reads[0].title, "r1 lane=1");
        assert_eq!(reads[0].seq, b"ACGT");
        assert_eq!(reads[1].title, "r2");
        assert_eq!(reads[1].phred_at(0), Some(0));
    }

    #[test]
    fn test_gzip_detected_by_content_not_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reads.txt");
        {
            let file = File::create(&path).unwrap();
            let mut writer = niffler::get_writer(
                Box::new(file),
                niffler::compression::Format::Gzip,
                niffler::Level::One,
            )
            .unwrap();
            writer.write_all(b"@r1\nACGTN\n+\nIIIII\n").unwrap();
        }

        let reader = FastqReader::open(&path).unwrap();
        let reads: Vec<Read> = reader.collect::<EngineResult<Vec<_>>>().unwrap();
        assert_eq!(reads.len(), 1);
        assert_eq!(reads[0].seq, b"ACGTN");
    }

    #[test]
    fn test_empty_file_yields_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_plain(dir.path(), "empty.fastq.gz", "");
        assert_eq!(FastqReader::open(&path).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_file_is_input_error() {
        let err = FastqReader::open(Path::new("/nonexistent/reads.fq"))
            .err()
            .unwrap();
        assert_eq!(err.kind(), "input");
    }
}
