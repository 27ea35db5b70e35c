use std::fmt::Write as _;

/// One sequencing record. Quality bytes are Phred+33 encoded and
/// index-aligned with `seq`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Read {
    pub title: String,
    pub seq: Vec<u8>,
    pub qual: Vec<u8>,
}

impl Read {
    pub fn new(title: impl Into<String>, seq: impl Into<Vec<u8>>, qual: impl Into<Vec<u8>>) -> Self {
        Read {
            title: title.into(),
            seq: seq.into(),
            qual: qual.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Truncate sequence and quality together to `len` bases.
    pub fn truncate(&mut self, len: usize) {
        self.seq.truncate(len);
        self.qual.truncate(len);
    }

    /// Phred score at a 0-based offset (ASCII code minus 33).
    pub fn phred_at(&self, idx: usize) -> Option<i16> {
        self.qual.get(idx).map(|&q| phred(q))
    }

    /// Render as a four-line FASTQ record, newline terminated.
    pub fn to_fastq(&self) -> String {
        let mut out = String::with_capacity(self.title.len() + self.seq.len() * 2 + 6);
        let _ = write!(
            out,
            "@{}\n{}\n+\n{}\n",
            self.title,
            String::from_utf8_lossy(&self.seq),
            String::from_utf8_lossy(&self.qual)
        );
        out
    }
}

#[inline]
pub fn phred(q: u8) -> i16 {
    i16::from(q) - 33
}
