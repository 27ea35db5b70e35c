#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingStats {
    pub processed: u64,
    pub bases: u64,
}

impl ProcessingStats {
    pub fn record(&mut self, read_len: usize) {
        self.processed += 1;
        self.bases += read_len as u64;
    }
}
