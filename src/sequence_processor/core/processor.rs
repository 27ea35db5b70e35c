use super::sequence::Read;
use crate::api::EngineResult;

/// Single-pass consumer of a read stream.
pub trait SequenceProcessor {
    fn process_sequence(&mut self, read: &Read) -> EngineResult<()>;
    fn finalize(&mut self) -> EngineResult<()> {
        Ok(())
    }
}
