use crate::instructions::Instruction;

pub trait Decoder {
    /// Rebuild the instruction a word encodes, or `None` if the pattern is unallocated.
    fn decode(&self, raw32: u32) -> Option<Instruction<'static>>;
}
