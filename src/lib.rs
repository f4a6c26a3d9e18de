pub mod bits;
pub mod cpu;
pub mod decoder;
pub mod disasm;
pub mod dump;
pub mod exec;
pub mod instructions;
pub mod memory;

pub mod isa {
    pub mod a64; // reduced A64 integer subset
}

pub use cpu::{Cpu, CpuConfig, Pstate, Trap};
pub use instructions::{Instruction, Reg, Width};
pub use memory::{Bus, LinearMemory, MemoryError, MEMORY_SIZE};
