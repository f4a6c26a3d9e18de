use crate::decoder::Decoder;
use crate::disasm::fmt_instruction;
use crate::exec::{Executor, Flow};
use crate::instructions::{Width, NUM_REGS, ZR};
use crate::memory::{Bus, MemoryError};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// `and x0, x0, x0`: stops the run loop without being executed.
pub const HALT: u32 = 0x8A00_0000;

/// `b` with a zero offset; treated as a halt since it would never advance.
pub const BRANCH_TO_SELF: u32 = 0x1400_0000;

pub const fn is_halt(raw: u32) -> bool {
    raw == HALT || raw == BRANCH_TO_SELF
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CpuConfig {
    /// Upper bound on executed instructions; `None` runs until halt.
    pub max_steps: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cpu {
    pub pc: u64,
    pub pstate: Pstate,
    regs: [u64; NUM_REGS],
    pub cfg: CpuConfig,
}

bitflags! {
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pstate: u8 {
const V = 1 << 0; // Signed overflow
const C = 1 << 1; // Carry / no borrow
const Z = 1 << 2; // Zero
const N = 1 << 3; // Negative
}
}

impl Pstate {
    /// `NZCV` with `-` for each clear flag.
    pub fn render(self) -> String {
        [(Pstate::N, 'N'), (Pstate::Z, 'Z'), (Pstate::C, 'C'), (Pstate::V, 'V')]
            .iter()
            .map(|&(flag, c)| if self.contains(flag) { c } else { '-' })
            .collect()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Trap {
    #[error("unknown instruction {raw:#010x} at {pc:#x}")]
    UnknownInstruction { pc: u64, raw: u32 },
    #[error("bus error at {addr:#x}: {source}")]
    Bus {
        addr: u64,
        #[source]
        source: MemoryError,
    },
    #[error("unaligned branch target {addr:#x}")]
    Unaligned { addr: u64 },
    #[error("register index {index} out of range")]
    RegisterOutOfRange { index: u8 },
    #[error("no halt after {limit} instructions")]
    StepLimit { limit: u64 },
}

impl Cpu {
    pub fn new(cfg: CpuConfig) -> Self {
        Self {
            pc: 0,
            pstate: Pstate::Z,
            regs: [0; NUM_REGS],
            cfg,
        }
    }

    pub fn reset(&mut self, reset_pc: u64) {
        self.pc = reset_pc;
        self.pstate = Pstate::Z;
        self.regs = [0; NUM_REGS];
    }

    /// Read register `index` at `width`; the zero register reads as 0.
    pub fn load(&self, index: u8, width: Width) -> Result<u64, Trap> {
        match index {
            ZR => Ok(0),
            i if (i as usize) < NUM_REGS => Ok(self.regs[i as usize] & width.mask()),
            _ => Err(Trap::RegisterOutOfRange { index }),
        }
    }

    /// Write register `index`. A 32-bit store clears the upper half; writes to
    /// the zero register vanish.
    pub fn store(&mut self, index: u8, value: u64, width: Width) -> Result<(), Trap> {
        match index {
            ZR => Ok(()),
            i if (i as usize) < NUM_REGS => {
                self.regs[i as usize] = value & width.mask();
                Ok(())
            }
            _ => Err(Trap::RegisterOutOfRange { index }),
        }
    }

    pub fn regs(&self) -> &[u64; NUM_REGS] {
        &self.regs
    }

    pub fn fetch<B: Bus>(&self, bus: &mut B) -> Result<u32, Trap> {
        let pc = self.pc;
        bus.read_u32(pc)
            .map_err(|source| Trap::Bus { addr: pc, source })
    }

    pub fn step<B: Bus, D: Decoder, X: Executor>(
        &mut self,
        bus: &mut B,
        dec: &D,
        exec: &X,
    ) -> Result<(), Trap> {
        let raw = self.fetch(bus)?;
        self.execute_word(raw, bus, dec, exec)
    }

    fn execute_word<B: Bus, D: Decoder, X: Executor>(
        &mut self,
        raw: u32,
        bus: &mut B,
        dec: &D,
        exec: &X,
    ) -> Result<(), Trap> {
        let pc = self.pc;
        let insn = dec
            .decode(raw)
            .ok_or(Trap::UnknownInstruction { pc, raw })?;
        trace!("{pc:#010x}  {raw:08x}  {}", fmt_instruction(&insn));
        self.pc = match exec.exec(self, bus, &insn)? {
            Flow::Next => pc.wrapping_add(4),
            Flow::Jump(target) => target,
        };
        Ok(())
    }

    /// Fetch and execute until a halt word is fetched; returns the number of executed instructions.
    pub fn run<B: Bus, D: Decoder, X: Executor>(
        &mut self,
        bus: &mut B,
        dec: &D,
        exec: &X,
    ) -> Result<u64, Trap> {
        let mut steps = 0u64;
        loop {
            let raw = self.fetch(bus)?;
            if is_halt(raw) {
                debug!(pc = self.pc, steps, "halt");
                return Ok(steps);
            }
            if let Some(limit) = self.cfg.max_steps {
                if steps >= limit {
                    return Err(Trap::StepLimit { limit });
                }
            }
            self.execute_word(raw, bus, dec, exec)?;
            steps += 1;
        }
    }
}
