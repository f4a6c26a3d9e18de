//! Final-state export written when the emulator halts.

use std::io::{self, Write};
use std::path::PathBuf;

use serde::Serialize;

use crate::cpu::Cpu;
use crate::instructions::NUM_REGS;
use crate::memory::LinearMemory;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryWord {
    pub address: u64,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalState {
    pub registers: Vec<u64>,
    pub pc: u64,
    pub pstate: String,
    pub memory: Vec<MemoryWord>,
}

impl FinalState {
    pub fn capture(cpu: &Cpu, mem: &LinearMemory) -> Self {
        Self {
            registers: cpu.regs().to_vec(),
            pc: cpu.pc,
            pstate: cpu.pstate.render(),
            memory: mem
                .non_zero_words()
                .map(|(address, value)| MemoryWord { address, value })
                .collect(),
        }
    }

    pub fn write_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Registers:")?;
        let pad = NUM_REGS.to_string().len();
        for (i, v) in self.registers.iter().enumerate() {
            writeln!(out, "X{i:0pad$} = {v:016x}")?;
        }
        writeln!(out, "PC = {:016x}", self.pc)?;
        writeln!(out, "PSTATE : {}", self.pstate)?;
        writeln!(out, "Non-Zero Memory:")?;
        for w in &self.memory {
            writeln!(out, "0x{:08x}: {:08x}", w.address, w.value)?;
        }
        Ok(())
    }
}

/// Output path for a dump: `.out` is appended unless already present.
pub fn dump_path(path: PathBuf) -> PathBuf {
    if path.extension().is_some_and(|e| e == "out") {
        path
    } else {
        let mut s = path.into_os_string();
        s.push(".out");
        PathBuf::from(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_path_appends_out_suffix() {
        assert_eq!(dump_path("a".into()), PathBuf::from("a.out"));
        assert_eq!(dump_path("a.out".into()), PathBuf::from("a.out"));
        assert_eq!(dump_path("a.b".into()), PathBuf::from("a.b.out"));
        assert_eq!(dump_path("dir/run".into()), PathBuf::from("dir/run.out"));
    }
    use crate::{Bus, CpuConfig};

    #[test]
    fn text_layout() {
        let mut cpu = Cpu::new(CpuConfig::default());
        cpu.store(2, 12, crate::Width::W64).unwrap();
        cpu.pc = 8;
        let mut mem = LinearMemory::new(16);
        mem.write_u32(4, 0x8A00_0000).unwrap();

        let mut buf = Vec::new();
        FinalState::capture(&cpu, &mem).write_text(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Registers:");
        assert_eq!(lines[1], "X00 = 0000000000000000");
        assert_eq!(lines[3], "X02 = 000000000000000c");
        assert_eq!(lines[31], "X30 = 0000000000000000");
        assert_eq!(lines[32], "PC = 0000000000000008");
        assert_eq!(lines[33], "PSTATE : -Z--");
        assert_eq!(lines[34], "Non-Zero Memory:");
        assert_eq!(lines[35], "0x00000004: 8a000000");
        assert_eq!(lines.len(), 36);
    }
}
