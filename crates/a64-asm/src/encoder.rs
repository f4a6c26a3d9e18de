//! Packs IR values into A64 machine words.

use a64_rs::bits::{fits_signed, fits_unsigned, is_aligned, mask};
use a64_rs::instructions::{
    Address, BranchTarget, Instruction, LogicOp, Operand, Reg, Shift, Target, Width,
};

use crate::error::AsmError;
use crate::symbols::SymbolTable;

const ARITH_IMM: u32 = 0b100010 << 23;
const ARITH_REG: u32 = 0b01011 << 24;
const LOGIC_REG: u32 = 0b01010 << 24;
const MOVE_WIDE: u32 = 0b100101 << 23;
const MULTIPLY: u32 = 0b1101_1000 << 21;
const LDST_UOFF: u32 = 1 << 31 | 0b111001 << 24;
const LDST_REG: u32 = 1 << 31 | 0b111000 << 24;
const LDR_LIT: u32 = 0b011 << 27;
const B: u32 = 0x1400_0000;
const B_COND: u32 = 0x5400_0000;
const BR: u32 = 0xD61F_0000;

fn sf(width: Width) -> u32 {
    (width.sf() as u32) << 31
}

fn r(reg: Reg) -> u32 {
    reg.index as u32
}

fn same_width(rd: Reg, others: &[Reg]) -> Result<(), AsmError> {
    match others.iter().find(|o| o.width != rd.width) {
        None => Ok(()),
        Some(o) => Err(AsmError::InvalidOperand(format!(
            "register {} does not match the {}-bit destination",
            o.index,
            rd.width.bits()
        ))),
    }
}

fn shift_amount(amount: u8, width: Width) -> Result<u32, AsmError> {
    if (amount as u32) < width.bits() {
        Ok(amount as u32)
    } else {
        Err(AsmError::Range {
            what: "shift amount",
            value: amount as i64,
        })
    }
}

/// Signed byte displacement from `address` to `target`.
fn displacement(
    target: Target<'_>,
    address: u64,
    symbols: &SymbolTable,
) -> Result<i64, AsmError> {
    Ok(match target {
        Target::Label(l) => symbols.resolve(l)?.wrapping_sub(address) as i64,
        Target::Address(a) => a.wrapping_sub(address) as i64,
        Target::Offset(o) => o,
    })
}

/// Word-scaled `bits`-wide signed field for a byte displacement.
fn pc_words(offset: i64, bits: u32, what: &'static str) -> Result<u32, AsmError> {
    if offset % 4 != 0 {
        return Err(AsmError::Alignment {
            what,
            value: offset,
            align: 4,
        });
    }
    let words = offset / 4;
    if !fits_signed(words, bits) {
        return Err(AsmError::Range {
            what,
            value: offset,
        });
    }
    Ok((words as u64 & mask(0, bits)) as u32)
}

/// Encode one instruction placed at `address`.
pub fn encode(
    insn: &Instruction<'_>,
    address: u64,
    symbols: &SymbolTable,
) -> Result<u32, AsmError> {
    match *insn {
        Instruction::Arithmetic {
            rd,
            rn,
            op2,
            negate,
            set_flags,
        } => {
            same_width(rd, &[rn])?;
            let opc = (negate as u32) << 1 | set_flags as u32;
            let head = sf(rd.width) | opc << 29 | r(rn) << 5 | r(rd);
            match op2 {
                Operand::Imm { value, shift } => {
                    let sh: u32 = match shift {
                        0 => 0,
                        12 => 1,
                        _ => {
                            return Err(AsmError::InvalidOperand(format!(
                                "arithmetic immediates shift by 0 or 12, not {shift}"
                            )))
                        }
                    };
                    if !fits_unsigned(value, 12) {
                        return Err(AsmError::Range {
                            what: "imm12",
                            value: value as i64,
                        });
                    }
                    Ok(head | ARITH_IMM | sh << 22 | (value as u32) << 10)
                }
                Operand::Reg { reg, shift, amount } => {
                    same_width(rd, &[reg])?;
                    if shift == Shift::Ror {
                        return Err(AsmError::InvalidOperand(
                            "ror is not allowed on arithmetic operands".into(),
                        ));
                    }
                    let imm6 = shift_amount(amount, rd.width)?;
                    Ok(head | ARITH_REG | shift.bits() << 22 | r(reg) << 16 | imm6 << 10)
                }
            }
        }
        Instruction::Logical {
            rd,
            rn,
            op2,
            op,
            negate,
            set_flags,
        } => {
            let Operand::Reg { reg, shift, amount } = op2 else {
                return Err(AsmError::UnsupportedOperandType("logical immediate"));
            };
            same_width(rd, &[rn, reg])?;
            let opc: u32 = match (op, set_flags) {
                (LogicOp::And, false) => 0b00,
                (LogicOp::Or, false) => 0b01,
                (LogicOp::Xor, false) => 0b10,
                (LogicOp::And, true) => 0b11,
                _ => {
                    return Err(AsmError::InvalidOperand(
                        "only and/bic can set flags".into(),
                    ))
                }
            };
            let imm6 = shift_amount(amount, rd.width)?;
            Ok(sf(rd.width)
                | opc << 29
                | LOGIC_REG
                | shift.bits() << 22
                | (negate as u32) << 21
                | r(reg) << 16
                | imm6 << 10
                | r(rn) << 5
                | r(rd))
        }
        Instruction::MoveWide {
            rd,
            imm16,
            shift,
            kind,
        } => {
            if shift % 16 != 0 {
                return Err(AsmError::InvalidOperand(format!(
                    "wide move shift {shift} is not a multiple of 16"
                )));
            }
            if shift as u32 >= rd.width.bits() {
                return Err(AsmError::Range {
                    what: "wide move shift",
                    value: shift as i64,
                });
            }
            let hw = shift as u32 / 16;
            Ok(sf(rd.width)
                | kind.opc() << 29
                | MOVE_WIDE
                | hw << 21
                | (imm16 as u32) << 5
                | r(rd))
        }
        Instruction::Multiply {
            rd,
            rn,
            rm,
            ra,
            negate,
        } => {
            same_width(rd, &[rn, rm, ra])?;
            Ok(sf(rd.width)
                | MULTIPLY
                | r(rm) << 16
                | (negate as u32) << 15
                | r(ra) << 10
                | r(rn) << 5
                | r(rd))
        }
        Instruction::Transfer { rt, store, address: mode } => {
            let size = (rt.width.sf() as u32) << 30;
            let load = (!store as u32) << 22;
            let head = size | load | r(rt);
            match mode {
                Address::UnsignedOffset { base, offset } => {
                    let bytes = rt.width.bytes();
                    if !is_aligned(offset, bytes) {
                        return Err(AsmError::Alignment {
                            what: "unsigned offset",
                            value: offset as i64,
                            align: bytes,
                        });
                    }
                    let imm12 = offset / bytes;
                    if !fits_unsigned(imm12, 12) {
                        return Err(AsmError::Range {
                            what: "unsigned offset",
                            value: offset as i64,
                        });
                    }
                    Ok(head | LDST_UOFF | (imm12 as u32) << 10 | r(base) << 5)
                }
                Address::PreIndexed { base, offset } | Address::PostIndexed { base, offset } => {
                    if !fits_signed(offset, 9) {
                        return Err(AsmError::Range {
                            what: "simm9",
                            value: offset,
                        });
                    }
                    let mode_bits: u32 = match mode {
                        Address::PreIndexed { .. } => 0b11,
                        _ => 0b01,
                    };
                    let simm9 = (offset as u64 & mask(0, 9)) as u32;
                    Ok(head | LDST_REG | simm9 << 12 | mode_bits << 10 | r(base) << 5)
                }
                Address::RegisterOffset { base, index } => {
                    Ok(head | LDST_REG | 1 << 21 | r(index) << 16 | 0b011010 << 10 | r(base) << 5)
                }
                Address::Literal(target) => {
                    if store {
                        return Err(AsmError::UnsupportedOperandType("str"));
                    }
                    let offset = displacement(target, address, symbols)?;
                    let simm19 = pc_words(offset, 19, "literal offset")?;
                    Ok(size | LDR_LIT | simm19 << 5 | r(rt))
                }
            }
        }
        Instruction::Branch {
            target: BranchTarget::Reg(reg),
            cond,
        } => {
            if cond.is_some() {
                return Err(AsmError::InvalidOperand(
                    "register branches are unconditional".into(),
                ));
            }
            Ok(BR | r(reg) << 5)
        }
        Instruction::Branch {
            target: BranchTarget::Target(target),
            cond: None,
        } => {
            let imm26 = pc_words(displacement(target, address, symbols)?, 26, "branch offset")?;
            Ok(B | imm26)
        }
        Instruction::Branch {
            target: BranchTarget::Target(target),
            cond: Some(cond),
        } => {
            let imm19 = pc_words(displacement(target, address, symbols)?, 19, "branch offset")?;
            Ok(B_COND | imm19 << 5 | cond.code() as u32)
        }
        Instruction::Directive(word) => Ok(word),
    }
}
