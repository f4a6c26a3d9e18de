use crate::bits::{bit, field, sign_extend};
use crate::decoder::Decoder;
use crate::instructions::{
    Address, BranchTarget, Cond, Instruction, LogicOp, MoveKind, Operand, Reg, Shift, Target,
    Width,
};

/// Decoder for the reduced A64 integer subset.
///
/// Dispatch follows `op0 = raw[28:25]`:
/// `100x` data processing (immediate), `x101` data processing (register),
/// `x1x0` loads and stores, `101x` branches.
#[derive(Debug, Default, Clone, Copy)]
pub struct A64Decoder;

impl A64Decoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for A64Decoder {
    fn decode(&self, raw32: u32) -> Option<Instruction<'static>> {
        match field(raw32, 25, 4) {
            0b1000 | 0b1001 => decode_dp_imm(raw32),
            0b0101 | 0b1101 => decode_dp_reg(raw32),
            0b0100 | 0b0110 | 0b1100 | 0b1110 => decode_transfer(raw32),
            0b1010 | 0b1011 => decode_branch(raw32),
            _ => None,
        }
    }
}

fn reg_at(raw: u32, lsb: u32, width: Width) -> Reg {
    Reg::new(field(raw, lsb, 5) as u8, width)
}

fn decode_dp_imm(raw: u32) -> Option<Instruction<'static>> {
    let width = Width::from_sf(bit(raw, 31));
    let opc = field(raw, 29, 2);
    let rd = reg_at(raw, 0, width);
    match field(raw, 23, 3) {
        0b010 => {
            // sf opc 100010 sh imm12 Rn Rd
            let shift = if bit(raw, 22) { 12 } else { 0 };
            Some(Instruction::Arithmetic {
                rd,
                rn: reg_at(raw, 5, width),
                op2: Operand::Imm {
                    value: field(raw, 10, 12) as u64,
                    shift,
                },
                negate: opc & 0b10 != 0,
                set_flags: opc & 0b01 != 0,
            })
        }
        0b101 => {
            // sf opc 100101 hw imm16 Rd
            let kind = MoveKind::from_opc(opc)?;
            let hw = field(raw, 21, 2);
            if width == Width::W32 && hw > 1 {
                return None;
            }
            Some(Instruction::MoveWide {
                rd,
                imm16: field(raw, 5, 16) as u16,
                shift: (hw * 16) as u8,
                kind,
            })
        }
        _ => None,
    }
}

fn decode_dp_reg(raw: u32) -> Option<Instruction<'static>> {
    let width = Width::from_sf(bit(raw, 31));
    let opc = field(raw, 29, 2);
    let opr = field(raw, 21, 4);
    let m = bit(raw, 28);
    let rd = reg_at(raw, 0, width);
    let rn = reg_at(raw, 5, width);
    let rm = reg_at(raw, 16, width);
    let imm6 = field(raw, 10, 6);

    if !m && imm6 >= width.bits() {
        // shift amount must stay below the operation width
        return None;
    }

    if !m && opr & 0b1001 == 0b1000 {
        let shift = Shift::from_bits(field(raw, 22, 2));
        if shift == Shift::Ror {
            return None;
        }
        Some(Instruction::Arithmetic {
            rd,
            rn,
            op2: Operand::Reg {
                reg: rm,
                shift,
                amount: imm6 as u8,
            },
            negate: opc & 0b10 != 0,
            set_flags: opc & 0b01 != 0,
        })
    } else if !m && opr & 0b1000 == 0 {
        let (op, set_flags) = match opc {
            0b00 => (LogicOp::And, false),
            0b01 => (LogicOp::Or, false),
            0b10 => (LogicOp::Xor, false),
            _ => (LogicOp::And, true),
        };
        Some(Instruction::Logical {
            rd,
            rn,
            op2: Operand::Reg {
                reg: rm,
                shift: Shift::from_bits(field(raw, 22, 2)),
                amount: imm6 as u8,
            },
            op,
            negate: bit(raw, 21),
            set_flags,
        })
    } else if m && opr == 0b1000 && opc == 0 {
        // sf 00 11011 000 Rm o0 Ra Rn Rd
        Some(Instruction::Multiply {
            rd,
            rn,
            rm,
            ra: reg_at(raw, 10, width),
            negate: bit(raw, 15),
        })
    } else {
        None
    }
}

fn decode_transfer(raw: u32) -> Option<Instruction<'static>> {
    let width = Width::from_sf(bit(raw, 30));
    let rt = reg_at(raw, 0, width);

    // 11 at [28:27] for every form in the subset; pair and SIMD transfers also land here
    if field(raw, 27, 2) != 0b11 {
        return None;
    }

    if !bit(raw, 31) {
        // 0 sf 011 000 simm19 Rt
        if bit(raw, 29) || field(raw, 24, 3) != 0 {
            return None;
        }
        let words = sign_extend(field(raw, 5, 19) as u64, 19);
        return Some(Instruction::Transfer {
            rt,
            store: false,
            address: Address::Literal(Target::Offset(words * 4)),
        });
    }

    if !bit(raw, 29) || field(raw, 25, 2) != 0 || bit(raw, 23) {
        return None;
    }
    let store = !bit(raw, 22);
    let base = reg_at(raw, 5, Width::W64);
    let address = if bit(raw, 24) {
        Address::UnsignedOffset {
            base,
            offset: field(raw, 10, 12) as u64 * width.bytes(),
        }
    } else if bit(raw, 21) {
        if field(raw, 10, 6) != 0b011010 {
            return None;
        }
        Address::RegisterOffset {
            base,
            index: reg_at(raw, 16, Width::W64),
        }
    } else {
        let offset = sign_extend(field(raw, 12, 9) as u64, 9);
        match field(raw, 10, 2) {
            0b11 => Address::PreIndexed { base, offset },
            0b01 => Address::PostIndexed { base, offset },
            _ => return None,
        }
    };
    Some(Instruction::Transfer { rt, store, address })
}

fn decode_branch(raw: u32) -> Option<Instruction<'static>> {
    match field(raw, 29, 3) {
        0b000 => {
            // 000101 simm26
            let words = sign_extend(field(raw, 0, 26) as u64, 26);
            Some(Instruction::Branch {
                target: BranchTarget::Target(Target::Offset(words * 4)),
                cond: None,
            })
        }
        0b110 => {
            // 1101011 0000 11111 000000 Rn 00000
            if raw & 0xFFFF_FC1F != 0xD61F_0000 {
                return None;
            }
            Some(Instruction::Branch {
                target: BranchTarget::Reg(reg_at(raw, 5, Width::W64)),
                cond: None,
            })
        }
        0b010 => {
            // 01010100 simm19 0 cond
            if bit(raw, 4) || bit(raw, 24) {
                return None;
            }
            let cond = Cond::from_code(field(raw, 0, 4) as u8)?;
            let words = sign_extend(field(raw, 5, 19) as u64, 19);
            Some(Instruction::Branch {
                target: BranchTarget::Target(Target::Offset(words * 4)),
                cond: Some(cond),
            })
        }
        _ => None,
    }
}
