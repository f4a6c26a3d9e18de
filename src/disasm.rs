use crate::instructions::{
    Address, BranchTarget, Instruction, LogicOp, MoveKind, Operand, Reg, Shift, Target, Width,
};

pub fn fmt_reg(r: Reg) -> String {
    let p = match r.width {
        Width::W64 => 'x',
        Width::W32 => 'w',
    };
    if r.is_zero() {
        format!("{p}zr")
    } else {
        format!("{p}{}", r.index)
    }
}

fn fmt_operand(op: &Operand) -> String {
    match *op {
        Operand::Reg {
            reg,
            shift: Shift::Lsl,
            amount: 0,
        } => fmt_reg(reg),
        Operand::Reg { reg, shift, amount } => {
            format!("{}, {} #{}", fmt_reg(reg), shift.mnemonic(), amount)
        }
        Operand::Imm { value, shift: 0 } => format!("#{value:#x}"),
        Operand::Imm { value, shift } => format!("#{value:#x}, lsl #{shift}"),
    }
}

fn fmt_target(t: &Target<'_>) -> String {
    match *t {
        Target::Label(l) => l.to_string(),
        Target::Address(a) => format!("#{a:#x}"),
        Target::Offset(o) if o < 0 => format!("-{:#x}", o.unsigned_abs()),
        Target::Offset(o) => format!("+{o:#x}"),
    }
}

fn fmt_address(a: &Address<'_>) -> String {
    match *a {
        Address::UnsignedOffset { base, offset: 0 } => format!("[{}]", fmt_reg(base)),
        Address::UnsignedOffset { base, offset } => {
            format!("[{}, #{offset:#x}]", fmt_reg(base))
        }
        Address::PreIndexed { base, offset } => format!("[{}, #{offset}]!", fmt_reg(base)),
        Address::PostIndexed { base, offset } => format!("[{}], #{offset}", fmt_reg(base)),
        Address::RegisterOffset { base, index } => {
            format!("[{}, {}]", fmt_reg(base), fmt_reg(index))
        }
        Address::Literal(ref t) => fmt_target(t),
    }
}

pub fn fmt_instruction(insn: &Instruction<'_>) -> String {
    match insn {
        Instruction::Arithmetic {
            rd,
            rn,
            op2,
            negate,
            set_flags,
        } => {
            let mn = match (negate, set_flags) {
                (false, false) => "add",
                (false, true) => "adds",
                (true, false) => "sub",
                (true, true) => "subs",
            };
            format!("{mn} {}, {}, {}", fmt_reg(*rd), fmt_reg(*rn), fmt_operand(op2))
        }
        Instruction::Logical {
            rd,
            rn,
            op2,
            op,
            negate,
            set_flags,
        } => {
            let mn = match (op, negate, set_flags) {
                (LogicOp::And, false, false) => "and",
                (LogicOp::And, false, true) => "ands",
                (LogicOp::And, true, false) => "bic",
                (LogicOp::And, true, true) => "bics",
                (LogicOp::Or, false, _) => "orr",
                (LogicOp::Or, true, _) => "orn",
                (LogicOp::Xor, false, _) => "eor",
                (LogicOp::Xor, true, _) => "eon",
            };
            format!("{mn} {}, {}, {}", fmt_reg(*rd), fmt_reg(*rn), fmt_operand(op2))
        }
        Instruction::MoveWide {
            rd,
            imm16,
            shift,
            kind,
        } => {
            let mn = match kind {
                MoveKind::Negate => "movn",
                MoveKind::Zero => "movz",
                MoveKind::Keep => "movk",
            };
            if *shift == 0 {
                format!("{mn} {}, #{imm16:#x}", fmt_reg(*rd))
            } else {
                format!("{mn} {}, #{imm16:#x}, lsl #{shift}", fmt_reg(*rd))
            }
        }
        Instruction::Multiply {
            rd,
            rn,
            rm,
            ra,
            negate,
        } => {
            let mn = if *negate { "msub" } else { "madd" };
            format!(
                "{mn} {}, {}, {}, {}",
                fmt_reg(*rd),
                fmt_reg(*rn),
                fmt_reg(*rm),
                fmt_reg(*ra)
            )
        }
        Instruction::Transfer { rt, store, address } => {
            let mn = if *store { "str" } else { "ldr" };
            format!("{mn} {}, {}", fmt_reg(*rt), fmt_address(address))
        }
        Instruction::Branch {
            target: BranchTarget::Reg(r),
            ..
        } => format!("br {}", fmt_reg(*r)),
        Instruction::Branch {
            target: BranchTarget::Target(t),
            cond: None,
        } => format!("b {}", fmt_target(t)),
        Instruction::Branch {
            target: BranchTarget::Target(t),
            cond: Some(c),
        } => {
            format!("b.{} {}", c.suffix(), fmt_target(t))
        }
        Instruction::Directive(v) => format!(".int {v:#x}"),
    }
}
