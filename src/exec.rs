use num_traits::ops::overflowing::{OverflowingAdd, OverflowingSub};
use num_traits::{PrimInt, WrappingAdd, WrappingMul, WrappingSub};

use crate::bits::apply_shift;
use crate::cpu::{Cpu, Pstate, Trap};
use crate::instructions::{
    Address, BranchTarget, Cond, Instruction, LogicOp, MoveKind, Operand, Reg, Target, Width,
};
use crate::memory::Bus;

/// What the program counter does after an instruction retires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Next,
    Jump(u64),
}

pub trait Executor {
    fn exec<B: Bus>(&self, cpu: &mut Cpu, bus: &mut B, insn: &Instruction<'_>)
        -> Result<Flow, Trap>;
}

pub struct IntExecutor;
impl Executor for IntExecutor {
    fn exec<B: Bus>(
        &self,
        cpu: &mut Cpu,
        bus: &mut B,
        insn: &Instruction<'_>,
    ) -> Result<Flow, Trap> {
        match *insn {
            Instruction::Arithmetic {
                rd,
                rn,
                op2,
                negate,
                set_flags,
            } => {
                let width = rd.width;
                let a = cpu.load(rn.index, width)?;
                let b = operand_value(cpu, op2, width)?;
                let (res, flags) = add_sub(width, a, b, negate);
                cpu.store(rd.index, res, width)?;
                if set_flags {
                    cpu.pstate = flags;
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
                let width = rd.width;
                let a = cpu.load(rn.index, width)?;
                let mut b = operand_value(cpu, op2, width)?;
                if negate {
                    b = !b & width.mask();
                }
                let res = match op {
                    LogicOp::And => a & b,
                    LogicOp::Or => a | b,
                    LogicOp::Xor => a ^ b,
                };
                cpu.store(rd.index, res, width)?;
                if set_flags {
                    let mut flags = Pstate::empty();
                    flags.set(Pstate::N, (res >> (width.bits() - 1)) & 1 == 1);
                    flags.set(Pstate::Z, res == 0);
                    cpu.pstate = flags;
                }
            }
            Instruction::MoveWide {
                rd,
                imm16,
                shift,
                kind,
            } => {
                let width = rd.width;
                let op = (imm16 as u64) << shift;
                let res = match kind {
                    MoveKind::Zero => op,
                    MoveKind::Negate => !op,
                    MoveKind::Keep => {
                        let old = cpu.load(rd.index, width)?;
                        (old & !(0xFFFFu64 << shift)) | op
                    }
                };
                cpu.store(rd.index, res & width.mask(), width)?;
            }
            Instruction::Multiply {
                rd,
                rn,
                rm,
                ra,
                negate,
            } => {
                let width = rd.width;
                let n = cpu.load(rn.index, width)?;
                let m = cpu.load(rm.index, width)?;
                let acc = cpu.load(ra.index, width)?;
                let res = match width {
                    Width::W64 => mul_acc(acc, n, m, negate),
                    Width::W32 => mul_acc(acc as u32, n as u32, m as u32, negate) as u64,
                };
                cpu.store(rd.index, res, width)?;
            }
            Instruction::Transfer { rt, store, address } => {
                let addr = effective_address(cpu, address)?;
                if store {
                    let value = cpu.load(rt.index, rt.width)?;
                    let res = match rt.width {
                        Width::W64 => bus.write_u64(addr, value),
                        Width::W32 => bus.write_u32(addr, value as u32),
                    };
                    res.map_err(|source| Trap::Bus { addr, source })?;
                } else {
                    let res = match rt.width {
                        Width::W64 => bus.read_u64(addr),
                        Width::W32 => bus.read_u32(addr).map(u64::from),
                    };
                    let value = res.map_err(|source| Trap::Bus { addr, source })?;
                    cpu.store(rt.index, value, rt.width)?;
                }
            }
            Instruction::Branch { target, cond } => {
                if let Some(cond) = cond {
                    if !condition_holds(cpu.pstate, cond) {
                        return Ok(Flow::Next);
                    }
                }
                let dest = match target {
                    BranchTarget::Reg(reg) => cpu.load(reg.index, Width::W64)?,
                    BranchTarget::Target(Target::Offset(off)) => cpu.pc.wrapping_add(off as u64),
                    BranchTarget::Target(Target::Address(addr)) => addr,
                    // Labels never survive encoding.
                    BranchTarget::Target(Target::Label(_)) => {
                        return Err(Trap::UnknownInstruction { pc: cpu.pc, raw: 0 })
                    }
                };
                if dest % 4 != 0 {
                    return Err(Trap::Unaligned { addr: dest });
                }
                return Ok(Flow::Jump(dest));
            }
            Instruction::Directive(raw) => {
                return Err(Trap::UnknownInstruction { pc: cpu.pc, raw });
            }
        }
        Ok(Flow::Next)
    }
}

fn operand_value(cpu: &Cpu, op: Operand, width: Width) -> Result<u64, Trap> {
    Ok(match op {
        Operand::Reg { reg, shift, amount } => {
            apply_shift(cpu.load(reg.index, width)?, shift, amount as u32, width)
        }
        Operand::Imm { value, shift } => (value << shift) & width.mask(),
    })
}

/// Computes the access address and performs any base-register writeback.
fn effective_address(cpu: &mut Cpu, address: Address<'_>) -> Result<u64, Trap> {
    Ok(match address {
        Address::UnsignedOffset { base, offset } => base_value(cpu, base)?.wrapping_add(offset),
        Address::PreIndexed { base, offset } => {
            let addr = base_value(cpu, base)?.wrapping_add(offset as u64);
            cpu.store(base.index, addr, Width::W64)?;
            addr
        }
        Address::PostIndexed { base, offset } => {
            let addr = base_value(cpu, base)?;
            cpu.store(base.index, addr.wrapping_add(offset as u64), Width::W64)?;
            addr
        }
        Address::RegisterOffset { base, index } => {
            base_value(cpu, base)?.wrapping_add(cpu.load(index.index, Width::W64)?)
        }
        Address::Literal(Target::Offset(off)) => cpu.pc.wrapping_add(off as u64),
        Address::Literal(Target::Address(addr)) => addr,
        Address::Literal(Target::Label(_)) => {
            return Err(Trap::UnknownInstruction { pc: cpu.pc, raw: 0 })
        }
    })
}

fn base_value(cpu: &Cpu, base: Reg) -> Result<u64, Trap> {
    cpu.load(base.index, Width::W64)
}

/// Evaluate a condition code against the current flags.
pub fn condition_holds(flags: Pstate, cond: Cond) -> bool {
    let n = flags.contains(Pstate::N);
    let z = flags.contains(Pstate::Z);
    let v = flags.contains(Pstate::V);
    let code = cond.code();
    let base = match code >> 1 {
        0b000 => z,
        0b101 => n == v,
        0b110 => n == v && !z,
        _ => return true,
    };
    base ^ (code & 1 == 1)
}

fn add_sub(width: Width, a: u64, b: u64, subtract: bool) -> (u64, Pstate) {
    match (width, subtract) {
        (Width::W64, false) => add_with_carry(a, b),
        (Width::W64, true) => sub_with_borrow(a, b),
        (Width::W32, false) => {
            let (r, f) = add_with_carry(a as u32, b as u32);
            (r as u64, f)
        }
        (Width::W32, true) => {
            let (r, f) = sub_with_borrow(a as u32, b as u32);
            (r as u64, f)
        }
    }
}

fn negative<T: PrimInt>(v: T) -> bool {
    v.leading_zeros() == 0
}

fn nz<T: PrimInt>(res: T) -> Pstate {
    let mut flags = Pstate::empty();
    flags.set(Pstate::N, negative(res));
    flags.set(Pstate::Z, res.is_zero());
    flags
}

pub fn add_with_carry<T: PrimInt + OverflowingAdd>(a: T, b: T) -> (T, Pstate) {
    let (res, carry) = a.overflowing_add(&b);
    let mut flags = nz(res);
    flags.set(Pstate::C, carry);
    flags.set(
        Pstate::V,
        negative(a) == negative(b) && negative(res) != negative(a),
    );
    (res, flags)
}

pub fn sub_with_borrow<T: PrimInt + OverflowingSub>(a: T, b: T) -> (T, Pstate) {
    let (res, _) = a.overflowing_sub(&b);
    let mut flags = nz(res);
    flags.set(Pstate::C, a >= b);
    flags.set(
        Pstate::V,
        negative(a) != negative(b) && negative(res) != negative(a),
    );
    (res, flags)
}

fn mul_acc<T: PrimInt + WrappingAdd + WrappingSub + WrappingMul>(
    acc: T,
    n: T,
    m: T,
    negate: bool,
) -> T {
    let prod = n.wrapping_mul(&m);
    if negate {
        acc.wrapping_sub(&prod)
    } else {
        acc.wrapping_add(&prod)
    }
}
