//! Every encodable instruction decodes back to itself.

use a64_asm::{encode, SymbolTable};
use a64_rs::decoder::Decoder;
use a64_rs::instructions::{
    Address, BranchTarget, Cond, Instruction, LogicOp, MoveKind, Operand, Reg, Shift, Target,
    Width,
};
use a64_rs::isa::a64::A64Decoder;
use proptest::prelude::*;

fn width() -> impl Strategy<Value = Width> {
    prop_oneof![Just(Width::W32), Just(Width::W64)]
}

fn reg(w: Width) -> impl Strategy<Value = Reg> {
    (0u8..=31).prop_map(move |i| Reg::new(i, w))
}

fn xreg() -> impl Strategy<Value = Reg> {
    reg(Width::W64)
}

fn cond() -> impl Strategy<Value = Cond> {
    prop_oneof![
        Just(Cond::Eq),
        Just(Cond::Ne),
        Just(Cond::Ge),
        Just(Cond::Lt),
        Just(Cond::Gt),
        Just(Cond::Le),
        Just(Cond::Al),
    ]
}

fn arith_shift() -> impl Strategy<Value = Shift> {
    prop_oneof![Just(Shift::Lsl), Just(Shift::Lsr), Just(Shift::Asr)]
}

fn any_shift() -> impl Strategy<Value = Shift> {
    prop_oneof![arith_shift(), Just(Shift::Ror)]
}

fn arithmetic() -> impl Strategy<Value = Instruction<'static>> {
    width().prop_flat_map(|w| {
        let imm = (0u64..4096, prop_oneof![Just(0u8), Just(12u8)])
            .prop_map(|(value, shift)| Operand::Imm { value, shift });
        let shifted = (reg(w), arith_shift(), 0..w.bits() as u8)
            .prop_map(|(reg, shift, amount)| Operand::Reg { reg, shift, amount });
        (reg(w), reg(w), prop_oneof![imm, shifted], any::<bool>(), any::<bool>()).prop_map(
            |(rd, rn, op2, negate, set_flags)| Instruction::Arithmetic {
                rd,
                rn,
                op2,
                negate,
                set_flags,
            },
        )
    })
}

fn logical() -> impl Strategy<Value = Instruction<'static>> {
    let op = prop_oneof![
        Just((LogicOp::And, false)),
        Just((LogicOp::Or, false)),
        Just((LogicOp::Xor, false)),
        Just((LogicOp::And, true)),
    ];
    width().prop_flat_map(move |w| {
        let op2 = (reg(w), any_shift(), 0..w.bits() as u8)
            .prop_map(|(reg, shift, amount)| Operand::Reg { reg, shift, amount });
        (reg(w), reg(w), op2, op.clone(), any::<bool>()).prop_map(
            |(rd, rn, op2, (op, set_flags), negate)| Instruction::Logical {
                rd,
                rn,
                op2,
                op,
                negate,
                set_flags,
            },
        )
    })
}

fn move_wide() -> impl Strategy<Value = Instruction<'static>> {
    let kind = prop_oneof![
        Just(MoveKind::Negate),
        Just(MoveKind::Zero),
        Just(MoveKind::Keep)
    ];
    width().prop_flat_map(move |w| {
        let chunks = w.bits() as u8 / 16;
        (reg(w), any::<u16>(), 0..chunks, kind.clone()).prop_map(|(rd, imm16, hw, kind)| {
            Instruction::MoveWide {
                rd,
                imm16,
                shift: hw * 16,
                kind,
            }
        })
    })
}

fn multiply() -> impl Strategy<Value = Instruction<'static>> {
    width().prop_flat_map(|w| {
        (reg(w), reg(w), reg(w), reg(w), any::<bool>()).prop_map(|(rd, rn, rm, ra, negate)| {
            Instruction::Multiply {
                rd,
                rn,
                rm,
                ra,
                negate,
            }
        })
    })
}

fn transfer() -> impl Strategy<Value = Instruction<'static>> {
    width().prop_flat_map(|w| {
        let bytes = w.bytes();
        let address = prop_oneof![
            (xreg(), 0u64..4096).prop_map(move |(base, k)| Address::UnsignedOffset {
                base,
                offset: k * bytes,
            }),
            (xreg(), -256i64..=255)
                .prop_map(|(base, offset)| Address::PreIndexed { base, offset }),
            (xreg(), -256i64..=255)
                .prop_map(|(base, offset)| Address::PostIndexed { base, offset }),
            (xreg(), xreg()).prop_map(|(base, index)| Address::RegisterOffset { base, index }),
        ];
        let memory = (reg(w), any::<bool>(), address)
            .prop_map(|(rt, store, address)| Instruction::Transfer { rt, store, address });
        let literal = (reg(w), -(1i64 << 18)..(1i64 << 18)).prop_map(|(rt, words)| {
            Instruction::Transfer {
                rt,
                store: false,
                address: Address::Literal(Target::Offset(words * 4)),
            }
        });
        prop_oneof![memory, literal]
    })
}

fn branch() -> impl Strategy<Value = Instruction<'static>> {
    prop_oneof![
        (-(1i64 << 25)..(1i64 << 25)).prop_map(|words| Instruction::Branch {
            target: BranchTarget::Target(Target::Offset(words * 4)),
            cond: None,
        }),
        (-(1i64 << 18)..(1i64 << 18), cond()).prop_map(|(words, cond)| Instruction::Branch {
            target: BranchTarget::Target(Target::Offset(words * 4)),
            cond: Some(cond),
        }),
        xreg().prop_map(|r| Instruction::Branch {
            target: BranchTarget::Reg(r),
            cond: None,
        }),
    ]
}

fn instruction() -> impl Strategy<Value = Instruction<'static>> {
    prop_oneof![
        arithmetic(),
        logical(),
        move_wide(),
        multiply(),
        transfer(),
        branch()
    ]
}

proptest! {
    #[test]
    fn encode_then_decode(insn in instruction()) {
        let word = encode(&insn, 0, &SymbolTable::new()).unwrap();
        prop_assert_eq!(A64Decoder::new().decode(word), Some(insn));
    }
}
