//! Single-line parser: mnemonic dispatch plus operand grammar.
//!
//! Synthetic mnemonics (`cmp`, `cmn`, `neg`, `negs`, `tst`, `mvn`, `mov`, `mul`,
//! `mneg`) are lowered here by substituting the zero register for the implicit
//! operand. Labels in the result borrow from the input line.

use a64_rs::instructions::{
    Address, BranchTarget, Cond, Instruction, LogicOp, MoveKind, Operand, Reg, Shift, Target,
    Width, ZR,
};

use crate::error::AsmError;

/// `[A-Za-z_.][A-Za-z0-9$_.]*`
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '.' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '$' | '_' | '.'))
}

/// Split on commas that are not inside `[...]`.
fn split_operands(rest: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in rest.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(rest[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = rest[start..].trim();
    if !last.is_empty() || !out.is_empty() {
        out.push(last);
    }
    out
}

fn parse_number(s: &str) -> Option<i64> {
    let (neg, digits) = match s.strip_prefix('-') {
        Some(d) => (true, d),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let magnitude = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = digits.strip_prefix("0b") {
        u64::from_str_radix(bin, 2).ok()?
    } else {
        digits.parse::<u64>().ok()?
    };
    let v = magnitude as i64;
    Some(if neg { v.wrapping_neg() } else { v })
}

fn parse_imm(tok: &str) -> Result<i64, AsmError> {
    tok.strip_prefix('#')
        .and_then(|s| parse_number(s.trim()))
        .ok_or_else(|| AsmError::Syntax(format!("expected immediate, found `{tok}`")))
}

/// `Ok(None)` means the token is not register-shaped (it may be a label).
fn parse_reg(tok: &str) -> Result<Option<Reg>, AsmError> {
    let lower = tok.to_ascii_lowercase();
    let width = match lower.as_str() {
        "xzr" | "sp" => return Ok(Some(Reg::zr(Width::W64))),
        "wzr" | "wsp" => return Ok(Some(Reg::zr(Width::W32))),
        s if s.starts_with('x') => Width::W64,
        s if s.starts_with('w') => Width::W32,
        _ => return Ok(None),
    };
    let digits = &lower[1..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(None);
    }
    match digits.parse::<u8>() {
        Ok(n) if n <= ZR => Ok(Some(Reg::new(n, width))),
        _ => Err(AsmError::RegisterOutOfRange(tok.to_string())),
    }
}

fn expect_reg(tok: &str) -> Result<Reg, AsmError> {
    parse_reg(tok)?
        .ok_or_else(|| AsmError::InvalidOperand(format!("expected register, found `{tok}`")))
}

/// Address registers are always 64-bit.
fn expect_xreg(tok: &str) -> Result<Reg, AsmError> {
    let reg = expect_reg(tok)?;
    if reg.width == Width::W32 {
        return Err(AsmError::InvalidOperand(format!(
            "address register `{tok}` must be 64-bit"
        )));
    }
    Ok(reg)
}

fn parse_shift(tok: &str) -> Result<(Shift, u8), AsmError> {
    let mut it = tok.split_whitespace();
    let kind = match it.next().map(str::to_ascii_lowercase).as_deref() {
        Some("lsl") => Shift::Lsl,
        Some("lsr") => Shift::Lsr,
        Some("asr") => Shift::Asr,
        Some("ror") => Shift::Ror,
        _ => return Err(AsmError::Syntax(format!("expected shift, found `{tok}`"))),
    };
    let amount = match (it.next(), it.next()) {
        (Some(a), None) => parse_imm(a)?,
        _ => return Err(AsmError::Syntax(format!("malformed shift `{tok}`"))),
    };
    if !(0..64).contains(&amount) {
        return Err(AsmError::Range {
            what: "shift amount",
            value: amount,
        });
    }
    Ok((kind, amount as u8))
}

/// `<reg>[, <shift> #n]` or `#imm[, lsl #n]`.
fn parse_operand(ops: &[&str]) -> Result<Operand, AsmError> {
    let (first, shift) = match ops {
        [first] => (*first, None),
        [first, shift] => (*first, Some(parse_shift(shift)?)),
        _ => return Err(AsmError::Syntax("wrong number of operands".into())),
    };
    if first.starts_with('#') {
        let value = parse_imm(first)?;
        let shift = match shift {
            None => 0,
            Some((Shift::Lsl, n)) => n,
            Some(_) => {
                return Err(AsmError::InvalidOperand(
                    "immediates only take `lsl`".into(),
                ))
            }
        };
        return Ok(Operand::Imm {
            value: value as u64,
            shift,
        });
    }
    let reg = expect_reg(first)?;
    let (shift, amount) = shift.unwrap_or((Shift::Lsl, 0));
    Ok(Operand::Reg { reg, shift, amount })
}

fn parse_target(tok: &str) -> Result<Target<'_>, AsmError> {
    if tok.starts_with('#') {
        Ok(Target::Address(parse_imm(tok)? as u64))
    } else if is_identifier(tok) {
        Ok(Target::Label(tok))
    } else {
        Err(AsmError::Syntax(format!("expected label or immediate, found `{tok}`")))
    }
}

fn parse_address<'a>(ops: &[&'a str]) -> Result<Address<'a>, AsmError> {
    let first = ops[0];
    let Some(inner_rest) = first.strip_prefix('[') else {
        if ops.len() != 1 {
            return Err(AsmError::Syntax("literal loads take one operand".into()));
        }
        return Ok(Address::Literal(parse_target(first)?));
    };
    let close = inner_rest
        .find(']')
        .ok_or_else(|| AsmError::Syntax(format!("missing `]` in `{first}`")))?;
    let parts: Vec<&str> = inner_rest[..close].split(',').map(str::trim).collect();
    let pre = match inner_rest[close + 1..].trim() {
        "" => false,
        "!" => true,
        other => return Err(AsmError::Syntax(format!("unexpected `{other}` after `]`"))),
    };
    let base = expect_xreg(parts[0])?;

    match (parts.as_slice(), &ops[1..]) {
        ([_], []) if pre => Ok(Address::PreIndexed { base, offset: 0 }),
        ([_], []) => Ok(Address::UnsignedOffset { base, offset: 0 }),
        ([_], [post]) if !pre => Ok(Address::PostIndexed {
            base,
            offset: parse_imm(post)?,
        }),
        ([_, second], []) if second.starts_with('#') => {
            let offset = parse_imm(second)?;
            if pre {
                Ok(Address::PreIndexed { base, offset })
            } else if offset < 0 {
                Err(AsmError::Range {
                    what: "unsigned offset",
                    value: offset,
                })
            } else {
                Ok(Address::UnsignedOffset {
                    base,
                    offset: offset as u64,
                })
            }
        }
        ([_, second], []) if !pre => Ok(Address::RegisterOffset {
            base,
            index: expect_xreg(second)?,
        }),
        _ => Err(AsmError::Syntax(format!("malformed address `{}`", ops.join(", ")))),
    }
}

/// `mov rd, #imm` becomes `movz` or `movn` on whichever 16-bit chunk holds the value.
fn mov_immediate(rd: Reg, value: i64) -> Result<Instruction<'static>, AsmError> {
    let mask = rd.width.mask();
    let v = value as u64 & mask;
    for (candidate, kind) in [(v, MoveKind::Zero), (!v & mask, MoveKind::Negate)] {
        for hw in 0..rd.width.bits() / 16 {
            let shift = hw * 16;
            if candidate & !(0xFFFFu64 << shift) == 0 {
                return Ok(Instruction::MoveWide {
                    rd,
                    imm16: (candidate >> shift) as u16,
                    shift: shift as u8,
                    kind,
                });
            }
        }
    }
    Err(AsmError::Range {
        what: "mov immediate",
        value,
    })
}

fn arity(mnemonic: &str, ops: &[&str], min: usize, max: usize) -> Result<(), AsmError> {
    if (min..=max).contains(&ops.len()) {
        Ok(())
    } else {
        Err(AsmError::Syntax(format!(
            "`{mnemonic}` takes {min}..={max} operands, found {}",
            ops.len()
        )))
    }
}

/// Parse one trimmed, comment-free, non-label source line.
pub fn parse_line(line: &str) -> Result<Instruction<'_>, AsmError> {
    let line = line.trim();
    let (mn_tok, rest) = match line.split_once(char::is_whitespace) {
        Some((m, r)) => (m, r.trim()),
        None => (line, ""),
    };
    let mn = mn_tok.to_ascii_lowercase();
    let ops = split_operands(rest);

    let insn = match mn.as_str() {
        "add" | "adds" | "sub" | "subs" => {
            arity(&mn, &ops, 3, 4)?;
            Instruction::Arithmetic {
                rd: expect_reg(ops[0])?,
                rn: expect_reg(ops[1])?,
                op2: parse_operand(&ops[2..])?,
                negate: mn.starts_with('s'),
                set_flags: mn.ends_with('s'),
            }
        }
        "cmp" | "cmn" => {
            arity(&mn, &ops, 2, 3)?;
            let rn = expect_reg(ops[0])?;
            Instruction::Arithmetic {
                rd: Reg::zr(rn.width),
                rn,
                op2: parse_operand(&ops[1..])?,
                negate: mn == "cmp",
                set_flags: true,
            }
        }
        "neg" | "negs" => {
            arity(&mn, &ops, 2, 3)?;
            let rd = expect_reg(ops[0])?;
            Instruction::Arithmetic {
                rd,
                rn: Reg::zr(rd.width),
                op2: parse_operand(&ops[1..])?,
                negate: true,
                set_flags: mn == "negs",
            }
        }
        "and" | "ands" | "bic" | "bics" | "eor" | "eon" | "orr" | "orn" => {
            arity(&mn, &ops, 3, 4)?;
            let op = match mn.as_bytes()[0] {
                b'e' => LogicOp::Xor,
                b'o' => LogicOp::Or,
                _ => LogicOp::And,
            };
            Instruction::Logical {
                rd: expect_reg(ops[0])?,
                rn: expect_reg(ops[1])?,
                op2: parse_operand(&ops[2..])?,
                op,
                negate: matches!(mn.as_str(), "bic" | "bics" | "eon" | "orn"),
                set_flags: matches!(mn.as_str(), "ands" | "bics"),
            }
        }
        "tst" => {
            arity(&mn, &ops, 2, 3)?;
            let rn = expect_reg(ops[0])?;
            Instruction::Logical {
                rd: Reg::zr(rn.width),
                rn,
                op2: parse_operand(&ops[1..])?,
                op: LogicOp::And,
                negate: false,
                set_flags: true,
            }
        }
        "mvn" => {
            arity(&mn, &ops, 2, 3)?;
            let rd = expect_reg(ops[0])?;
            Instruction::Logical {
                rd,
                rn: Reg::zr(rd.width),
                op2: parse_operand(&ops[1..])?,
                op: LogicOp::Or,
                negate: true,
                set_flags: false,
            }
        }
        "mov" => {
            arity(&mn, &ops, 2, 2)?;
            let rd = expect_reg(ops[0])?;
            if ops[1].starts_with('#') {
                mov_immediate(rd, parse_imm(ops[1])?)?
            } else {
                Instruction::Logical {
                    rd,
                    rn: Reg::zr(rd.width),
                    op2: parse_operand(&ops[1..])?,
                    op: LogicOp::Or,
                    negate: false,
                    set_flags: false,
                }
            }
        }
        "movz" | "movn" | "movk" => {
            arity(&mn, &ops, 2, 3)?;
            let rd = expect_reg(ops[0])?;
            let imm = parse_imm(ops[1])?;
            if !(0..=0xFFFF).contains(&imm) {
                return Err(AsmError::Range {
                    what: "16-bit immediate",
                    value: imm,
                });
            }
            let shift = match ops.get(2).map(|s| parse_shift(s)).transpose()? {
                None => 0,
                Some((Shift::Lsl, n)) => n,
                Some(_) => {
                    return Err(AsmError::InvalidOperand(
                        "wide moves only take `lsl`".into(),
                    ))
                }
            };
            let kind = match mn.as_str() {
                "movz" => MoveKind::Zero,
                "movn" => MoveKind::Negate,
                _ => MoveKind::Keep,
            };
            Instruction::MoveWide {
                rd,
                imm16: imm as u16,
                shift,
                kind,
            }
        }
        "madd" | "msub" => {
            arity(&mn, &ops, 4, 4)?;
            Instruction::Multiply {
                rd: expect_reg(ops[0])?,
                rn: expect_reg(ops[1])?,
                rm: expect_reg(ops[2])?,
                ra: expect_reg(ops[3])?,
                negate: mn == "msub",
            }
        }
        "mul" | "mneg" => {
            arity(&mn, &ops, 3, 3)?;
            let rd = expect_reg(ops[0])?;
            Instruction::Multiply {
                rd,
                rn: expect_reg(ops[1])?,
                rm: expect_reg(ops[2])?,
                ra: Reg::zr(rd.width),
                negate: mn == "mneg",
            }
        }
        "br" => {
            arity(&mn, &ops, 1, 1)?;
            Instruction::Branch {
                target: BranchTarget::Reg(expect_xreg(ops[0])?),
                cond: None,
            }
        }
        "b" => {
            arity(&mn, &ops, 1, 1)?;
            Instruction::Branch {
                target: BranchTarget::Target(parse_target(ops[0])?),
                cond: None,
            }
        }
        s if s.starts_with("b.") => {
            let cond = Cond::from_suffix(&s[2..])
                .ok_or_else(|| AsmError::UnknownMnemonic(mn_tok.to_string()))?;
            arity(&mn, &ops, 1, 1)?;
            Instruction::Branch {
                target: BranchTarget::Target(parse_target(ops[0])?),
                cond: Some(cond),
            }
        }
        "ldr" | "str" => {
            arity(&mn, &ops, 2, 3)?;
            let rt = expect_reg(ops[0])?;
            let address = parse_address(&ops[1..])?;
            let store = mn == "str";
            if store && matches!(address, Address::Literal(_)) {
                return Err(AsmError::UnsupportedOperandType("str"));
            }
            Instruction::Transfer { rt, store, address }
        }
        ".int" => {
            arity(&mn, &ops, 1, 1)?;
            let tok = ops[0];
            let value = parse_number(tok.strip_prefix('#').unwrap_or(tok))
                .ok_or_else(|| AsmError::Syntax(format!("bad .int value `{tok}`")))?;
            if !(i32::MIN as i64..=u32::MAX as i64).contains(&value) {
                return Err(AsmError::Range {
                    what: ".int value",
                    value,
                });
            }
            Instruction::Directive(value as u32)
        }
        _ => return Err(AsmError::UnknownMnemonic(mn_tok.to_string())),
    };
    Ok(insn)
}
