//! Instruction representation shared by the assembler and the emulator.
//!
//! The parser builds these values from source text and the encoder packs them
//! into machine words; the decoder rebuilds the same type from a fetched word
//! and the executor consumes it. Decoded values never carry labels, so they are
//! `Instruction<'static>`.

use serde::{Deserialize, Serialize};

/// Number of general-purpose registers backed by storage.
pub const NUM_REGS: usize = 31;

/// Register index that reads as zero and discards writes.
pub const ZR: u8 = 31;

/// Operation width selected by the `sf` bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Width {
    W32 = 32,
    W64 = 64,
}

impl Width {
    pub const fn from_sf(sf: bool) -> Self {
        if sf {
            Width::W64
        } else {
            Width::W32
        }
    }

    pub const fn sf(self) -> bool {
        matches!(self, Width::W64)
    }

    pub const fn bits(self) -> u32 {
        self as u32
    }

    pub const fn bytes(self) -> u64 {
        self as u64 / 8
    }

    /// All-ones mask covering the operation width.
    pub const fn mask(self) -> u64 {
        match self {
            Width::W32 => 0xFFFF_FFFF,
            Width::W64 => u64::MAX,
        }
    }
}

/// A register operand: slot index plus the width it is accessed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reg {
    pub index: u8,
    pub width: Width,
}

impl Reg {
    pub const fn new(index: u8, width: Width) -> Self {
        Self { index, width }
    }

    pub const fn x(index: u8) -> Self {
        Self::new(index, Width::W64)
    }

    pub const fn w(index: u8) -> Self {
        Self::new(index, Width::W32)
    }

    /// The zero register at the given width.
    pub const fn zr(width: Width) -> Self {
        Self::new(ZR, width)
    }

    pub const fn is_zero(self) -> bool {
        self.index == ZR
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shift {
    Lsl = 0,
    Lsr = 1,
    Asr = 2,
    Ror = 3,
}

impl Shift {
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0 => Shift::Lsl,
            1 => Shift::Lsr,
            2 => Shift::Asr,
            _ => Shift::Ror,
        }
    }

    pub const fn bits(self) -> u32 {
        self as u32
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Shift::Lsl => "lsl",
            Shift::Lsr => "lsr",
            Shift::Asr => "asr",
            Shift::Ror => "ror",
        }
    }
}

/// Second operand of the data-processing classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Reg { reg: Reg, shift: Shift, amount: u8 },
    /// `shift` is the `lsl #n` amount as written; arithmetic only accepts 0 or 12.
    Imm { value: u64, shift: u8 },
}

impl Operand {
    pub const fn reg(reg: Reg) -> Self {
        Operand::Reg {
            reg,
            shift: Shift::Lsl,
            amount: 0,
        }
    }

    pub const fn imm(value: u64) -> Self {
        Operand::Imm { value, shift: 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicOp {
    And,
    Or,
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveKind {
    /// `movn`: complement of the shifted immediate.
    Negate,
    /// `movz`: shifted immediate, other bits cleared.
    Zero,
    /// `movk`: insert into the existing register value.
    Keep,
}

impl MoveKind {
    pub const fn negate(self) -> bool {
        matches!(self, MoveKind::Negate)
    }

    pub const fn with_keep(self) -> bool {
        matches!(self, MoveKind::Keep)
    }

    /// The two-bit `opc` field: `(!negate) << 1 | with_keep`.
    pub const fn opc(self) -> u32 {
        ((!self.negate() as u32) << 1) | self.with_keep() as u32
    }

    pub const fn from_opc(opc: u32) -> Option<Self> {
        match opc {
            0b00 => Some(MoveKind::Negate),
            0b10 => Some(MoveKind::Zero),
            0b11 => Some(MoveKind::Keep),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cond {
    Eq,
    Ne,
    Ge,
    Lt,
    Gt,
    Le,
    Al,
}

impl Cond {
    pub const fn code(self) -> u8 {
        match self {
            Cond::Eq => 0b0000,
            Cond::Ne => 0b0001,
            Cond::Ge => 0b1010,
            Cond::Lt => 0b1011,
            Cond::Gt => 0b1100,
            Cond::Le => 0b1101,
            Cond::Al => 0b1110,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0b0000 => Some(Cond::Eq),
            0b0001 => Some(Cond::Ne),
            0b1010 => Some(Cond::Ge),
            0b1011 => Some(Cond::Lt),
            0b1100 => Some(Cond::Gt),
            0b1101 => Some(Cond::Le),
            0b1110 => Some(Cond::Al),
            _ => None,
        }
    }

    pub fn from_suffix(s: &str) -> Option<Self> {
        match s {
            "eq" => Some(Cond::Eq),
            "ne" => Some(Cond::Ne),
            "ge" => Some(Cond::Ge),
            "lt" => Some(Cond::Lt),
            "gt" => Some(Cond::Gt),
            "le" => Some(Cond::Le),
            "al" => Some(Cond::Al),
            _ => None,
        }
    }

    pub const fn suffix(self) -> &'static str {
        match self {
            Cond::Eq => "eq",
            Cond::Ne => "ne",
            Cond::Ge => "ge",
            Cond::Lt => "lt",
            Cond::Gt => "gt",
            Cond::Le => "le",
            Cond::Al => "al",
        }
    }
}

/// A code location referenced by branches and literal loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    /// Symbol resolved through the symbol table at encode time.
    Label(&'a str),
    /// Absolute byte address (`#imm` in source).
    Address(u64),
    /// Signed byte offset from the instruction's own address.
    Offset(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Address<'a> {
    /// `[xn, #imm]`; `offset` is in bytes and must be a multiple of the access size.
    UnsignedOffset { base: Reg, offset: u64 },
    /// `[xn, #simm]!`
    PreIndexed { base: Reg, offset: i64 },
    /// `[xn], #simm`
    PostIndexed { base: Reg, offset: i64 },
    /// `[xn, xm]`
    RegisterOffset { base: Reg, index: Reg },
    /// PC-relative literal.
    Literal(Target<'a>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchTarget<'a> {
    Reg(Reg),
    Target(Target<'a>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction<'a> {
    Arithmetic {
        rd: Reg,
        rn: Reg,
        op2: Operand,
        negate: bool,
        set_flags: bool,
    },
    Logical {
        rd: Reg,
        rn: Reg,
        op2: Operand,
        op: LogicOp,
        negate: bool,
        set_flags: bool,
    },
    MoveWide {
        rd: Reg,
        imm16: u16,
        /// Bit position of the immediate: 0, 16, 32 or 48.
        shift: u8,
        kind: MoveKind,
    },
    Multiply {
        rd: Reg,
        rn: Reg,
        rm: Reg,
        ra: Reg,
        negate: bool,
    },
    Transfer {
        rt: Reg,
        store: bool,
        address: Address<'a>,
    },
    /// `cond` is `None` for unconditional branches.
    Branch {
        target: BranchTarget<'a>,
        cond: Option<Cond>,
    },
    /// Raw word emitted verbatim (`.int`).
    Directive(u32),
}
