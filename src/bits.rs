//! Bit-field helpers used by the decoder, encoder and executor.

use crate::instructions::{Shift, Width};

/// Mask of `width` ones starting at bit `lsb`.
#[inline]
pub const fn mask(lsb: u32, width: u32) -> u64 {
    if width >= 64 {
        u64::MAX << lsb
    } else {
        ((1u64 << width) - 1) << lsb
    }
}

/// Extract `width` bits of `value` starting at `lsb`.
#[inline]
pub const fn extract(value: u64, lsb: u32, width: u32) -> u64 {
    (value >> lsb) & mask(0, width)
}

/// `extract` specialised to instruction words.
#[inline]
pub const fn field(raw: u32, lsb: u32, width: u32) -> u32 {
    extract(raw as u64, lsb, width) as u32
}

#[inline]
pub const fn bit(raw: u32, pos: u32) -> bool {
    (raw >> pos) & 1 != 0
}

/// Sign-extend the low `bits` bits of `value`.
#[inline]
pub const fn sign_extend(value: u64, bits: u32) -> i64 {
    let s = 64 - bits;
    ((value << s) as i64) >> s
}

/// Whether `value` is representable as a `bits`-wide two's-complement number.
#[inline]
pub const fn fits_signed(value: i64, bits: u32) -> bool {
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << (bits - 1)) - 1;
    value >= min && value <= max
}

#[inline]
pub const fn fits_unsigned(value: u64, bits: u32) -> bool {
    bits >= 64 || value >> bits == 0
}

#[inline]
pub const fn is_aligned(value: u64, alignment: u64) -> bool {
    value & (alignment - 1) == 0
}

/// Rotate the low `width` bits of `value` right by `amount`.
pub fn rotate_right(value: u64, amount: u32, width: Width) -> u64 {
    let w = width.bits();
    let v = value & width.mask();
    let amount = amount % w;
    if amount == 0 {
        return v;
    }
    ((v >> amount) | (v << (w - amount))) & width.mask()
}

/// Apply a register-operand shift at the given operation width.
pub fn apply_shift(value: u64, shift: Shift, amount: u32, width: Width) -> u64 {
    let v = value & width.mask();
    if amount >= width.bits() {
        return match shift {
            Shift::Asr if (v >> (width.bits() - 1)) & 1 == 1 => width.mask(),
            Shift::Ror => rotate_right(v, amount, width),
            _ => 0,
        };
    }
    match shift {
        Shift::Lsl => (v << amount) & width.mask(),
        Shift::Lsr => v >> amount,
        Shift::Asr => (sign_extend(v, width.bits()) >> amount) as u64 & width.mask(),
        Shift::Ror => rotate_right(v, amount, width),
    }
}
