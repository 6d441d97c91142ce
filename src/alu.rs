//! Bit-level helpers shared by every opcode.
//!
//! All LC-3 arithmetic happens on 16-bit words with silent wraparound.
//! Instruction fields are pulled out with [`field`] and widened with
//! [`sign_extend`]; the condition codes are derived with [`CondFlag::of`].

use serde::{Serialize, Deserialize};

/// Extend the low `width` bits of `bits` to a full 16-bit word,
/// treating bit `width - 1` as the sign.
///
/// `width` must be in `1..=16`; anything above the field is discarded first,
/// so callers may pass an unmasked instruction word.
#[inline]
pub fn sign_extend(bits: u16, width: u32) -> u16 {
    debug_assert!((1..=16).contains(&width), "field width {} out of range", width);
    if width >= 16 {
        return bits;
    }
    let mask = (1u16 << width) - 1;
    let value = bits & mask;
    if (value >> (width - 1)) & 1 == 1 {
        value | !mask
    } else {
        value
    }
}

/// Extract `width` bits of `word` starting at bit `shift` (bit 0 = LSB).
#[inline]
pub fn field(word: u16, shift: u32, width: u32) -> u16 {
    (word >> shift) & ((1u16 << width) - 1)
}

/// One of the three mutually exclusive condition codes.
///
/// The discriminants are the bit positions used by BR's `nzp` mask,
/// so a flag can be tested against an instruction with a single AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum CondFlag {
    /// P: last value written was positive
    Pos = 1 << 0,
    /// Z: last value written was zero
    Zero = 1 << 1,
    /// N: last value written had its top bit set
    Neg = 1 << 2,
}

impl CondFlag {
    /// Classify a 16-bit word as two's-complement.
    #[inline]
    pub fn of(value: u16) -> Self {
        if value == 0 {
            CondFlag::Zero
        } else if value >> 15 == 1 {
            CondFlag::Neg
        } else {
            CondFlag::Pos
        }
    }

    /// The `nzp` bit pattern for this flag.
    #[inline]
    pub fn bits(self) -> u16 {
        self as u16
    }

    /// Single-letter name as used in assembly (`n`, `z`, `p`).
    pub fn letter(self) -> char {
        match self {
            CondFlag::Neg => 'n',
            CondFlag::Zero => 'z',
            CondFlag::Pos => 'p',
        }
    }
}

impl Default for CondFlag {
    fn default() -> Self {
        CondFlag::Zero
    }
}
