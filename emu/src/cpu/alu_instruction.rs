//! # Data-Processing Opcodes and the Barrel Shifter
//!
//! The sixteen ALU operations of the data-processing format, the decoded
//! second-operand forms, and the barrel shifter producing the "shifter
//! operand" value together with its carry-out.
//!
//! ```text
//! ┌────────┬─────────┬────────────────────────────────────────────────┐
//! │ OpCode │  Instr  │ Operation                                      │
//! ├────────┼─────────┼────────────────────────────────────────────────┤
//! │  0000  │   AND   │ Rd = Rn AND Op2                                │
//! │  0001  │   EOR   │ Rd = Rn XOR Op2                                │
//! │  0010  │   SUB   │ Rd = Rn - Op2                                  │
//! │  0011  │   RSB   │ Rd = Op2 - Rn                                  │
//! │  0100  │   ADD   │ Rd = Rn + Op2                                  │
//! │  0101  │   ADC   │ Rd = Rn + Op2 + C                              │
//! │  0110  │   SBC   │ Rd = Rn - Op2 - !C                             │
//! │  0111  │   RSC   │ Rd = Op2 - Rn - !C                             │
//! │  1000  │   TST   │ Rn AND Op2, flags only                         │
//! │  1001  │   TEQ   │ Rn XOR Op2, flags only                         │
//! │  1010  │   CMP   │ Rn - Op2, flags only                           │
//! │  1011  │   CMN   │ Rn + Op2, flags only                           │
//! │  1100  │   ORR   │ Rd = Rn OR Op2                                 │
//! │  1101  │   MOV   │ Rd = Op2                                       │
//! │  1110  │   BIC   │ Rd = Rn AND NOT Op2                            │
//! │  1111  │   MVN   │ Rd = NOT Op2                                   │
//! └────────┴─────────┴────────────────────────────────────────────────┘
//! ```
//!
//! The carry flag comes from the barrel shifter for the logical group and
//! from the ALU itself for the arithmetic group.

use crate::bitwise::Bits;
use crate::cpu::flags::ShiftKind;

/// The 16 data-processing operations (bits 24-21 of the instruction).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AluInstruction {
    /// Logical AND: `Rd = Rn AND Op2`
    And = 0x0,
    /// Exclusive OR: `Rd = Rn XOR Op2`
    Eor = 0x1,
    /// Subtract: `Rd = Rn - Op2`
    Sub = 0x2,
    /// Reverse Subtract: `Rd = Op2 - Rn`
    Rsb = 0x3,
    /// Add: `Rd = Rn + Op2`
    Add = 0x4,
    /// Add with Carry: `Rd = Rn + Op2 + C`
    Adc = 0x5,
    /// Subtract with Carry: `Rd = Rn - Op2 - !C`
    Sbc = 0x6,
    /// Reverse Subtract with Carry: `Rd = Op2 - Rn - !C`
    Rsc = 0x7,
    /// Test bits (AND, flags only, no result written)
    Tst = 0x8,
    /// Test Equivalence (XOR, flags only, no result written)
    Teq = 0x9,
    /// Compare (SUB, flags only, no result written)
    Cmp = 0xA,
    /// Compare Negative (ADD, flags only, no result written)
    Cmn = 0xB,
    /// Logical OR: `Rd = Rn OR Op2`
    Orr = 0xC,
    /// Move: `Rd = Op2` (Rn is ignored)
    Mov = 0xD,
    /// Bit Clear: `Rd = Rn AND NOT Op2`
    Bic = 0xE,
    /// Move Not: `Rd = NOT Op2` (Rn is ignored)
    Mvn = 0xF,
}

impl From<u32> for AluInstruction {
    fn from(alu_op_code: u32) -> Self {
        match alu_op_code {
            0x0 => Self::And,
            0x1 => Self::Eor,
            0x2 => Self::Sub,
            0x3 => Self::Rsb,
            0x4 => Self::Add,
            0x5 => Self::Adc,
            0x6 => Self::Sbc,
            0x7 => Self::Rsc,
            0x8 => Self::Tst,
            0x9 => Self::Teq,
            0xA => Self::Cmp,
            0xB => Self::Cmn,
            0xC => Self::Orr,
            0xD => Self::Mov,
            0xE => Self::Bic,
            0xF => Self::Mvn,
            _ => unreachable!(),
        }
    }
}

impl std::fmt::Display for AluInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => f.write_str("AND"),
            Self::Eor => f.write_str("EOR"),
            Self::Sub => f.write_str("SUB"),
            Self::Rsb => f.write_str("RSB"),
            Self::Add => f.write_str("ADD"),
            Self::Adc => f.write_str("ADC"),
            Self::Sbc => f.write_str("SBC"),
            Self::Rsc => f.write_str("RSC"),
            Self::Tst => f.write_str("TST"),
            Self::Teq => f.write_str("TEQ"),
            Self::Cmp => f.write_str("CMP"),
            Self::Cmn => f.write_str("CMN"),
            Self::Orr => f.write_str("ORR"),
            Self::Mov => f.write_str("MOV"),
            Self::Bic => f.write_str("BIC"),
            Self::Mvn => f.write_str("MVN"),
        }
    }
}

/// Classification that determines where the carry flag comes from.
#[derive(Eq, PartialEq, Debug)]
pub enum AluKind {
    /// AND, EOR, TST, TEQ, ORR, MOV, BIC, MVN: carry from the shifter.
    Logical,
    /// SUB, RSB, ADD, ADC, SBC, RSC, CMP, CMN: carry from the ALU.
    Arithmetic,
}

impl AluInstruction {
    #[must_use]
    pub fn kind(self) -> AluKind {
        match self {
            Self::And
            | Self::Eor
            | Self::Tst
            | Self::Teq
            | Self::Orr
            | Self::Mov
            | Self::Bic
            | Self::Mvn => AluKind::Logical,
            Self::Sub
            | Self::Rsb
            | Self::Add
            | Self::Adc
            | Self::Sbc
            | Self::Rsc
            | Self::Cmp
            | Self::Cmn => AluKind::Arithmetic,
        }
    }
}

/// Result of a shift or ALU step, flags included. Shift results leave
/// `overflow`, `sign` and `zero` at their defaults.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Default)]
pub struct ArithmeticOpResult {
    pub result: u32,
    /// Last bit shifted out, or unsigned carry/not-borrow.
    pub carry: bool,
    /// Signed overflow.
    pub overflow: bool,
    /// Bit 31 of the result.
    pub sign: bool,
    /// The result is exactly zero.
    pub zero: bool,
}

/// Performs one barrel-shifter operation on `rm`, returning the shifted
/// value and its carry-out.
///
/// Amount 0 carries the special immediate-shift encodings:
///
/// - `LSL #0`: value passes through, carry unchanged
/// - `LSR #0`: encodes `LSR #32`, result 0, carry = bit 31
/// - `ASR #0`: encodes `ASR #32`, sign fill, carry = bit 31
/// - `ROR #0`: encodes `RRX`, rotate right through carry by 1
///
/// Register-specified amounts up to 255 follow the architecture's rules
/// for 32 and beyond (zero or sign fill, carry from the last bit out).
pub fn shift(kind: ShiftKind, shift_amount: u32, rm: u32, carry: bool) -> ArithmeticOpResult {
    match kind {
        ShiftKind::Lsl => match shift_amount {
            0 => ArithmeticOpResult {
                result: rm,
                carry,
                ..Default::default()
            },
            // The shift happens in u64 so that amount 32 is not modular.
            1..=32 => ArithmeticOpResult {
                result: ((u64::from(rm)) << shift_amount) as u32,
                carry: (u64::from(rm) >> (32 - shift_amount)) & 1 != 0,
                ..Default::default()
            },
            _ => ArithmeticOpResult {
                result: 0,
                carry: false,
                ..Default::default()
            },
        },
        ShiftKind::Lsr => match shift_amount {
            0 => ArithmeticOpResult {
                result: 0,
                carry: rm.get_bit(31),
                ..Default::default()
            },
            1..=32 => ArithmeticOpResult {
                result: (u64::from(rm) >> shift_amount) as u32,
                carry: (u64::from(rm) >> (shift_amount - 1)) & 1 != 0,
                ..Default::default()
            },
            _ => ArithmeticOpResult {
                result: 0,
                carry: false,
                ..Default::default()
            },
        },
        ShiftKind::Asr => match shift_amount {
            1..=31 => ArithmeticOpResult {
                result: ((rm as i32) >> shift_amount) as u32,
                carry: rm.get_bit((shift_amount - 1) as u8),
                ..Default::default()
            },
            // Amount 0 encodes ASR #32; 32 and beyond saturate the same
            // way: every result bit is a copy of the sign bit.
            _ => ArithmeticOpResult {
                result: ((rm as i32) >> 31) as u32,
                carry: rm.get_bit(31),
                ..Default::default()
            },
        },
        ShiftKind::Ror => {
            // ROR by n > 32 matches ROR by n mod 32, with multiples of 32
            // behaving as ROR #32.
            let mut amount = shift_amount;
            if amount > 32 {
                amount %= 32;
                if amount == 0 {
                    amount = 32;
                }
            }

            match amount {
                // ROR #0 encodes RRX: carry into bit 31, shift right by 1.
                0 => ArithmeticOpResult {
                    result: (u32::from(carry) << 31) | (rm >> 1),
                    carry: rm.get_bit(0),
                    ..Default::default()
                },
                1..=31 => ArithmeticOpResult {
                    result: rm.rotate_right(amount),
                    carry: rm.get_bit((amount - 1) as u8),
                    ..Default::default()
                },
                32 => ArithmeticOpResult {
                    result: rm,
                    carry: rm.get_bit(31),
                    ..Default::default()
                },
                _ => unreachable!(),
            }
        }
    }
}

/// Where the shift amount of a register-form second operand comes from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ShiftSource {
    /// Amount encoded in the instruction (0-31, with special encodings).
    Immediate(u32),
    /// Amount read from the low byte of a register.
    Register(u32),
}

impl std::fmt::Display for ShiftSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Immediate(value) => write!(f, "#{value}"),
            Self::Register(register) => write!(f, "R{register}"),
        }
    }
}

/// The decoded second operand of a data-processing instruction.
///
/// The three source formats map onto two shapes: a register routed through
/// the barrel shifter (amount immediate or register-supplied), or an 8-bit
/// immediate rotated right by twice the 4-bit rotate field.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SecondOperand {
    /// Register operand with a shift.
    Register {
        shift_kind: ShiftKind,
        shift_source: ShiftSource,
        rm: u32,
    },
    /// Rotated-immediate operand.
    Immediate {
        /// Rotate field; the value is rotated right by `2 * rotate`.
        rotate: u32,
        /// The zero-extended immediate (8 bits in the encoding).
        imm: u32,
    },
}

impl std::fmt::Display for SecondOperand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Register {
                shift_kind,
                shift_source,
                rm,
            } => {
                if let ShiftSource::Immediate(0) = shift_source {
                    return match shift_kind {
                        ShiftKind::Lsl => write!(f, "R{rm}"),
                        ShiftKind::Ror => write!(f, "R{rm}, RRX"),
                        _ => write!(f, "R{rm}, {shift_kind} #32"),
                    };
                }

                write!(f, "R{rm}, {shift_kind} {shift_source}")
            }
            Self::Immediate { rotate, imm } => {
                write!(f, "#{}", imm.rotate_right(2 * rotate))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn amount_zero_special_encodings() {
        // LSL #0 passes the value and the carry through.
        let r = shift(ShiftKind::Lsl, 0, 0xDEAD_BEEF, true);
        assert_eq!(r.result, 0xDEAD_BEEF);
        assert!(r.carry);

        // LSR #0 encodes LSR #32.
        let r = shift(ShiftKind::Lsr, 0, 0x8000_0001, false);
        assert_eq!(r.result, 0);
        assert!(r.carry);

        // ASR #0 encodes ASR #32: sign fill.
        let r = shift(ShiftKind::Asr, 0, 0x8000_0000, false);
        assert_eq!(r.result, 0xFFFF_FFFF);
        assert!(r.carry);
        let r = shift(ShiftKind::Asr, 0, 0x7FFF_FFFF, true);
        assert_eq!(r.result, 0);
        assert!(!r.carry);

        // ROR #0 encodes RRX.
        let r = shift(ShiftKind::Ror, 0, 0b11, true);
        assert_eq!(r.result, 0x8000_0001);
        assert!(r.carry);
        let r = shift(ShiftKind::Ror, 0, 0b10, false);
        assert_eq!(r.result, 0b1);
        assert!(!r.carry);
    }

    #[test]
    fn amount_exactly_32() {
        let r = shift(ShiftKind::Lsl, 32, 0x0000_0001, false);
        assert_eq!(r.result, 0);
        assert!(r.carry, "LSL #32 carries out bit 0");

        let r = shift(ShiftKind::Lsr, 32, 0x8000_0000, false);
        assert_eq!(r.result, 0);
        assert!(r.carry, "LSR #32 carries out bit 31");

        let r = shift(ShiftKind::Asr, 32, 0xF000_0000, false);
        assert_eq!(r.result, 0xFFFF_FFFF);
        assert!(r.carry);

        let r = shift(ShiftKind::Ror, 32, 0xA5A5_0000, false);
        assert_eq!(r.result, 0xA5A5_0000);
        assert!(r.carry);
    }

    #[test]
    fn amount_beyond_32() {
        let r = shift(ShiftKind::Lsl, 33, u32::MAX, true);
        assert_eq!(r.result, 0);
        assert!(!r.carry);

        let r = shift(ShiftKind::Lsr, 40, u32::MAX, true);
        assert_eq!(r.result, 0);
        assert!(!r.carry);

        let r = shift(ShiftKind::Asr, 100, 0x8000_0000, false);
        assert_eq!(r.result, 0xFFFF_FFFF);
        assert!(r.carry);

        // ROR folds back modulo 32; multiples of 32 act as ROR #32.
        let r = shift(ShiftKind::Ror, 36, 0x0000_00F0, false);
        assert_eq!(r.result, 0x0000_000F);
        let r = shift(ShiftKind::Ror, 64, 0x8000_0000, false);
        assert_eq!(r.result, 0x8000_0000);
        assert!(r.carry);
    }

    #[test]
    fn ordinary_amounts() {
        let r = shift(ShiftKind::Lsl, 4, 0x0000_00F1, false);
        assert_eq!(r.result, 0x0000_0F10);
        assert!(!r.carry);

        let r = shift(ShiftKind::Lsr, 4, 0x0000_00F8, false);
        assert_eq!(r.result, 0x0000_000F);
        assert!(r.carry);

        let r = shift(ShiftKind::Asr, 8, 0xFF00_0000, false);
        assert_eq!(r.result, 0xFFFF_0000);

        let r = shift(ShiftKind::Ror, 8, 0x0000_01FF, false);
        assert_eq!(r.result, 0xFF00_0001);
        assert!(r.carry);
    }

    #[test]
    fn logical_and_arithmetic_groups() {
        assert_eq!(AluInstruction::from(0x9).kind(), AluKind::Logical);
        assert_eq!(AluInstruction::from(0x2).kind(), AluKind::Arithmetic);
    }

    #[test]
    fn second_operand_display() {
        let op = SecondOperand::Register {
            shift_kind: ShiftKind::Lsl,
            shift_source: ShiftSource::Immediate(0),
            rm: 2,
        };
        assert_eq!(op.to_string(), "R2");

        let op = SecondOperand::Register {
            shift_kind: ShiftKind::Ror,
            shift_source: ShiftSource::Immediate(0),
            rm: 7,
        };
        assert_eq!(op.to_string(), "R7, RRX");

        let op = SecondOperand::Register {
            shift_kind: ShiftKind::Asr,
            shift_source: ShiftSource::Register(3),
            rm: 1,
        };
        assert_eq!(op.to_string(), "R1, ASR R3");

        let op = SecondOperand::Immediate { rotate: 4, imm: 0xFF };
        assert_eq!(op.to_string(), "#4278190080");
    }
}
