//! # Status Flags
//!
//! The six ARM condition/state flags of the User-mode view. Unlike a full
//! CPSR register, the flags are stored individually and the CPSR word is
//! only assembled on demand (MRS, debugger):
//!
//! ```text
//! 31 30 29 28 27 26      8 7 6 5 4   0
//! ┌──┬──┬──┬──┬──┬────────┬─┬─┬─┬─────┐
//! │N │Z │C │V │Q │Reserved│I│F│T│Mode │
//! └──┴──┴──┴──┴──┴────────┴─┴─┴─┴─────┘
//! ```
//!
//! Bits 4, 6 and 7 of the assembled word are always set: the simulated
//! machine runs in User mode with IRQ and FIQ disabled.

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::condition::Condition;

/// The live flag state of the core. Cleared at simulation start.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct StatusFlags {
    /// N: bit 31 of the last flag-setting result.
    pub sign: bool,

    /// Z: the last flag-setting result was zero.
    pub zero: bool,

    /// C: carry out of an add, not-borrow of a subtract, or the
    /// barrel-shifter carry for logical operations.
    pub carry: bool,

    /// V: signed overflow of the last flag-setting arithmetic result.
    pub overflow: bool,

    /// Q: sticky DSP saturation flag. Acknowledged but never set by the
    /// implemented operations.
    pub sticky_overflow: bool,

    /// T: Thumb state. Entry into Thumb is detected and reported, never
    /// executed, so this stays observable-only.
    pub thumb_state: bool,
}

impl StatusFlags {
    /// Evaluates an instruction's condition field against the flags.
    #[must_use]
    pub fn can_execute(self, cond: Condition) -> bool {
        use Condition::{AL, CC, CS, EQ, GE, GT, HI, LE, LS, LT, MI, NE, NV, PL, VC, VS};
        match cond {
            EQ => self.zero,                      // Equal (Z=1)
            NE => !self.zero,                     // Not equal (Z=0)
            CS => self.carry,                     // Unsigned higher or same (C=1)
            CC => !self.carry,                    // Unsigned lower (C=0)
            MI => self.sign,                      // Negative (N=1)
            PL => !self.sign,                     // Positive or zero (N=0)
            VS => self.overflow,                  // Overflow (V=1)
            VC => !self.overflow,                 // No overflow (V=0)
            HI => self.carry && !self.zero,       // Unsigned higher (C=1 and Z=0)
            LS => !self.carry || self.zero,       // Unsigned lower or same (C=0 or Z=1)
            GE => self.sign == self.overflow,     // Greater or equal (N=V)
            LT => self.sign != self.overflow,     // Less than (N<>V)
            GT => !self.zero && (self.sign == self.overflow), // Greater than (Z=0 and N=V)
            LE => self.zero || (self.sign != self.overflow), // Less or equal (Z=1 or N<>V)
            AL => true,  // Always (the "AL" suffix can be omitted)
            NV => false, // Reserved encoding, never executed
        }
    }

    /// Assembles the CPSR word visible to MRS and the debugger.
    ///
    /// Bit 4 (User mode), bit 6 (FIQ disable) and bit 7 (IRQ disable) are
    /// fixed to 1; bit 5 mirrors T, bit 27 Q, bits 28..=31 V, C, Z, N.
    #[must_use]
    pub fn cpsr(self) -> u32 {
        let mut cpsr: u32 = 0;
        cpsr.set_bit_on(4);
        cpsr.set_bit_on(6);
        cpsr.set_bit_on(7);
        cpsr.set_bit(5, self.thumb_state);
        cpsr.set_bit(27, self.sticky_overflow);
        cpsr.set_bit(28, self.overflow);
        cpsr.set_bit(29, self.carry);
        cpsr.set_bit(30, self.zero);
        cpsr.set_bit(31, self.sign);

        cpsr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn flag_states() -> impl Iterator<Item = StatusFlags> {
        (0_u8..16).map(|bits| StatusFlags {
            sign: bits & 0b0001 != 0,
            zero: bits & 0b0010 != 0,
            carry: bits & 0b0100 != 0,
            overflow: bits & 0b1000 != 0,
            ..Default::default()
        })
    }

    #[test]
    fn condition_table() {
        // The annul decision must match the architectural predicate for
        // every condition and every flag combination.
        for flags in flag_states() {
            let (n, z, c, v) = (flags.sign, flags.zero, flags.carry, flags.overflow);

            assert_eq!(flags.can_execute(Condition::EQ), z);
            assert_eq!(flags.can_execute(Condition::NE), !z);
            assert_eq!(flags.can_execute(Condition::CS), c);
            assert_eq!(flags.can_execute(Condition::CC), !c);
            assert_eq!(flags.can_execute(Condition::MI), n);
            assert_eq!(flags.can_execute(Condition::PL), !n);
            assert_eq!(flags.can_execute(Condition::VS), v);
            assert_eq!(flags.can_execute(Condition::VC), !v);
            assert_eq!(flags.can_execute(Condition::HI), c && !z);
            assert_eq!(flags.can_execute(Condition::LS), !c || z);
            assert_eq!(flags.can_execute(Condition::GE), n == v);
            assert_eq!(flags.can_execute(Condition::LT), n != v);
            assert_eq!(flags.can_execute(Condition::GT), !z && n == v);
            assert_eq!(flags.can_execute(Condition::LE), z || n != v);
            assert!(flags.can_execute(Condition::AL));
            assert!(!flags.can_execute(Condition::NV));
        }
    }

    #[test]
    fn cpsr_fixed_bits() {
        for flags in flag_states() {
            let cpsr = flags.cpsr();

            assert!(cpsr.get_bit(4));
            assert!(cpsr.get_bit(6));
            assert!(cpsr.get_bit(7));
            assert_eq!(cpsr & 0b11111, 0b10000, "mode bits must read User");
        }
    }

    #[test]
    fn cpsr_mirrors_flags() {
        let mut flags = StatusFlags::default();
        flags.sign = true;
        flags.carry = true;
        flags.sticky_overflow = true;
        flags.thumb_state = true;

        let cpsr = flags.cpsr();
        assert!(cpsr.get_bit(31)); // N
        assert!(!cpsr.get_bit(30)); // Z
        assert!(cpsr.get_bit(29)); // C
        assert!(!cpsr.get_bit(28)); // V
        assert!(cpsr.get_bit(27)); // Q
        assert!(cpsr.get_bit(5)); // T
    }
}
