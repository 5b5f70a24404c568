//! # Register File
//!
//! Sixteen general 32-bit registers, R0 through R15. R15 doubles as the
//! program counter; the core additionally mirrors it into a scalar for
//! external observers (see [`Armv5e::pc`](super::armv5e::Armv5e)).
//!
//! | Register | Alias | Purpose                                   |
//! |----------|-------|-------------------------------------------|
//! | R0-R12   | -     | General purpose                           |
//! | R13      | SP    | Stack Pointer (by convention)             |
//! | R14      | LR    | Link Register (return address on BL)      |
//! | R15      | PC    | Program Counter, 4 bytes past the fetch   |

use serde::{Deserialize, Serialize};

/// Stack Pointer register index.
pub const REG_SP: usize = 0xD;

/// Link Register index (return address for subroutines).
pub const REG_LR: usize = 0xE;

/// Program Counter register index, typed for decode-field comparisons.
pub const REG_PC: u32 = 0xF;

#[derive(Default, Serialize, Deserialize)]
pub struct Registers([u32; 16]);

impl Registers {
    #[must_use]
    pub const fn program_counter(&self) -> u32 {
        self.0[15]
    }

    pub const fn set_program_counter(&mut self, new_value: u32) {
        self.0[15] = new_value;
    }

    pub fn set_register_at(&mut self, reg: usize, new_value: u32) {
        assert!(reg <= 15, "Invalid register index: {reg} (0x{reg:X})");
        self.0[reg] = new_value;
    }

    #[must_use]
    pub const fn register_at(&self, reg: usize) -> u32 {
        self.0[reg]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn program_counter_is_r15() {
        let mut registers = Registers::default();

        registers.set_program_counter(0x8000);
        assert_eq!(registers.register_at(15), 0x8000);

        registers.set_register_at(15, 0x8004);
        assert_eq!(registers.program_counter(), 0x8004);
    }

    #[test]
    #[should_panic]
    fn out_of_range_index() {
        let mut registers = Registers::default();
        registers.set_register_at(16, 0);
    }
}
