//! Debugger peek-poke adapter: the register and memory surface a remote
//! debug stub drives while the core is quiesced between instructions.

use crate::cpu::armv5e::Armv5e;
use crate::memory::IoDevice;

impl Armv5e {
    /// Number of registers visible to the debugger.
    #[must_use]
    pub const fn n_regs() -> usize {
        16
    }

    /// Reads a debugger-visible register. Index 15 reads the PC mirror;
    /// CPSR access is not supported by this adapter.
    #[must_use]
    pub fn reg_read(&self, reg: usize) -> u32 {
        if reg < 15 {
            self.registers.register_at(reg)
        } else if reg == 15 {
            self.pc
        } else {
            tracing::warn!("CPSR reads are not supported by the debug adapter");
            0
        }
    }

    /// Writes a debugger-visible register. Index 15 moves both R15 and
    /// the PC mirror so the next fetch starts at the new address.
    pub fn reg_write(&mut self, reg: usize, value: u32) {
        if reg < 15 {
            self.registers.set_register_at(reg, value);
        } else if reg == 15 {
            self.pc = value;
            self.registers.set_program_counter(value);
        } else {
            tracing::warn!("CPSR writes are not supported by the debug adapter");
        }
    }

    #[must_use]
    pub fn mem_read(&self, address: usize) -> u8 {
        self.memory.lock().unwrap().read_at(address)
    }

    pub fn mem_write(&mut self, address: usize, value: u8) {
        self.memory.lock().unwrap().write_at(address, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sixteen_registers() {
        assert_eq!(Armv5e::n_regs(), 16);
    }

    #[test]
    fn register_fifteen_is_the_pc_mirror() {
        let mut cpu = Armv5e::default();

        cpu.reg_write(15, 0x8000);
        assert_eq!(cpu.pc, 0x8000);
        assert_eq!(cpu.registers.program_counter(), 0x8000);
        assert_eq!(cpu.reg_read(15), 0x8000);
    }

    #[test]
    fn general_registers_round_trip() {
        let mut cpu = Armv5e::default();

        cpu.reg_write(3, 0xCAFE);
        assert_eq!(cpu.reg_read(3), 0xCAFE);
    }

    #[test]
    fn cpsr_slot_reads_zero() {
        let cpu = Armv5e::default();
        assert_eq!(cpu.reg_read(25), 0);
    }

    #[test]
    fn memory_round_trip() {
        let mut cpu = Armv5e::default();

        cpu.mem_write(0x123, 0x42);
        assert_eq!(cpu.mem_read(0x123), 0x42);
    }
}
