//! # Syscall Binding
//!
//! `SWI` delegates to an external handler implementing [`SyscallHandler`].
//! The helpers below are the register/memory surface such a handler works
//! through: buffers addressed by an argument register, integer arguments
//! and results, the return-via-LR convention, and the program-arguments
//! bootstrap that seeds argc/argv before the first instruction.

use crate::cpu::armv5e::Armv5e;
use crate::cpu::registers::{REG_LR, REG_SP};
use crate::memory::ram::RAM_END;
use crate::memory::IoDevice;

/// The external emulation layer invoked by `SWI`.
pub trait SyscallHandler {
    /// Handles the syscall selected by the 24-bit SWI `number`.
    /// Returns -1 when the number is unknown; the core reports it and
    /// carries on.
    fn process_syscall(&mut self, cpu: &mut Armv5e, number: u32) -> i32;
}

impl Armv5e {
    pub(crate) fn software_interrupt(&mut self, number: u32) {
        match self.syscall.take() {
            Some(mut handler) => {
                let outcome = handler.process_syscall(self, number);
                self.syscall = Some(handler);

                if outcome == -1 {
                    tracing::warn!(
                        "A syscall not implemented in this model was called. Caller address: {:#010X} SWI number: {number:#X}",
                        self.pc
                    );
                }
            }
            None => tracing::warn!(
                "SWI with no syscall handler installed. Caller address: {:#010X} SWI number: {number:#X}",
                self.pc
            ),
        }
    }

    /// Fills `buf` from memory starting at the address held in `R{argn}`.
    pub fn get_buffer(&self, argn: usize, buf: &mut [u8]) {
        let mut address = self.registers.register_at(argn) as usize;
        let memory = self.memory.lock().unwrap();

        for byte in buf {
            *byte = memory.read_at(address);
            address += 1;
        }
    }

    /// Writes `buf` into memory starting at the address held in `R{argn}`.
    pub fn set_buffer(&mut self, argn: usize, buf: &[u8]) {
        let mut address = self.registers.register_at(argn) as usize;
        let mut memory = self.memory.lock().unwrap();

        for byte in buf {
            memory.write_at(address, *byte);
            address += 1;
        }
    }

    /// Word-wise variant of [`set_buffer`](Self::set_buffer) for data
    /// that is already laid out as little-endian words (pointer tables).
    pub fn set_buffer_noinvert(&mut self, argn: usize, buf: &[u8]) {
        let mut address = self.registers.register_at(argn) as usize;
        let mut memory = self.memory.lock().unwrap();

        for chunk in buf.chunks_exact(4) {
            memory.write_word(address, u32::from_le_bytes(chunk.try_into().unwrap()));
            address += 4;
        }
    }

    /// Reads the integer argument held in `R{argn}`.
    #[must_use]
    pub fn get_int(&self, argn: usize) -> i32 {
        self.registers.register_at(argn) as i32
    }

    /// Places an integer result in `R{argn}`.
    pub fn set_int(&mut self, argn: usize, value: i32) {
        self.registers.set_register_at(argn, value as u32);
    }

    /// Resumes execution at the address in LR, the syscall return
    /// convention. Both R15 and the PC mirror move.
    pub fn return_from_syscall(&mut self) {
        let return_address = self.registers.register_at(REG_LR);
        self.registers.set_program_counter(return_address);
        self.pc = return_address;
    }

    /// Seeds the program arguments: argv strings at `RAM_END - 512`, the
    /// pointer table at `RAM_END - 632`, SP at the table base, R0 = argc
    /// and R1 = the table address.
    pub fn set_prog_args(&mut self, args: &[&str]) {
        assert!(args.len() <= 30, "at most 30 program arguments fit");

        let mut arg_strings = [0_u8; 512];
        let mut arg_pointers = [0_u32; 30];
        let strings_base = (RAM_END - 512) as u32;

        let mut offset = 0_usize;
        for (i, arg) in args.iter().enumerate() {
            let bytes = arg.as_bytes();
            assert!(
                offset + bytes.len() + 1 <= arg_strings.len(),
                "program arguments exceed the 512-byte string block"
            );

            arg_pointers[i] = strings_base + offset as u32;
            arg_strings[offset..offset + bytes.len()].copy_from_slice(bytes);
            offset += bytes.len() + 1; // NUL terminator
        }

        self.registers.set_register_at(REG_SP, strings_base);
        self.set_buffer(REG_SP, &arg_strings);

        let mut pointer_table = [0_u8; 120];
        for (i, pointer) in arg_pointers.iter().enumerate() {
            pointer_table[i * 4..i * 4 + 4].copy_from_slice(&pointer.to_le_bytes());
        }
        self.registers
            .set_register_at(REG_SP, (RAM_END - 632) as u32);
        self.set_buffer_noinvert(REG_SP, &pointer_table);

        self.registers.set_register_at(0, args.len() as u32);
        self.registers.set_register_at(1, (RAM_END - 632) as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::condition::Condition;
    use crate::cpu::instructions::Instruction;
    use pretty_assertions::assert_eq;

    struct ExitRecorder {
        known: u32,
    }

    impl SyscallHandler for ExitRecorder {
        fn process_syscall(&mut self, cpu: &mut Armv5e, number: u32) -> i32 {
            if number == self.known {
                cpu.set_int(0, 0);
                cpu.return_from_syscall();
                0
            } else {
                -1
            }
        }
    }

    #[test]
    fn swi_delegates_to_the_handler() {
        let mut cpu = Armv5e::default();
        cpu.registers.set_register_at(REG_LR, 0x800);
        cpu.set_syscall_handler(Box::new(ExitRecorder { known: 0x900001 }));

        cpu.execute(Instruction::SoftwareInterrupt {
            condition: Condition::AL,
            number: 0x900001,
        });

        assert_eq!(cpu.registers.register_at(0), 0);
        assert_eq!(cpu.pc, 0x800, "return_from_syscall lands on LR");
        assert_eq!(cpu.registers.program_counter(), 0x800);
    }

    #[test]
    fn unknown_swi_continues_execution() {
        let mut cpu = Armv5e::default();
        cpu.set_syscall_handler(Box::new(ExitRecorder { known: 1 }));

        cpu.execute(Instruction::SoftwareInterrupt {
            condition: Condition::AL,
            number: 0xABCDEF,
        });

        // Only the PC advance happened.
        assert_eq!(cpu.pc, 4);
    }

    #[test]
    fn buffers_round_trip_through_memory() {
        let mut cpu = Armv5e::default();
        cpu.registers.set_register_at(2, 0x4000);

        cpu.set_buffer(2, b"hello");

        let mut read_back = [0_u8; 5];
        cpu.get_buffer(2, &mut read_back);
        assert_eq!(&read_back, b"hello");
    }

    #[test]
    fn int_arguments_round_trip() {
        let mut cpu = Armv5e::default();

        cpu.set_int(3, -7);
        assert_eq!(cpu.get_int(3), -7);
        assert_eq!(cpu.registers.register_at(3), (-7_i32) as u32);
    }

    #[test]
    fn prog_args_bootstrap_layout() {
        let mut cpu = Armv5e::default();

        cpu.set_prog_args(&["prog", "arg1"]);

        assert_eq!(cpu.registers.register_at(0), 2);
        assert_eq!(cpu.registers.register_at(1), (RAM_END - 632) as u32);
        assert_eq!(cpu.registers.register_at(REG_SP), (RAM_END - 632) as u32);

        // The pointer table holds the string addresses.
        let memory = cpu.memory.lock().unwrap();
        let argv0 = memory.read_word(RAM_END - 632) as usize;
        let argv1 = memory.read_word(RAM_END - 632 + 4) as usize;
        assert_eq!(argv0, RAM_END - 512);
        assert_eq!(argv1, RAM_END - 512 + 5);

        // And the strings are NUL terminated where the pointers say.
        assert_eq!(memory.read_at(argv0), b'p');
        assert_eq!(memory.read_at(argv0 + 4), 0);
        assert_eq!(memory.read_at(argv1), b'a');
        assert_eq!(memory.read_at(argv1 + 4), 0);
    }
}
