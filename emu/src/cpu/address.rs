//! # Load/Store Address Generation
//!
//! The format-preparation half of every transfer instruction: computes the
//! effective address into the per-instruction context (and performs base
//! writeback) before the operation half moves any data.
//!
//! Four forms exist:
//!
//! - immediate offset (12-bit), for word/byte transfers
//! - scaled register offset, routed through the barrel shifter
//! - extended offset (split 8-bit immediate or plain register), for
//!   halfword / signed / doubleword transfers
//! - multiple, computing the start/end bounds of an LDM/STM walk
//!
//! Each form annuls on the operand-aliasing encodings the architecture
//! leaves UNPREDICTABLE, after emitting a diagnostic.

use crate::bitwise::Bits;
use crate::cpu::alu_instruction::shift;
use crate::cpu::armv5e::{Armv5e, ExecContext};
use crate::cpu::flags::{Indexing, Offsetting, ShiftKind};
use crate::cpu::instructions::ExtraOffset;
use crate::cpu::registers::REG_PC;

const fn apply_offset(base: u32, offset: u32, offsetting: Offsetting) -> u32 {
    match offsetting {
        Offsetting::Up => base.wrapping_add(offset),
        Offsetting::Down => base.wrapping_sub(offset),
    }
}

impl Armv5e {
    /// Immediate-offset form: 12-bit offset added to or subtracted from
    /// the base register.
    pub(crate) fn prepare_immediate_offset(
        &mut self,
        ctx: &mut ExecContext,
        indexing: Indexing,
        offsetting: Offsetting,
        write_back: bool,
        rd: u32,
        rn: u32,
        offset: u32,
    ) {
        let rn_value = self.registers.register_at(rn as usize);

        match indexing {
            Indexing::Pre if !write_back => {
                // Rn = PC reads as PC + 8; the preamble already added 4.
                let base = if rn == REG_PC {
                    rn_value.wrapping_add(4)
                } else {
                    rn_value
                };
                ctx.transfer_address = apply_offset(base, offset, offsetting);
            }
            Indexing::Pre => {
                if rn == REG_PC {
                    tracing::warn!(
                        "Unpredictable load/store result (Can't writeback to PC, Rn = PC)"
                    );
                    ctx.execute = false;
                    return;
                }
                if rn == rd {
                    tracing::warn!(
                        "Unpredictable load/store result (Can't writeback to transferred register, Rn = Rd)"
                    );
                    ctx.execute = false;
                    return;
                }

                ctx.transfer_address = apply_offset(rn_value, offset, offsetting);
                self.registers
                    .set_register_at(rn as usize, ctx.transfer_address);
            }
            Indexing::Post => {
                // Post indexing always writes the base back.
                if rn == REG_PC {
                    tracing::warn!(
                        "Unpredictable load/store result (Can't writeback to PC, Rn = PC)"
                    );
                    ctx.execute = false;
                    return;
                }
                if rn == rd {
                    tracing::warn!(
                        "Unpredictable load/store result (Can't writeback to transferred register, Rn = Rd)"
                    );
                    ctx.execute = false;
                    return;
                }

                ctx.transfer_address = rn_value;
                self.registers
                    .set_register_at(rn as usize, apply_offset(rn_value, offset, offsetting));
            }
        }
    }

    /// Scaled-register form: the index is Rm run through the barrel
    /// shifter with the immediate-shift-amount rules (amount 0 selects
    /// the LSR #32 / ASR #32 / RRX encodings).
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn prepare_scaled_register(
        &mut self,
        ctx: &mut ExecContext,
        indexing: Indexing,
        offsetting: Offsetting,
        write_back: bool,
        rd: u32,
        rn: u32,
        shift_kind: ShiftKind,
        shift_amount: u32,
        rm: u32,
    ) {
        if rm == REG_PC {
            tracing::warn!("Unpredictable load/store result (Illegal usage of PC, Rm = PC)");
            ctx.execute = false;
            return;
        }

        let rn_value = self.registers.register_at(rn as usize);
        let rm_value = self.registers.register_at(rm as usize);
        let index = shift(shift_kind, shift_amount, rm_value, self.flags.carry).result;

        match indexing {
            Indexing::Pre if !write_back => {
                let base = if rn == REG_PC {
                    rn_value.wrapping_add(4)
                } else {
                    rn_value
                };
                ctx.transfer_address = apply_offset(base, index, offsetting);
            }
            Indexing::Pre | Indexing::Post => {
                if rn == REG_PC {
                    tracing::warn!(
                        "Unpredictable load/store result (Can't writeback to PC, Rn = PC)"
                    );
                    ctx.execute = false;
                    return;
                }
                if rn == rd {
                    tracing::warn!(
                        "Unpredictable load/store result (Can't writeback to transferred register, Rn = Rd)"
                    );
                    ctx.execute = false;
                    return;
                }
                if rn == rm {
                    tracing::warn!(
                        "Unpredictable load/store result (Can't use the same register for Rn and Rm)"
                    );
                    ctx.execute = false;
                    return;
                }

                if indexing == Indexing::Pre {
                    ctx.transfer_address = apply_offset(rn_value, index, offsetting);
                    self.registers
                        .set_register_at(rn as usize, ctx.transfer_address);
                } else {
                    ctx.transfer_address = rn_value;
                    self.registers
                        .set_register_at(rn as usize, apply_offset(rn_value, index, offsetting));
                }
            }
        }
    }

    /// Extended form for halfword / signed / doubleword transfers. The
    /// immediate arrives as two nibbles; the register form reads Rm.
    pub(crate) fn prepare_extra_offset(
        &mut self,
        ctx: &mut ExecContext,
        indexing: Indexing,
        offsetting: Offsetting,
        write_back: bool,
        rd: u32,
        rn: u32,
        offset: ExtraOffset,
    ) {
        // Post indexing with the writeback bit set is UNPREDICTABLE for
        // this format.
        if indexing == Indexing::Post && write_back {
            tracing::warn!("Unpredictable extended load/store result (Post-indexed with W set)");
            ctx.execute = false;
            return;
        }

        let rn_value = self.registers.register_at(rn as usize);
        let (offset_value, offset_rm) = match offset {
            ExtraOffset::Immediate { high, low } => ((high << 4) | low, None),
            ExtraOffset::Register { rm } => (self.registers.register_at(rm as usize), Some(rm)),
        };

        if let Some(rm) = offset_rm {
            if rm == REG_PC {
                tracing::warn!(
                    "Unpredictable extended load/store result (Illegal usage of PC, Rm = PC)"
                );
                ctx.execute = false;
                return;
            }
        }

        match indexing {
            Indexing::Pre if !write_back => {
                let base = if rn == REG_PC {
                    rn_value.wrapping_add(4)
                } else {
                    rn_value
                };
                ctx.transfer_address = apply_offset(base, offset_value, offsetting);
            }
            Indexing::Pre => {
                if rn == REG_PC {
                    tracing::warn!(
                        "Unpredictable extended load/store result (Can't writeback to PC, Rn = PC)"
                    );
                    ctx.execute = false;
                    return;
                }
                if rn == rd {
                    tracing::warn!(
                        "Unpredictable extended load/store result (Can't writeback to transferred register, Rn = Rd)"
                    );
                    ctx.execute = false;
                    return;
                }
                if let Some(rm) = offset_rm {
                    if rn == rm {
                        tracing::warn!(
                            "Unpredictable extended load/store result (Can't use the same register for Rn and Rm)"
                        );
                        ctx.execute = false;
                        return;
                    }
                }

                ctx.transfer_address = apply_offset(rn_value, offset_value, offsetting);
                self.registers
                    .set_register_at(rn as usize, ctx.transfer_address);
            }
            Indexing::Post => {
                if rn == REG_PC {
                    tracing::warn!(
                        "Unpredictable extended load/store result (Can't writeback to PC, Rn = PC)"
                    );
                    ctx.execute = false;
                    return;
                }
                if offset_rm.is_some() && rn == rd {
                    tracing::warn!(
                        "Unpredictable extended load/store result (Can't writeback to transferred register, Rn = Rd)"
                    );
                    ctx.execute = false;
                    return;
                }
                if let Some(rm) = offset_rm {
                    if rn == rm {
                        tracing::warn!(
                            "Unpredictable extended load/store result (Can't use the same register for Rn and Rm)"
                        );
                        ctx.execute = false;
                        return;
                    }
                }

                ctx.transfer_address = rn_value;
                self.registers
                    .set_register_at(rn as usize, apply_offset(rn_value, offset_value, offsetting));
            }
        }
    }

    /// Multiple form: computes the inclusive `[start, end]` word range an
    /// LDM/STM walks, plus the optional base writeback.
    ///
    /// For every mode with `k` set bits, `end - start == 4 * (k - 1)` and
    /// writeback moves the base by `±4k`.
    pub(crate) fn prepare_multiple(
        &mut self,
        ctx: &mut ExecContext,
        indexing: Indexing,
        offsetting: Offsetting,
        write_back: bool,
        rn: u32,
        register_list: u32,
    ) {
        let register_list = register_list & 0xFFFF;
        if register_list == 0 {
            tracing::warn!("Unpredictable block transfer result (No register specified)");
            ctx.execute = false;
            return;
        }

        let rn_value = self.registers.register_at(rn as usize);
        let span = register_list.count_ones() * 4;

        let (start, end, written_back) = match (indexing, offsetting) {
            // Increment after.
            (Indexing::Post, Offsetting::Up) => (
                rn_value,
                rn_value.wrapping_add(span).wrapping_sub(4),
                rn_value.wrapping_add(span),
            ),
            // Increment before.
            (Indexing::Pre, Offsetting::Up) => (
                rn_value.wrapping_add(4),
                rn_value.wrapping_add(span),
                rn_value.wrapping_add(span),
            ),
            // Decrement after.
            (Indexing::Post, Offsetting::Down) => (
                rn_value.wrapping_sub(span).wrapping_add(4),
                rn_value,
                rn_value.wrapping_sub(span),
            ),
            // Decrement before.
            (Indexing::Pre, Offsetting::Down) => (
                rn_value.wrapping_sub(span),
                rn_value.wrapping_sub(4),
                rn_value.wrapping_sub(span),
            ),
        };

        ctx.multiple_start_address = start;
        ctx.multiple_end_address = end;

        if write_back {
            if register_list.get_bit(rn as u8) {
                tracing::warn!(
                    "Unpredictable block transfer result (Can't writeback to transferred register, Rn in list)"
                );
                ctx.execute = false;
                return;
            }

            self.registers.set_register_at(rn as usize, written_back);
        }
    }
}
