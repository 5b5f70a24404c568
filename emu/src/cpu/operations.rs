//! # Operation Behaviors
//!
//! The per-operation half of the two-stage execution model. Format
//! preparation (barrel shifter here, address generation in `address`)
//! has already filled the per-instruction
//! context; each method below reads the context and the register file,
//! writes its result and, when the S bit asks for it, the flags.
//!
//! Flag rules follow the ARM data-processing contract:
//!
//! - logical group: N and Z from the result, C from the barrel shifter,
//!   V untouched
//! - arithmetic group: C is the unsigned carry-out (for subtracts the
//!   not-borrow `!(op2 > op1)`), V the signed-overflow rule applied to
//!   the widened addition actually performed
//! - multiplies: N and Z only; C and V are architecturally meaningless
//!   and stay untouched

use crate::bitwise::Bits;
use crate::cpu::alu_instruction::{shift, AluInstruction};
use crate::cpu::armv5e::{Armv5e, ExecContext};
use crate::cpu::flags::ShiftKind;
use crate::cpu::instructions::MultiplyLongVariant;
use crate::cpu::registers::{REG_LR, REG_PC};
use crate::memory::IoDevice;

/// Classical signed-overflow rule on the addition `a + b = result`:
/// equal operand signs, differing result sign.
const fn overflow_from_add(a: u32, b: u32, result: u32) -> bool {
    let sign_a = a >> 31;
    let sign_b = b >> 31;
    let sign_r = result >> 31;

    sign_a == sign_b && sign_a != sign_r
}

impl Armv5e {
    /// Reads an arithmetic first operand, applying the architectural
    /// PC+8 rule (the preamble has already committed +4).
    fn read_operand_register(&self, rn: u32) -> u32 {
        let value = self.registers.register_at(rn as usize);
        if rn == REG_PC {
            value.wrapping_add(4)
        } else {
            value
        }
    }

    // ------------------------------------------------------------------
    // Barrel-shifter format preparations
    // ------------------------------------------------------------------

    /// Register operand shifted by an immediate amount (0..=31, with the
    /// special amount-0 encodings handled by [`shift`]).
    pub(crate) fn prepare_shift_immediate(
        &mut self,
        ctx: &mut ExecContext,
        shift_kind: ShiftKind,
        shift_amount: u32,
        rm: u32,
    ) {
        let mut rm_value = self.registers.register_at(rm as usize);
        if rm == REG_PC {
            rm_value = rm_value.wrapping_add(4);
        }

        let shifted = shift(shift_kind, shift_amount, rm_value, self.flags.carry);
        ctx.shift_operand = shifted.result;
        ctx.shift_carry = shifted.carry;
    }

    /// Register operand shifted by the low byte of Rs. Amount 0 leaves
    /// the value and the carry untouched; R15 is not allowed anywhere in
    /// this form.
    pub(crate) fn prepare_shift_register(
        &mut self,
        ctx: &mut ExecContext,
        shift_kind: ShiftKind,
        rs: u32,
        rm: u32,
        rd: u32,
        rn: u32,
    ) {
        if rd == REG_PC || rm == REG_PC || rn == REG_PC || rs == REG_PC {
            tracing::warn!("Register 15 cannot be used in a register-shift operand");
            ctx.execute = false;
            return;
        }

        let rm_value = self.registers.register_at(rm as usize);
        let amount = u32::from(self.registers.register_at(rs as usize).get_byte(0));

        if amount == 0 {
            ctx.shift_operand = rm_value;
            ctx.shift_carry = self.flags.carry;
            return;
        }

        let shifted = shift(shift_kind, amount, rm_value, self.flags.carry);
        ctx.shift_operand = shifted.result;
        ctx.shift_carry = shifted.carry;
    }

    /// 8-bit immediate rotated right by twice the rotate field. Rotate 0
    /// leaves the carry untouched, anything else copies bit 31 of the
    /// rotated value.
    pub(crate) fn prepare_rotated_immediate(
        &mut self,
        ctx: &mut ExecContext,
        rotate: u32,
        imm: u32,
    ) {
        ctx.shift_operand = imm.rotate_right(2 * rotate);
        ctx.shift_carry = if rotate == 0 {
            self.flags.carry
        } else {
            ctx.shift_operand.get_bit(31)
        };
    }

    // ------------------------------------------------------------------
    // Data processing
    // ------------------------------------------------------------------

    pub(crate) fn data_processing(
        &mut self,
        ctx: &ExecContext,
        opcode: AluInstruction,
        set_flags: bool,
        rn: u32,
        rd: u32,
    ) {
        use AluInstruction::{
            Adc, Add, And, Bic, Cmn, Cmp, Eor, Mov, Mvn, Orr, Rsb, Rsc, Sbc, Sub, Teq, Tst,
        };
        match opcode {
            And => self.and(ctx, rd, rn, set_flags),
            Eor => self.eor(ctx, rd, rn, set_flags),
            Sub => self.sub(ctx, rd, rn, set_flags),
            Rsb => self.rsb(ctx, rd, rn, set_flags),
            Add => self.add(ctx, rd, rn, set_flags),
            Adc => self.adc(ctx, rd, rn, set_flags),
            Sbc => self.sbc(ctx, rd, rn, set_flags),
            Rsc => self.rsc(ctx, rd, rn, set_flags),
            Tst => self.tst(ctx, rn),
            Teq => self.teq(ctx, rn),
            Cmp => self.cmp(ctx, rn),
            Cmn => self.cmn(ctx, rn),
            Orr => self.orr(ctx, rd, rn, set_flags),
            Mov => self.mov(ctx, rd, set_flags),
            Bic => self.bic(ctx, rd, rn, set_flags),
            Mvn => self.mvn(ctx, rd, set_flags),
        }
    }

    fn set_logical_flags(&mut self, ctx: &ExecContext, result: u32) {
        self.flags.sign = result.get_bit(31);
        self.flags.zero = result == 0;
        self.flags.carry = ctx.shift_carry;
        // V is untouched by the logical group.
    }

    fn and(&mut self, ctx: &ExecContext, rd: u32, rn: u32, set_flags: bool) {
        let result = self.registers.register_at(rn as usize) & ctx.shift_operand;
        self.registers.set_register_at(rd as usize, result);

        if set_flags && rd == REG_PC {
            tracing::warn!("Unpredictable AND instruction result");
            return;
        }
        if set_flags {
            self.set_logical_flags(ctx, result);
        }
    }

    fn eor(&mut self, ctx: &ExecContext, rd: u32, rn: u32, set_flags: bool) {
        let result = self.registers.register_at(rn as usize) ^ ctx.shift_operand;
        self.registers.set_register_at(rd as usize, result);

        if set_flags && rd == REG_PC {
            tracing::warn!("Unpredictable EOR instruction result");
            return;
        }
        if set_flags {
            self.set_logical_flags(ctx, result);
        }
    }

    fn orr(&mut self, ctx: &ExecContext, rd: u32, rn: u32, set_flags: bool) {
        let result = self.registers.register_at(rn as usize) | ctx.shift_operand;
        self.registers.set_register_at(rd as usize, result);

        if set_flags && rd == REG_PC {
            tracing::warn!("Unpredictable ORR instruction result");
            return;
        }
        if set_flags {
            self.set_logical_flags(ctx, result);
        }
    }

    fn bic(&mut self, ctx: &ExecContext, rd: u32, rn: u32, set_flags: bool) {
        let result = self.registers.register_at(rn as usize) & !ctx.shift_operand;
        self.registers.set_register_at(rd as usize, result);

        if set_flags && rd == REG_PC {
            tracing::warn!("Unpredictable BIC instruction result");
            return;
        }
        if set_flags {
            self.set_logical_flags(ctx, result);
        }
    }

    fn mov(&mut self, ctx: &ExecContext, rd: u32, set_flags: bool) {
        self.registers.set_register_at(rd as usize, ctx.shift_operand);

        if set_flags {
            self.set_logical_flags(ctx, ctx.shift_operand);
        }
    }

    fn mvn(&mut self, ctx: &ExecContext, rd: u32, set_flags: bool) {
        let result = !ctx.shift_operand;
        self.registers.set_register_at(rd as usize, result);

        if set_flags && rd == REG_PC {
            tracing::warn!("Unpredictable MVN instruction result");
            return;
        }
        if set_flags {
            self.set_logical_flags(ctx, result);
        }
    }

    fn add(&mut self, ctx: &ExecContext, rd: u32, rn: u32, set_flags: bool) {
        let rn_value = self.read_operand_register(rn);
        let sum = u64::from(rn_value) + u64::from(ctx.shift_operand);
        let result = sum as u32;
        self.registers.set_register_at(rd as usize, result);

        if set_flags && rd == REG_PC {
            tracing::warn!("Unpredictable ADD instruction result");
            return;
        }
        if set_flags {
            self.flags.sign = result.get_bit(31);
            self.flags.zero = result == 0;
            self.flags.carry = (sum >> 32) != 0;
            self.flags.overflow = overflow_from_add(rn_value, ctx.shift_operand, result);
        }
    }

    fn adc(&mut self, ctx: &ExecContext, rd: u32, rn: u32, set_flags: bool) {
        let rn_value = self.read_operand_register(rn);
        let mut sum = u64::from(rn_value) + u64::from(ctx.shift_operand);
        if self.flags.carry {
            sum += 1;
        }
        let result = sum as u32;
        self.registers.set_register_at(rd as usize, result);

        if set_flags && rd == REG_PC {
            tracing::warn!("Unpredictable ADC instruction result");
            return;
        }
        if set_flags {
            self.flags.sign = result.get_bit(31);
            self.flags.zero = result == 0;
            self.flags.carry = (sum >> 32) != 0;
            self.flags.overflow = overflow_from_add(rn_value, ctx.shift_operand, result);
        }
    }

    fn sub(&mut self, ctx: &ExecContext, rd: u32, rn: u32, set_flags: bool) {
        let rn_value = self.read_operand_register(rn);
        let negated = ctx.shift_operand.wrapping_neg();
        let result = rn_value.wrapping_add(negated);
        self.registers.set_register_at(rd as usize, result);

        if set_flags && rd == REG_PC {
            tracing::warn!("Unpredictable SUB instruction result");
            return;
        }
        if set_flags {
            self.flags.sign = result.get_bit(31);
            self.flags.zero = result == 0;
            self.flags.carry = !(ctx.shift_operand > rn_value);
            self.flags.overflow = overflow_from_add(rn_value, negated, result);
        }
    }

    fn sbc(&mut self, ctx: &ExecContext, rd: u32, rn: u32, set_flags: bool) {
        let rn_value = self.read_operand_register(rn);
        let mut negated = ctx.shift_operand.wrapping_neg();
        if !self.flags.carry {
            negated = negated.wrapping_sub(1);
        }
        let result = rn_value.wrapping_add(negated);
        self.registers.set_register_at(rd as usize, result);

        if set_flags && rd == REG_PC {
            tracing::warn!("Unpredictable SBC instruction result");
            return;
        }
        if set_flags {
            self.flags.sign = result.get_bit(31);
            self.flags.zero = result == 0;
            self.flags.carry = !(ctx.shift_operand > rn_value);
            self.flags.overflow = overflow_from_add(rn_value, negated, result);
        }
    }

    fn rsb(&mut self, ctx: &ExecContext, rd: u32, rn: u32, set_flags: bool) {
        let rn_value = self.read_operand_register(rn);
        let negated = rn_value.wrapping_neg();
        let result = ctx.shift_operand.wrapping_add(negated);
        self.registers.set_register_at(rd as usize, result);

        if set_flags && rd == REG_PC {
            tracing::warn!("Unpredictable RSB instruction result");
            return;
        }
        if set_flags {
            self.flags.sign = result.get_bit(31);
            self.flags.zero = result == 0;
            self.flags.carry = !(rn_value > ctx.shift_operand);
            self.flags.overflow = overflow_from_add(negated, ctx.shift_operand, result);
        }
    }

    fn rsc(&mut self, ctx: &ExecContext, rd: u32, rn: u32, set_flags: bool) {
        let rn_value = self.read_operand_register(rn);
        let mut negated = rn_value.wrapping_neg();
        if !self.flags.carry {
            negated = negated.wrapping_sub(1);
        }
        let result = ctx.shift_operand.wrapping_add(negated);
        self.registers.set_register_at(rd as usize, result);

        if set_flags && rd == REG_PC {
            tracing::warn!("Unpredictable RSC instruction result");
            return;
        }
        if set_flags {
            self.flags.sign = result.get_bit(31);
            self.flags.zero = result == 0;
            self.flags.carry = !(rn_value > ctx.shift_operand);
            self.flags.overflow = overflow_from_add(negated, ctx.shift_operand, result);
        }
    }

    fn tst(&mut self, ctx: &ExecContext, rn: u32) {
        let result = self.registers.register_at(rn as usize) & ctx.shift_operand;
        self.set_logical_flags(ctx, result);
    }

    fn teq(&mut self, ctx: &ExecContext, rn: u32) {
        let result = self.registers.register_at(rn as usize) ^ ctx.shift_operand;
        self.set_logical_flags(ctx, result);
    }

    fn cmp(&mut self, ctx: &ExecContext, rn: u32) {
        let rn_value = self.registers.register_at(rn as usize);
        let negated = ctx.shift_operand.wrapping_neg();
        let result = rn_value.wrapping_add(negated);

        self.flags.sign = result.get_bit(31);
        self.flags.zero = result == 0;
        self.flags.carry = !(ctx.shift_operand > rn_value);
        self.flags.overflow = overflow_from_add(rn_value, negated, result);
    }

    fn cmn(&mut self, ctx: &ExecContext, rn: u32) {
        let rn_value = self.registers.register_at(rn as usize);
        let sum = u64::from(rn_value) + u64::from(ctx.shift_operand);
        let result = sum as u32;

        self.flags.sign = result.get_bit(31);
        self.flags.zero = result == 0;
        self.flags.carry = (sum >> 32) != 0;
        self.flags.overflow = overflow_from_add(rn_value, ctx.shift_operand, result);
    }

    // ------------------------------------------------------------------
    // Branches
    // ------------------------------------------------------------------

    /// B / BL. The stored offset is a 24-bit word displacement; the
    /// effective target is `PC + 4 + sign_extend(offset << 2)` on top of
    /// the committed increment. A negative target is not recoverable.
    pub(crate) fn branch(&mut self, link: bool, offset: u32) {
        if link {
            let return_address = self.registers.program_counter();
            self.registers.set_register_at(REG_LR, return_address);
        }

        let displacement = (offset << 2).sign_extended(26) as i32;
        let target = i64::from(self.registers.program_counter()) + 4 + i64::from(displacement);

        if target < 0 {
            tracing::error!("Branch destination out of bounds");
            std::process::exit(1);
        }

        self.registers.set_program_counter(target as u32);
    }

    /// BX. Bit 0 of the target selects Thumb state, which this model
    /// detects and reports without executing.
    pub(crate) fn branch_and_exchange(&mut self, rm: u32) {
        let value = self.registers.register_at(rm as usize);

        if value.get_bit(0) {
            tracing::warn!(
                "Thumb entry detected; Thumb execution is not implemented in this model. PC={:#010X}",
                self.pc
            );
            return;
        }

        self.flags.thumb_state = false;
        self.registers.set_program_counter(value & 0xFFFF_FFFE);
    }

    // ------------------------------------------------------------------
    // Miscellaneous register operations
    // ------------------------------------------------------------------

    pub(crate) fn count_leading_zeros(&mut self, rd: u32, rm: u32) {
        if rd == REG_PC || rm == REG_PC {
            tracing::warn!("Unpredictable CLZ instruction result");
            return;
        }

        let value = self.registers.register_at(rm as usize);
        self.registers.set_register_at(rd as usize, value.leading_zeros());
    }

    /// MRS. The CPSR word is assembled from the live flags; SPSR access
    /// (`r`) and partial field masks are UNPREDICTABLE in User mode.
    pub(crate) fn read_status_register(&mut self, rd: u32, r: bool, field_mask: u32) {
        if rd == REG_PC || r || field_mask != 15 {
            tracing::warn!("Unpredictable MRS instruction result");
            return;
        }

        self.registers.set_register_at(rd as usize, self.flags.cpsr());
    }

    // ------------------------------------------------------------------
    // Multiplies
    // ------------------------------------------------------------------

    pub(crate) fn mul(&mut self, rd: u32, rm: u32, rs: u32, set_flags: bool) {
        if rd == REG_PC || rm == REG_PC || rs == REG_PC {
            tracing::warn!("Unpredictable MUL instruction result");
            return;
        }
        if rd == rm {
            // Architecturally unreliable, but the computed value is kept.
            tracing::warn!("Unpredictable MUL instruction result (Rd = Rm)");
        }

        let rm_value = self.registers.register_at(rm as usize);
        let rs_value = self.registers.register_at(rs as usize);
        let result = rm_value.wrapping_mul(rs_value);
        self.registers.set_register_at(rd as usize, result);

        if set_flags {
            self.flags.sign = result.get_bit(31);
            self.flags.zero = result == 0;
            // C and V are architecturally meaningless after a multiply.
        }
    }

    pub(crate) fn mla(&mut self, rd: u32, rn: u32, rm: u32, rs: u32, set_flags: bool) {
        if rd == REG_PC || rm == REG_PC || rs == REG_PC || rn == REG_PC {
            tracing::warn!("Unpredictable MLA instruction result");
            return;
        }
        if rd == rm {
            tracing::warn!("Unpredictable MLA instruction result (Rd = Rm)");
        }

        let rn_value = self.registers.register_at(rn as usize);
        let rm_value = self.registers.register_at(rm as usize);
        let rs_value = self.registers.register_at(rs as usize);
        let result = rm_value.wrapping_mul(rs_value).wrapping_add(rn_value);
        self.registers.set_register_at(rd as usize, result);

        if set_flags {
            self.flags.sign = result.get_bit(31);
            self.flags.zero = result == 0;
        }
    }

    pub(crate) fn multiply_long(
        &mut self,
        variant: MultiplyLongVariant,
        set_flags: bool,
        rd_hi: u32,
        rd_lo: u32,
        rm: u32,
        rs: u32,
    ) {
        if rd_hi == REG_PC
            || rd_lo == REG_PC
            || rm == REG_PC
            || rs == REG_PC
            || rd_hi == rd_lo
            || rd_hi == rm
            || rd_lo == rm
        {
            tracing::warn!("Unpredictable {variant} instruction result");
            return;
        }

        let rm_value = self.registers.register_at(rm as usize);
        let rs_value = self.registers.register_at(rs as usize);
        let accumulator = (u64::from(self.registers.register_at(rd_hi as usize)) << 32)
            | u64::from(self.registers.register_at(rd_lo as usize));

        let product = if variant.is_signed() {
            i64::from(rm_value as i32).wrapping_mul(i64::from(rs_value as i32)) as u64
        } else {
            u64::from(rm_value).wrapping_mul(u64::from(rs_value))
        };
        let result = if variant.accumulates() {
            product.wrapping_add(accumulator)
        } else {
            product
        };

        self.registers
            .set_register_at(rd_hi as usize, (result >> 32) as u32);
        self.registers.set_register_at(rd_lo as usize, result as u32);

        if set_flags {
            self.flags.sign = (result >> 63) != 0;
            self.flags.zero = result == 0;
        }
    }

    // ------------------------------------------------------------------
    // DSP multiplies (16 x 16)
    // ------------------------------------------------------------------

    /// Selects and sign-extends the halfword operands of SMLA/SMUL by the
    /// `x`/`y` flags (false = low halfword, true = high halfword).
    pub(crate) fn prepare_dsp_operands(
        &mut self,
        ctx: &mut ExecContext,
        rd: u32,
        rn: u32,
        rm: u32,
        rs: u32,
        x: bool,
        y: bool,
    ) {
        if rd == REG_PC || rn == REG_PC || rm == REG_PC || rs == REG_PC {
            tracing::warn!("Unpredictable SMLA<y><x> instruction result");
            ctx.execute = false;
            return;
        }

        let rm_value = self.registers.register_at(rm as usize);
        let rs_value = self.registers.register_at(rs as usize);

        let op1 = if x { (rm_value >> 16) as u16 } else { rm_value as u16 };
        let op2 = if y { (rs_value >> 16) as u16 } else { rs_value as u16 };

        ctx.dsp_op1 = i32::from(op1 as i16);
        ctx.dsp_op2 = i32::from(op2 as i16);
    }

    /// SMLA<y><x>: Rd = op1 * op2 + Rn. Saturation would set Q; this
    /// model never does (known limitation).
    pub(crate) fn dsp_multiply_accumulate(&mut self, ctx: &ExecContext, rd: u32, rn: u32) {
        let rn_value = self.registers.register_at(rn as usize) as i32;
        let result = ctx.dsp_op1.wrapping_mul(ctx.dsp_op2).wrapping_add(rn_value);
        self.registers.set_register_at(rd as usize, result as u32);
    }

    /// SMUL<y><x>: Rd = op1 * op2.
    pub(crate) fn dsp_multiply(&mut self, ctx: &ExecContext, rd: u32) {
        let result = ctx.dsp_op1.wrapping_mul(ctx.dsp_op2);
        self.registers.set_register_at(rd as usize, result as u32);
    }

    // ------------------------------------------------------------------
    // Loads
    // ------------------------------------------------------------------

    /// LDR. Misaligned addresses read the enclosing aligned word rotated
    /// so the addressed byte lands in the low lane. Loading into R15
    /// branches, masking bit 0 into the T flag.
    pub(crate) fn ldr(&mut self, ctx: &ExecContext, rd: u32) {
        let address = ctx.transfer_address;
        let rotation = 8 * (address & 3);
        let word = self.memory.lock().unwrap().read_word((address & !3) as usize);
        let value = word.rotate_right(rotation);

        if rd == REG_PC {
            self.registers.set_program_counter(value & 0xFFFF_FFFE);
            self.flags.thumb_state = value.get_bit(0);
        } else {
            self.registers.set_register_at(rd as usize, value);
        }
    }

    /// LDRT: user-mode word load; same rotate-on-misalignment as LDR.
    pub(crate) fn ldrt(&mut self, ctx: &ExecContext, rd: u32) {
        let address = ctx.transfer_address;
        let rotation = 8 * (address & 3);
        let word = self.memory.lock().unwrap().read_word((address & !3) as usize);

        self.registers
            .set_register_at(rd as usize, word.rotate_right(rotation));
    }

    /// LDRB / LDRBT: zero-extended byte.
    pub(crate) fn ldrb(&mut self, ctx: &ExecContext, rd: u32) {
        let value = self
            .memory
            .lock()
            .unwrap()
            .read_at(ctx.transfer_address as usize);

        self.registers.set_register_at(rd as usize, u32::from(value));
    }

    /// LDRH: zero-extended halfword; misaligned addresses are reported
    /// and leave state unchanged.
    pub(crate) fn ldrh(&mut self, ctx: &ExecContext, rd: u32) {
        if ctx.transfer_address.get_bit(0) {
            tracing::warn!("Unpredictable LDRH instruction result (Address is not halfword aligned)");
            return;
        }

        let value = self
            .memory
            .lock()
            .unwrap()
            .read_half_word(ctx.transfer_address as usize);

        self.registers.set_register_at(rd as usize, u32::from(value));
    }

    /// LDRSB: sign-extended byte.
    pub(crate) fn ldrsb(&mut self, ctx: &ExecContext, rd: u32) {
        let value = self
            .memory
            .lock()
            .unwrap()
            .read_at(ctx.transfer_address as usize);

        self.registers
            .set_register_at(rd as usize, u32::from(value).sign_extended(8));
    }

    /// LDRSH: sign-extended halfword.
    pub(crate) fn ldrsh(&mut self, ctx: &ExecContext, rd: u32) {
        if ctx.transfer_address.get_bit(0) {
            tracing::warn!(
                "Unpredictable LDRSH instruction result (Address is not halfword aligned)"
            );
            return;
        }

        let value = self
            .memory
            .lock()
            .unwrap()
            .read_half_word(ctx.transfer_address as usize);

        self.registers
            .set_register_at(rd as usize, u32::from(value).sign_extended(16));
    }

    /// LDRD: two consecutive words into an even/odd register pair.
    pub(crate) fn ldrd(&mut self, ctx: &ExecContext, rd: u32) {
        if rd.get_bit(0) {
            tracing::warn!("Undefined LDRD instruction result (Rd must be even)");
            return;
        }
        if rd as usize == REG_LR || ctx.transfer_address & 0b111 != 0 {
            tracing::warn!(
                "Unpredictable LDRD instruction result (Address is not doubleword aligned) @ {:#010X}",
                self.pc.wrapping_sub(4)
            );
            return;
        }

        let memory = self.memory.lock().unwrap();
        let low = memory.read_word(ctx.transfer_address as usize);
        let high = memory.read_word(ctx.transfer_address as usize + 4);
        drop(memory);

        self.registers.set_register_at(rd as usize, low);
        self.registers.set_register_at(rd as usize + 1, high);
    }

    /// LDM: walks the register list from bit 0 upward, loading
    /// consecutive words. Bit 15 loads the PC (bit 0 masked into T).
    pub(crate) fn ldm(&mut self, ctx: &ExecContext, register_list: u32) {
        let mut address = ctx.multiple_start_address as usize;
        let memory = self.memory.lock().unwrap();

        for reg in 0..15_u8 {
            if register_list.get_bit(reg) {
                self.registers
                    .set_register_at(usize::from(reg), memory.read_word(address));
                address += 4;
            }
        }

        if register_list.get_bit(15) {
            let value = memory.read_word(address);
            self.registers.set_program_counter(value & 0xFFFF_FFFE);
            self.flags.thumb_state = value.get_bit(0);
        }
    }

    // ------------------------------------------------------------------
    // Stores
    // ------------------------------------------------------------------

    /// STR / STRT.
    pub(crate) fn store(&mut self, ctx: &ExecContext, rd: u32) {
        let value = self.registers.register_at(rd as usize);
        self.memory
            .lock()
            .unwrap()
            .write_word(ctx.transfer_address as usize, value);
    }

    /// STRB / STRBT: low byte only.
    pub(crate) fn store_byte(&mut self, ctx: &ExecContext, rd: u32) {
        let value = self.registers.register_at(rd as usize);
        self.memory
            .lock()
            .unwrap()
            .write_at(ctx.transfer_address as usize, value.get_byte(0));
    }

    /// STRH: low halfword; misaligned addresses are reported and ignored.
    pub(crate) fn store_half_word(&mut self, ctx: &ExecContext, rd: u32) {
        if ctx.transfer_address.get_bit(0) {
            tracing::warn!("Unpredictable STRH instruction result (Address is not halfword aligned)");
            return;
        }

        let value = self.registers.register_at(rd as usize);
        self.memory
            .lock()
            .unwrap()
            .write_half_word(ctx.transfer_address as usize, value as u16);
    }

    /// STRD: even/odd register pair into two consecutive words.
    pub(crate) fn store_double(&mut self, ctx: &ExecContext, rd: u32) {
        if rd.get_bit(0) {
            tracing::warn!("Undefined STRD instruction result (Rd must be even)");
            return;
        }
        if rd as usize == REG_LR || ctx.transfer_address & 0b111 != 0 {
            tracing::warn!(
                "Unpredictable STRD instruction result (Address is not doubleword aligned)"
            );
            return;
        }

        let low = self.registers.register_at(rd as usize);
        let high = self.registers.register_at(rd as usize + 1);
        let mut memory = self.memory.lock().unwrap();
        memory.write_word(ctx.transfer_address as usize, low);
        memory.write_word(ctx.transfer_address as usize + 4, high);
    }

    /// STM: walks the register list from bit 0 upward, storing
    /// consecutive words (R15 included).
    pub(crate) fn stm(&mut self, ctx: &ExecContext, register_list: u32) {
        let mut address = ctx.multiple_start_address as usize;
        let mut memory = self.memory.lock().unwrap();

        for reg in 0..16_u8 {
            if register_list.get_bit(reg) {
                memory.write_word(address, self.registers.register_at(usize::from(reg)));
                address += 4;
            }
        }
    }

    // ------------------------------------------------------------------
    // Swap
    // ------------------------------------------------------------------

    /// SWP / SWPB: load from [Rn] and store Rm to [Rn] as one logical
    /// step; the loaded value lands in Rd. The word form rotates a
    /// misaligned load like LDR does.
    pub(crate) fn swap(&mut self, byte: bool, rd: u32, rn: u32, rm: u32) {
        if rd == REG_PC || rm == REG_PC || rn == REG_PC || rm == rn || rn == rd {
            tracing::warn!("Unpredictable SWP instruction result");
            return;
        }

        let rn_value = self.registers.register_at(rn as usize);
        let rm_value = self.registers.register_at(rm as usize);
        let mut memory = self.memory.lock().unwrap();

        let loaded = if byte {
            let loaded = u32::from(memory.read_at(rn_value as usize));
            memory.write_at(rn_value as usize, rm_value.get_byte(0));
            loaded
        } else {
            let rotation = 8 * (rn_value & 3);
            let loaded = memory.read_word((rn_value & !3) as usize).rotate_right(rotation);
            memory.write_word(rn_value as usize, rm_value);
            loaded
        };
        drop(memory);

        self.registers.set_register_at(rd as usize, loaded);
    }
}
