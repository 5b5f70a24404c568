//! # Decoded Instruction Forms
//!
//! The sum type the dispatcher consumes. Field extraction belongs to the
//! external decoder table; every variant carries already-decoded operands
//! with their architectural meaning (no aliased field names survive
//! decoding).
//!
//! [`Instruction::disassembler`] renders the trace form
//! `MNEMONIC{cond}{S} operands` used by the instruction-trace channel.

use crate::cpu::alu_instruction::{AluInstruction, SecondOperand};
use crate::cpu::condition::Condition;
use crate::cpu::flags::{Indexing, LoadStoreKind, Offsetting, ShiftKind};

/// Which word/byte single-data-transfer operation to perform, including
/// the user-mode (translated) T variants.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum SingleTransferKind {
    Ldr,
    Ldrt,
    Ldrb,
    Ldrbt,
    Str,
    Strt,
    Strb,
    Strbt,
}

impl std::fmt::Display for SingleTransferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ldr => f.write_str("LDR"),
            Self::Ldrt => f.write_str("LDRT"),
            Self::Ldrb => f.write_str("LDRB"),
            Self::Ldrbt => f.write_str("LDRBT"),
            Self::Str => f.write_str("STR"),
            Self::Strt => f.write_str("STRT"),
            Self::Strb => f.write_str("STRB"),
            Self::Strbt => f.write_str("STRBT"),
        }
    }
}

/// The halfword / signed / doubleword transfer operations of the extended
/// load/store format.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum ExtraTransferKind {
    Ldrh,
    Ldrsb,
    Ldrsh,
    Ldrd,
    Strh,
    Strd,
}

impl std::fmt::Display for ExtraTransferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ldrh => f.write_str("LDRH"),
            Self::Ldrsb => f.write_str("LDRSB"),
            Self::Ldrsh => f.write_str("LDRSH"),
            Self::Ldrd => f.write_str("LDRD"),
            Self::Strh => f.write_str("STRH"),
            Self::Strd => f.write_str("STRD"),
        }
    }
}

/// Offset of a word/byte transfer: 12-bit immediate or scaled register.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransferOffset {
    Immediate {
        offset: u32,
    },
    ScaledRegister {
        shift_kind: ShiftKind,
        shift_amount: u32,
        rm: u32,
    },
}

impl std::fmt::Display for TransferOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Immediate { offset } => write!(f, "#{offset}"),
            Self::ScaledRegister {
                shift_kind,
                shift_amount,
                rm,
            } => write!(f, "R{rm}, {shift_kind} #{shift_amount}"),
        }
    }
}

/// Offset of an extended transfer: split 8-bit immediate or plain register.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExtraOffset {
    /// The immediate arrives as two nibbles; the effective offset is
    /// `(high << 4) | low`.
    Immediate { high: u32, low: u32 },
    Register { rm: u32 },
}

impl std::fmt::Display for ExtraOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Immediate { high, low } => write!(f, "#{}", (high << 4) | low),
            Self::Register { rm } => write!(f, "R{rm}"),
        }
    }
}

/// 32-bit multiply operations.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MultiplyVariant {
    Mul,
    Mla,
}

impl std::fmt::Display for MultiplyVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mul => f.write_str("MUL"),
            Self::Mla => f.write_str("MLA"),
        }
    }
}

/// 64-bit multiply operations.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MultiplyLongVariant {
    Umull,
    Umlal,
    Smull,
    Smlal,
}

impl MultiplyLongVariant {
    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::Smull | Self::Smlal)
    }

    #[must_use]
    pub const fn accumulates(self) -> bool {
        matches!(self, Self::Umlal | Self::Smlal)
    }
}

impl std::fmt::Display for MultiplyLongVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Umull => f.write_str("UMULL"),
            Self::Umlal => f.write_str("UMLAL"),
            Self::Smull => f.write_str("SMULL"),
            Self::Smlal => f.write_str("SMLAL"),
        }
    }
}

/// Coprocessor instructions are recognized but inert in this model.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CoprocessorKind {
    Cdp,
    Mcr,
    Mrc,
    Ldc,
    Stc,
}

impl std::fmt::Display for CoprocessorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cdp => f.write_str("CDP"),
            Self::Mcr => f.write_str("MCR"),
            Self::Mrc => f.write_str("MRC"),
            Self::Ldc => f.write_str("LDC"),
            Self::Stc => f.write_str("STC"),
        }
    }
}

/// Recognized encodings whose behavior this model does not provide. Each
/// produces a warning naming the instruction and leaves state unchanged.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnimplementedKind {
    Blx,
    Bkpt,
    Msr,
    Smlalxy,
    Smlawy,
    Smulwy,
}

impl std::fmt::Display for UnimplementedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blx => f.write_str("BLX"),
            Self::Bkpt => f.write_str("BKPT"),
            Self::Msr => f.write_str("MSR"),
            Self::Smlalxy => f.write_str("SMLAL<y><x>"),
            Self::Smlawy => f.write_str("SMLAW<y>"),
            Self::Smulwy => f.write_str("SMULW<y>"),
        }
    }
}

/// One decoded ARMv5e instruction.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Instruction {
    DataProcessing {
        condition: Condition,
        opcode: AluInstruction,
        set_flags: bool,
        rn: u32,
        rd: u32,
        operand: SecondOperand,
    },
    Multiply {
        condition: Condition,
        variant: MultiplyVariant,
        set_flags: bool,
        rd: u32,
        rn: u32,
        rs: u32,
        rm: u32,
    },
    MultiplyLong {
        condition: Condition,
        variant: MultiplyLongVariant,
        set_flags: bool,
        rd_hi: u32,
        rd_lo: u32,
        rs: u32,
        rm: u32,
    },
    /// SMLA<y><x> / SMUL<y><x>: 16x16 DSP multiplies. `x`/`y` pick the low
    /// (false) or high (true) halfword of Rm/Rs.
    DspMultiply {
        condition: Condition,
        accumulate: bool,
        rd: u32,
        rn: u32,
        rs: u32,
        rm: u32,
        x: bool,
        y: bool,
    },
    Branch {
        condition: Condition,
        link: bool,
        /// 24-bit word offset straight from the instruction; shifted left
        /// by two and sign extended from bit 25 at execution time.
        offset: u32,
    },
    BranchAndExchange {
        condition: Condition,
        rm: u32,
    },
    SingleDataTransfer {
        condition: Condition,
        kind: SingleTransferKind,
        indexing: Indexing,
        offsetting: Offsetting,
        write_back: bool,
        rd: u32,
        rn: u32,
        offset: TransferOffset,
    },
    ExtraDataTransfer {
        condition: Condition,
        kind: ExtraTransferKind,
        indexing: Indexing,
        offsetting: Offsetting,
        write_back: bool,
        rd: u32,
        rn: u32,
        offset: ExtraOffset,
    },
    BlockDataTransfer {
        condition: Condition,
        kind: LoadStoreKind,
        indexing: Indexing,
        offsetting: Offsetting,
        write_back: bool,
        rn: u32,
        register_list: u32,
    },
    Swap {
        condition: Condition,
        byte: bool,
        rd: u32,
        rn: u32,
        rm: u32,
    },
    CountLeadingZeros {
        condition: Condition,
        rd: u32,
        rm: u32,
    },
    /// MRS. `r` selects SPSR (unsupported, UNPREDICTABLE here) and
    /// `field_mask` must name all four fields (15) to be predictable.
    ReadStatusRegister {
        condition: Condition,
        rd: u32,
        r: bool,
        field_mask: u32,
    },
    SoftwareInterrupt {
        condition: Condition,
        /// The 24-bit comment field handed to the syscall layer.
        number: u32,
    },
    Coprocessor {
        condition: Condition,
        kind: CoprocessorKind,
    },
    Unimplemented {
        condition: Condition,
        kind: UnimplementedKind,
    },
}

impl Instruction {
    #[must_use]
    pub const fn condition(&self) -> Condition {
        match *self {
            Self::DataProcessing { condition, .. }
            | Self::Multiply { condition, .. }
            | Self::MultiplyLong { condition, .. }
            | Self::DspMultiply { condition, .. }
            | Self::Branch { condition, .. }
            | Self::BranchAndExchange { condition, .. }
            | Self::SingleDataTransfer { condition, .. }
            | Self::ExtraDataTransfer { condition, .. }
            | Self::BlockDataTransfer { condition, .. }
            | Self::Swap { condition, .. }
            | Self::CountLeadingZeros { condition, .. }
            | Self::ReadStatusRegister { condition, .. }
            | Self::SoftwareInterrupt { condition, .. }
            | Self::Coprocessor { condition, .. }
            | Self::Unimplemented { condition, .. } => condition,
        }
    }

    pub(crate) fn disassembler(&self) -> String {
        match self {
            Self::DataProcessing {
                condition,
                opcode,
                set_flags,
                rn,
                rd,
                operand,
            } => {
                let set_string = if *set_flags { "S" } else { "" };
                match opcode {
                    AluInstruction::And
                    | AluInstruction::Eor
                    | AluInstruction::Sub
                    | AluInstruction::Rsb
                    | AluInstruction::Add
                    | AluInstruction::Adc
                    | AluInstruction::Sbc
                    | AluInstruction::Rsc
                    | AluInstruction::Orr
                    | AluInstruction::Bic => {
                        format!("{opcode}{condition}{set_string} R{rd}, R{rn}, {operand}")
                    }
                    AluInstruction::Tst
                    | AluInstruction::Teq
                    | AluInstruction::Cmp
                    | AluInstruction::Cmn => {
                        format!("{opcode}{condition} R{rn}, {operand}")
                    }
                    AluInstruction::Mov | AluInstruction::Mvn => {
                        format!("{opcode}{condition}{set_string} R{rd}, {operand}")
                    }
                }
            }
            Self::Multiply {
                condition,
                variant,
                set_flags,
                rd,
                rn,
                rs,
                rm,
            } => {
                let set_string = if *set_flags { "S" } else { "" };
                match variant {
                    MultiplyVariant::Mul => {
                        format!("MUL{condition}{set_string} R{rd}, R{rm}, R{rs}")
                    }
                    MultiplyVariant::Mla => {
                        format!("MLA{condition}{set_string} R{rd}, R{rm}, R{rs}, R{rn}")
                    }
                }
            }
            Self::MultiplyLong {
                condition,
                variant,
                set_flags,
                rd_hi,
                rd_lo,
                rs,
                rm,
            } => {
                let set_string = if *set_flags { "S" } else { "" };
                format!("{variant}{condition}{set_string} R{rd_lo}, R{rd_hi}, R{rm}, R{rs}")
            }
            Self::DspMultiply {
                condition,
                accumulate,
                rd,
                rn,
                rs,
                rm,
                x,
                y,
            } => {
                let xs = if *x { "T" } else { "B" };
                let ys = if *y { "T" } else { "B" };
                if *accumulate {
                    format!("SMLA{xs}{ys}{condition} R{rd}, R{rm}, R{rs}, R{rn}")
                } else {
                    format!("SMUL{xs}{ys}{condition} R{rd}, R{rm}, R{rs}")
                }
            }
            Self::Branch {
                condition,
                link,
                offset,
            } => {
                let mnemonic = if *link { "BL" } else { "B" };
                format!("{mnemonic}{condition} #{offset:#X}")
            }
            Self::BranchAndExchange { condition, rm } => format!("BX{condition} R{rm}"),
            Self::SingleDataTransfer {
                condition,
                kind,
                indexing,
                offsetting,
                write_back,
                rd,
                rn,
                offset,
            } => {
                let sign = match offsetting {
                    Offsetting::Up => "+",
                    Offsetting::Down => "-",
                };
                let wb = if *write_back { "!" } else { "" };
                match indexing {
                    Indexing::Pre => {
                        format!("{kind}{condition} R{rd}, [R{rn}, {sign}{offset}]{wb}")
                    }
                    Indexing::Post => {
                        format!("{kind}{condition} R{rd}, [R{rn}], {sign}{offset}")
                    }
                }
            }
            Self::ExtraDataTransfer {
                condition,
                kind,
                indexing,
                offsetting,
                write_back,
                rd,
                rn,
                offset,
            } => {
                let sign = match offsetting {
                    Offsetting::Up => "+",
                    Offsetting::Down => "-",
                };
                let wb = if *write_back { "!" } else { "" };
                match indexing {
                    Indexing::Pre => {
                        format!("{kind}{condition} R{rd}, [R{rn}, {sign}{offset}]{wb}")
                    }
                    Indexing::Post => {
                        format!("{kind}{condition} R{rd}, [R{rn}], {sign}{offset}")
                    }
                }
            }
            Self::BlockDataTransfer {
                condition,
                kind,
                indexing,
                offsetting,
                write_back,
                rn,
                register_list,
            } => {
                let mnemonic = match kind {
                    LoadStoreKind::Load => "LDM",
                    LoadStoreKind::Store => "STM",
                };
                let mode = match (indexing, offsetting) {
                    (Indexing::Post, Offsetting::Up) => "IA",
                    (Indexing::Pre, Offsetting::Up) => "IB",
                    (Indexing::Post, Offsetting::Down) => "DA",
                    (Indexing::Pre, Offsetting::Down) => "DB",
                };
                let wb = if *write_back { "!" } else { "" };
                let registers = (0..16)
                    .filter(|i| register_list & (1 << i) != 0)
                    .map(|i| format!("R{i}"))
                    .collect::<Vec<_>>()
                    .join(",");
                format!("{mnemonic}{mode}{condition} R{rn}{wb}, {{{registers}}}")
            }
            Self::Swap {
                condition,
                byte,
                rd,
                rn,
                rm,
            } => {
                let suffix = if *byte { "B" } else { "" };
                format!("SWP{suffix}{condition} R{rd}, R{rm}, [R{rn}]")
            }
            Self::CountLeadingZeros { condition, rd, rm } => {
                format!("CLZ{condition} R{rd}, R{rm}")
            }
            Self::ReadStatusRegister { condition, rd, .. } => {
                format!("MRS{condition} R{rd}, CPSR")
            }
            Self::SoftwareInterrupt { condition, number } => {
                format!("SWI{condition} #{number:#X}")
            }
            Self::Coprocessor { condition, kind } => format!("{kind}{condition}"),
            Self::Unimplemented { condition, kind } => format!("{kind}{condition}"),
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.disassembler())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn disassembles_data_processing() {
        let instruction = Instruction::DataProcessing {
            condition: Condition::AL,
            opcode: AluInstruction::Add,
            set_flags: true,
            rn: 1,
            rd: 2,
            operand: SecondOperand::Immediate { rotate: 0, imm: 10 },
        };
        assert_eq!(instruction.disassembler(), "ADDS R2, R1, #10");

        let instruction = Instruction::DataProcessing {
            condition: Condition::NE,
            opcode: AluInstruction::Cmp,
            set_flags: true,
            rn: 4,
            rd: 0,
            operand: SecondOperand::Register {
                shift_kind: ShiftKind::Lsl,
                shift_source: crate::cpu::alu_instruction::ShiftSource::Immediate(2),
                rm: 5,
            },
        };
        assert_eq!(instruction.disassembler(), "CMPNE R4, R5, LSL #2");
    }

    #[test]
    fn disassembles_block_transfer() {
        let instruction = Instruction::BlockDataTransfer {
            condition: Condition::AL,
            kind: LoadStoreKind::Store,
            indexing: Indexing::Post,
            offsetting: Offsetting::Up,
            write_back: true,
            rn: 6,
            register_list: 0b0000_0000_0000_0111,
        };
        assert_eq!(instruction.disassembler(), "STMIA R6!, {R0,R1,R2}");
    }

    #[test]
    fn disassembles_transfers() {
        let instruction = Instruction::SingleDataTransfer {
            condition: Condition::AL,
            kind: SingleTransferKind::Ldr,
            indexing: Indexing::Pre,
            offsetting: Offsetting::Up,
            write_back: false,
            rd: 4,
            rn: 5,
            offset: TransferOffset::Immediate { offset: 4 },
        };
        assert_eq!(instruction.disassembler(), "LDR R4, [R5, +#4]");

        let instruction = Instruction::ExtraDataTransfer {
            condition: Condition::AL,
            kind: ExtraTransferKind::Ldrh,
            indexing: Indexing::Post,
            offsetting: Offsetting::Down,
            write_back: false,
            rd: 1,
            rn: 0,
            offset: ExtraOffset::Immediate { high: 1, low: 0xF },
        };
        assert_eq!(instruction.disassembler(), "LDRH R1, [R0], -#31");
    }

    #[test]
    fn every_variant_reports_its_condition() {
        let instruction = Instruction::SoftwareInterrupt {
            condition: Condition::LE,
            number: 4,
        };
        assert_eq!(instruction.condition(), Condition::LE);

        let instruction = Instruction::Unimplemented {
            condition: Condition::AL,
            kind: UnimplementedKind::Bkpt,
        };
        assert_eq!(instruction.condition(), Condition::AL);
    }
}
