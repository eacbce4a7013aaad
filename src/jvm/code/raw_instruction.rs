use super::{ProgramCounter, opcodes};
use crate::macros::see_jvm_spec;

/// A JVM instruction as it is laid out in the bytecode, with branch targets as relative offsets
/// and constants as constant pool indices.
///
/// Instructions are grouped by the shape of their operands rather than one variant per opcode.
#[doc = see_jvm_spec!(6, 5)]
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum RawInstruction {
    /// An instruction without operands, e.g., `return` or `aload_0`.
    Simple {
        /// The opcode.
        opcode: u8,
    },
    /// An instruction with a single byte operand, e.g., `aload 4`, `bipush` or `ldc`.
    Byte {
        /// The opcode.
        opcode: u8,
        /// The operand.
        operand: u8,
    },
    /// An instruction with a two-byte operand, e.g., `sipush`, `new` or `getfield`.
    Short {
        /// The opcode.
        opcode: u8,
        /// The operand.
        operand: u16,
    },
    /// The `iinc` instruction.
    IInc {
        /// The index of the local variable.
        index: u8,
        /// The increment.
        constant: i8,
    },
    /// A branch instruction with a two-byte offset.
    Branch {
        /// The opcode.
        opcode: u8,
        /// The offset relative to the instruction.
        offset: i16,
    },
    /// `goto_w` or `jsr_w`.
    BranchWide {
        /// The opcode.
        opcode: u8,
        /// The offset relative to the instruction.
        offset: i32,
    },
    /// The `tableswitch` instruction.
    TableSwitch {
        /// The offset of the default target.
        default: i32,
        /// The lowest key.
        low: i32,
        /// The highest key.
        high: i32,
        /// The offsets for the keys from `low` to `high`.
        jump_offsets: Vec<i32>,
    },
    /// The `lookupswitch` instruction.
    LookupSwitch {
        /// The offset of the default target.
        default: i32,
        /// The keys and their target offsets.
        match_offsets: Vec<(i32, i32)>,
    },
    /// The `invokeinterface` instruction.
    InvokeInterface {
        /// The index of the [`InterfaceMethodRef`](crate::jvm::class::constant_pool::Entry::InterfaceMethodRef).
        index: u16,
        /// The number of argument slots including the receiver.
        count: u8,
    },
    /// The `invokedynamic` instruction.
    InvokeDynamic {
        /// The index of the [`InvokeDynamic`](crate::jvm::class::constant_pool::Entry::InvokeDynamic) entry.
        index: u16,
    },
    /// The `multianewarray` instruction.
    MultiANewArray {
        /// The index of the array class.
        index: u16,
        /// The number of dimensions to allocate.
        dimensions: u8,
    },
    /// An instruction prefixed with `wide`.
    Wide(RawWideInstruction),
}

/// An instruction modified by the `wide` prefix.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RawWideInstruction {
    /// A load, a store or `ret` with a two-byte local variable index.
    Local {
        /// The opcode of the modified instruction.
        opcode: u8,
        /// The index of the local variable.
        index: u16,
    },
    /// `iinc` with a two-byte index and increment.
    IInc {
        /// The index of the local variable.
        index: u16,
        /// The increment.
        increment: i16,
    },
}

impl RawInstruction {
    /// Gets the opcode of the instruction.
    #[must_use]
    pub const fn opcode(&self) -> u8 {
        match self {
            Self::Simple { opcode }
            | Self::Byte { opcode, .. }
            | Self::Short { opcode, .. }
            | Self::Branch { opcode, .. }
            | Self::BranchWide { opcode, .. } => *opcode,
            Self::IInc { .. } => opcodes::IINC,
            Self::TableSwitch { .. } => opcodes::TABLESWITCH,
            Self::LookupSwitch { .. } => opcodes::LOOKUPSWITCH,
            Self::InvokeInterface { .. } => opcodes::INVOKEINTERFACE,
            Self::InvokeDynamic { .. } => opcodes::INVOKEDYNAMIC,
            Self::MultiANewArray { .. } => opcodes::MULTIANEWARRAY,
            Self::Wide(_) => opcodes::WIDE,
        }
    }

    /// Gets the number of bytes the instruction takes when it starts at `pc`.
    #[must_use]
    pub fn num_bytes(&self, pc: ProgramCounter) -> usize {
        match self {
            Self::Simple { .. } => 1,
            Self::Byte { .. } => 2,
            Self::Short { .. } | Self::IInc { .. } | Self::Branch { .. } => 3,
            Self::MultiANewArray { .. } => 4,
            Self::BranchWide { .. } | Self::InvokeInterface { .. } | Self::InvokeDynamic { .. } => 5,
            Self::Wide(RawWideInstruction::Local { .. }) => 4,
            Self::Wide(RawWideInstruction::IInc { .. }) => 6,
            Self::TableSwitch { jump_offsets, .. } => {
                1 + switch_padding(pc) + 12 + 4 * jump_offsets.len()
            }
            Self::LookupSwitch { match_offsets, .. } => {
                1 + switch_padding(pc) + 8 + 8 * match_offsets.len()
            }
        }
    }
}

impl RawWideInstruction {
    /// Gets the opcode of the modified instruction.
    #[must_use]
    pub const fn opcode(&self) -> u8 {
        match self {
            Self::Local { opcode, .. } => *opcode,
            Self::IInc { .. } => opcodes::IINC,
        }
    }
}

/// Number of zero bytes between the opcode of a switch at `pc` and its 4-byte aligned operands.
pub(crate) fn switch_padding(pc: ProgramCounter) -> usize {
    let after_opcode = usize::from(u16::from(pc)) + 1;
    (4 - after_opcode % 4) % 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding() {
        assert_eq!(switch_padding(ProgramCounter::from(0)), 3);
        assert_eq!(switch_padding(ProgramCounter::from(1)), 2);
        assert_eq!(switch_padding(ProgramCounter::from(2)), 1);
        assert_eq!(switch_padding(ProgramCounter::from(3)), 0);
    }

    #[test]
    fn switch_size_depends_on_pc() {
        let insn = RawInstruction::TableSwitch {
            default: 0,
            low: 0,
            high: 1,
            jump_offsets: vec![0, 0],
        };
        assert_eq!(insn.num_bytes(ProgramCounter::from(3)), 1 + 12 + 8);
        assert_eq!(insn.num_bytes(ProgramCounter::from(4)), 1 + 3 + 12 + 8);
    }

    #[test]
    fn opcodes_of_shapes() {
        let wide = RawInstruction::Wide(RawWideInstruction::IInc {
            index: 300,
            increment: -2,
        });
        assert_eq!(wide.opcode(), opcodes::WIDE);
        assert_eq!(wide.num_bytes(ProgramCounter::ZERO), 6);
        let ret = RawInstruction::Simple {
            opcode: opcodes::RETURN,
        };
        assert_eq!(ret.opcode(), opcodes::RETURN);
    }
}
