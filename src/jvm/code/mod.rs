//! Instructions and method bodies.

mod instruction;
mod instruction_list;
mod method_body;
pub mod opcodes;
mod pc;
mod raw_instruction;

pub use instruction::{FieldOp, Instruction, InvokeKind, peak_stack_growth};
pub use instruction_list::{InstructionList, Label, Node, PositionOutOfBounds};
pub use method_body::{
    ExceptionTableEntry, FrameKind, LineNumber, LocalVariable, MethodBody, StackMapFrame,
    VerificationType,
};
pub use pc::{InvalidOffset, ProgramCounter};
pub use raw_instruction::{RawInstruction, RawWideInstruction};
pub(crate) use raw_instruction::switch_padding;
