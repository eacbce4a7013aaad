use crate::{jvm::RawAttribute, macros::see_jvm_spec};

use super::{Instruction, InstructionList, Label, PositionOutOfBounds, peak_stack_growth};

/// The body of a method, i.e., the content of its `Code` attribute.
#[doc = see_jvm_spec!(4, 7, 3)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBody {
    /// The maximum depth of the operand stack.
    pub max_stack: u16,
    /// The number of local variable slots.
    pub max_locals: u16,
    /// The instructions.
    pub instructions: InstructionList,
    /// The exception handlers.
    pub exception_table: Vec<ExceptionTableEntry>,
    /// The `LineNumberTable` entries, if any.
    pub line_numbers: Vec<LineNumber>,
    /// The `LocalVariableTable` entries, if any.
    pub local_variables: Vec<LocalVariable>,
    /// The `LocalVariableTypeTable` entries, if any.
    pub local_variable_types: Vec<LocalVariable>,
    /// The `StackMapTable` frames, or `None` if the attribute is absent.
    pub stack_map_frames: Option<Vec<StackMapFrame>>,
    /// Attributes of the `Code` attribute that are carried over verbatim.
    pub free_attributes: Vec<RawAttribute>,
}

impl MethodBody {
    /// Creates a body with no handlers and no debug information.
    #[must_use]
    pub fn new(max_stack: u16, max_locals: u16, instructions: InstructionList) -> Self {
        Self {
            max_stack,
            max_locals,
            instructions,
            exception_table: Vec::new(),
            line_numbers: Vec::new(),
            local_variables: Vec::new(),
            local_variable_types: Vec::new(),
            stack_map_frames: None,
            free_attributes: Vec::new(),
        }
    }

    /// Inserts `insns` before the instruction at `position` and reserves the operand stack they
    /// need.
    /// # Errors
    /// - [`PositionOutOfBounds`] if there is no instruction at `position`.
    pub fn insert_before(
        &mut self,
        position: usize,
        insns: Vec<Instruction>,
    ) -> Result<(), PositionOutOfBounds> {
        let growth = peak_stack_growth(&insns);
        self.instructions.insert_before(position, insns)?;
        self.max_stack = self.max_stack.saturating_add(growth);
        Ok(())
    }

    /// Inserts `insns` after the instruction at `position` and reserves the operand stack they
    /// need.
    /// # Errors
    /// - [`PositionOutOfBounds`] if there is no instruction at `position`.
    pub fn insert_after(
        &mut self,
        position: usize,
        insns: Vec<Instruction>,
    ) -> Result<(), PositionOutOfBounds> {
        let growth = peak_stack_growth(&insns);
        self.instructions.insert_after(position, insns)?;
        self.max_stack = self.max_stack.saturating_add(growth);
        Ok(())
    }
}

/// An exception handler of a [`MethodBody`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    /// The start of the protected range (inclusive).
    pub start: Label,
    /// The end of the protected range (exclusive).
    pub end: Label,
    /// The start of the handler.
    pub handler: Label,
    /// The constant pool index of the caught class, or `0` for any exception.
    pub catch_type: u16,
}

/// An entry of the `LineNumberTable`.
#[doc = see_jvm_spec!(4, 7, 12)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumber {
    /// The first instruction of the line.
    pub start: Label,
    /// The line number in the source file.
    pub line_number: u16,
}

/// An entry of the `LocalVariableTable` or the `LocalVariableTypeTable`.
#[doc = see_jvm_spec!(4, 7, 13)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalVariable {
    /// The start of the live range (inclusive).
    pub start: Label,
    /// The end of the live range (exclusive).
    pub end: Label,
    /// The constant pool index of the name.
    pub name_index: u16,
    /// The constant pool index of the descriptor or the signature.
    pub descriptor_index: u16,
    /// The local variable slot.
    pub index: u16,
}

/// A frame of the `StackMapTable`, anchored to the instruction it describes.
#[doc = see_jvm_spec!(4, 7, 4)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackMapFrame {
    /// The instruction the frame applies to.
    pub target: Label,
    /// The frame contents, relative to the previous frame.
    pub kind: FrameKind,
}

/// The contents of a [`StackMapFrame`]. Whether the compact or the extended encoding is used is
/// decided when the frame is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind {
    /// Same locals as the previous frame and an empty stack.
    Same,
    /// Same locals as the previous frame and one stack item.
    SameLocals1StackItem(VerificationType),
    /// The last `k` locals of the previous frame are absent and the stack is empty.
    Chop(u8),
    /// Additional locals on top of the previous frame and an empty stack.
    Append(Vec<VerificationType>),
    /// All locals and stack items.
    Full {
        /// The local variables.
        locals: Vec<VerificationType>,
        /// The operand stack.
        stack: Vec<VerificationType>,
    },
}

/// A verification type in a [`StackMapFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationType {
    /// `top`
    Top,
    /// `int`
    Integer,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `long`
    Long,
    /// `null`
    Null,
    /// `this` before the super constructor has been called.
    UninitializedThis,
    /// An instance of the class at the given constant pool index.
    Object(u16),
    /// An object created by the `new` instruction at the label, not yet initialized.
    Uninitialized(Label),
}
