use crate::{
    jvm::references::{FieldRef, MethodRef},
    types::method_descriptor::ReturnType,
};

use super::{Label, RawInstruction, RawWideInstruction, opcodes};

/// An instruction in a [`MethodBody`](super::MethodBody).
///
/// Field accesses and invocations carry resolved references so that they can be matched and
/// created without touching the constant pool. Control transfers refer to [`Label`]s so that
/// inserting code does not invalidate them. Everything else is kept in its raw form.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Instruction {
    /// An instruction whose operands are independent of the code layout.
    Plain(RawInstruction),
    /// A field access.
    Field {
        /// The kind of access.
        op: FieldOp,
        /// The accessed field.
        field: FieldRef,
    },
    /// A method invocation other than `invokedynamic`.
    Invoke {
        /// The kind of invocation.
        kind: InvokeKind,
        /// The invoked method.
        method: MethodRef,
        /// Whether the owner of the method is an interface.
        is_interface: bool,
    },
    /// A conditional or unconditional branch, including `jsr`.
    Jump {
        /// The opcode of the branch.
        opcode: u8,
        /// The branch target.
        target: Label,
    },
    /// The `tableswitch` instruction.
    TableSwitch {
        /// The default target.
        default: Label,
        /// The lowest key.
        low: i32,
        /// The targets for consecutive keys starting from `low`.
        targets: Vec<Label>,
    },
    /// The `lookupswitch` instruction.
    LookupSwitch {
        /// The default target.
        default: Label,
        /// The keys and their targets.
        pairs: Vec<(i32, Label)>,
    },
}

/// The kind of a field access instruction.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FieldOp {
    /// `getstatic`
    GetStatic,
    /// `putstatic`
    PutStatic,
    /// `getfield`
    GetField,
    /// `putfield`
    PutField,
}

/// The kind of an invocation instruction.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum InvokeKind {
    /// `invokevirtual`
    Virtual,
    /// `invokespecial`
    Special,
    /// `invokestatic`
    Static,
    /// `invokeinterface`
    Interface,
}

impl FieldOp {
    /// Gets the opcode of the access.
    #[must_use]
    pub const fn opcode(self) -> u8 {
        match self {
            Self::GetStatic => opcodes::GETSTATIC,
            Self::PutStatic => opcodes::PUTSTATIC,
            Self::GetField => opcodes::GETFIELD,
            Self::PutField => opcodes::PUTFIELD,
        }
    }

    /// Gets the access for an opcode in `getstatic..=putfield`.
    #[must_use]
    pub const fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode {
            opcodes::GETSTATIC => Some(Self::GetStatic),
            opcodes::PUTSTATIC => Some(Self::PutStatic),
            opcodes::GETFIELD => Some(Self::GetField),
            opcodes::PUTFIELD => Some(Self::PutField),
            _ => None,
        }
    }
}

impl InvokeKind {
    /// Gets the opcode of the invocation.
    #[must_use]
    pub const fn opcode(self) -> u8 {
        match self {
            Self::Virtual => opcodes::INVOKEVIRTUAL,
            Self::Special => opcodes::INVOKESPECIAL,
            Self::Static => opcodes::INVOKESTATIC,
            Self::Interface => opcodes::INVOKEINTERFACE,
        }
    }

    /// Gets the kind for an opcode in `invokevirtual..=invokeinterface`.
    #[must_use]
    pub const fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode {
            opcodes::INVOKEVIRTUAL => Some(Self::Virtual),
            opcodes::INVOKESPECIAL => Some(Self::Special),
            opcodes::INVOKESTATIC => Some(Self::Static),
            opcodes::INVOKEINTERFACE => Some(Self::Interface),
            _ => None,
        }
    }
}

impl Instruction {
    /// Creates an instruction without operands.
    #[must_use]
    pub const fn simple(opcode: u8) -> Self {
        Self::Plain(RawInstruction::Simple { opcode })
    }

    /// `aconst_null`
    #[must_use]
    pub const fn aconst_null() -> Self {
        Self::simple(opcodes::ACONST_NULL)
    }

    /// Loads a reference from the local variable at `index`, using the shortest encoding.
    #[must_use]
    pub fn aload(index: u16) -> Self {
        match u8::try_from(index) {
            Ok(short @ 0..=3) => Self::simple(opcodes::ALOAD_0 + short),
            Ok(operand) => Self::Plain(RawInstruction::Byte {
                opcode: opcodes::ALOAD,
                operand,
            }),
            Err(_) => Self::Plain(RawInstruction::Wide(RawWideInstruction::Local {
                opcode: opcodes::ALOAD,
                index,
            })),
        }
    }

    /// `getstatic`
    #[must_use]
    pub const fn get_static(field: FieldRef) -> Self {
        Self::Field {
            op: FieldOp::GetStatic,
            field,
        }
    }

    /// `putstatic`
    #[must_use]
    pub const fn put_static(field: FieldRef) -> Self {
        Self::Field {
            op: FieldOp::PutStatic,
            field,
        }
    }

    /// `getfield`
    #[must_use]
    pub const fn get_field(field: FieldRef) -> Self {
        Self::Field {
            op: FieldOp::GetField,
            field,
        }
    }

    /// `putfield`
    #[must_use]
    pub const fn put_field(field: FieldRef) -> Self {
        Self::Field {
            op: FieldOp::PutField,
            field,
        }
    }

    /// `invokestatic` on a class method.
    #[must_use]
    pub const fn invoke_static(method: MethodRef) -> Self {
        Self::Invoke {
            kind: InvokeKind::Static,
            method,
            is_interface: false,
        }
    }

    /// `invokespecial` on a class method.
    #[must_use]
    pub const fn invoke_special(method: MethodRef) -> Self {
        Self::Invoke {
            kind: InvokeKind::Special,
            method,
            is_interface: false,
        }
    }

    /// `invokevirtual`
    #[must_use]
    pub const fn invoke_virtual(method: MethodRef) -> Self {
        Self::Invoke {
            kind: InvokeKind::Virtual,
            method,
            is_interface: false,
        }
    }

    /// Gets the opcode the instruction is encoded with.
    #[must_use]
    pub fn opcode(&self) -> u8 {
        match self {
            Self::Plain(raw) => raw.opcode(),
            Self::Field { op, .. } => op.opcode(),
            Self::Invoke { kind, .. } => kind.opcode(),
            Self::Jump { opcode, .. } => *opcode,
            Self::TableSwitch { .. } => opcodes::TABLESWITCH,
            Self::LookupSwitch { .. } => opcodes::LOOKUPSWITCH,
        }
    }

    /// Checks whether the instruction is `return`.
    #[must_use]
    pub fn is_void_return(&self) -> bool {
        matches!(self, Self::Plain(RawInstruction::Simple { opcode }) if *opcode == opcodes::RETURN)
    }

    /// Checks whether the instruction is `areturn`.
    #[must_use]
    pub fn is_reference_return(&self) -> bool {
        matches!(self, Self::Plain(RawInstruction::Simple { opcode }) if *opcode == opcodes::ARETURN)
    }

    /// Gets the invoked method if the instruction is an invocation.
    #[must_use]
    pub fn invocation(&self) -> Option<(InvokeKind, &MethodRef)> {
        match self {
            Self::Invoke { kind, method, .. } => Some((*kind, method)),
            _ => None,
        }
    }

    /// Gets the accessed field if the instruction is a field access.
    #[must_use]
    pub fn field_access(&self) -> Option<(FieldOp, &FieldRef)> {
        match self {
            Self::Field { op, field } => Some((*op, field)),
            _ => None,
        }
    }

    /// Gets the labels the instruction may transfer control to.
    #[must_use]
    pub fn targets(&self) -> Vec<Label> {
        match self {
            Self::Jump { target, .. } => vec![*target],
            Self::TableSwitch {
                default, targets, ..
            } => std::iter::once(*default)
                .chain(targets.iter().copied())
                .collect(),
            Self::LookupSwitch { default, pairs } => std::iter::once(*default)
                .chain(pairs.iter().map(|(_, label)| *label))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Gets the net change of the operand stack depth, in slots, caused by the instruction.
    ///
    /// Returns `None` for instructions whose effect is not tracked, i.e., those that never appear
    /// in injected code.
    #[must_use]
    pub fn stack_delta(&self) -> Option<i32> {
        match self {
            Self::Plain(raw) => raw_stack_delta(raw),
            Self::Field { op, field } => {
                let size = i32::from(field.field_type.slot_size());
                Some(match op {
                    FieldOp::GetStatic => size,
                    FieldOp::PutStatic => -size,
                    FieldOp::GetField => size - 1,
                    FieldOp::PutField => -size - 1,
                })
            }
            Self::Invoke { kind, method, .. } => {
                let args = i32::from(method.descriptor.argument_slots());
                let receiver = i32::from(*kind != InvokeKind::Static);
                let ret = match &method.descriptor.return_type {
                    ReturnType::Some(t) => i32::from(t.slot_size()),
                    ReturnType::Void => 0,
                };
                Some(ret - args - receiver)
            }
            Self::Jump { .. } | Self::TableSwitch { .. } | Self::LookupSwitch { .. } => None,
        }
    }
}

fn raw_stack_delta(raw: &RawInstruction) -> Option<i32> {
    match raw {
        RawInstruction::Simple { opcode } => match *opcode {
            opcodes::NOP => Some(0),
            opcodes::ACONST_NULL..=opcodes::ICONST_5
            | opcodes::FCONST_0..=opcodes::FCONST_2
            | opcodes::ILOAD_0..=opcodes::ILOAD_3
            | opcodes::FLOAD_0..=opcodes::FLOAD_3
            | opcodes::ALOAD_0..=opcodes::ALOAD_3
            | opcodes::DUP => Some(1),
            opcodes::LCONST_0..=opcodes::LCONST_1
            | opcodes::DCONST_0..=opcodes::DCONST_1
            | opcodes::LLOAD_0..=opcodes::LLOAD_3
            | opcodes::DLOAD_0..=opcodes::DLOAD_3 => Some(2),
            opcodes::POP | opcodes::ARETURN => Some(-1),
            opcodes::POP2 => Some(-2),
            opcodes::RETURN => Some(0),
            _ => None,
        },
        RawInstruction::Byte { opcode, .. } => match *opcode {
            opcodes::BIPUSH | opcodes::LDC | opcodes::ILOAD | opcodes::FLOAD | opcodes::ALOAD => {
                Some(1)
            }
            opcodes::LLOAD | opcodes::DLOAD => Some(2),
            _ => None,
        },
        RawInstruction::Short { opcode, .. } => match *opcode {
            opcodes::SIPUSH | opcodes::LDC_W | opcodes::NEW => Some(1),
            opcodes::LDC2_W => Some(2),
            opcodes::CHECKCAST => Some(0),
            _ => None,
        },
        RawInstruction::Wide(RawWideInstruction::Local { opcode, .. }) => match *opcode {
            opcodes::ILOAD | opcodes::FLOAD | opcodes::ALOAD => Some(1),
            opcodes::LLOAD | opcodes::DLOAD => Some(2),
            _ => None,
        },
        _ => None,
    }
}

/// Computes how far above its starting depth the operand stack grows while `insns` run in
/// sequence. Instructions with untracked effects count as neutral.
#[must_use]
pub fn peak_stack_growth<'a, I>(insns: I) -> u16
where
    I: IntoIterator<Item = &'a Instruction>,
{
    let (_, peak) = insns.into_iter().fold((0i32, 0i32), |(depth, peak), insn| {
        let depth = depth + insn.stack_delta().unwrap_or(0);
        (depth, peak.max(depth))
    });
    u16::try_from(peak).unwrap_or(u16::MAX)
}
