use std::io::{Read, Write};

use super::{
    GenerationError, ParseError,
    reader_utils::{BytecodeReader, PositionTracker},
};
#[allow(clippy::wildcard_imports)]
use crate::jvm::code::{
    ProgramCounter, RawInstruction, RawWideInstruction, opcodes::*, switch_padding,
};

impl RawInstruction {
    /// Decodes all instructions in `code`, paired with their offsets.
    pub(crate) fn read_all(code: &[u8]) -> Result<Vec<(ProgramCounter, Self)>, ParseError> {
        let mut reader = PositionTracker::new(code);
        let mut insns = Vec::new();
        while reader.position() < code.len() {
            let pc = u16::try_from(reader.position())
                .map_err(|_| ParseError::malform("The code is longer than 65535 bytes"))?;
            let pc = ProgramCounter::from(pc);
            let insn = Self::read_one(&mut reader, pc)?;
            insns.push((pc, insn));
        }
        Ok(insns)
    }

    #[allow(clippy::too_many_lines)]
    fn read_one<R>(reader: &mut PositionTracker<R>, pc: ProgramCounter) -> Result<Self, ParseError>
    where
        R: Read,
    {
        let opcode: u8 = reader.decode_value()?;
        let insn = match opcode {
            NOP..=DCONST_1
            | ILOAD_0..=SALOAD
            | ISTORE_0..=LXOR
            | I2L..=DCMPG
            | IRETURN..=RETURN
            | ARRAYLENGTH
            | ATHROW
            | MONITORENTER
            | MONITOREXIT => Self::Simple { opcode },
            BIPUSH | LDC | ILOAD..=ALOAD | ISTORE..=ASTORE | RET | NEWARRAY => Self::Byte {
                opcode,
                operand: reader.decode_value()?,
            },
            SIPUSH
            | LDC_W
            | LDC2_W
            | GETSTATIC..=INVOKESTATIC
            | NEW
            | ANEWARRAY
            | CHECKCAST
            | INSTANCEOF => Self::Short {
                opcode,
                operand: reader.decode_value()?,
            },
            IINC => Self::IInc {
                index: reader.decode_value()?,
                constant: reader.decode_value()?,
            },
            IFEQ..=JSR | IFNULL | IFNONNULL => Self::Branch {
                opcode,
                offset: reader.decode_value()?,
            },
            GOTO_W | JSR_W => Self::BranchWide {
                opcode,
                offset: reader.decode_value()?,
            },
            TABLESWITCH => {
                skip_padding(reader, pc)?;
                let default = reader.decode_value()?;
                let low: i32 = reader.decode_value()?;
                let high: i32 = reader.decode_value()?;
                if high < low {
                    return Err(ParseError::malform(format!(
                        "tableswitch at {pc} has high {high} below low {low}"
                    )));
                }
                let count = usize::try_from(i64::from(high) - i64::from(low) + 1)
                    .map_err(|_| ParseError::malform("tableswitch is too large"))?;
                let jump_offsets = (0..count)
                    .map(|_| reader.decode_value())
                    .collect::<Result<_, _>>()?;
                Self::TableSwitch {
                    default,
                    low,
                    high,
                    jump_offsets,
                }
            }
            LOOKUPSWITCH => {
                skip_padding(reader, pc)?;
                let default = reader.decode_value()?;
                let npairs: i32 = reader.decode_value()?;
                let npairs = usize::try_from(npairs).map_err(|_| {
                    ParseError::malform(format!("lookupswitch at {pc} has {npairs} pairs"))
                })?;
                let match_offsets = (0..npairs)
                    .map(|_| Ok((reader.decode_value()?, reader.decode_value()?)))
                    .collect::<Result<_, ParseError>>()?;
                Self::LookupSwitch {
                    default,
                    match_offsets,
                }
            }
            INVOKEINTERFACE => {
                let index = reader.decode_value()?;
                let count = reader.decode_value()?;
                let _zero: u8 = reader.decode_value()?;
                Self::InvokeInterface { index, count }
            }
            INVOKEDYNAMIC => {
                let index = reader.decode_value()?;
                let _zeros: [u8; 2] = reader.decode_value()?;
                Self::InvokeDynamic { index }
            }
            MULTIANEWARRAY => Self::MultiANewArray {
                index: reader.decode_value()?,
                dimensions: reader.decode_value()?,
            },
            WIDE => {
                let wide_opcode: u8 = reader.decode_value()?;
                let wide = match wide_opcode {
                    ILOAD..=ALOAD | ISTORE..=ASTORE | RET => RawWideInstruction::Local {
                        opcode: wide_opcode,
                        index: reader.decode_value()?,
                    },
                    IINC => RawWideInstruction::IInc {
                        index: reader.decode_value()?,
                        increment: reader.decode_value()?,
                    },
                    unexpected => Err(ParseError::malform(format!(
                        "Invalid opcode {unexpected:#04x} after wide at {pc}"
                    )))?,
                };
                Self::Wide(wide)
            }
            unexpected => Err(ParseError::malform(format!(
                "Invalid opcode {unexpected:#04x} at {pc}"
            )))?,
        };
        Ok(insn)
    }

    /// Encodes the instruction, placing switch padding according to the writer's position.
    pub(crate) fn write_one<W>(&self, writer: &mut PositionTracker<W>) -> Result<(), GenerationError>
    where
        W: Write,
    {
        let pc = ProgramCounter::from(u16::try_from(writer.position())?);
        writer.write_all(&[self.opcode()])?;
        match self {
            Self::Simple { .. } => {}
            Self::Byte { operand, .. } => writer.write_all(&[*operand])?,
            Self::Short { operand, .. } => writer.write_all(&operand.to_be_bytes())?,
            Self::IInc { index, constant } => {
                writer.write_all(&[*index])?;
                writer.write_all(&constant.to_be_bytes())?;
            }
            Self::Branch { offset, .. } => writer.write_all(&offset.to_be_bytes())?,
            Self::BranchWide { offset, .. } => writer.write_all(&offset.to_be_bytes())?,
            Self::TableSwitch {
                default,
                low,
                high,
                jump_offsets,
            } => {
                writer.write_all(&vec![0u8; switch_padding(pc)])?;
                writer.write_all(&default.to_be_bytes())?;
                writer.write_all(&low.to_be_bytes())?;
                writer.write_all(&high.to_be_bytes())?;
                for offset in jump_offsets {
                    writer.write_all(&offset.to_be_bytes())?;
                }
            }
            Self::LookupSwitch {
                default,
                match_offsets,
            } => {
                writer.write_all(&vec![0u8; switch_padding(pc)])?;
                writer.write_all(&default.to_be_bytes())?;
                let npairs = i32::try_from(match_offsets.len())?;
                writer.write_all(&npairs.to_be_bytes())?;
                for (key, offset) in match_offsets {
                    writer.write_all(&key.to_be_bytes())?;
                    writer.write_all(&offset.to_be_bytes())?;
                }
            }
            Self::InvokeInterface { index, count } => {
                writer.write_all(&index.to_be_bytes())?;
                writer.write_all(&[*count, 0])?;
            }
            Self::InvokeDynamic { index } => {
                writer.write_all(&index.to_be_bytes())?;
                writer.write_all(&[0, 0])?;
            }
            Self::MultiANewArray { index, dimensions } => {
                writer.write_all(&index.to_be_bytes())?;
                writer.write_all(&[*dimensions])?;
            }
            Self::Wide(RawWideInstruction::Local { opcode, index }) => {
                writer.write_all(&[*opcode])?;
                writer.write_all(&index.to_be_bytes())?;
            }
            Self::Wide(RawWideInstruction::IInc { index, increment }) => {
                writer.write_all(&[IINC])?;
                writer.write_all(&index.to_be_bytes())?;
                writer.write_all(&increment.to_be_bytes())?;
            }
        }
        Ok(())
    }
}

fn skip_padding<R: Read>(
    reader: &mut PositionTracker<R>,
    pc: ProgramCounter,
) -> Result<(), ParseError> {
    for _ in 0..switch_padding(pc) {
        let _: u8 = reader.decode_value()?;
    }
    Ok(())
}
