use std::io::{Read, Write};

use super::{GenerationError, ParseError, reader_utils::BytecodeReader, write_length};
use crate::jvm::code::{FrameKind, Label, ProgramCounter, StackMapFrame, VerificationType};

const SAME_MAX: u8 = 63;
const SAME_LOCALS_1_STACK_ITEM_MIN: u8 = 64;
const SAME_LOCALS_1_STACK_ITEM_MAX: u8 = 127;
const SAME_LOCALS_1_STACK_ITEM_EXTENDED: u8 = 247;
const CHOP_MIN: u8 = 248;
const CHOP_MAX: u8 = 250;
const SAME_FRAME_EXTENDED: u8 = 251;
const APPEND_MIN: u8 = 252;
const APPEND_MAX: u8 = 254;
const FULL_FRAME: u8 = 255;

/// Decodes the content of a `StackMapTable` attribute.
///
/// `resolve` maps an offset in the code to the label of the instruction there.
pub(super) fn decode_stack_map<F>(info: &[u8], resolve: F) -> Result<Vec<StackMapFrame>, ParseError>
where
    F: Fn(u16) -> Result<Label, ParseError>,
{
    let mut reader = info;
    let count: u16 = reader.decode_value()?;
    let mut frames = Vec::with_capacity(usize::from(count));
    let mut previous_pc: Option<u16> = None;
    for _ in 0..count {
        let frame_type: u8 = reader.decode_value()?;
        let (offset_delta, kind) = match frame_type {
            0..=SAME_MAX => (u16::from(frame_type), FrameKind::Same),
            SAME_LOCALS_1_STACK_ITEM_MIN..=SAME_LOCALS_1_STACK_ITEM_MAX => {
                let item = read_verification_type(&mut reader, &resolve)?;
                (
                    u16::from(frame_type - SAME_LOCALS_1_STACK_ITEM_MIN),
                    FrameKind::SameLocals1StackItem(item),
                )
            }
            SAME_LOCALS_1_STACK_ITEM_EXTENDED => {
                let delta = reader.decode_value()?;
                let item = read_verification_type(&mut reader, &resolve)?;
                (delta, FrameKind::SameLocals1StackItem(item))
            }
            CHOP_MIN..=CHOP_MAX => (
                reader.decode_value()?,
                FrameKind::Chop(SAME_FRAME_EXTENDED - frame_type),
            ),
            SAME_FRAME_EXTENDED => (reader.decode_value()?, FrameKind::Same),
            APPEND_MIN..=APPEND_MAX => {
                let delta = reader.decode_value()?;
                let locals = (0..frame_type - SAME_FRAME_EXTENDED)
                    .map(|_| read_verification_type(&mut reader, &resolve))
                    .collect::<Result<_, _>>()?;
                (delta, FrameKind::Append(locals))
            }
            FULL_FRAME => {
                let delta = reader.decode_value()?;
                let num_locals: u16 = reader.decode_value()?;
                let locals = (0..num_locals)
                    .map(|_| read_verification_type(&mut reader, &resolve))
                    .collect::<Result<_, _>>()?;
                let num_stack: u16 = reader.decode_value()?;
                let stack = (0..num_stack)
                    .map(|_| read_verification_type(&mut reader, &resolve))
                    .collect::<Result<_, _>>()?;
                (delta, FrameKind::Full { locals, stack })
            }
            reserved => Err(ParseError::malform(format!(
                "Reserved stack map frame type {reserved}"
            )))?,
        };
        let pc = match previous_pc {
            None => Some(offset_delta),
            Some(prev) => prev
                .checked_add(offset_delta)
                .and_then(|it| it.checked_add(1)),
        }
        .ok_or_else(|| ParseError::malform("Stack map frame offset overflows"))?;
        previous_pc = Some(pc);
        frames.push(StackMapFrame {
            target: resolve(pc)?,
            kind,
        });
    }
    if !reader.is_empty() {
        return Err(ParseError::malform("Trailing bytes in StackMapTable"));
    }
    Ok(frames)
}

fn read_verification_type<R, F>(reader: &mut R, resolve: &F) -> Result<VerificationType, ParseError>
where
    R: Read + ?Sized,
    F: Fn(u16) -> Result<Label, ParseError>,
{
    let tag: u8 = reader.decode_value()?;
    let vtype = match tag {
        0 => VerificationType::Top,
        1 => VerificationType::Integer,
        2 => VerificationType::Float,
        3 => VerificationType::Double,
        4 => VerificationType::Long,
        5 => VerificationType::Null,
        6 => VerificationType::UninitializedThis,
        7 => VerificationType::Object(reader.decode_value()?),
        8 => VerificationType::Uninitialized(resolve(reader.decode_value()?)?),
        unexpected => Err(ParseError::malform(format!(
            "Invalid verification type tag {unexpected}"
        )))?,
    };
    Ok(vtype)
}

/// Encodes frames into the content of a `StackMapTable` attribute, using the most compact form
/// for each frame.
///
/// `pc_of` maps a label to the offset it ended up at.
pub(super) fn encode_stack_map<F>(
    frames: &[StackMapFrame],
    pc_of: F,
) -> Result<Vec<u8>, GenerationError>
where
    F: Fn(Label) -> Result<ProgramCounter, GenerationError>,
{
    let mut buf = Vec::new();
    write_length::<u16>(&mut buf, frames.len())?;
    let mut previous_pc: Option<u16> = None;
    for frame in frames {
        let pc = u16::from(pc_of(frame.target)?);
        let delta = match previous_pc {
            None => Some(pc),
            Some(prev) => pc.checked_sub(prev).and_then(|it| it.checked_sub(1)),
        }
        .ok_or_else(|| {
            GenerationError::other(format!(
                "Stack map frame at {} is not after the previous one",
                ProgramCounter::from(pc)
            ))
        })?;
        previous_pc = Some(pc);
        write_frame(&mut buf, &frame.kind, delta, &pc_of)?;
    }
    Ok(buf)
}

fn write_frame<W, F>(
    writer: &mut W,
    kind: &FrameKind,
    delta: u16,
    pc_of: &F,
) -> Result<(), GenerationError>
where
    W: Write + ?Sized,
    F: Fn(Label) -> Result<ProgramCounter, GenerationError>,
{
    let compact = u8::try_from(delta).ok().filter(|it| *it <= SAME_MAX);
    match kind {
        FrameKind::Same => match compact {
            Some(frame_type) => writer.write_all(&[frame_type])?,
            None => {
                writer.write_all(&[SAME_FRAME_EXTENDED])?;
                writer.write_all(&delta.to_be_bytes())?;
            }
        },
        FrameKind::SameLocals1StackItem(item) => {
            match compact {
                Some(it) => writer.write_all(&[SAME_LOCALS_1_STACK_ITEM_MIN + it])?,
                None => {
                    writer.write_all(&[SAME_LOCALS_1_STACK_ITEM_EXTENDED])?;
                    writer.write_all(&delta.to_be_bytes())?;
                }
            }
            write_verification_type(writer, item, pc_of)?;
        }
        FrameKind::Chop(k) => {
            if !(1..=3).contains(k) {
                return Err(GenerationError::other(format!("Cannot chop {k} locals")));
            }
            writer.write_all(&[SAME_FRAME_EXTENDED - k])?;
            writer.write_all(&delta.to_be_bytes())?;
        }
        FrameKind::Append(locals) => {
            let k = u8::try_from(locals.len())
                .ok()
                .filter(|it| (1..=3).contains(it))
                .ok_or_else(|| {
                    GenerationError::other(format!("Cannot append {} locals", locals.len()))
                })?;
            writer.write_all(&[SAME_FRAME_EXTENDED + k])?;
            writer.write_all(&delta.to_be_bytes())?;
            for local in locals {
                write_verification_type(writer, local, pc_of)?;
            }
        }
        FrameKind::Full { locals, stack } => {
            writer.write_all(&[FULL_FRAME])?;
            writer.write_all(&delta.to_be_bytes())?;
            write_length::<u16>(writer, locals.len())?;
            for local in locals {
                write_verification_type(writer, local, pc_of)?;
            }
            write_length::<u16>(writer, stack.len())?;
            for item in stack {
                write_verification_type(writer, item, pc_of)?;
            }
        }
    }
    Ok(())
}

fn write_verification_type<W, F>(
    writer: &mut W,
    vtype: &VerificationType,
    pc_of: &F,
) -> Result<(), GenerationError>
where
    W: Write + ?Sized,
    F: Fn(Label) -> Result<ProgramCounter, GenerationError>,
{
    match vtype {
        VerificationType::Top => writer.write_all(&[0])?,
        VerificationType::Integer => writer.write_all(&[1])?,
        VerificationType::Float => writer.write_all(&[2])?,
        VerificationType::Double => writer.write_all(&[3])?,
        VerificationType::Long => writer.write_all(&[4])?,
        VerificationType::Null => writer.write_all(&[5])?,
        VerificationType::UninitializedThis => writer.write_all(&[6])?,
        VerificationType::Object(index) => {
            writer.write_all(&[7])?;
            writer.write_all(&index.to_be_bytes())?;
        }
        VerificationType::Uninitialized(label) => {
            writer.write_all(&[8])?;
            writer.write_all(&u16::from(pc_of(*label)?).to_be_bytes())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(pc: u16) -> Result<Label, ParseError> {
        Ok(Label::at(pc.into()))
    }

    fn original(label: Label) -> Result<ProgramCounter, GenerationError> {
        label
            .original_pc()
            .ok_or_else(|| GenerationError::other("synthetic label"))
    }

    #[test]
    fn decode_offsets_accumulate() {
        let info = [
            0u8, 3, // three frames
            5, // same at 5
            64 + 2, 1, // same_locals_1_stack_item at 8, int
            251, 0, 100, // same_frame_extended at 109
        ];
        let frames = decode_stack_map(&info, identity).unwrap();
        let pcs: Vec<_> = frames
            .iter()
            .map(|it| u16::from(it.target.original_pc().unwrap()))
            .collect();
        assert_eq!(pcs, vec![5, 8, 109]);
        assert_eq!(
            frames[1].kind,
            FrameKind::SameLocals1StackItem(VerificationType::Integer)
        );
        assert_eq!(frames[2].kind, FrameKind::Same);
    }

    #[test]
    fn encoding_picks_compact_forms() {
        let frames = vec![
            StackMapFrame {
                target: Label::at(5.into()),
                kind: FrameKind::Same,
            },
            StackMapFrame {
                target: Label::at(200.into()),
                kind: FrameKind::Same,
            },
            StackMapFrame {
                target: Label::at(202.into()),
                kind: FrameKind::Append(vec![VerificationType::Object(3)]),
            },
        ];
        let bytes = encode_stack_map(&frames, original).unwrap();
        assert_eq!(
            bytes,
            vec![0, 3, 5, SAME_FRAME_EXTENDED, 0, 194, SAME_FRAME_EXTENDED + 1, 0, 1, 7, 0, 3]
        );
        assert_eq!(decode_stack_map(&bytes, identity).unwrap(), frames);
    }

    #[test]
    fn full_frame_with_uninitialized() {
        let frames = vec![StackMapFrame {
            target: Label::at(12.into()),
            kind: FrameKind::Full {
                locals: vec![VerificationType::UninitializedThis, VerificationType::Long],
                stack: vec![VerificationType::Uninitialized(Label::at(4.into()))],
            },
        }];
        let bytes = encode_stack_map(&frames, original).unwrap();
        assert_eq!(decode_stack_map(&bytes, identity).unwrap(), frames);
    }

    #[test]
    fn frames_out_of_order() {
        let frames = vec![
            StackMapFrame {
                target: Label::at(8.into()),
                kind: FrameKind::Same,
            },
            StackMapFrame {
                target: Label::at(8.into()),
                kind: FrameKind::Same,
            },
        ];
        assert!(encode_stack_map(&frames, original).is_err());
    }

    #[test]
    fn reserved_frame_type() {
        let info = [0u8, 1, 128];
        assert!(decode_stack_map(&info, identity).is_err());
    }
}
