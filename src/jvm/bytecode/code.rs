use std::collections::{BTreeSet, HashMap};

use super::{
    GenerationError, ParseError, ParsingContext, ParsingErrorContext,
    reader_utils::{BytecodeReader, PositionTracker, read_byte_chunk},
    stack_map::{decode_stack_map, encode_stack_map},
    write_length,
};
use crate::{
    jvm::{
        RawAttribute,
        class::ConstantPool,
        code::{
            ExceptionTableEntry, FieldOp, Instruction, InstructionList, InvokeKind, Label,
            LineNumber, LocalVariable, MethodBody, Node, ProgramCounter, RawInstruction,
            opcodes,
        },
    },
    macros::fill_once,
};

const LINE_NUMBER_TABLE: &str = "LineNumberTable";
const LOCAL_VARIABLE_TABLE: &str = "LocalVariableTable";
const LOCAL_VARIABLE_TYPE_TABLE: &str = "LocalVariableTypeTable";
const STACK_MAP_TABLE: &str = "StackMapTable";

/// Decodes the content of a `Code` attribute.
pub(super) fn decode_code(info: &[u8], ctx: &ParsingContext<'_>) -> Result<MethodBody, ParseError> {
    let mut reader = info;
    let max_stack = reader.decode_value()?;
    let max_locals = reader.decode_value()?;
    let code_length: u32 = reader.decode_value()?;
    let code_length = u16::try_from(code_length)
        .ok()
        .filter(|it| *it > 0)
        .with_context(|()| format!("Invalid code length {code_length}"))?;
    let code = read_byte_chunk(&mut reader, usize::from(code_length))?;
    let raw_insns = RawInstruction::read_all(&code)?;

    let boundaries: BTreeSet<u16> = raw_insns
        .iter()
        .map(|(pc, _)| u16::from(*pc))
        .chain(std::iter::once(code_length))
        .collect();
    let resolve = |pc: u16| -> Result<Label, ParseError> {
        if boundaries.contains(&pc) {
            Ok(Label::at(pc.into()))
        } else {
            Err(ParseError::malform(format!(
                "Offset {} in {} is not an instruction boundary",
                ProgramCounter::from(pc),
                ctx.current_class_binary_name
            )))
        }
    };

    let mut nodes = Vec::with_capacity(raw_insns.len() * 2 + 1);
    for (pc, raw) in raw_insns {
        nodes.push(Node::Label(Label::at(pc)));
        nodes.push(Node::Instruction(lift(pc, raw, ctx, &resolve)?));
    }
    nodes.push(Node::Label(Label::at(code_length.into())));
    let instructions: InstructionList = nodes.into_iter().collect();

    let exception_table_len: u16 = reader.decode_value()?;
    let exception_table = (0..exception_table_len)
        .map(|_| {
            Ok(ExceptionTableEntry {
                start: resolve(reader.decode_value()?)?,
                end: resolve(reader.decode_value()?)?,
                handler: resolve(reader.decode_value()?)?,
                catch_type: reader.decode_value()?,
            })
        })
        .collect::<Result<_, ParseError>>()?;

    let mut body = MethodBody::new(max_stack, max_locals, instructions);
    body.exception_table = exception_table;
    let mut stack_map_frames = None;

    let attributes_count: u16 = reader.decode_value()?;
    for _ in 0..attributes_count {
        let name_index: u16 = reader.decode_value()?;
        let length: u32 = reader.decode_value()?;
        let length = usize::try_from(length).context("Attribute is too long")?;
        let info = read_byte_chunk(&mut reader, length)?;
        let name = ctx
            .constant_pool
            .get_str(name_index)
            .context("Invalid attribute name")?;
        match name {
            LINE_NUMBER_TABLE => {
                let mut table = info.as_slice();
                let count: u16 = table.decode_value()?;
                for _ in 0..count {
                    body.line_numbers.push(LineNumber {
                        start: resolve(table.decode_value()?)?,
                        line_number: table.decode_value()?,
                    });
                }
            }
            LOCAL_VARIABLE_TABLE => {
                body.local_variables
                    .extend(decode_local_variables(&info, &resolve)?);
            }
            LOCAL_VARIABLE_TYPE_TABLE => {
                body.local_variable_types
                    .extend(decode_local_variables(&info, &resolve)?);
            }
            STACK_MAP_TABLE => {
                let frames = decode_stack_map(&info, &resolve)?;
                fill_once!(stack_map_frames, frames, "StackMapTable");
            }
            _ => body.free_attributes.push(RawAttribute { name_index, info }),
        }
    }
    if !reader.is_empty() {
        return Err(ParseError::malform("Trailing bytes in Code attribute"));
    }
    body.stack_map_frames = stack_map_frames;
    Ok(body)
}

fn lift<F>(
    pc: ProgramCounter,
    raw: RawInstruction,
    ctx: &ParsingContext<'_>,
    resolve: &F,
) -> Result<Instruction, ParseError>
where
    F: Fn(u16) -> Result<Label, ParseError>,
{
    let jump_target = |offset: i32| -> Result<Label, ParseError> {
        let target = pc.offset(offset).context("Invalid jump offset")?;
        resolve(target.into())
    };
    let insn = match raw {
        RawInstruction::Short {
            opcode: opcode @ opcodes::GETSTATIC..=opcodes::PUTFIELD,
            operand,
        } => Instruction::Field {
            op: FieldOp::from_opcode(opcode).context("Unknown field access")?,
            field: ctx
                .constant_pool
                .get_field_ref(operand)
                .with_context(|err| format!("Invalid field reference at {pc}: {err}"))?,
        },
        RawInstruction::Short {
            opcode: opcode @ opcodes::INVOKEVIRTUAL..=opcodes::INVOKESTATIC,
            operand,
        } => {
            let (method, is_interface) = ctx
                .constant_pool
                .get_method_ref(operand)
                .with_context(|err| format!("Invalid method reference at {pc}: {err}"))?;
            Instruction::Invoke {
                kind: InvokeKind::from_opcode(opcode).context("Unknown invocation")?,
                method,
                is_interface,
            }
        }
        RawInstruction::InvokeInterface { index, .. } => {
            let (method, _) = ctx
                .constant_pool
                .get_method_ref(index)
                .with_context(|err| format!("Invalid method reference at {pc}: {err}"))?;
            Instruction::Invoke {
                kind: InvokeKind::Interface,
                method,
                is_interface: true,
            }
        }
        RawInstruction::Branch { opcode, offset } => Instruction::Jump {
            opcode,
            target: jump_target(i32::from(offset))?,
        },
        RawInstruction::BranchWide { opcode, offset } => Instruction::Jump {
            opcode,
            target: jump_target(offset)?,
        },
        RawInstruction::TableSwitch {
            default,
            low,
            jump_offsets,
            ..
        } => Instruction::TableSwitch {
            default: jump_target(default)?,
            low,
            targets: jump_offsets
                .into_iter()
                .map(jump_target)
                .collect::<Result<_, _>>()?,
        },
        RawInstruction::LookupSwitch {
            default,
            match_offsets,
        } => Instruction::LookupSwitch {
            default: jump_target(default)?,
            pairs: match_offsets
                .into_iter()
                .map(|(key, offset)| Ok((key, jump_target(offset)?)))
                .collect::<Result<_, ParseError>>()?,
        },
        other => Instruction::Plain(other),
    };
    Ok(insn)
}

fn decode_local_variables<F>(info: &[u8], resolve: &F) -> Result<Vec<LocalVariable>, ParseError>
where
    F: Fn(u16) -> Result<Label, ParseError>,
{
    let mut reader = info;
    let count: u16 = reader.decode_value()?;
    (0..count)
        .map(|_| {
            let start_pc: u16 = reader.decode_value()?;
            let length: u16 = reader.decode_value()?;
            let end_pc = start_pc
                .checked_add(length)
                .context("Local variable range overflows")?;
            Ok(LocalVariable {
                start: resolve(start_pc)?,
                end: resolve(end_pc)?,
                name_index: reader.decode_value()?,
                descriptor_index: reader.decode_value()?,
                index: reader.decode_value()?,
            })
        })
        .collect()
}

/// Encodes a [`MethodBody`] into the content of a `Code` attribute, adding the constants the
/// instructions refer to into `pool`.
pub(super) fn encode_code(
    body: &MethodBody,
    pool: &mut ConstantPool,
) -> Result<Vec<u8>, GenerationError> {
    // Pass 1: lower every instruction with zeroed offsets and lay them out.
    let mut labels: HashMap<Label, ProgramCounter> = HashMap::new();
    let mut lowered: Vec<(ProgramCounter, &Instruction, RawInstruction)> = Vec::new();
    let mut next_pc = 0usize;
    for node in body.instructions.nodes() {
        let pc = ProgramCounter::from(u16::try_from(next_pc)?);
        match node {
            Node::Label(label) => {
                labels.insert(*label, pc);
            }
            Node::Instruction(insn) => {
                let raw = lower(insn, pool)?;
                next_pc += raw.num_bytes(pc);
                lowered.push((pc, insn, raw));
            }
        }
    }
    if next_pc == 0 || u16::try_from(next_pc).is_err() {
        return Err(GenerationError::other(format!(
            "Invalid code length {next_pc}"
        )));
    }
    let pc_of = |label: Label| -> Result<ProgramCounter, GenerationError> {
        labels
            .get(&label)
            .copied()
            .ok_or_else(|| GenerationError::other(format!("Label {label} is not placed")))
    };

    // Pass 2: patch the offsets now that every label has a position.
    let mut code = Vec::with_capacity(next_pc);
    let mut writer = PositionTracker::new(&mut code);
    for (pc, insn, raw) in lowered {
        let raw = relocate(pc, insn, raw, &pc_of)?;
        raw.write_one(&mut writer)?;
    }

    let layout_preserved = labels
        .iter()
        .all(|(label, pc)| label.original_pc() == Some(*pc));

    let mut buf = Vec::new();
    buf.extend_from_slice(&body.max_stack.to_be_bytes());
    buf.extend_from_slice(&body.max_locals.to_be_bytes());
    write_length::<u32>(&mut buf, code.len())?;
    buf.extend_from_slice(&code);

    write_length::<u16>(&mut buf, body.exception_table.len())?;
    for entry in &body.exception_table {
        for label in [entry.start, entry.end, entry.handler] {
            buf.extend_from_slice(&u16::from(pc_of(label)?).to_be_bytes());
        }
        buf.extend_from_slice(&entry.catch_type.to_be_bytes());
    }

    let mut attributes = Vec::new();
    if !body.line_numbers.is_empty() {
        let mut info = Vec::new();
        write_length::<u16>(&mut info, body.line_numbers.len())?;
        for line in &body.line_numbers {
            info.extend_from_slice(&u16::from(pc_of(line.start)?).to_be_bytes());
            info.extend_from_slice(&line.line_number.to_be_bytes());
        }
        attributes.push((pool.put_str(LINE_NUMBER_TABLE)?, info));
    }
    if !body.local_variables.is_empty() {
        let info = encode_local_variables(&body.local_variables, &pc_of)?;
        attributes.push((pool.put_str(LOCAL_VARIABLE_TABLE)?, info));
    }
    if !body.local_variable_types.is_empty() {
        let info = encode_local_variables(&body.local_variable_types, &pc_of)?;
        attributes.push((pool.put_str(LOCAL_VARIABLE_TYPE_TABLE)?, info));
    }
    if let Some(frames) = &body.stack_map_frames {
        let info = encode_stack_map(frames, pc_of)?;
        attributes.push((pool.put_str(STACK_MAP_TABLE)?, info));
    }
    if layout_preserved {
        attributes.extend(
            body.free_attributes
                .iter()
                .map(|it| (it.name_index, it.info.clone())),
        );
    } else if !body.free_attributes.is_empty() {
        tracing::warn!(
            count = body.free_attributes.len(),
            "Dropping code attributes that refer to offsets of the modified code"
        );
    }

    write_length::<u16>(&mut buf, attributes.len())?;
    for (name_index, info) in attributes {
        buf.extend_from_slice(&name_index.to_be_bytes());
        write_length::<u32>(&mut buf, info.len())?;
        buf.extend_from_slice(&info);
    }
    Ok(buf)
}

fn lower(insn: &Instruction, pool: &mut ConstantPool) -> Result<RawInstruction, GenerationError> {
    let raw = match insn {
        Instruction::Plain(raw) => raw.clone(),
        Instruction::Field { op, field } => RawInstruction::Short {
            opcode: op.opcode(),
            operand: pool.put_field_ref(field)?,
        },
        Instruction::Invoke {
            kind: InvokeKind::Interface,
            method,
            ..
        } => RawInstruction::InvokeInterface {
            index: pool.put_method_ref(method, true)?,
            count: u8::try_from(method.descriptor.argument_slots() + 1)?,
        },
        Instruction::Invoke {
            kind,
            method,
            is_interface,
        } => RawInstruction::Short {
            opcode: kind.opcode(),
            operand: pool.put_method_ref(method, *is_interface)?,
        },
        &Instruction::Jump {
            opcode: opcode @ (opcodes::GOTO_W | opcodes::JSR_W),
            ..
        } => RawInstruction::BranchWide { opcode, offset: 0 },
        &Instruction::Jump { opcode, .. } => RawInstruction::Branch { opcode, offset: 0 },
        Instruction::TableSwitch { low, targets, .. } => {
            let span = i32::try_from(targets.len())?;
            let high = span
                .checked_sub(1)
                .and_then(|it| low.checked_add(it))
                .ok_or_else(|| GenerationError::other("tableswitch without targets"))?;
            RawInstruction::TableSwitch {
                default: 0,
                low: *low,
                high,
                jump_offsets: vec![0; targets.len()],
            }
        }
        Instruction::LookupSwitch { pairs, .. } => RawInstruction::LookupSwitch {
            default: 0,
            match_offsets: pairs.iter().map(|(key, _)| (*key, 0)).collect(),
        },
    };
    Ok(raw)
}

fn relocate<F>(
    pc: ProgramCounter,
    insn: &Instruction,
    raw: RawInstruction,
    pc_of: &F,
) -> Result<RawInstruction, GenerationError>
where
    F: Fn(Label) -> Result<ProgramCounter, GenerationError>,
{
    let distance = |label: Label| -> Result<i32, GenerationError> {
        Ok(pc.distance_to(pc_of(label)?))
    };
    let raw = match (insn, raw) {
        (Instruction::Jump { target, .. }, RawInstruction::Branch { opcode, .. }) => {
            RawInstruction::Branch {
                opcode,
                offset: pc.distance_to_i16(pc_of(*target)?)?,
            }
        }
        (Instruction::Jump { target, .. }, RawInstruction::BranchWide { opcode, .. }) => {
            RawInstruction::BranchWide {
                opcode,
                offset: distance(*target)?,
            }
        }
        (
            Instruction::TableSwitch {
                default, targets, ..
            },
            RawInstruction::TableSwitch { low, high, .. },
        ) => RawInstruction::TableSwitch {
            default: distance(*default)?,
            low,
            high,
            jump_offsets: targets
                .iter()
                .map(|it| distance(*it))
                .collect::<Result<_, _>>()?,
        },
        (Instruction::LookupSwitch { default, pairs }, RawInstruction::LookupSwitch { .. }) => {
            RawInstruction::LookupSwitch {
                default: distance(*default)?,
                match_offsets: pairs
                    .iter()
                    .map(|(key, label)| Ok((*key, distance(*label)?)))
                    .collect::<Result<_, GenerationError>>()?,
            }
        }
        (_, other) => other,
    };
    Ok(raw)
}

fn encode_local_variables<F>(
    variables: &[LocalVariable],
    pc_of: &F,
) -> Result<Vec<u8>, GenerationError>
where
    F: Fn(Label) -> Result<ProgramCounter, GenerationError>,
{
    let mut info = Vec::new();
    write_length::<u16>(&mut info, variables.len())?;
    for variable in variables {
        let start = pc_of(variable.start)?;
        let end = pc_of(variable.end)?;
        let length = u16::try_from(start.distance_to(end))?;
        info.extend_from_slice(&u16::from(start).to_be_bytes());
        info.extend_from_slice(&length.to_be_bytes());
        info.extend_from_slice(&variable.name_index.to_be_bytes());
        info.extend_from_slice(&variable.descriptor_index.to_be_bytes());
        info.extend_from_slice(&variable.index.to_be_bytes());
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        jvm::{code::FrameKind, references::MethodRef},
        tests::hook_method,
    };

    fn context(pool: &ConstantPool) -> ParsingContext<'_> {
        ParsingContext {
            constant_pool: pool,
            current_class_binary_name: "com/example/Game",
        }
    }

    fn code_attribute(code: &[u8], attributes: &[(u16, Vec<u8>)]) -> Vec<u8> {
        let mut buf = vec![0, 2, 0, 1];
        buf.extend_from_slice(&u32::try_from(code.len()).unwrap().to_be_bytes());
        buf.extend_from_slice(code);
        buf.extend_from_slice(&[0, 0]);
        buf.extend_from_slice(&u16::try_from(attributes.len()).unwrap().to_be_bytes());
        for (name_index, info) in attributes {
            buf.extend_from_slice(&name_index.to_be_bytes());
            buf.extend_from_slice(&u32::try_from(info.len()).unwrap().to_be_bytes());
            buf.extend_from_slice(info);
        }
        buf
    }

    #[test]
    fn unmodified_code_round_trips() {
        let mut pool = ConstantPool::new();
        let method_index = pool.put_method_ref(&hook_method(), false).unwrap();
        let custom = pool.put_str("CustomTable").unwrap();
        let line_numbers = pool.put_str(LINE_NUMBER_TABLE).unwrap();
        let [hi, lo] = method_index.to_be_bytes();
        let code = [
            opcodes::ALOAD_1,
            opcodes::ALOAD_0,
            opcodes::INVOKESTATIC,
            hi,
            lo,
            opcodes::IFNULL,
            0,
            3,
            opcodes::RETURN,
        ];
        let info = code_attribute(
            &code,
            &[
                (line_numbers, vec![0, 1, 0, 0, 0, 7]),
                (custom, vec![1, 2, 3]),
            ],
        );
        let body = decode_code(&info, &context(&pool)).unwrap();
        assert!(matches!(
            body.instructions.get(2),
            Some(Instruction::Invoke {
                kind: InvokeKind::Static,
                ..
            })
        ));
        assert_eq!(
            body.instructions.get(3).unwrap().targets(),
            vec![Label::at(8.into())]
        );
        let encoded = encode_code(&body, &mut pool).unwrap();
        assert_eq!(encoded, info);
    }

    #[test]
    fn insertion_relocates_branches_and_drops_free_attributes() {
        let mut pool = ConstantPool::new();
        let custom = pool.put_str("CustomTable").unwrap();
        let code = [opcodes::ALOAD_0, opcodes::IFNULL, 0, 3, opcodes::RETURN];
        let info = code_attribute(&code, &[(custom, vec![9])]);
        let mut body = decode_code(&info, &context(&pool)).unwrap();
        body.insert_before(2, vec![Instruction::aconst_null(), Instruction::simple(opcodes::POP)])
            .unwrap();
        let encoded = encode_code(&body, &mut pool).unwrap();
        let reparsed = decode_code(&encoded, &context(&pool)).unwrap();
        assert_eq!(reparsed.instructions.len(), 5);
        // the branch now lands on the inserted code in front of `return`
        assert_eq!(
            reparsed.instructions.get(1).unwrap().targets(),
            vec![Label::at(4.into())]
        );
        assert!(reparsed.free_attributes.is_empty());
    }

    #[test]
    fn stack_map_follows_inserted_code() {
        let mut pool = ConstantPool::new();
        let table = pool.put_str(STACK_MAP_TABLE).unwrap();
        let code = [opcodes::ALOAD_0, opcodes::IFNULL, 0, 4, opcodes::NOP, opcodes::RETURN];
        // one `same` frame at offset 5
        let info = code_attribute(&code, &[(table, vec![0, 1, 5])]);
        let mut body = decode_code(&info, &context(&pool)).unwrap();
        let target = body.stack_map_frames.as_ref().unwrap()[0].target;
        assert_eq!(target, Label::at(5.into()));
        body.insert_before(2, vec![Instruction::aconst_null(), Instruction::simple(opcodes::POP)])
            .unwrap();
        let encoded = encode_code(&body, &mut pool).unwrap();
        let reparsed = decode_code(&encoded, &context(&pool)).unwrap();
        let frames = reparsed.stack_map_frames.unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].target, Label::at(7.into()));
        assert_eq!(frames[0].kind, FrameKind::Same);
    }

    #[test]
    fn interface_invocation_recomputes_count() {
        let mut pool = ConstantPool::new();
        let method = MethodRef {
            owner: crate::jvm::references::ClassRef::new("java/util/Map"),
            name: "put".to_owned(),
            descriptor: "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;"
                .parse()
                .unwrap(),
        };
        let list: InstructionList = [
            Instruction::Invoke {
                kind: InvokeKind::Interface,
                method,
                is_interface: true,
            },
            Instruction::simple(opcodes::RETURN),
        ]
        .into_iter()
        .collect();
        let body = MethodBody::new(3, 1, list);
        let encoded = encode_code(&body, &mut pool).unwrap();
        // max_stack, max_locals, code_length, then the instruction
        assert_eq!(encoded[8], opcodes::INVOKEINTERFACE);
        assert_eq!(encoded[11], 3);
        assert_eq!(encoded[12], 0);
    }

    #[test]
    fn jump_into_operand_is_malformed() {
        let pool = ConstantPool::new();
        let code = [opcodes::GOTO, 0, 2, opcodes::SIPUSH, 0, 1, opcodes::RETURN];
        let info = code_attribute(&code, &[]);
        assert!(decode_code(&info, &context(&pool)).is_err());
    }

    #[test]
    fn wide_jump_past_the_method_is_malformed() {
        let pool = ConstantPool::new();
        let code = [
            opcodes::NOP,
            opcodes::GOTO_W,
            0x7f,
            0xff,
            0xff,
            0xff,
            opcodes::RETURN,
        ];
        let info = code_attribute(&code, &[]);
        let err = decode_code(&info, &context(&pool)).unwrap_err();
        assert_eq!(err.kind(), super::super::ParsingErrorKind::Malformed);
    }

    #[test]
    fn table_switch_with_huge_offset_is_malformed() {
        let pool = ConstantPool::new();
        // tableswitch at pc 1, padded to 4
        let mut code = vec![opcodes::NOP, opcodes::TABLESWITCH, 0, 0];
        code.extend_from_slice(&i32::MAX.to_be_bytes());
        code.extend_from_slice(&0_i32.to_be_bytes());
        code.extend_from_slice(&0_i32.to_be_bytes());
        code.extend_from_slice(&i32::MAX.to_be_bytes());
        code.push(opcodes::RETURN);
        let info = code_attribute(&code, &[]);
        let err = decode_code(&info, &context(&pool)).unwrap_err();
        assert_eq!(err.kind(), super::super::ParsingErrorKind::Malformed);
    }

    #[test]
    fn branch_out_of_range() {
        let mut pool = ConstantPool::new();
        let mut list = InstructionList::new();
        let far = list.new_label();
        list.push(Instruction::Jump {
            opcode: opcodes::GOTO,
            target: far,
        });
        for _ in 0..40_000 {
            list.push(Instruction::simple(opcodes::NOP));
        }
        list.push_label(far);
        list.push(Instruction::simple(opcodes::RETURN));
        let body = MethodBody::new(0, 0, list);
        let err = encode_code(&body, &mut pool).unwrap_err();
        assert_eq!(err.kind(), super::super::GenerationErrorKind::OutOfRange);
    }
}
