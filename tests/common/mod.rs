#![allow(dead_code)]

use entrypatch::{
    entrypoint::{ClassPathLauncher, EnvType},
    jvm::{
        Class, Field, JavaString, Method,
        class::Version,
        class_loader::{ClassLoader, class_paths::MemoryClassPath},
        code::{
            Instruction, InstructionList, InvokeKind, Label, MethodBody, Node, RawInstruction,
            opcodes,
        },
        field, method,
        references::{ClassRef, FieldRef, MethodRef},
    },
    types::field_type::FieldType,
};

pub const FILE: &str = "java/io/File";

pub fn method_ref(owner: &str, name: &str, descriptor: &str) -> MethodRef {
    MethodRef {
        owner: ClassRef::new(owner),
        name: name.to_owned(),
        descriptor: descriptor.parse().unwrap(),
    }
}

pub fn field_ref(owner: &str, name: &str, descriptor: &str) -> FieldRef {
    FieldRef {
        owner: ClassRef::new(owner),
        name: name.to_owned(),
        field_type: descriptor.parse().unwrap(),
    }
}

pub fn new_object(owner: &str, descriptor: &str) -> Instruction {
    Instruction::invoke_special(method_ref(owner, "<init>", descriptor))
}

pub fn call(kind: InvokeKind, owner: &str, name: &str, descriptor: &str) -> Instruction {
    Instruction::Invoke {
        kind,
        method: method_ref(owner, name, descriptor),
        is_interface: false,
    }
}

pub fn ret() -> Instruction {
    Instruction::simple(opcodes::RETURN)
}

pub fn areturn() -> Instruction {
    Instruction::simple(opcodes::ARETURN)
}

pub fn code<I>(max_stack: u16, max_locals: u16, insns: I) -> MethodBody
where
    I: IntoIterator<Item = Instruction>,
{
    MethodBody::new(max_stack, max_locals, insns.into_iter().collect())
}

pub fn method(
    access_flags: method::AccessFlags,
    name: &str,
    descriptor: &str,
    body: MethodBody,
) -> Method {
    Method {
        access_flags,
        name: name.to_owned(),
        descriptor: descriptor.parse().unwrap(),
        body: Some(body),
        attributes: Vec::new(),
    }
}

/// A class with `public static void main(String[])` running `insns`.
pub fn wrapper_class(binary_name: &str, insns: Vec<Instruction>) -> Class {
    let mut class = Class::new(binary_name, Version::new(52, 0));
    class.methods.push(method(
        method::AccessFlags::PUBLIC | method::AccessFlags::STATIC,
        "main",
        "([Ljava/lang/String;)V",
        code(4, 2, insns.into_iter().chain([ret()])),
    ));
    class
}

/// A constructor calling the super constructor of `super_class`, then running `insns`.
pub fn constructor(super_class: &str, descriptor: &str, insns: Vec<Instruction>) -> Method {
    let body = [Instruction::aload(0), new_object(super_class, "()V")]
        .into_iter()
        .chain(insns)
        .chain([ret()]);
    method(method::AccessFlags::PUBLIC, "<init>", descriptor, code(2, 4, body))
}

/// A client game class storing its run directory in the `gameDir` field.
pub fn client_game_class(binary_name: &str) -> Class {
    let mut class = Class::new(binary_name, Version::new(52, 0));
    class.fields.push(Field::new(
        field::AccessFlags::PUBLIC,
        "gameDir",
        FieldType::Object(ClassRef::new(FILE)),
    ));
    class.methods.push(constructor(
        "java/lang/Object",
        "(Ljava/io/File;)V",
        vec![
            Instruction::aload(0),
            Instruction::aload(1),
            Instruction::put_field(field_ref(binary_name, "gameDir", "Ljava/io/File;")),
        ],
    ));
    class.methods.push(method(
        method::AccessFlags::PUBLIC,
        "run",
        "()V",
        code(0, 1, [ret()]),
    ));
    class
}

/// A server game class taking its run directory as the first constructor argument.
pub fn server_game_class(binary_name: &str) -> Class {
    let mut class = Class::new(binary_name, Version::new(52, 0));
    class
        .methods
        .push(constructor("java/lang/Object", "(Ljava/io/File;)V", vec![]));
    class
}

/// A class with a brand accessor returning `"vanilla"` or `null` through two return sites.
pub fn brand_class(binary_name: &str, accessor: &str) -> Class {
    let mut class = Class::new(binary_name, Version::new(52, 0));
    let vanilla = class
        .constant_pool
        .put_string(JavaString::from("vanilla"))
        .unwrap();
    let mut insns = InstructionList::new();
    let other = insns.new_label();
    insns.push(Instruction::simple(opcodes::ICONST_0));
    insns.push(Instruction::Jump {
        opcode: opcodes::IFEQ,
        target: other,
    });
    insns.push(Instruction::Plain(RawInstruction::Byte {
        opcode: opcodes::LDC,
        operand: u8::try_from(vanilla).unwrap(),
    }));
    insns.push(areturn());
    insns.push_label(other);
    insns.push(Instruction::aconst_null());
    insns.push(areturn());
    class.methods.push(method(
        method::AccessFlags::PUBLIC | method::AccessFlags::STATIC,
        accessor,
        "()Ljava/lang/String;",
        MethodBody::new(1, 0, insns),
    ));
    class
}

/// A launcher over encoded copies of `classes`.
pub fn launcher(
    env_type: EnvType,
    entrypoint: &str,
    classes: &[&Class],
) -> ClassPathLauncher<MemoryClassPath> {
    let class_path = classes
        .iter()
        .map(|class| (class.binary_name.clone(), class.to_bytes().unwrap()))
        .collect::<MemoryClassPath>();
    ClassPathLauncher::new(env_type, entrypoint, ClassLoader::new([class_path]))
}

pub fn decode(bytes: Option<&[u8]>) -> Class {
    Class::from_bytes(bytes.expect("The class is not patched")).unwrap()
}

/// The instructions of the first method of `class` satisfying `predicate`.
pub fn instructions_of<P>(class: &Class, predicate: P) -> Vec<Instruction>
where
    P: FnMut(&Method) -> bool,
{
    class
        .find_method(predicate)
        .and_then(|it| it.body.as_ref())
        .map(|body| body.instructions.iter().cloned().collect())
        .unwrap_or_default()
}

/// The instruction following `label`.
pub fn instruction_at(body: &MethodBody, label: Label) -> Option<&Instruction> {
    body.instructions
        .nodes()
        .iter()
        .skip_while(|node| **node != Node::Label(label))
        .find_map(|node| match node {
            Node::Instruction(insn) => Some(insn),
            Node::Label(_) => None,
        })
}
