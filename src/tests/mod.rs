use std::collections::HashMap;

use proptest::prelude::*;

use crate::{
    entrypoint::{EnvType, Launcher},
    jvm::{
        Class, Method,
        class::Version,
        code::{Instruction, InvokeKind, MethodBody, opcodes},
        method,
        references::{ClassRef, MethodRef},
    },
    types::field_type::{FieldType, PrimitiveType},
};

#[rustfmt::skip]
#[must_use]
pub const fn empty_class_with_version(major: u16, minor: u16) -> [u8;40] {
    [
        0xCA, 0xFE, 0xBA, 0xBE, // Magic
        minor.to_be_bytes()[0], minor.to_be_bytes()[1], // Minor version
        major.to_be_bytes()[0], major.to_be_bytes()[1], // Major version
        // Constant pool
        0x00, 0x03, // Constant pool count 2+1
        0x07, // Tag: Class
        0x00, 0x02, // Name index: 2
        0x01, // Tag: Utf8
        0x00, 0x0A, // Length of string: 10
        0x48, 0x65, 0x6C, 0x6C, 0x6F, 0x57, 0x6F, 0x72, 0x6C, 0x64, // "HelloWorld"
        0x00, 0x01, // Access flags: public
        0x00, 0x01, // This class index
        0x00, 0x01, // Super class index
        0x00, 0x00, // Interfaces count
        0x00, 0x00, // Fields count
        0x00, 0x00, // Methods count
        0x00, 0x00, // Attributes count
    ]
}

/// The server start hook.
pub(crate) fn hook_method() -> MethodRef {
    MethodRef {
        owner: ClassRef::new("net/fabricmc/loader/entrypoint/EntrypointServer"),
        name: "start".to_owned(),
        descriptor: "(Ljava/io/File;Ljava/lang/Object;)V".parse().unwrap(),
    }
}

pub(crate) fn method_call(kind: InvokeKind, owner: &str, name: &str, descriptor: &str) -> Instruction {
    Instruction::Invoke {
        kind,
        method: MethodRef {
            owner: ClassRef::new(owner),
            name: name.to_owned(),
            descriptor: descriptor.parse().unwrap(),
        },
        is_interface: false,
    }
}

pub(crate) fn constructor_call(owner: &str, descriptor: &str) -> Instruction {
    method_call(InvokeKind::Special, owner, Method::CONSTRUCTOR_NAME, descriptor)
}

pub(crate) fn method_with_code(
    access_flags: method::AccessFlags,
    name: &str,
    descriptor: &str,
    insns: Vec<Instruction>,
) -> Method {
    Method {
        access_flags,
        name: name.to_owned(),
        descriptor: descriptor.parse().unwrap(),
        body: Some(MethodBody::new(2, 4, insns.into_iter().collect())),
        attributes: Vec::new(),
    }
}

/// A constructor calling `Object.<init>`, then running `insns` and returning.
pub(crate) fn constructor(descriptor: &str, insns: Vec<Instruction>) -> Method {
    let code = [
        Instruction::aload(0),
        constructor_call("java/lang/Object", "()V"),
    ]
    .into_iter()
    .chain(insns)
    .chain([Instruction::simple(opcodes::RETURN)])
    .collect();
    method_with_code(method::AccessFlags::PUBLIC, Method::CONSTRUCTOR_NAME, descriptor, code)
}

/// A class whose `main` runs `insns` and returns.
pub(crate) fn class_with_main(binary_name: &str, mut insns: Vec<Instruction>) -> Class {
    insns.push(Instruction::simple(opcodes::RETURN));
    let mut class = Class::new(binary_name, Version::new(52, 0));
    class.methods.push(method_with_code(
        method::AccessFlags::PUBLIC | method::AccessFlags::STATIC,
        "main",
        "([Ljava/lang/String;)V",
        insns,
    ));
    class
}

pub(crate) fn game_class_with_constructor(
    binary_name: &str,
    descriptor: &str,
    insns: Vec<Instruction>,
) -> Class {
    let mut class = Class::new(binary_name, Version::new(52, 0));
    class.methods.push(constructor(descriptor, insns));
    class
}

/// A launcher serving encoded classes from memory.
#[derive(Debug)]
pub(crate) struct StaticLauncher {
    env_type: EnvType,
    entrypoint: String,
    classes: HashMap<String, Vec<u8>>,
}

impl StaticLauncher {
    pub(crate) fn new(env_type: EnvType, entrypoint: &str) -> Self {
        Self {
            env_type,
            entrypoint: entrypoint.to_owned(),
            classes: HashMap::new(),
        }
    }

    pub(crate) fn with_class(self, class: &Class) -> Self {
        let bytes = class.to_bytes().unwrap();
        self.with_bytes(&class.dotted_name(), bytes)
    }

    pub(crate) fn with_bytes(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.classes.insert(name.to_owned(), bytes);
        self
    }
}

impl Launcher for StaticLauncher {
    fn environment_type(&self) -> EnvType {
        self.env_type
    }

    fn entrypoint(&self) -> &str {
        &self.entrypoint
    }

    fn class_bytes(&self, name: &str) -> Option<Vec<u8>> {
        self.classes.get(name).cloned()
    }
}

pub(crate) fn arb_class_name() -> impl Strategy<Value = String> {
    let arb_ident = prop::string::string_regex(r"[a-zA-Z][\w\$_]*").expect("The regex is invalid");
    prop::collection::vec(arb_ident, 1..10).prop_map(|v| v.join("/"))
}

pub(crate) fn arb_non_array_field_type() -> impl Strategy<Value = FieldType> {
    prop_oneof![
        any::<PrimitiveType>().prop_map(FieldType::Base),
        arb_class_name()
            .prop_map(ClassRef::new)
            .prop_map(FieldType::Object),
    ]
}

prop_compose! {
    fn arb_array_field_type()(
        t in arb_non_array_field_type(),
        dim in 1..=u8::MAX
    ) -> FieldType {
        FieldType::array_of(t, dim)
    }
}

pub(crate) fn arb_field_type() -> impl Strategy<Value = FieldType> {
    prop_oneof![arb_non_array_field_type(), arb_array_field_type()]
}
