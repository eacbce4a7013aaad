use std::{
    io::{Read, Write},
    str::FromStr,
};

use super::{
    GenerationError, ParseError, ParsingContext, ParsingErrorContext, ToWriter,
    code::{decode_code, encode_code},
    reader_utils::{BytecodeReader, read_byte_chunk},
    write_length,
};
use crate::{
    jvm::{
        Class, Field, Method, RawAttribute,
        class::{self, ConstantPool, Version},
        field, method,
    },
    macros::fill_once,
    types::{Descriptor, field_type::FieldType, method_descriptor::MethodDescriptor},
};

const JAVA_CLASS_MAGIC: u32 = 0xCAFE_BABE;
const CODE: &str = "Code";

impl Class {
    /// Decodes a class from the content of a class file.
    /// # Errors
    /// See [`ParseError`] for more information. Bytes left over after the class are an error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        let mut reader = bytes;
        let class = Self::from_reader(&mut reader)?;
        if reader.is_empty() {
            Ok(class)
        } else {
            Err(ParseError::malform(format!(
                "{} trailing bytes after the class file",
                reader.len()
            )))
        }
    }

    /// Decodes a class from the given reader.
    /// # Errors
    /// See [`ParseError`] for more information.
    pub fn from_reader<R>(reader: &mut R) -> Result<Self, ParseError>
    where
        R: Read + ?Sized,
    {
        let magic: u32 = reader.decode_value()?;
        if magic != JAVA_CLASS_MAGIC {
            return Err(ParseError::malform(format!("Invalid magic number {magic:#010x}")));
        }
        let minor = reader.decode_value()?;
        let major = reader.decode_value()?;
        let version = Version::new(major, minor);
        let constant_pool_count: u16 = reader.decode_value()?;
        let constant_pool = ConstantPool::from_reader(reader, constant_pool_count)?;
        let access_flags = class::AccessFlags::from_bits_retain(reader.decode_value()?);
        let this_class: u16 = reader.decode_value()?;
        let binary_name = constant_pool
            .get_class_ref(this_class)
            .context("Invalid this_class")?
            .binary_name;
        let super_class_index: u16 = reader.decode_value()?;
        let super_class = if super_class_index == 0 {
            None
        } else {
            Some(
                constant_pool
                    .get_class_ref(super_class_index)
                    .context("Invalid super_class")?,
            )
        };
        let interfaces_count: u16 = reader.decode_value()?;
        let interfaces = (0..interfaces_count)
            .map(|_| {
                let index = reader.decode_value()?;
                constant_pool
                    .get_class_ref(index)
                    .context("Invalid interface")
            })
            .collect::<Result<_, ParseError>>()?;

        let ctx = ParsingContext {
            constant_pool: &constant_pool,
            current_class_binary_name: &binary_name,
        };
        let fields_count: u16 = reader.decode_value()?;
        let fields = (0..fields_count)
            .map(|_| read_field(reader, &ctx))
            .collect::<Result<_, _>>()?;
        let methods_count: u16 = reader.decode_value()?;
        let methods = (0..methods_count)
            .map(|_| read_method(reader, &ctx))
            .collect::<Result<_, _>>()?;
        let attributes = read_attributes(reader)?;

        Ok(Self {
            version,
            constant_pool,
            access_flags,
            binary_name,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    /// Encodes the class into the content of a class file.
    ///
    /// Constants needed by modified code are appended to a copy of the constant pool, so the
    /// class itself is left untouched.
    /// # Errors
    /// See [`GenerationError`] for more information.
    pub fn to_bytes(&self) -> Result<Vec<u8>, GenerationError> {
        let mut buf = Vec::new();
        self.to_writer(&mut buf)?;
        Ok(buf)
    }

    /// Encodes the class into the given writer.
    /// # Errors
    /// See [`GenerationError`] for more information.
    pub fn to_writer<W>(&self, writer: &mut W) -> Result<(), GenerationError>
    where
        W: Write + ?Sized,
    {
        let mut pool = self.constant_pool.clone();
        // Everything after the constant pool is encoded first since it may grow the pool.
        let mut rest = Vec::new();
        rest.extend_from_slice(&self.access_flags.bits().to_be_bytes());
        let this_class = pool.put_class_ref(&self.make_ref())?;
        rest.extend_from_slice(&this_class.to_be_bytes());
        let super_class = match &self.super_class {
            Some(it) => pool.put_class_ref(it)?,
            None => 0,
        };
        rest.extend_from_slice(&super_class.to_be_bytes());
        write_length::<u16>(&mut rest, self.interfaces.len())?;
        for interface in &self.interfaces {
            rest.extend_from_slice(&pool.put_class_ref(interface)?.to_be_bytes());
        }
        write_length::<u16>(&mut rest, self.fields.len())?;
        for field in &self.fields {
            write_field(&mut rest, field, &mut pool)?;
        }
        write_length::<u16>(&mut rest, self.methods.len())?;
        for method in &self.methods {
            write_method(&mut rest, method, &mut pool)?;
        }
        write_attributes(&mut rest, self.attributes.iter().map(|it| (it.name_index, &it.info)))?;

        writer.write_all(&JAVA_CLASS_MAGIC.to_be_bytes())?;
        writer.write_all(&self.version.minor.to_be_bytes())?;
        writer.write_all(&self.version.major.to_be_bytes())?;
        pool.to_writer(writer)?;
        writer.write_all(&rest)?;
        Ok(())
    }
}

fn read_field<R>(reader: &mut R, ctx: &ParsingContext<'_>) -> Result<Field, ParseError>
where
    R: Read + ?Sized,
{
    let access_flags = field::AccessFlags::from_bits_retain(reader.decode_value()?);
    let name = ctx
        .constant_pool
        .get_str(reader.decode_value()?)
        .context("Invalid field name")?
        .to_owned();
    let descriptor = ctx
        .constant_pool
        .get_str(reader.decode_value()?)
        .context("Invalid field descriptor")?;
    let field_type = FieldType::from_str(descriptor).with_context(|_| {
        format!(
            "Invalid descriptor {descriptor} of field {}.{name}",
            ctx.current_class_binary_name
        )
    })?;
    let attributes = read_attributes(reader)?;
    Ok(Field {
        access_flags,
        name,
        field_type,
        attributes,
    })
}

fn read_method<R>(reader: &mut R, ctx: &ParsingContext<'_>) -> Result<Method, ParseError>
where
    R: Read + ?Sized,
{
    let access_flags = method::AccessFlags::from_bits_retain(reader.decode_value()?);
    let name = ctx
        .constant_pool
        .get_str(reader.decode_value()?)
        .context("Invalid method name")?
        .to_owned();
    let descriptor = ctx
        .constant_pool
        .get_str(reader.decode_value()?)
        .context("Invalid method descriptor")?;
    let descriptor = MethodDescriptor::from_str(descriptor).with_context(|_| {
        format!(
            "Invalid descriptor {descriptor} of method {}.{name}",
            ctx.current_class_binary_name
        )
    })?;
    let mut body = None;
    let mut attributes = Vec::new();
    for attribute in read_attributes(reader)? {
        let attribute_name = ctx
            .constant_pool
            .get_str(attribute.name_index)
            .context("Invalid attribute name")?;
        if attribute_name == CODE {
            let decoded = decode_code(&attribute.info, ctx).with_context(|err| {
                format!(
                    "Invalid code of {}.{name}{descriptor}: {err}",
                    ctx.current_class_binary_name
                )
            })?;
            fill_once!(body, decoded, "Code attribute");
        } else {
            attributes.push(attribute);
        }
    }
    Ok(Method {
        access_flags,
        name,
        descriptor,
        body,
        attributes,
    })
}

fn read_attributes<R>(reader: &mut R) -> Result<Vec<RawAttribute>, ParseError>
where
    R: Read + ?Sized,
{
    let count: u16 = reader.decode_value()?;
    (0..count)
        .map(|_| {
            let name_index = reader.decode_value()?;
            let length: u32 = reader.decode_value()?;
            let length = usize::try_from(length).context("Attribute is too long")?;
            let info = read_byte_chunk(reader, length)?;
            Ok(RawAttribute { name_index, info })
        })
        .collect()
}

fn write_field(
    writer: &mut Vec<u8>,
    field: &Field,
    pool: &mut ConstantPool,
) -> Result<(), GenerationError> {
    writer.extend_from_slice(&field.access_flags.bits().to_be_bytes());
    writer.extend_from_slice(&pool.put_str(&field.name)?.to_be_bytes());
    writer.extend_from_slice(&pool.put_str(&field.field_type.descriptor())?.to_be_bytes());
    write_attributes(writer, field.attributes.iter().map(|it| (it.name_index, &it.info)))
}

fn write_method(
    writer: &mut Vec<u8>,
    method: &Method,
    pool: &mut ConstantPool,
) -> Result<(), GenerationError> {
    writer.extend_from_slice(&method.access_flags.bits().to_be_bytes());
    writer.extend_from_slice(&pool.put_str(&method.name)?.to_be_bytes());
    writer.extend_from_slice(&pool.put_str(&method.descriptor.descriptor())?.to_be_bytes());
    let code = match &method.body {
        Some(body) => Some((pool.put_str(CODE)?, encode_code(body, pool)?)),
        None => None,
    };
    let attributes = code.iter().map(|(name_index, info)| (*name_index, info)).chain(
        method
            .attributes
            .iter()
            .map(|it| (it.name_index, &it.info)),
    );
    write_attributes(writer, attributes)
}

fn write_attributes<'a, I>(writer: &mut Vec<u8>, attributes: I) -> Result<(), GenerationError>
where
    I: IntoIterator<Item = (u16, &'a Vec<u8>)>,
{
    let attributes: Vec<_> = attributes.into_iter().collect();
    write_length::<u16>(writer, attributes.len())?;
    for (name_index, info) in attributes {
        writer.extend_from_slice(&name_index.to_be_bytes());
        write_length::<u32>(writer, info.len())?;
        writer.extend_from_slice(info);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        jvm::{
            bytecode::ParsingErrorKind,
            code::{Instruction, InstructionList, MethodBody, opcodes},
            references::{ClassRef, MethodRef},
        },
        tests::empty_class_with_version,
    };

    fn sample_class() -> Class {
        let mut class = Class::new("com/example/Game", Version::JDK8);
        class.fields.push(Field::new(
            field::AccessFlags::PRIVATE,
            "runDir",
            "Ljava/io/File;".parse().unwrap(),
        ));
        let instructions: InstructionList = [
            Instruction::aload(0),
            Instruction::invoke_special(MethodRef {
                owner: ClassRef::new("java/lang/Object"),
                name: "<init>".to_owned(),
                descriptor: "()V".parse().unwrap(),
            }),
            Instruction::simple(opcodes::RETURN),
        ]
        .into_iter()
        .collect();
        class.methods.push(Method {
            access_flags: method::AccessFlags::PUBLIC,
            name: "<init>".to_owned(),
            descriptor: "()V".parse().unwrap(),
            body: Some(MethodBody::new(1, 1, instructions)),
            attributes: Vec::new(),
        });
        class
    }

    #[test]
    fn parse_empty_class() {
        let bytes = empty_class_with_version(52, 0);
        let class = Class::from_bytes(&bytes).unwrap();
        assert_eq!(class.binary_name, "HelloWorld");
        assert_eq!(class.version, Version::JDK8);
        assert!(class.methods.is_empty());
    }

    #[test]
    fn encode_then_decode_keeps_members() {
        let class = sample_class();
        let bytes = class.to_bytes().unwrap();
        let decoded = Class::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.binary_name, class.binary_name);
        assert_eq!(decoded.super_class, class.super_class);
        assert_eq!(decoded.fields, class.fields);
        let body = decoded.methods[0].body.as_ref().unwrap();
        let insns: Vec<_> = body.instructions.iter().cloned().collect();
        let original = class.methods[0].body.as_ref().unwrap();
        let expected: Vec<_> = original.instructions.iter().cloned().collect();
        assert_eq!(insns, expected);
        // a decoded class encodes back to the same bytes
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn bad_magic() {
        let mut bytes = empty_class_with_version(52, 0);
        bytes[0] = 0;
        let err = Class::from_bytes(&bytes).unwrap_err();
        assert_eq!(err.kind(), ParsingErrorKind::Malformed);
    }

    #[test]
    fn trailing_bytes() {
        let mut bytes = empty_class_with_version(52, 0).to_vec();
        bytes.push(0);
        assert!(Class::from_bytes(&bytes).is_err());
    }

    #[test]
    fn truncated() {
        let bytes = empty_class_with_version(52, 0);
        assert!(Class::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    }
}
