use std::io::{Read, Write};

use super::{
    GenerationError, ParseError, ToWriter,
    reader_utils::{BytecodeReader, read_byte_chunk},
    write_length,
};
use crate::jvm::{
    JavaString,
    class::{
        ConstantPool,
        constant_pool::{Entry, Slot},
    },
};

impl ConstantPool {
    /// Decodes `count - 1` slots of entries, keeping every entry at its original index.
    pub(crate) fn from_reader<R>(reader: &mut R, count: u16) -> Result<Self, ParseError>
    where
        R: Read + ?Sized,
    {
        let mut pool = Self::with_capacity(count);
        while pool.count() < count {
            let entry = Entry::from_reader(reader)?;
            pool.push_raw(entry);
        }
        if pool.count() != count {
            return Err(ParseError::malform(
                "A wide constant overflows the constant pool",
            ));
        }
        Ok(pool)
    }
}

impl ToWriter for ConstantPool {
    fn to_writer<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), GenerationError> {
        write_length::<u16>(writer, self.inner.len())?;
        for slot in &self.inner {
            if let Slot::Entry(entry) = slot {
                entry.to_writer(writer)?;
            }
        }
        Ok(())
    }
}

impl Entry {
    fn from_reader<R>(reader: &mut R) -> Result<Self, ParseError>
    where
        R: Read + ?Sized,
    {
        let tag: u8 = reader.decode_value()?;
        let entry = match tag {
            1 => {
                let length: u16 = reader.decode_value()?;
                let bytes = read_byte_chunk(reader, usize::from(length))?;
                Self::Utf8(JavaString::from_modified_utf8(bytes))
            }
            3 => Self::Integer(reader.decode_value()?),
            4 => Self::Float(reader.decode_value()?),
            5 => Self::Long(reader.decode_value()?),
            6 => Self::Double(reader.decode_value()?),
            7 => Self::Class {
                name_index: reader.decode_value()?,
            },
            8 => Self::String {
                string_index: reader.decode_value()?,
            },
            9 => Self::FieldRef {
                class_index: reader.decode_value()?,
                name_and_type_index: reader.decode_value()?,
            },
            10 => Self::MethodRef {
                class_index: reader.decode_value()?,
                name_and_type_index: reader.decode_value()?,
            },
            11 => Self::InterfaceMethodRef {
                class_index: reader.decode_value()?,
                name_and_type_index: reader.decode_value()?,
            },
            12 => Self::NameAndType {
                name_index: reader.decode_value()?,
                descriptor_index: reader.decode_value()?,
            },
            15 => Self::MethodHandle {
                reference_kind: reader.decode_value()?,
                reference_index: reader.decode_value()?,
            },
            16 => Self::MethodType {
                descriptor_index: reader.decode_value()?,
            },
            17 => Self::Dynamic {
                bootstrap_method_attr_index: reader.decode_value()?,
                name_and_type_index: reader.decode_value()?,
            },
            18 => Self::InvokeDynamic {
                bootstrap_method_attr_index: reader.decode_value()?,
                name_and_type_index: reader.decode_value()?,
            },
            19 => Self::Module {
                name_index: reader.decode_value()?,
            },
            20 => Self::Package {
                name_index: reader.decode_value()?,
            },
            unexpected => Err(ParseError::malform(format!(
                "Unexpected constant pool tag {unexpected}"
            )))?,
        };
        Ok(entry)
    }
}

impl ToWriter for Entry {
    fn to_writer<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), GenerationError> {
        writer.write_all(&[self.tag()])?;
        match self {
            Self::Utf8(java_str) => {
                let bytes = java_str.to_modified_utf8();
                write_length::<u16>(writer, bytes.len())?;
                writer.write_all(&bytes)?;
            }
            Self::Integer(it) => writer.write_all(&it.to_be_bytes())?,
            Self::Float(it) => writer.write_all(&it.to_be_bytes())?,
            Self::Long(it) => writer.write_all(&it.to_be_bytes())?,
            Self::Double(it) => writer.write_all(&it.to_be_bytes())?,
            Self::Class { name_index: index }
            | Self::String {
                string_index: index,
            }
            | Self::MethodType {
                descriptor_index: index,
            }
            | Self::Module { name_index: index }
            | Self::Package { name_index: index } => writer.write_all(&index.to_be_bytes())?,
            Self::FieldRef {
                class_index: first,
                name_and_type_index: second,
            }
            | Self::MethodRef {
                class_index: first,
                name_and_type_index: second,
            }
            | Self::InterfaceMethodRef {
                class_index: first,
                name_and_type_index: second,
            }
            | Self::NameAndType {
                name_index: first,
                descriptor_index: second,
            }
            | Self::Dynamic {
                bootstrap_method_attr_index: first,
                name_and_type_index: second,
            }
            | Self::InvokeDynamic {
                bootstrap_method_attr_index: first,
                name_and_type_index: second,
            } => {
                writer.write_all(&first.to_be_bytes())?;
                writer.write_all(&second.to_be_bytes())?;
            }
            Self::MethodHandle {
                reference_kind,
                reference_index,
            } => {
                writer.write_all(&[*reference_kind])?;
                writer.write_all(&reference_index.to_be_bytes())?;
            }
        }
        Ok(())
    }
}
