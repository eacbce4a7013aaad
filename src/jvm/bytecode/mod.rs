//! Decoding and encoding of the JVM class file format.
mod class_file;
mod code;
mod constant_pool;
mod errors;
mod raw_instruction;
mod reader_utils;
mod stack_map;

use std::{io::Write, num::TryFromIntError};

pub use errors::{GenerationError, GenerationErrorKind, ParseError, ParsingErrorKind};
pub(crate) use errors::ParsingErrorContext;
use num_traits::ToBytes;

use crate::jvm::class::ConstantPool;

/// Context used to decode the members of a class file.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ParsingContext<'a> {
    /// The constant pool of the class file.
    pub constant_pool: &'a ConstantPool,
    /// The binary name of the class being decoded.
    pub current_class_binary_name: &'a str,
}

/// Trait for writing a raw JVM element to a writer.
pub(crate) trait ToWriter {
    /// Writes the element to the given writer.
    ///
    /// # Errors
    /// See [`GenerationError`] for more information.
    fn to_writer<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), GenerationError>;
}

/// Writes a table length as a `Len`, failing if it does not fit.
pub(crate) fn write_length<Len>(
    writer: &mut (impl Write + ?Sized),
    length: usize,
) -> Result<(), GenerationError>
where
    usize: TryInto<Len, Error = TryFromIntError>,
    Len: ToBytes,
    <Len as ToBytes>::Bytes: AsRef<[u8]>,
{
    let length: Len = length.try_into()?;
    writer.write_all(length.to_be_bytes().as_ref())?;
    Ok(())
}
