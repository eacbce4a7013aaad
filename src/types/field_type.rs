//! Types of fields, local variables and method parameters.

use std::{fmt::Display, str::FromStr};

use itertools::Itertools;

use crate::{jvm::references::ClassRef, macros::see_jvm_spec};

use super::{Descriptor, method_descriptor::InvalidDescriptor};

/// A primitive type in Java.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum PrimitiveType {
    /// The `boolean` type.
    Boolean,
    /// The `char` type.
    Char,
    /// The `float` type.
    Float,
    /// The `double` type.
    Double,
    /// The `byte` type.
    Byte,
    /// The `short` type.
    Short,
    /// The `int` type.
    Int,
    /// The `long` type.
    Long,
}

impl TryFrom<char> for PrimitiveType {
    type Error = InvalidDescriptor;

    fn try_from(descriptor: char) -> Result<Self, Self::Error> {
        match descriptor {
            'Z' => Ok(Self::Boolean),
            'C' => Ok(Self::Char),
            'F' => Ok(Self::Float),
            'D' => Ok(Self::Double),
            'B' => Ok(Self::Byte),
            'S' => Ok(Self::Short),
            'I' => Ok(Self::Int),
            'J' => Ok(Self::Long),
            _ => Err(InvalidDescriptor),
        }
    }
}

impl Descriptor for PrimitiveType {
    fn descriptor(&self) -> String {
        match self {
            Self::Boolean => "Z",
            Self::Char => "C",
            Self::Float => "F",
            Self::Double => "D",
            Self::Byte => "B",
            Self::Short => "S",
            Self::Int => "I",
            Self::Long => "J",
        }
        .to_owned()
    }
}

impl Display for PrimitiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Boolean => "boolean",
            Self::Char => "char",
            Self::Float => "float",
            Self::Double => "double",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
        };
        f.write_str(name)
    }
}

/// A type of a field, a local variable or a method parameter.
#[doc = see_jvm_spec!(4, 3, 2)]
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub enum FieldType {
    /// A primitive type.
    Base(PrimitiveType),
    /// A class or interface type.
    Object(ClassRef),
    /// An array type.
    Array(Box<FieldType>),
}

impl FieldType {
    /// Creates an array type with `self` as the element type.
    #[must_use]
    pub fn into_array_type(self) -> Self {
        Self::Array(Box::new(self))
    }

    /// Creates an array type of `dim` dimensions with `element` as the element type.
    #[must_use]
    pub fn array_of(element: Self, dim: u8) -> Self {
        (0..dim).fold(element, |acc, _| acc.into_array_type())
    }

    /// Returns the class this type refers to if it is a class or interface type.
    #[must_use]
    pub fn class_ref(&self) -> Option<&ClassRef> {
        match self {
            Self::Object(class_ref) => Some(class_ref),
            _ => None,
        }
    }

    /// Checks whether the type is the class or interface with the given binary name.
    #[must_use]
    pub fn is_class(&self, binary_name: &str) -> bool {
        self.class_ref()
            .is_some_and(|it| it.binary_name == binary_name)
    }

    /// Gets the number of local variable or operand stack slots a value of this type takes.
    #[must_use]
    pub const fn slot_size(&self) -> u8 {
        match self {
            Self::Base(PrimitiveType::Long | PrimitiveType::Double) => 2,
            _ => 1,
        }
    }
}

impl Descriptor for FieldType {
    fn descriptor(&self) -> String {
        match self {
            Self::Base(it) => it.descriptor(),
            Self::Object(ClassRef { binary_name }) => format!("L{binary_name};"),
            Self::Array(inner) => format!("[{}", inner.descriptor()),
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Base(it) => it.fmt(f),
            Self::Object(it) => it.binary_name.replace('/', ".").fmt(f),
            Self::Array(inner) => write!(f, "{inner}[]"),
        }
    }
}

impl FromStr for FieldType {
    type Err = InvalidDescriptor;

    fn from_str(descriptor: &str) -> Result<Self, Self::Err> {
        let mut chars = descriptor.chars();
        match chars.next() {
            Some('[') => Self::from_str(chars.as_str()).map(Self::into_array_type),
            Some('L') => {
                let binary_name: String = chars.take_while_ref(|c| *c != ';').collect();
                match (chars.next(), chars.next()) {
                    (Some(';'), None) if !binary_name.is_empty() => {
                        Ok(Self::Object(ClassRef::new(binary_name)))
                    }
                    _ => Err(InvalidDescriptor),
                }
            }
            Some(c) if chars.next().is_none() => PrimitiveType::try_from(c).map(Self::Base),
            _ => Err(InvalidDescriptor),
        }
    }
}
