//! Non-generic JVM method descriptors.

use itertools::Itertools;
use std::{
    fmt::Display,
    str::{Chars, FromStr},
};

use crate::{jvm::references::ClassRef, macros::see_jvm_spec};

use super::{
    Descriptor,
    field_type::{FieldType, PrimitiveType},
};

/// The descriptor of a method.
/// Consists of the parameters types and the return type.
#[doc = see_jvm_spec!(4, 3, 3)]
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub struct MethodDescriptor {
    /// The type of the parameters.
    pub parameters_types: Vec<FieldType>,
    /// The return type.
    pub return_type: ReturnType,
}

/// Denotes the return type of a method.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub enum ReturnType {
    /// The method returns a specific type.
    Some(FieldType),
    /// The return type of the method is `void`.
    Void,
}

impl Display for ReturnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReturnType::Some(t) => t.fmt(f),
            ReturnType::Void => write!(f, "void"),
        }
    }
}

impl Display for MethodDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.descriptor())
    }
}

impl Descriptor for MethodDescriptor {
    fn descriptor(&self) -> String {
        let params = self
            .parameters_types
            .iter()
            .map(Descriptor::descriptor)
            .join("");
        format!("({params}){}", self.return_type.descriptor())
    }
}

impl Descriptor for ReturnType {
    fn descriptor(&self) -> String {
        match self {
            ReturnType::Some(it) => it.descriptor(),
            ReturnType::Void => "V".to_owned(),
        }
    }
}

impl MethodDescriptor {
    /// Returns the type of the first parameter, if any.
    #[must_use]
    pub fn first_parameter(&self) -> Option<&FieldType> {
        self.parameters_types.first()
    }

    /// Gets the number of slots the arguments take, excluding the receiver.
    #[must_use]
    pub fn argument_slots(&self) -> u16 {
        self.parameters_types
            .iter()
            .map(|it| u16::from(it.slot_size()))
            .sum()
    }

    /// Checks whether the method returns an instance of the given class.
    #[must_use]
    pub fn returns_class(&self, binary_name: &str) -> bool {
        matches!(&self.return_type, ReturnType::Some(t) if t.is_class(binary_name))
    }

    /// Parses a method descriptor from a string and advances the iterator.
    /// For an input as follows.
    /// ```text
    ///   L      java/lang/String;IJB)V
    ///   ^      ^
    ///   prefix remaining
    /// ````
    /// It returns a [`FieldType::Object`] with `"java/lang/String"` and leaves `remaining` at
    /// `IJB)V`.
    fn parse_single_param(
        prefix: char,
        remaining: &mut Chars<'_>,
    ) -> Result<FieldType, InvalidDescriptor> {
        if let Ok(p) = PrimitiveType::try_from(prefix) {
            return Ok(FieldType::Base(p));
        }
        match prefix {
            'L' => {
                let binary_name: String = remaining.take_while_ref(|c| *c != ';').collect();
                match remaining.next() {
                    Some(';') if !binary_name.is_empty() => {
                        Ok(FieldType::Object(ClassRef::new(binary_name)))
                    }
                    _ => Err(InvalidDescriptor),
                }
            }
            '[' => {
                let next_prefix = remaining.next().ok_or(InvalidDescriptor)?;
                Self::parse_single_param(next_prefix, remaining).map(FieldType::into_array_type)
            }
            _ => Err(InvalidDescriptor),
        }
    }
}

impl FromStr for MethodDescriptor {
    type Err = InvalidDescriptor;

    fn from_str(descriptor: &str) -> Result<Self, Self::Err> {
        let mut chars = descriptor.chars();
        if chars.next() != Some('(') {
            return Err(InvalidDescriptor);
        }
        let mut parameters_types = Vec::new();
        let return_type = loop {
            match chars.next() {
                Some(')') => break ReturnType::from_str(chars.as_str())?,
                Some(c) => {
                    let param = Self::parse_single_param(c, &mut chars)?;
                    parameters_types.push(param);
                }
                None => Err(InvalidDescriptor)?,
            }
        };
        Ok(Self {
            parameters_types,
            return_type,
        })
    }
}

/// An error indicating that the descriptor string is invalid.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("Invalid descriptor")]
pub struct InvalidDescriptor;

impl FromStr for ReturnType {
    type Err = InvalidDescriptor;
    fn from_str(descriptor: &str) -> Result<Self, Self::Err> {
        if descriptor == "V" {
            Ok(ReturnType::Void)
        } else {
            FieldType::from_str(descriptor).map(ReturnType::Some)
        }
    }
}
