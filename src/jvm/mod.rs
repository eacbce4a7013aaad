//! Module containing the APIs for the JVM elements.

use std::fmt::Display;

use itertools::Itertools;

pub mod bytecode;
pub mod class;
pub mod class_loader;
pub mod code;
pub mod field;
pub mod method;
pub mod references;

pub use class::Class;
pub use field::Field;
pub use method::Method;

/// An attribute kept as its constant pool name index and undecoded content.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RawAttribute {
    /// The index of the [`Utf8`](class::constant_pool::Entry::Utf8) entry holding the name.
    pub name_index: u16,
    /// The content following the `attribute_length`.
    pub info: Vec<u8>,
}

/// A string in the JVM bytecode.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum JavaString {
    /// A valid UTF-8 string.
    Utf8(String),
    /// An string that is not valid UTF-8, kept as the raw modified UTF-8 bytes.
    InvalidUtf8(Vec<u8>),
}

impl JavaString {
    /// Decodes a string from its modified UTF-8 representation.
    #[must_use]
    pub fn from_modified_utf8(bytes: Vec<u8>) -> Self {
        match cesu8::from_java_cesu8(&bytes) {
            Ok(it) => Self::Utf8(it.into_owned()),
            Err(_) => Self::InvalidUtf8(bytes),
        }
    }

    /// Encodes the string in modified UTF-8.
    #[must_use]
    pub fn to_modified_utf8(&self) -> Vec<u8> {
        match self {
            Self::Utf8(it) => cesu8::to_java_cesu8(it).into_owned(),
            Self::InvalidUtf8(bytes) => bytes.clone(),
        }
    }

    /// Returns the string if it is valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Utf8(it) => Some(it),
            Self::InvalidUtf8(_) => None,
        }
    }
}

impl From<&str> for JavaString {
    fn from(value: &str) -> Self {
        Self::Utf8(value.to_owned())
    }
}

impl From<String> for JavaString {
    fn from(value: String) -> Self {
        Self::Utf8(value)
    }
}

impl Display for JavaString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JavaString::Utf8(value) => write!(f, "String(\"{value}\")"),
            JavaString::InvalidUtf8(value) => write!(
                f,
                "String({}) // Invalid UTF-8",
                value.iter().map(|it| format!("0x{it:02X}")).join(" ")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn modified_utf8_round_trip(s in any::<String>()) {
            let java_str = JavaString::from(s.clone());
            let bytes = java_str.to_modified_utf8();
            prop_assert_eq!(JavaString::from_modified_utf8(bytes), JavaString::Utf8(s));
        }
    }

    #[test]
    fn nul_is_two_bytes() {
        let bytes = JavaString::from("\0").to_modified_utf8();
        assert_eq!(bytes, vec![0xC0, 0x80]);
    }

    #[test]
    fn invalid_bytes_are_kept() {
        let raw = vec![0xFF, 0xFE];
        let s = JavaString::from_modified_utf8(raw.clone());
        assert_eq!(s, JavaString::InvalidUtf8(raw.clone()));
        assert_eq!(s.to_modified_utf8(), raw);
        assert!(s.as_str().is_none());
    }
}
