//! JVM fields.

use bitflags::bitflags;

use super::{
    RawAttribute,
    references::{ClassRef, FieldRef},
};
use crate::types::field_type::FieldType;

/// A field declared by a [`Class`](super::Class).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// The access flags of the field.
    pub access_flags: AccessFlags,
    /// The name of the field.
    pub name: String,
    /// The type of the field.
    pub field_type: FieldType,
    /// The attributes of the field, kept verbatim.
    pub attributes: Vec<RawAttribute>,
}

impl Field {
    /// Creates a field without attributes.
    pub fn new(access_flags: AccessFlags, name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            access_flags,
            name: name.into(),
            field_type,
            attributes: Vec::new(),
        }
    }

    /// Checks whether the field is `static`.
    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.access_flags.contains(AccessFlags::STATIC)
    }

    /// Creates a [`FieldRef`] to this field as a member of `owner`.
    #[must_use]
    pub fn make_ref(&self, owner: ClassRef) -> FieldRef {
        FieldRef {
            owner,
            name: self.name.clone(),
            field_type: self.field_type.clone(),
        }
    }
}

bitflags! {
    /// The access flags of a [`Field`].
    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    pub struct AccessFlags: u16 {
        /// Declared `public`; may be accessed from outside its package.
        const PUBLIC = 0x0001;
        /// Declared `private`; accessible only within the defining class and other classes belonging to the same nest.
        const PRIVATE = 0x0002;
        /// Declared `protected`; may be accessed within subclasses.
        const PROTECTED = 0x0004;
        /// Declared `static`.
        const STATIC = 0x0008;
        /// Declared `final`; never directly assigned to after object construction.
        const FINAL = 0x0010;
        /// Declared `volatile`; cannot be cached.
        const VOLATILE = 0x0040;
        /// Declared `transient`; not written or read by a persistent object manager.
        const TRANSIENT = 0x0080;
        /// Declared synthetic; not present in the source code.
        const SYNTHETIC = 0x1000;
        /// Declared as an element of an `enum` class.
        const ENUM = 0x4000;
    }
}
