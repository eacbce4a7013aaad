//! JVM methods.

use bitflags::bitflags;

use super::{
    RawAttribute,
    code::MethodBody,
    references::{ClassRef, MethodRef},
};
use crate::types::method_descriptor::MethodDescriptor;

/// A method declared by a [`Class`](super::Class).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    /// The access flags of the method.
    pub access_flags: AccessFlags,
    /// The name of the method.
    pub name: String,
    /// The descriptor of the method.
    pub descriptor: MethodDescriptor,
    /// The body of the method, absent for `abstract` and `native` methods.
    pub body: Option<MethodBody>,
    /// The attributes other than `Code`, kept verbatim.
    pub attributes: Vec<RawAttribute>,
}

impl Method {
    /// The name of instance initialization methods.
    pub const CONSTRUCTOR_NAME: &'static str = "<init>";
    /// The name of class initialization methods.
    pub const CLASS_INITIALIZER_NAME: &'static str = "<clinit>";

    /// Checks whether the method is an instance initialization method.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == Self::CONSTRUCTOR_NAME
    }

    /// Checks whether the method is `static`.
    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.access_flags.contains(AccessFlags::STATIC)
    }

    /// Creates a [`MethodRef`] to this method as a member of `owner`.
    #[must_use]
    pub fn make_ref(&self, owner: ClassRef) -> MethodRef {
        MethodRef {
            owner,
            name: self.name.clone(),
            descriptor: self.descriptor.clone(),
        }
    }
}

bitflags! {
    /// The access flags of a [`Method`].
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
        /// Declared `final`; must not be overridden.
        const FINAL = 0x0010;
        /// Declared `synchronized`; invocation is wrapped by a monitor use.
        const SYNCHRONIZED = 0x0020;
        /// A bridge method, generated by the compiler.
        const BRIDGE = 0x0040;
        /// Declared with variable number of arguments.
        const VARARGS = 0x0080;
        /// Declared `native`; implemented in a language other than the Java programming language.
        const NATIVE = 0x0100;
        /// Declared `abstract`; no implementation is provided.
        const ABSTRACT = 0x0400;
        /// In a class file whose major version number is at least 46 and at most 60; Declared `strictfp`.
        const STRICT = 0x0800;
        /// Declared synthetic; not present in the source code.
        const SYNTHETIC = 0x1000;
    }
}
