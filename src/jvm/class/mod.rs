//! JVM classes and interfaces

pub mod constant_pool;

use bitflags::bitflags;

pub use constant_pool::ConstantPool;

use super::{Field, Method, RawAttribute, references::ClassRef};
use crate::macros::see_jvm_spec;

/// A JVM class or interface, as decoded from a class file.
#[doc = see_jvm_spec!(4, 1)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    /// The version of the class file.
    pub version: Version,
    /// The constant pool. Indices held by raw attributes and raw instructions refer to it.
    pub constant_pool: ConstantPool,
    /// The access flags of the class.
    pub access_flags: AccessFlags,
    /// The binary name of the class, e.g., `net/minecraft/client/Minecraft`.
    pub binary_name: String,
    /// The super class, absent only for `java/lang/Object`.
    pub super_class: Option<ClassRef>,
    /// The directly implemented interfaces.
    pub interfaces: Vec<ClassRef>,
    /// The declared fields.
    pub fields: Vec<Field>,
    /// The declared methods.
    pub methods: Vec<Method>,
    /// The class attributes, kept verbatim.
    pub attributes: Vec<RawAttribute>,
}

impl Class {
    /// Creates an empty class extending `java/lang/Object`.
    pub fn new(binary_name: impl Into<String>, version: Version) -> Self {
        Self {
            version,
            constant_pool: ConstantPool::new(),
            access_flags: AccessFlags::PUBLIC | AccessFlags::SUPER,
            binary_name: binary_name.into(),
            super_class: Some(ClassRef::new("java/lang/Object")),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Creates a [`ClassRef`] referring to the class.
    #[must_use]
    pub fn make_ref(&self) -> ClassRef {
        ClassRef::new(self.binary_name.clone())
    }

    /// Gets the class name with `.` as the package separator.
    #[must_use]
    pub fn dotted_name(&self) -> String {
        self.binary_name.replace('/', ".")
    }

    /// Iterates over the fields satisfying `predicate`.
    pub fn find_fields<P>(&self, mut predicate: P) -> impl Iterator<Item = &Field>
    where
        P: FnMut(&Field) -> bool,
    {
        self.fields.iter().filter(move |it| predicate(*it))
    }

    /// Gets the first field satisfying `predicate`.
    pub fn find_field<P>(&self, predicate: P) -> Option<&Field>
    where
        P: FnMut(&Field) -> bool,
    {
        self.find_fields(predicate).next()
    }

    /// Iterates over the methods satisfying `predicate`.
    pub fn find_methods<P>(&self, mut predicate: P) -> impl Iterator<Item = &Method>
    where
        P: FnMut(&Method) -> bool,
    {
        self.methods.iter().filter(move |it| predicate(*it))
    }

    /// Gets the first method satisfying `predicate`.
    pub fn find_method<P>(&self, predicate: P) -> Option<&Method>
    where
        P: FnMut(&Method) -> bool,
    {
        self.find_methods(predicate).next()
    }

    /// Iterates mutably over the methods satisfying `predicate`.
    pub fn find_methods_mut<P>(&mut self, mut predicate: P) -> impl Iterator<Item = &mut Method>
    where
        P: FnMut(&Method) -> bool,
    {
        self.methods.iter_mut().filter(move |it| predicate(&**it))
    }

    /// Checks if the class is an interface.
    #[must_use]
    pub const fn is_interface(&self) -> bool {
        self.access_flags.contains(AccessFlags::INTERFACE)
    }
}

/// The version of a class file.
#[derive(Debug, PartialOrd, Ord, PartialEq, Eq, Copy, Clone)]
pub struct Version {
    /// The major version, e.g., `52` for Java 8.
    pub major: u16,
    /// The minor version.
    pub minor: u16,
}

impl Version {
    /// Java 8.
    pub const JDK8: Self = Self::new(52, 0);

    /// Creates a version from its components.
    #[must_use]
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

bitflags! {
    /// The access flags of a [`Class`].
    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    pub struct AccessFlags: u16 {
        /// Declared `public`; may be accessed from outside its package.
        const PUBLIC = 0x0001;
        /// Marked `private` in source.
        /// NOTE: The is not mentioned in the JVM Specification. However it is set in some class
        /// files, event for those in the JDK.
        const PRIVATE = 0x0002;
        /// Declared `final`; no subclasses allowed.
        const FINAL = 0x0010;
        /// Treat superclass methods specially when invoked by the invokespecial instruction.
        const SUPER = 0x0020;
        /// Is an interface, not a class.
        const INTERFACE = 0x0200;
        /// Declared `abstract`; must not be instantiated.
        const ABSTRACT = 0x0400;
        /// Declared synthetic; not present in the source code.
        const SYNTHETIC = 0x1000;
        /// Declared as an annotation interface.
        const ANNOTATION = 0x2000;
        /// Declared as an enum class.
        const ENUM = 0x4000;
        /// Is a module, not a class or interface.
        const MODULE = 0x8000;
    }
}
