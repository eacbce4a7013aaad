//! Constant pool in a JVM class file.
//!
//! The pool is append-only: entries decoded from a class file keep their indices so that
//! attributes copied verbatim stay valid, and new entries are only ever added at the end.

use std::str::FromStr;

use crate::{
    jvm::{
        JavaString,
        references::{ClassRef, FieldRef, MethodRef},
    },
    macros::see_jvm_spec,
    types::{
        Descriptor,
        field_type::FieldType,
        method_descriptor::{InvalidDescriptor, MethodDescriptor},
    },
};

/// A JVM constant pool.
#[doc = see_jvm_spec!(4, 4)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantPool {
    pub(crate) inner: Vec<Slot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Slot {
    Entry(Entry),
    Padding,
}

impl ConstantPool {
    /// Creates a new empty constant pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: vec![Slot::Padding],
        }
    }

    /// Creates a new constant pool with the given capacity.
    /// # Parameters
    /// - `count`: the maximum index of entries in the constant pool plus one.
    #[must_use]
    pub fn with_capacity(count: u16) -> Self {
        // The `constant_pool` table is indexed from `1` to `constant_pool_count - 1`.
        let mut inner = Vec::with_capacity(usize::from(count) + 1);
        inner.push(Slot::Padding);
        Self { inner }
    }

    /// Pushes an entry without looking for an existing equal one.
    pub(crate) fn push_raw(&mut self, entry: Entry) {
        let wide = entry.is_wide();
        self.inner.push(Slot::Entry(entry));
        if wide {
            self.inner.push(Slot::Padding);
        }
    }

    /// Gets the constant pool entry at the given index.
    /// # Errors
    /// - [`Error::BadIndex`] if `index` does not point to a valid entry.
    pub fn get_entry(&self, index: u16) -> Result<&Entry, Error> {
        match self.inner.get(usize::from(index)) {
            Some(Slot::Entry(entry)) => Ok(entry),
            _ => Err(Error::BadIndex(index)),
        }
    }

    /// Adds an entry to the end of the constant pool, or returns the index of an equal entry
    /// that is already present.
    /// # Errors
    /// - [`Error::Overflow`] if the constant pool is full.
    pub fn put_entry(&mut self, entry: Entry) -> Result<u16, Error> {
        if let Some(index) = self.find_index(|it| it == &entry) {
            return Ok(index);
        }
        let new_index = self.count();
        let needed = if entry.is_wide() { 2 } else { 1 };
        if self.inner.len() + needed > usize::from(u16::MAX) {
            return Err(Error::Overflow);
        }
        self.push_raw(entry);
        Ok(new_index)
    }

    /// Finds the first constant pool entry that satisfies the given predicate.
    pub fn find<P>(&self, predicate: P) -> Option<(u16, &Entry)>
    where
        P: Fn(&Entry) -> bool,
    {
        self.inner
            .iter()
            .enumerate()
            .find_map(|(idx, slot)| match slot {
                Slot::Entry(entry) if predicate(entry) => {
                    u16::try_from(idx).ok().map(|idx| (idx, entry))
                }
                _ => None,
            })
    }

    pub(crate) fn find_index<P>(&self, predicate: P) -> Option<u16>
    where
        P: Fn(&Entry) -> bool,
    {
        self.find(predicate).map(|(idx, _)| idx)
    }

    /// Gets the count of the constant pool. Note that this is NOT the number of entries.
    #[doc = see_jvm_spec!(4, 1)]
    #[must_use]
    pub fn count(&self) -> u16 {
        // `put_entry` and the decoder never grow the pool beyond `u16::MAX` slots.
        u16::try_from(self.inner.len()).unwrap_or(u16::MAX)
    }

    /// Iterates over the entries, skipping the unusable slots.
    pub fn entries(&self) -> impl Iterator<Item = (u16, &Entry)> {
        self.inner
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| match slot {
                Slot::Entry(entry) => u16::try_from(idx).ok().map(|idx| (idx, entry)),
                Slot::Padding => None,
            })
    }
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Typed accessors.
impl ConstantPool {
    /// Gets the string stored in a [`Entry::Utf8`].
    /// # Errors
    /// - [`Error::BadIndex`] if `index` does not point to a valid entry.
    /// - [`Error::MismatchedType`] if the entry is not a [`Entry::Utf8`].
    /// - [`Error::BrokenUtf8`] if the string is not valid modified UTF-8.
    pub fn get_str(&self, index: u16) -> Result<&str, Error> {
        match self.get_entry(index)? {
            Entry::Utf8(JavaString::Utf8(it)) => Ok(it),
            Entry::Utf8(JavaString::InvalidUtf8(_)) => Err(Error::BrokenUtf8(index)),
            other => Err(Error::MismatchedType {
                expected: "CONSTANT_Utf8",
                found: other.constant_kind(),
            }),
        }
    }

    /// Gets the class referred to by a [`Entry::Class`].
    /// # Errors
    /// See [`ConstantPool::get_str`].
    pub fn get_class_ref(&self, index: u16) -> Result<ClassRef, Error> {
        match self.get_entry(index)? {
            &Entry::Class { name_index } => self.get_str(name_index).map(ClassRef::new),
            other => Err(Error::MismatchedType {
                expected: "CONSTANT_Class",
                found: other.constant_kind(),
            }),
        }
    }

    /// Gets the name and the descriptor stored in a [`Entry::NameAndType`].
    /// # Errors
    /// See [`ConstantPool::get_str`].
    pub fn get_name_and_type(&self, index: u16) -> Result<(&str, &str), Error> {
        match self.get_entry(index)? {
            &Entry::NameAndType {
                name_index,
                descriptor_index,
            } => Ok((self.get_str(name_index)?, self.get_str(descriptor_index)?)),
            other => Err(Error::MismatchedType {
                expected: "CONSTANT_NameAndType",
                found: other.constant_kind(),
            }),
        }
    }

    /// Gets the field referred to by a [`Entry::FieldRef`].
    /// # Errors
    /// See [`ConstantPool::get_str`]. Also fails if the descriptor is malformed.
    pub fn get_field_ref(&self, index: u16) -> Result<FieldRef, Error> {
        match self.get_entry(index)? {
            &Entry::FieldRef {
                class_index,
                name_and_type_index,
            } => {
                let owner = self.get_class_ref(class_index)?;
                let (name, descriptor) = self.get_name_and_type(name_and_type_index)?;
                let field_type = FieldType::from_str(descriptor)?;
                Ok(FieldRef {
                    owner,
                    name: name.to_owned(),
                    field_type,
                })
            }
            other => Err(Error::MismatchedType {
                expected: "CONSTANT_Fieldref",
                found: other.constant_kind(),
            }),
        }
    }

    /// Gets the method referred to by a [`Entry::MethodRef`] or a
    /// [`Entry::InterfaceMethodRef`], along with whether the owner is an interface.
    /// # Errors
    /// See [`ConstantPool::get_str`]. Also fails if the descriptor is malformed.
    pub fn get_method_ref(&self, index: u16) -> Result<(MethodRef, bool), Error> {
        let (class_index, name_and_type_index, is_interface) = match self.get_entry(index)? {
            &Entry::MethodRef {
                class_index,
                name_and_type_index,
            } => (class_index, name_and_type_index, false),
            &Entry::InterfaceMethodRef {
                class_index,
                name_and_type_index,
            } => (class_index, name_and_type_index, true),
            other => Err(Error::MismatchedType {
                expected: "CONSTANT_Methodref | CONSTANT_InterfaceMethodref",
                found: other.constant_kind(),
            })?,
        };
        let owner = self.get_class_ref(class_index)?;
        let (name, descriptor) = self.get_name_and_type(name_and_type_index)?;
        let descriptor = MethodDescriptor::from_str(descriptor)?;
        let method_ref = MethodRef {
            owner,
            name: name.to_owned(),
            descriptor,
        };
        Ok((method_ref, is_interface))
    }
}

/// Deduplicating constructors used when emitting new instructions.
impl ConstantPool {
    /// Adds a [`Entry::Utf8`] holding `value`.
    /// # Errors
    /// - [`Error::Overflow`] if the constant pool is full.
    pub fn put_str(&mut self, value: &str) -> Result<u16, Error> {
        self.put_entry(Entry::Utf8(JavaString::from(value)))
    }

    /// Adds a [`Entry::Class`] referring to `class_ref`.
    /// # Errors
    /// - [`Error::Overflow`] if the constant pool is full.
    pub fn put_class_ref(&mut self, class_ref: &ClassRef) -> Result<u16, Error> {
        let name_index = self.put_str(&class_ref.binary_name)?;
        self.put_entry(Entry::Class { name_index })
    }

    /// Adds a [`Entry::String`] holding `value`.
    /// # Errors
    /// - [`Error::Overflow`] if the constant pool is full.
    pub fn put_string(&mut self, value: JavaString) -> Result<u16, Error> {
        let string_index = self.put_entry(Entry::Utf8(value))?;
        self.put_entry(Entry::String { string_index })
    }

    /// Adds a [`Entry::NameAndType`].
    /// # Errors
    /// - [`Error::Overflow`] if the constant pool is full.
    pub fn put_name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16, Error> {
        let name_index = self.put_str(name)?;
        let descriptor_index = self.put_str(descriptor)?;
        self.put_entry(Entry::NameAndType {
            name_index,
            descriptor_index,
        })
    }

    /// Adds a [`Entry::FieldRef`] referring to `field_ref`.
    /// # Errors
    /// - [`Error::Overflow`] if the constant pool is full.
    pub fn put_field_ref(&mut self, field_ref: &FieldRef) -> Result<u16, Error> {
        let class_index = self.put_class_ref(&field_ref.owner)?;
        let name_and_type_index =
            self.put_name_and_type(&field_ref.name, &field_ref.field_type.descriptor())?;
        self.put_entry(Entry::FieldRef {
            class_index,
            name_and_type_index,
        })
    }

    /// Adds a [`Entry::MethodRef`] or a [`Entry::InterfaceMethodRef`] referring to `method_ref`.
    /// # Errors
    /// - [`Error::Overflow`] if the constant pool is full.
    pub fn put_method_ref(
        &mut self,
        method_ref: &MethodRef,
        is_interface: bool,
    ) -> Result<u16, Error> {
        let class_index = self.put_class_ref(&method_ref.owner)?;
        let name_and_type_index =
            self.put_name_and_type(&method_ref.name, &method_ref.descriptor.descriptor())?;
        let entry = if is_interface {
            Entry::InterfaceMethodRef {
                class_index,
                name_and_type_index,
            }
        } else {
            Entry::MethodRef {
                class_index,
                name_and_type_index,
            }
        };
        self.put_entry(entry)
    }
}

/// An error when accessing or growing the constant pool.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The index used to access the constant pool is invalid.
    #[error("Bad constant pool index: {0}")]
    BadIndex(u16),
    /// The constant pool is full.
    #[error("The constant pool is full")]
    Overflow,
    /// The entry is not of the expected kind.
    #[error("Expected {expected} but found {found}")]
    MismatchedType {
        /// The expected kind.
        expected: &'static str,
        /// The kind found at the index.
        found: &'static str,
    },
    /// The string at the index is not valid modified UTF-8.
    #[error("Broken UTF-8 string at index {0}")]
    BrokenUtf8(u16),
    /// A descriptor in the pool cannot be parsed.
    #[error(transparent)]
    InvalidDescriptor(#[from] InvalidDescriptor),
}

/// An entry in the [`ConstantPool`].
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Entry {
    /// A UTF-8 string.
    #[doc = see_jvm_spec!(4, 4, 7)]
    Utf8(JavaString),
    /// An integer.
    #[doc = see_jvm_spec!(4, 4, 4)]
    Integer(i32),
    /// A float.
    #[doc = see_jvm_spec!(4, 4, 4)]
    Float(f32),
    /// A long.
    #[doc = see_jvm_spec!(4, 4, 5)]
    Long(i64),
    /// A double.
    #[doc = see_jvm_spec!(4, 4, 5)]
    Double(f64),
    /// A class.
    #[doc = see_jvm_spec!(4, 4, 1)]
    Class {
        /// The index in the constant pool of its binary name.
        name_index: u16,
    },
    /// A string.
    #[doc = see_jvm_spec!(4, 4, 3)]
    String {
        /// The index in the constant pool of its UTF-8 value.
        string_index: u16,
    },
    /// A field reference.
    #[doc = see_jvm_spec!(4, 4, 2)]
    FieldRef {
        /// The index of the [`Entry::Class`] containing the field.
        class_index: u16,
        /// The index of the [`Entry::NameAndType`] of the field.
        name_and_type_index: u16,
    },
    /// A method reference.
    #[doc = see_jvm_spec!(4, 4, 2)]
    MethodRef {
        /// The index of the [`Entry::Class`] containing the method.
        class_index: u16,
        /// The index of the [`Entry::NameAndType`] of the method.
        name_and_type_index: u16,
    },
    /// An interface method reference.
    #[doc = see_jvm_spec!(4, 4, 2)]
    InterfaceMethodRef {
        /// The index of the [`Entry::Class`] of the interface containing the method.
        class_index: u16,
        /// The index of the [`Entry::NameAndType`] of the method.
        name_and_type_index: u16,
    },
    /// A name and type.
    #[doc = see_jvm_spec!(4, 4, 6)]
    NameAndType {
        /// The index of the [`Entry::Utf8`] containing the name.
        name_index: u16,
        /// The index of the [`Entry::Utf8`] containing the descriptor.
        descriptor_index: u16,
    },
    /// A method handle.
    #[doc = see_jvm_spec!(4, 4, 8)]
    MethodHandle {
        /// The kind of method handle.
        reference_kind: u8,
        /// The index of the field or method the handle refers to.
        reference_index: u16,
    },
    /// A method type.
    #[doc = see_jvm_spec!(4, 4, 9)]
    MethodType {
        /// The index of the [`Entry::Utf8`] containing the descriptor.
        descriptor_index: u16,
    },
    /// A dynamically computed constant.
    #[doc = see_jvm_spec!(4, 4, 10)]
    Dynamic {
        /// The index of the bootstrap method in the bootstrap method table.
        bootstrap_method_attr_index: u16,
        /// The index of the [`Entry::NameAndType`] of the constant.
        name_and_type_index: u16,
    },
    /// An invokedynamic call site.
    #[doc = see_jvm_spec!(4, 4, 10)]
    InvokeDynamic {
        /// The index of the bootstrap method in the bootstrap method table.
        bootstrap_method_attr_index: u16,
        /// The index of the [`Entry::NameAndType`] of the call site.
        name_and_type_index: u16,
    },
    /// A module.
    #[doc = see_jvm_spec!(4, 4, 11)]
    Module {
        /// The index of the [`Entry::Utf8`] containing the name.
        name_index: u16,
    },
    /// A package.
    #[doc = see_jvm_spec!(4, 4, 12)]
    Package {
        /// The index of the [`Entry::Utf8`] containing the name.
        name_index: u16,
    },
}

impl Eq for Entry {}

impl Entry {
    /// Returns the tag of this constant pool entry.
    #[must_use]
    pub const fn tag(&self) -> u8 {
        match self {
            Self::Utf8(_) => 1,
            Self::Integer(_) => 3,
            Self::Float(_) => 4,
            Self::Long(_) => 5,
            Self::Double(_) => 6,
            Self::Class { .. } => 7,
            Self::String { .. } => 8,
            Self::FieldRef { .. } => 9,
            Self::MethodRef { .. } => 10,
            Self::InterfaceMethodRef { .. } => 11,
            Self::NameAndType { .. } => 12,
            Self::MethodHandle { .. } => 15,
            Self::MethodType { .. } => 16,
            Self::Dynamic { .. } => 17,
            Self::InvokeDynamic { .. } => 18,
            Self::Module { .. } => 19,
            Self::Package { .. } => 20,
        }
    }

    /// Checks whether the entry takes up two slots in the pool.
    #[must_use]
    pub const fn is_wide(&self) -> bool {
        matches!(self, Self::Long(_) | Self::Double(_))
    }

    /// Gets the kind of this constant pool entry.
    #[must_use]
    pub const fn constant_kind(&self) -> &'static str {
        match self {
            Self::Utf8(_) => "CONSTANT_Utf8",
            Self::Integer(_) => "CONSTANT_Integer",
            Self::Float(_) => "CONSTANT_Float",
            Self::Long(_) => "CONSTANT_Long",
            Self::Double(_) => "CONSTANT_Double",
            Self::Class { .. } => "CONSTANT_Class",
            Self::String { .. } => "CONSTANT_String",
            Self::FieldRef { .. } => "CONSTANT_Fieldref",
            Self::MethodRef { .. } => "CONSTANT_Methodref",
            Self::InterfaceMethodRef { .. } => "CONSTANT_InterfaceMethodref",
            Self::NameAndType { .. } => "CONSTANT_NameAndType",
            Self::MethodHandle { .. } => "CONSTANT_MethodHandle",
            Self::MethodType { .. } => "CONSTANT_MethodType",
            Self::Dynamic { .. } => "CONSTANT_Dynamic",
            Self::InvokeDynamic { .. } => "CONSTANT_InvokeDynamic",
            Self::Module { .. } => "CONSTANT_Module",
            Self::Package { .. } => "CONSTANT_Package",
        }
    }
}
