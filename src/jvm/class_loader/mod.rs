//! Discovering and loading classes.

use std::ops::Deref;

use super::{bytecode::ParseError, class::Class};

pub mod class_paths;

/// An error that can occur while loading a class.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The class could not be found.
    #[error("Class not found: {0}")]
    NotFound(String),
    /// Error occurred while parsing the class bytes.
    #[error("Error parsing class bytes: {0}")]
    Malformed(#[from] ParseError),
    /// Error occurred while reading the class bytes or locating the class file.
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    /// Other error occurred.
    #[error("Cause: {0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// A class path that can be searched for classes.
pub trait ClassPath {
    /// Finds the content of the class file for a class by its binary name, e.g.,
    /// `net/minecraft/client/Minecraft`.
    ///
    /// # Errors
    /// - [`Error::NotFound`] if the class path does not contain the class.
    /// - Other variants of [`Error`] if the class path cannot be read.
    fn find_class_bytes(&self, binary_name: &str) -> Result<Vec<u8>, Error>;
}

impl<T> ClassPath for T
where
    T: Deref,
    <T as Deref>::Target: ClassPath,
{
    fn find_class_bytes(&self, binary_name: &str) -> Result<Vec<u8>, Error> {
        self.deref().find_class_bytes(binary_name)
    }
}

/// A class loader that searches a list of class paths in order.
#[derive(Debug)]
pub struct ClassLoader<P> {
    class_path: Vec<P>,
}

impl<P> ClassLoader<P> {
    /// Creates a new class loader with the given class paths.
    #[must_use]
    pub fn new(class_path: impl Into<Vec<P>>) -> Self {
        let class_path = class_path.into();
        Self { class_path }
    }
}

impl<P: ClassPath> ClassLoader<P> {
    /// Finds the content of the class file for a class, taking it from the first class path that
    /// contains it.
    ///
    /// # Errors
    /// See [`Error`].
    pub fn load_class_bytes(&self, binary_name: impl AsRef<str>) -> Result<Vec<u8>, Error> {
        for class_path in &self.class_path {
            match class_path.find_class_bytes(binary_name.as_ref()) {
                Ok(bytes) => return Ok(bytes),
                Err(Error::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Err(Error::NotFound(binary_name.as_ref().to_owned()))
    }

    /// Loads and decodes a class.
    ///
    /// # Errors
    /// See [`Error`].
    pub fn load_class(&self, binary_name: impl AsRef<str>) -> Result<Class, Error> {
        let bytes = self.load_class_bytes(binary_name)?;
        Ok(Class::from_bytes(&bytes)?)
    }
}
