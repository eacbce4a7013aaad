//! Implementations of [`ClassPath`].

use std::{collections::HashMap, fs, path::PathBuf};

#[cfg(feature = "jar")]
use std::{fs::File, io::BufReader, io::Read};

#[cfg(feature = "jar")]
use zip::{ZipArchive, result::ZipError};

use super::{ClassPath, Error};

/// A class path that searches for classes in a directory.
#[derive(Debug)]
pub struct DirectoryClassPath {
    directory: PathBuf,
}

impl DirectoryClassPath {
    /// Creates a new directory class path.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

impl ClassPath for DirectoryClassPath {
    fn find_class_bytes(&self, binary_name: &str) -> Result<Vec<u8>, Error> {
        let class_file_path = self.directory.join(format!("{binary_name}.class"));
        if class_file_path.is_file() {
            Ok(fs::read(class_file_path)?)
        } else {
            Err(Error::NotFound(binary_name.to_owned()))
        }
    }
}

/// A class path that searches for classes in a JAR file.
#[derive(Debug)]
#[cfg(feature = "jar")]
pub struct JarClassPath {
    jar_file: PathBuf,
}

#[cfg(feature = "jar")]
impl JarClassPath {
    /// Creates a new JAR class path.
    pub fn new(jar_file: impl Into<PathBuf>) -> Self {
        Self {
            jar_file: jar_file.into(),
        }
    }
}

#[cfg(feature = "jar")]
impl ClassPath for JarClassPath {
    fn find_class_bytes(&self, binary_name: &str) -> Result<Vec<u8>, Error> {
        let jar_file = File::open(&self.jar_file)?;
        let jar_reader = BufReader::new(jar_file);
        let mut jar_archive = ZipArchive::new(jar_reader).map_err(|e| match e {
            ZipError::Io(io_err) => Error::IO(io_err),
            e => Error::Other(Box::new(e)),
        })?;
        let mut class_file = jar_archive
            .by_name(&format!("{binary_name}.class"))
            .map_err(|e| match e {
                ZipError::FileNotFound => Error::NotFound(binary_name.to_owned()),
                ZipError::Io(io_err) => Error::IO(io_err),
                e => Error::Other(Box::new(e)),
            })?;
        let mut bytes = Vec::new();
        class_file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

/// A class path holding class files in memory, keyed by binary name.
#[derive(Debug, Default, Clone)]
pub struct MemoryClassPath {
    classes: HashMap<String, Vec<u8>>,
}

impl MemoryClassPath {
    /// Creates an empty class path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a class file, replacing any previous one for the same class. Names may use either
    /// `/` or `.` as the package separator.
    pub fn insert(&mut self, name: impl AsRef<str>, bytes: Vec<u8>) -> Option<Vec<u8>> {
        self.classes.insert(name.as_ref().replace('.', "/"), bytes)
    }
}

impl FromIterator<(String, Vec<u8>)> for MemoryClassPath {
    fn from_iter<T: IntoIterator<Item = (String, Vec<u8>)>>(iter: T) -> Self {
        let mut class_path = Self::new();
        for (name, bytes) in iter {
            class_path.insert(name, bytes);
        }
        class_path
    }
}

impl ClassPath for MemoryClassPath {
    fn find_class_bytes(&self, binary_name: &str) -> Result<Vec<u8>, Error> {
        self.classes
            .get(binary_name)
            .cloned()
            .ok_or_else(|| Error::NotFound(binary_name.to_owned()))
    }
}
