//! Patched class files, keyed by class name.

use std::collections::{HashMap, hash_map::Entry};

use super::TransformError;

/// Holds the encoded form of every patched class. Each class is registered at most once.
///
/// Names are stored with `.` as the package separator; lookups accept either separator.
#[derive(Debug, Default, Clone)]
pub struct PatchRegistry {
    classes: HashMap<String, Vec<u8>>,
}

fn normalize(name: &str) -> String {
    name.replace('/', ".")
}

impl PatchRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the patched bytes of a class.
    /// # Errors
    /// - [`TransformError::DuplicateRegistration`] if the class is already registered, in which
    ///   case the first registration is kept.
    pub fn register(&mut self, name: &str, bytes: Vec<u8>) -> Result<(), TransformError> {
        match self.classes.entry(normalize(name)) {
            Entry::Occupied(it) => Err(TransformError::DuplicateRegistration {
                class: it.key().clone(),
            }),
            Entry::Vacant(it) => {
                it.insert(bytes);
                Ok(())
            }
        }
    }

    /// Gets the patched bytes of a class.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.classes.get(&normalize(name)).map(Vec::as_slice)
    }

    /// Checks whether a class is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(&normalize(name))
    }

    /// Gets the number of registered classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Checks whether no class is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterates over the registered class names and their bytes, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.classes
            .iter()
            .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
    }
}
