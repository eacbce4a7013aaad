//! Errors of the entry point pass.

use crate::jvm::{
    bytecode::{GenerationError, ParseError},
    code::PositionOutOfBounds,
};

/// Which class the transformer was after when a lookup failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum Stage {
    /// The declared entry class.
    #[display("entry class")]
    EntryClass,
    /// The class constructed by the entry class.
    #[display("game class")]
    GameClass,
}

/// An error that stops the entry point pass.
///
/// Any of these leaves the transformer failed; later calls report [`TransformError::AlreadyFailed`].
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// The launcher does not have the class.
    #[error("Could not load {stage} {class}")]
    ClassNotFound {
        /// What the class was supposed to be.
        stage: Stage,
        /// The name of the class.
        class: String,
    },
    /// Only the legacy field heuristic works without a `main` method.
    #[error("Could not find main method in {class}")]
    NoMainMethod {
        /// The entry class.
        class: String,
    },
    /// No heuristic found the game class.
    #[error("Could not find game constructor in {class}")]
    NoEntryPointHeuristicMatch {
        /// The entry class.
        class: String,
    },
    /// None of the constructors of the game class could be patched.
    #[error("Game constructor patch not applied to {class}")]
    PatchNotApplied {
        /// The game class.
        class: String,
    },
    /// A class was registered twice.
    #[error("Patched class {class} is already registered")]
    DuplicateRegistration {
        /// The class.
        class: String,
    },
    /// The class file could not be decoded.
    #[error("Malformed class file for {class}: {source}")]
    MalformedBinary {
        /// The class.
        class: String,
        /// The cause.
        #[source]
        source: ParseError,
    },
    /// The patched class could not be encoded.
    #[error("Failed to encode patched class {class}: {source}")]
    EncodingFailed {
        /// The class.
        class: String,
        /// The cause.
        #[source]
        source: GenerationError,
    },
    /// An insertion point computed by a patch is not in the method.
    #[error("Failed to insert hook code into {class}: {source}")]
    InsertionFailed {
        /// The class.
        class: String,
        /// The cause.
        #[source]
        source: PositionOutOfBounds,
    },
    /// An earlier run of the pass failed.
    #[error("Locating the entry point failed earlier: {0}")]
    AlreadyFailed(String),
}
