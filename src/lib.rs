#![warn(
    clippy::pedantic,
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms
)]
#![deny(rustdoc::broken_intra_doc_links)]

//! `entrypatch` finds the real game entry point behind a thin `main` wrapper in a JVM program
//! and injects calls to loader hooks into its constructor.
//!
//! The pipeline has three layers:
//! - [`jvm`] decodes class files into a mutable model and encodes them back,
//! - [`entrypoint`] runs the locating heuristics and the patch strategies,
//! - [`types`] holds the descriptor types shared by both.
//!
//! ## Features
#![doc = document_features::document_features!()]

pub mod entrypoint;
pub mod jvm;
pub(crate) mod macros;
pub mod types;

/// Test utilities
#[cfg(test)]
pub mod tests;
