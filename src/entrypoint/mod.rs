//! Locating the game entry point behind a `main` wrapper and injecting the loader hooks.
//!
//! [`EntrypointTransformer`] drives the pass: [`locate`] finds the game class,
//! [`patch_constructors`] wires the start hook into its constructors and
//! [`apply_branding_patch`] reroutes the brand accessors. The encoded results are kept in a
//! [`PatchRegistry`].

mod branding;
mod config;
mod env;
mod error;
mod locator;
mod patcher;
mod registry;
mod transformer;

pub use branding::apply_branding_patch;
pub use config::{HookTargets, TransformerConfig};
pub use env::{ClassPathLauncher, EnvType, Launcher, UnknownEnvType};
pub use error::{Stage, TransformError};
pub use locator::{LocatedEntrypoint, Route, is_main_method, locate};
pub use patcher::{PatchStrategy, is_applet, patch_constructors};
pub use registry::PatchRegistry;
pub use transformer::{EntrypointTransformer, TransformerState};
