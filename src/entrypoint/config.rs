//! Hook targets and other knobs of the transformer.

use super::EnvType;
use crate::{
    jvm::references::{ClassRef, MethodRef},
    types::{
        field_type::FieldType,
        method_descriptor::{MethodDescriptor, ReturnType},
    },
};

const HOOK_PACKAGE: &str = "net/fabricmc/loader/entrypoint";
const FILE: &str = "java/io/File";
const OBJECT: &str = "java/lang/Object";
const STRING: &str = "java/lang/String";

/// The static methods injected code calls into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookTargets {
    /// `start(File, Object) -> void` called by patched clients.
    pub client_start: MethodRef,
    /// `start(File, Object) -> void` called by patched servers.
    pub server_start: MethodRef,
    /// `(File) -> File`, resolving the run directory of applet-style clients.
    pub game_directory: MethodRef,
    /// `(String) -> String`, rewriting the brand reported by the game.
    pub brand: MethodRef,
}

impl HookTargets {
    /// Gets the start hook for the environment.
    #[must_use]
    pub const fn start(&self, env: EnvType) -> &MethodRef {
        match env {
            EnvType::Client => &self.client_start,
            EnvType::Server => &self.server_start,
        }
    }
}

fn object(binary_name: &str) -> FieldType {
    FieldType::Object(ClassRef::new(binary_name))
}

fn hook(owner: &str, name: &str, parameters_types: Vec<FieldType>, return_type: ReturnType) -> MethodRef {
    MethodRef {
        owner: ClassRef::new(format!("{HOOK_PACKAGE}/{owner}")),
        name: name.to_owned(),
        descriptor: MethodDescriptor {
            parameters_types,
            return_type,
        },
    }
}

impl Default for HookTargets {
    fn default() -> Self {
        let start_params = || vec![object(FILE), object(OBJECT)];
        Self {
            client_start: hook("EntrypointClient", "start", start_params(), ReturnType::Void),
            server_start: hook("EntrypointServer", "start", start_params(), ReturnType::Void),
            game_directory: hook(
                "AppletMain",
                "hookGameDir",
                vec![object(FILE)],
                ReturnType::Some(object(FILE)),
            ),
            brand: hook(
                "EntrypointBranding",
                "brand",
                vec![object(STRING)],
                ReturnType::Some(object(STRING)),
            ),
        }
    }
}

/// Configuration of an [`EntrypointTransformer`](super::EntrypointTransformer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformerConfig {
    /// The hooks injected code calls.
    pub hooks: HookTargets,
    /// Classes, with `.` as the package separator, whose brand accessors are patched after the
    /// entry point.
    pub brand_classes: Vec<String>,
    /// Names of the methods reporting the brand.
    pub brand_methods: Vec<String>,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            hooks: HookTargets::default(),
            brand_classes: vec![
                "net.minecraft.client.ClientBrandRetriever".to_owned(),
                "net.minecraft.server.MinecraftServer".to_owned(),
            ],
            brand_methods: vec!["getClientModName".to_owned(), "getServerModName".to_owned()],
        }
    }
}
