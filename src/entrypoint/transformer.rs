//! The entry point pass: locate, patch, brand, register.

use super::{
    Launcher, LocatedEntrypoint, PatchRegistry, PatchStrategy, Stage, TransformError,
    TransformerConfig, apply_branding_patch, is_applet, locate, patch_constructors,
};
use crate::jvm::Class;

/// The progress of an [`EntrypointTransformer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformerState {
    /// The pass has not run yet.
    Unstarted,
    /// The pass succeeded.
    Located(LocatedEntrypoint),
    /// The pass failed with the given diagnostic.
    Failed(String),
}

/// Locates the game entry point through a [`Launcher`] and holds the patched classes.
///
/// The pass runs at most once; [`transform`](Self::transform) serves its result.
#[derive(Debug)]
pub struct EntrypointTransformer {
    config: TransformerConfig,
    state: TransformerState,
    registry: PatchRegistry,
    applet_main_class: Option<String>,
}

/// What a successful pass produces.
#[derive(Debug)]
struct PassOutcome {
    located: LocatedEntrypoint,
    registry: PatchRegistry,
    applet_main_class: Option<String>,
}

impl Default for EntrypointTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl EntrypointTransformer {
    /// Creates a transformer calling the standard hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TransformerConfig::default())
    }

    /// Creates a transformer with a custom configuration.
    #[must_use]
    pub fn with_config(config: TransformerConfig) -> Self {
        Self {
            config,
            state: TransformerState::Unstarted,
            registry: PatchRegistry::new(),
            applet_main_class: None,
        }
    }

    /// Gets the configuration.
    #[must_use]
    pub const fn config(&self) -> &TransformerConfig {
        &self.config
    }

    /// Gets the progress of the pass.
    #[must_use]
    pub const fn state(&self) -> &TransformerState {
        &self.state
    }

    /// Gets the located entry point, if the pass succeeded.
    #[must_use]
    pub const fn located(&self) -> Option<&LocatedEntrypoint> {
        match &self.state {
            TransformerState::Located(located) => Some(located),
            _ => None,
        }
    }

    /// Gets the entry class, with `.` as the package separator, if it is an applet launcher.
    #[must_use]
    pub fn applet_main_class(&self) -> Option<&str> {
        self.applet_main_class.as_deref()
    }

    /// Gets the patched classes.
    #[must_use]
    pub const fn registry(&self) -> &PatchRegistry {
        &self.registry
    }

    /// Gets the patched bytes of a class, or `None` if the class is not patched or the pass has
    /// not succeeded.
    #[must_use]
    pub fn transform(&self, class_name: &str) -> Option<&[u8]> {
        self.registry.get(class_name)
    }

    /// Runs the pass unless it has already run. Succeeds silently if it already succeeded.
    ///
    /// Patched classes become visible only if the whole pass succeeds.
    /// # Errors
    /// - [`TransformError::AlreadyFailed`] if an earlier run failed.
    /// - Any other [`TransformError`] stops the pass and leaves the transformer failed.
    pub fn locate_entrypoints<L>(&mut self, launcher: &L) -> Result<(), TransformError>
    where
        L: Launcher + ?Sized,
    {
        match &self.state {
            TransformerState::Located(_) => return Ok(()),
            TransformerState::Failed(diagnostic) => {
                return Err(TransformError::AlreadyFailed(diagnostic.clone()));
            }
            TransformerState::Unstarted => {}
        }
        match self.run(launcher) {
            Ok(outcome) => {
                tracing::info!(
                    entry_class = %outcome.located.entry_class,
                    game_class = %outcome.located.game_class,
                    route = %outcome.located.route,
                    patched_classes = outcome.registry.len(),
                    "Located entry point"
                );
                self.registry = outcome.registry;
                self.applet_main_class = outcome.applet_main_class;
                self.state = TransformerState::Located(outcome.located);
                Ok(())
            }
            Err(err) => {
                self.state = TransformerState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    fn run<L>(&self, launcher: &L) -> Result<PassOutcome, TransformError>
    where
        L: Launcher + ?Sized,
    {
        let env = launcher.environment_type();
        let entrypoint = launcher.entrypoint().replace('/', ".");
        let mut entry_class = load_class(launcher, Stage::EntryClass, &entrypoint)?;
        let located = locate(env, &entry_class)?;
        tracing::debug!(
            "Found game constructor: {} -> {}",
            located.entry_class,
            located.game_class
        );

        let strategy = PatchStrategy::select(env, &located);
        let mut registry = PatchRegistry::new();
        if located.is_self_hosted() {
            self.patch_game_class(&mut entry_class, strategy)?;
            self.brand(&mut entry_class)?;
            register(&mut registry, &entry_class)?;
        } else {
            let mut game_class = load_class(launcher, Stage::GameClass, &located.game_class)?;
            self.patch_game_class(&mut game_class, strategy)?;
            register(&mut registry, &game_class)?;
            if self.brand(&mut entry_class)? {
                register(&mut registry, &entry_class)?;
            }
        }

        for brand_class in &self.config.brand_classes {
            if registry.contains(brand_class) {
                continue;
            }
            let Some(bytes) = launcher.class_bytes(brand_class) else {
                continue;
            };
            let mut class = decode(brand_class, &bytes)?;
            if self.brand(&mut class)? {
                register(&mut registry, &class)?;
            }
        }

        Ok(PassOutcome {
            applet_main_class: is_applet(&entrypoint).then_some(entrypoint),
            located,
            registry,
        })
    }

    fn patch_game_class(
        &self,
        class: &mut Class,
        strategy: PatchStrategy,
    ) -> Result<(), TransformError> {
        let patched = patch_constructors(class, strategy, &self.config.hooks).map_err(|source| {
            TransformError::InsertionFailed {
                class: class.dotted_name(),
                source,
            }
        })?;
        if patched {
            Ok(())
        } else {
            Err(TransformError::PatchNotApplied {
                class: class.dotted_name(),
            })
        }
    }

    fn brand(&self, class: &mut Class) -> Result<bool, TransformError> {
        apply_branding_patch(class, &self.config).map_err(|source| {
            TransformError::InsertionFailed {
                class: class.dotted_name(),
                source,
            }
        })
    }
}

fn load_class<L>(launcher: &L, stage: Stage, name: &str) -> Result<Class, TransformError>
where
    L: Launcher + ?Sized,
{
    let bytes = launcher
        .class_bytes(name)
        .ok_or_else(|| TransformError::ClassNotFound {
            stage,
            class: name.to_owned(),
        })?;
    decode(name, &bytes)
}

fn decode(name: &str, bytes: &[u8]) -> Result<Class, TransformError> {
    Class::from_bytes(bytes).map_err(|source| TransformError::MalformedBinary {
        class: name.to_owned(),
        source,
    })
}

fn register(registry: &mut PatchRegistry, class: &Class) -> Result<(), TransformError> {
    let class_name = class.dotted_name();
    let bytes = class
        .to_bytes()
        .map_err(|source| TransformError::EncodingFailed {
            class: class_name.clone(),
            source,
        })?;
    registry.register(&class_name, bytes)
}
