//! Injecting the start hook into the constructors of the game class.

use super::{EnvType, HookTargets, LocatedEntrypoint};
use crate::{
    jvm::{
        Class,
        code::{FieldOp, Instruction, InvokeKind, MethodBody, PositionOutOfBounds},
        references::{ClassRef, FieldRef},
    },
    types::method_descriptor::MethodDescriptor,
};

const FILE: &str = "java/io/File";

/// How the start hook is wired into a constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchStrategy {
    /// Call the server hook before the constructor returns.
    Server {
        /// Whether the run directory is passed to the constructor as its first argument.
        has_file: bool,
    },
    /// Resolve the run directory of an applet-style client, then call the client hook.
    Applet,
    /// Call the client hook right after the run directory field is assigned.
    DefaultClient,
}

impl PatchStrategy {
    /// Picks the strategy for a located entry point.
    #[must_use]
    pub fn select(env: EnvType, located: &LocatedEntrypoint) -> Self {
        match env {
            EnvType::Server => Self::Server {
                has_file: located.server_has_file,
            },
            EnvType::Client if is_applet(&located.entry_class) => Self::Applet,
            EnvType::Client => Self::DefaultClient,
        }
    }
}

/// Checks whether the entry class is an applet launcher, judging by its name.
#[must_use]
pub fn is_applet(entry_class: &str) -> bool {
    entry_class.contains("Applet")
}

/// Patches every constructor of `class` with `strategy`.
///
/// Returns whether at least one constructor was patched.
/// # Errors
/// - [`PositionOutOfBounds`] if an insertion point is not in the constructor.
pub fn patch_constructors(
    class: &mut Class,
    strategy: PatchStrategy,
    hooks: &HookTargets,
) -> Result<bool, PositionOutOfBounds> {
    let owner = class.make_ref();
    let super_class = class.super_class.clone();
    let run_directory = run_directory_field(class);
    if strategy == PatchStrategy::Applet && run_directory.is_none() {
        tracing::warn!(
            "Could not find applet run directory! (If you're running pre-late-indev versions, this is fine.)"
        );
    }

    let mut patched = false;
    for constructor in class.find_methods_mut(|it| it.is_constructor()) {
        let Some(body) = constructor.body.as_mut() else {
            continue;
        };
        tracing::debug!(class = %owner, descriptor = %constructor.descriptor, "Patching game constructor");
        patched |= match strategy {
            PatchStrategy::Server { has_file } => {
                patch_server(body, &constructor.descriptor, has_file, hooks)?
            }
            PatchStrategy::Applet => patch_applet(
                body,
                super_class.as_ref(),
                run_directory.as_ref(),
                hooks,
            )?,
            PatchStrategy::DefaultClient => patch_default_client(body, hooks)?,
        };
    }
    Ok(patched)
}

/// Finds the static field holding the run directory of an applet-style client.
fn run_directory_field(class: &Class) -> Option<FieldRef> {
    class
        .find_field(|it| it.is_static() && it.field_type.is_class(FILE))
        .map(|it| it.make_ref(class.make_ref()))
}

fn patch_server(
    body: &mut MethodBody,
    descriptor: &MethodDescriptor,
    has_file: bool,
    hooks: &HookTargets,
) -> Result<bool, PositionOutOfBounds> {
    let Some(ret) = body.instructions.position(Instruction::is_void_return) else {
        return Ok(false);
    };
    let takes_file = descriptor
        .first_parameter()
        .is_some_and(|it| it.is_class(FILE));
    let run_directory = if has_file && takes_file {
        Instruction::aload(1)
    } else {
        Instruction::aconst_null()
    };
    body.insert_before(
        ret,
        vec![
            run_directory,
            Instruction::aload(0),
            Instruction::invoke_static(hooks.server_start.clone()),
        ],
    )?;
    Ok(true)
}

fn patch_applet(
    body: &mut MethodBody,
    super_class: Option<&ClassRef>,
    run_directory: Option<&FieldRef>,
    hooks: &HookTargets,
) -> Result<bool, PositionOutOfBounds> {
    let start = Instruction::invoke_static(hooks.client_start.clone());
    let resolve = Instruction::invoke_static(hooks.game_directory.clone());
    let Some(field) = run_directory else {
        let Some(ret) = body.instructions.position(Instruction::is_void_return) else {
            return Ok(false);
        };
        body.insert_before(
            ret,
            vec![Instruction::aconst_null(), resolve, Instruction::aload(0), start],
        )?;
        return Ok(true);
    };

    let Some(super_init) = super_class.and_then(|super_class| {
        body.instructions.position(|insn| {
            matches!(
                insn.invocation(),
                Some((InvokeKind::Special, method))
                    if method.is_constructor() && method.owner == *super_class
            )
        })
    }) else {
        return Ok(false);
    };
    let Some(ret) = body
        .instructions
        .position_from(super_init + 1, Instruction::is_void_return)
    else {
        return Ok(false);
    };
    // The later site first so that `super_init` stays valid.
    body.insert_before(
        ret,
        vec![
            Instruction::get_static(field.clone()),
            Instruction::aload(0),
            start,
        ],
    )?;
    body.insert_after(
        super_init,
        vec![
            Instruction::get_static(field.clone()),
            resolve,
            Instruction::put_static(field.clone()),
        ],
    )?;
    Ok(true)
}

fn patch_default_client(
    body: &mut MethodBody,
    hooks: &HookTargets,
) -> Result<bool, PositionOutOfBounds> {
    let found = body.instructions.iter().enumerate().find_map(|(pos, insn)| {
        match insn.field_access() {
            Some((FieldOp::PutField, field)) if field.field_type.is_class(FILE) => {
                Some((pos, field.clone()))
            }
            _ => None,
        }
    });
    let Some((pos, field)) = found else {
        return Ok(false);
    };
    tracing::debug!("Run directory field is thought to be {}", field);
    body.insert_after(
        pos,
        vec![
            Instruction::aload(0),
            Instruction::get_field(field),
            Instruction::aload(0),
            Instruction::invoke_static(hooks.client_start.clone()),
        ],
    )?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entrypoint::Route,
        jvm::{class::Version, field, method},
        tests::{constructor_call, method_with_code},
        types::field_type::FieldType,
    };

    const GAME: &str = "net/minecraft/client/Minecraft";

    fn located(entry_class: &str, server_has_file: bool) -> LocatedEntrypoint {
        LocatedEntrypoint {
            entry_class: entry_class.to_owned(),
            game_class: GAME.replace('/', "."),
            route: Route::BackwardScan,
            server_has_file,
        }
    }

    fn game_class(constructor_descriptor: &str, insns: Vec<Instruction>) -> Class {
        let mut class = Class::new(GAME, Version::new(52, 0));
        class.methods.push(method_with_code(
            method::AccessFlags::PUBLIC,
            "<init>",
            constructor_descriptor,
            insns,
        ));
        class
    }

    fn super_init() -> Instruction {
        constructor_call("java/lang/Object", "()V")
    }

    fn ret() -> Instruction {
        Instruction::simple(crate::jvm::code::opcodes::RETURN)
    }

    fn file_field(owner: &str, name: &str) -> FieldRef {
        FieldRef {
            owner: ClassRef::new(owner),
            name: name.to_owned(),
            field_type: FieldType::Object(ClassRef::new(FILE)),
        }
    }

    fn constructor_code(class: &Class) -> Vec<Instruction> {
        class.methods[0]
            .body
            .as_ref()
            .unwrap()
            .instructions
            .iter()
            .cloned()
            .collect()
    }

    #[test]
    fn strategy_selection() {
        assert_eq!(
            PatchStrategy::select(EnvType::Server, &located("a.Main", true)),
            PatchStrategy::Server { has_file: true }
        );
        assert_eq!(
            PatchStrategy::select(EnvType::Client, &located("net.minecraft.client.MinecraftApplet", false)),
            PatchStrategy::Applet
        );
        assert_eq!(
            PatchStrategy::select(EnvType::Client, &located("net.minecraft.client.main.Main", false)),
            PatchStrategy::DefaultClient
        );
    }

    #[test]
    fn server_passes_run_directory() {
        let hooks = HookTargets::default();
        let mut class = game_class(
            "(Ljava/io/File;)V",
            vec![Instruction::aload(0), super_init(), ret()],
        );
        let patched =
            patch_constructors(&mut class, PatchStrategy::Server { has_file: true }, &hooks).unwrap();
        assert!(patched);
        assert_eq!(
            constructor_code(&class),
            vec![
                Instruction::aload(0),
                super_init(),
                Instruction::aload(1),
                Instruction::aload(0),
                Instruction::invoke_static(hooks.server_start.clone()),
                ret(),
            ]
        );
        assert_eq!(class.methods[0].body.as_ref().unwrap().max_stack, 4);
    }

    #[test]
    fn server_without_file_parameter_passes_null() {
        let hooks = HookTargets::default();
        let mut class = game_class("(I)V", vec![Instruction::aload(0), super_init(), ret()]);
        assert!(
            patch_constructors(&mut class, PatchStrategy::Server { has_file: true }, &hooks).unwrap()
        );
        assert_eq!(constructor_code(&class)[2], Instruction::aconst_null());
    }

    #[test]
    fn constructor_without_return_is_skipped() {
        let hooks = HookTargets::default();
        let athrow = Instruction::simple(crate::jvm::code::opcodes::ATHROW);
        let mut class = game_class("()V", vec![Instruction::aconst_null(), athrow]);
        assert!(
            !patch_constructors(&mut class, PatchStrategy::Server { has_file: false }, &hooks).unwrap()
        );
        assert_eq!(constructor_code(&class).len(), 2);
    }

    #[test]
    fn default_client_hooks_after_assignment() {
        let hooks = HookTargets::default();
        let game_dir = file_field(GAME, "gameDir");
        let mut class = game_class(
            "(Ljava/io/File;)V",
            vec![
                Instruction::aload(0),
                super_init(),
                Instruction::aload(0),
                Instruction::aload(1),
                Instruction::put_field(game_dir.clone()),
                ret(),
            ],
        );
        assert!(patch_constructors(&mut class, PatchStrategy::DefaultClient, &hooks).unwrap());
        assert_eq!(
            constructor_code(&class)[5..],
            [
                Instruction::aload(0),
                Instruction::get_field(game_dir),
                Instruction::aload(0),
                Instruction::invoke_static(hooks.client_start.clone()),
                ret(),
            ]
        );
    }

    #[test]
    fn default_client_without_file_field() {
        let hooks = HookTargets::default();
        let mut class = game_class("()V", vec![Instruction::aload(0), super_init(), ret()]);
        assert!(!patch_constructors(&mut class, PatchStrategy::DefaultClient, &hooks).unwrap());
    }

    #[test]
    fn applet_with_run_directory_field() {
        let hooks = HookTargets::default();
        let mut class = game_class("()V", vec![Instruction::aload(0), super_init(), ret()]);
        class.fields.push(crate::jvm::Field::new(
            field::AccessFlags::PUBLIC | field::AccessFlags::STATIC,
            "minecraftDir",
            FieldType::Object(ClassRef::new(FILE)),
        ));
        let field = file_field(GAME, "minecraftDir");
        assert!(patch_constructors(&mut class, PatchStrategy::Applet, &hooks).unwrap());
        assert_eq!(
            constructor_code(&class),
            vec![
                Instruction::aload(0),
                super_init(),
                Instruction::get_static(field.clone()),
                Instruction::invoke_static(hooks.game_directory.clone()),
                Instruction::put_static(field.clone()),
                Instruction::get_static(field),
                Instruction::aload(0),
                Instruction::invoke_static(hooks.client_start.clone()),
                ret(),
            ]
        );
    }

    #[test]
    fn applet_without_run_directory_field() {
        let hooks = HookTargets::default();
        let mut class = game_class("()V", vec![Instruction::aload(0), super_init(), ret()]);
        assert!(patch_constructors(&mut class, PatchStrategy::Applet, &hooks).unwrap());
        assert_eq!(
            constructor_code(&class)[2..],
            [
                Instruction::aconst_null(),
                Instruction::invoke_static(hooks.game_directory.clone()),
                Instruction::aload(0),
                Instruction::invoke_static(hooks.client_start.clone()),
                ret(),
            ]
        );
    }
}
