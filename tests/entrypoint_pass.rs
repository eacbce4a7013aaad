use entrypatch::{
    entrypoint::{EntrypointTransformer, EnvType, HookTargets, Route, TransformError},
    jvm::{
        Class, Field,
        class::Version,
        code::{Instruction, InvokeKind, opcodes},
        field, method,
        references::ClassRef,
    },
    types::field_type::FieldType,
};

mod common;
use common::*;

const CLIENT_MAIN: &str = "net/minecraft/client/main/Main";
const MINECRAFT: &str = "net/minecraft/client/Minecraft";
const SERVER_MAIN: &str = "net/minecraft/server/Main";
const DEDICATED_SERVER: &str = "net/minecraft/server/dedicated/DedicatedServer";
const MINECRAFT_SERVER: &str = "net/minecraft/server/MinecraftServer";
const CLIENT_BRAND: &str = "net/minecraft/client/ClientBrandRetriever";

fn modern_client_main() -> Class {
    wrapper_class(
        CLIENT_MAIN,
        vec![
            new_object("java/io/File", "(Ljava/lang/String;)V"),
            new_object(MINECRAFT, "(Ljava/io/File;)V"),
            call(InvokeKind::Virtual, MINECRAFT, "run", "()V"),
            call(InvokeKind::Virtual, "java/lang/Thread", "start", "()V"),
        ],
    )
}

fn is_brand_hook(insn: &Instruction) -> bool {
    matches!(
        insn.invocation(),
        Some((InvokeKind::Static, method)) if *method == HookTargets::default().brand
    )
}

#[test]
fn modern_client() {
    let main = modern_client_main();
    let game = client_game_class(MINECRAFT);
    let brand = brand_class(CLIENT_BRAND, "getClientModName");
    let launcher = launcher(EnvType::Client, "net.minecraft.client.main.Main", &[&main, &game, &brand]);

    let mut transformer = EntrypointTransformer::new();
    transformer.locate_entrypoints(&launcher).unwrap();

    let located = transformer.located().unwrap();
    assert_eq!(located.game_class, "net.minecraft.client.Minecraft");
    assert_eq!(located.route, Route::BackwardScan);
    assert_eq!(transformer.applet_main_class(), None);

    let hooks = HookTargets::default();
    let patched = decode(transformer.transform("net.minecraft.client.Minecraft"));
    assert_eq!(
        instructions_of(&patched, |it| it.is_constructor()),
        vec![
            Instruction::aload(0),
            new_object("java/lang/Object", "()V"),
            Instruction::aload(0),
            Instruction::aload(1),
            Instruction::put_field(field_ref(MINECRAFT, "gameDir", "Ljava/io/File;")),
            Instruction::aload(0),
            Instruction::get_field(field_ref(MINECRAFT, "gameDir", "Ljava/io/File;")),
            Instruction::aload(0),
            Instruction::invoke_static(hooks.client_start),
            ret(),
        ]
    );
    assert_eq!(patched.methods.len(), game.methods.len());
    assert_eq!(patched.fields, game.fields);

    // The wrapper has no brand accessor, so it is left alone.
    assert_eq!(transformer.transform("net.minecraft.client.main.Main"), None);

    let branded = decode(transformer.transform("net/minecraft/client/ClientBrandRetriever"));
    let code = instructions_of(&branded, |it| it.name == "getClientModName");
    let returns: Vec<_> = code
        .iter()
        .enumerate()
        .filter(|(_, insn)| insn.is_reference_return())
        .map(|(pos, _)| pos)
        .collect();
    assert_eq!(returns.len(), 2);
    for pos in returns {
        assert!(is_brand_hook(&code[pos - 1]));
    }
    assert_eq!(transformer.registry().len(), 2);
}

#[test]
fn legacy_applet() {
    let mut applet = Class::new("net/minecraft/client/MinecraftApplet", Version::new(49, 0));
    applet.fields.push(Field::new(
        field::AccessFlags::PRIVATE,
        "mc",
        FieldType::Object(ClassRef::new(MINECRAFT)),
    ));
    applet.fields.push(Field::new(
        field::AccessFlags::PRIVATE,
        "canvas",
        FieldType::Object(ClassRef::new("java/awt/Canvas")),
    ));
    let mut game = Class::new(MINECRAFT, Version::new(49, 0));
    game.fields.push(Field::new(
        field::AccessFlags::PRIVATE | field::AccessFlags::STATIC,
        "minecraftDir",
        FieldType::Object(ClassRef::new(FILE)),
    ));
    game.methods
        .push(constructor("java/lang/Object", "(Ljava/awt/Canvas;)V", vec![]));
    let launcher = launcher(
        EnvType::Client,
        "net.minecraft.client.MinecraftApplet",
        &[&applet, &game],
    );

    let mut transformer = EntrypointTransformer::new();
    transformer.locate_entrypoints(&launcher).unwrap();
    assert_eq!(transformer.located().unwrap().route, Route::LegacyField);
    assert_eq!(
        transformer.applet_main_class(),
        Some("net.minecraft.client.MinecraftApplet")
    );

    let hooks = HookTargets::default();
    let dir = field_ref(MINECRAFT, "minecraftDir", "Ljava/io/File;");
    let patched = decode(transformer.transform("net.minecraft.client.Minecraft"));
    assert_eq!(
        instructions_of(&patched, |it| it.is_constructor()),
        vec![
            Instruction::aload(0),
            new_object("java/lang/Object", "()V"),
            Instruction::get_static(dir.clone()),
            Instruction::invoke_static(hooks.game_directory),
            Instruction::put_static(dir.clone()),
            Instruction::get_static(dir),
            Instruction::aload(0),
            Instruction::invoke_static(hooks.client_start),
            ret(),
        ]
    );
}

#[test]
fn modern_server_with_brand_sweep() {
    let main = wrapper_class(
        SERVER_MAIN,
        vec![
            new_object("joptsimple/OptionParser", "()V"),
            new_object(DEDICATED_SERVER, "(Ljava/io/File;)V"),
            new_object("java/lang/Thread", "(Ljava/lang/Runnable;)V"),
        ],
    );
    let game = server_game_class(DEDICATED_SERVER);
    let brand = brand_class(MINECRAFT_SERVER, "getServerModName");
    let launcher = launcher(EnvType::Server, "net.minecraft.server.Main", &[&main, &game, &brand]);

    let mut transformer = EntrypointTransformer::new();
    transformer.locate_entrypoints(&launcher).unwrap();
    let located = transformer.located().unwrap();
    assert_eq!(located.game_class, "net.minecraft.server.dedicated.DedicatedServer");
    assert!(located.server_has_file);

    let patched = decode(transformer.transform("net.minecraft.server.dedicated.DedicatedServer"));
    let code = instructions_of(&patched, |it| it.is_constructor());
    assert_eq!(
        code[2..],
        [
            Instruction::aload(1),
            Instruction::aload(0),
            Instruction::invoke_static(HookTargets::default().server_start),
            ret(),
        ]
    );
    let branded = decode(transformer.transform("net.minecraft.server.MinecraftServer"));
    let code = instructions_of(&branded, |it| it.name == "getServerModName");
    assert_eq!(code.iter().filter(|it| is_brand_hook(it)).count(), 2);
}

#[test]
fn self_constructing_server_is_registered_once() {
    let mut server = brand_class(MINECRAFT_SERVER, "getServerModName");
    server.methods.push(method(
        method::AccessFlags::PUBLIC | method::AccessFlags::STATIC,
        "main",
        "([Ljava/lang/String;)V",
        code(
            4,
            1,
            [
                new_object(MINECRAFT_SERVER, "()V"),
                Instruction::simple(opcodes::POP),
                ret(),
            ],
        ),
    ));
    server.methods.push(constructor("java/lang/Object", "()V", vec![]));
    let launcher = launcher(EnvType::Server, "net.minecraft.server.MinecraftServer", &[&server]);

    let mut transformer = EntrypointTransformer::new();
    transformer.locate_entrypoints(&launcher).unwrap();
    transformer.locate_entrypoints(&launcher).unwrap();
    let located = transformer.located().unwrap();
    assert_eq!(located.route, Route::SelfConstruction);
    assert!(!located.server_has_file);
    assert_eq!(transformer.registry().len(), 1);

    let patched = decode(transformer.transform("net.minecraft.server.MinecraftServer"));
    let constructor_code = instructions_of(&patched, |it| it.is_constructor());
    assert_eq!(constructor_code[2], Instruction::aconst_null());
    let brand_code = instructions_of(&patched, |it| it.name == "getServerModName");
    assert_eq!(brand_code.iter().filter(|it| is_brand_hook(it)).count(), 2);
}

#[test]
fn inserted_code_runs_on_branch_to_return() {
    let main = wrapper_class(SERVER_MAIN, vec![new_object(DEDICATED_SERVER, "(Ljava/io/File;)V")]);
    let mut game = Class::new(DEDICATED_SERVER, Version::new(52, 0));
    let mut insns = entrypatch::jvm::code::InstructionList::new();
    let done = insns.new_label();
    insns.push(Instruction::aload(0));
    insns.push(new_object("java/lang/Object", "()V"));
    insns.push(Instruction::aload(1));
    insns.push(Instruction::Jump {
        opcode: opcodes::IFNULL,
        target: done,
    });
    insns.push(Instruction::simple(opcodes::NOP));
    insns.push_label(done);
    insns.push(ret());
    game.methods.push(method(
        method::AccessFlags::PUBLIC,
        "<init>",
        "(Ljava/io/File;)V",
        entrypatch::jvm::code::MethodBody::new(1, 2, insns),
    ));
    let launcher = launcher(EnvType::Server, "net.minecraft.server.Main", &[&main, &game]);

    let mut transformer = EntrypointTransformer::new();
    transformer.locate_entrypoints(&launcher).unwrap();
    let patched = decode(transformer.transform("net.minecraft.server.dedicated.DedicatedServer"));
    let body = patched
        .find_method(|it| it.is_constructor())
        .and_then(|it| it.body.as_ref())
        .unwrap();
    assert_eq!(body.max_stack, 3);
    let jump_target = body
        .instructions
        .iter()
        .find_map(|insn| match insn {
            Instruction::Jump { target, .. } => Some(*target),
            _ => None,
        })
        .unwrap();
    assert_eq!(instruction_at(body, jump_target), Some(&Instruction::aload(1)));
    assert_eq!(body.instructions.len(), 9);
}

#[test]
fn unsupported_shape_fails_for_good() {
    let main = wrapper_class(
        CLIENT_MAIN,
        vec![call(InvokeKind::Static, "java/lang/System", "exit", "(I)V")],
    );
    let launcher = launcher(EnvType::Client, "net.minecraft.client.main.Main", &[&main]);

    let mut transformer = EntrypointTransformer::new();
    let err = transformer.locate_entrypoints(&launcher).unwrap_err();
    assert!(matches!(
        &err,
        TransformError::NoEntryPointHeuristicMatch { class } if class == "net.minecraft.client.main.Main"
    ));
    assert!(err.to_string().contains("net.minecraft.client.main.Main"));
    assert!(matches!(
        transformer.locate_entrypoints(&launcher),
        Err(TransformError::AlreadyFailed(_))
    ));
    assert!(transformer.located().is_none());
    assert_eq!(transformer.transform("net.minecraft.client.main.Main"), None);
}

#[test]
fn wrapper_without_main() {
    let class = Class::new(CLIENT_MAIN, Version::new(52, 0));
    let launcher = launcher(EnvType::Server, "net.minecraft.client.main.Main", &[&class]);
    let mut transformer = EntrypointTransformer::new();
    assert!(matches!(
        transformer.locate_entrypoints(&launcher),
        Err(TransformError::NoMainMethod { .. })
    ));
}

#[test]
fn game_class_without_patch_site() {
    let main = modern_client_main();
    let mut game = Class::new(MINECRAFT, Version::new(52, 0));
    game.methods
        .push(constructor("java/lang/Object", "(Ljava/io/File;)V", vec![]));
    let launcher = launcher(EnvType::Client, "net.minecraft.client.main.Main", &[&main, &game]);
    let mut transformer = EntrypointTransformer::new();
    assert!(matches!(
        transformer.locate_entrypoints(&launcher),
        Err(TransformError::PatchNotApplied { class }) if class == "net.minecraft.client.Minecraft"
    ));
    assert!(transformer.registry().is_empty());
}
