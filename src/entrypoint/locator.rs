//! Heuristics finding the game class behind the entry class.

use super::{EnvType, TransformError};
use crate::{
    jvm::{
        Class, Method,
        code::{Instruction, InvokeKind},
        method,
    },
    types::{field_type::FieldType, method_descriptor::ReturnType},
};

const FILE: &str = "java/io/File";
const STRING: &str = "java/lang/String";

/// The heuristic that found the game class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Route {
    /// The entry class is an applet holding the game in its only non-platform instance field.
    #[display("legacy field")]
    LegacyField,
    /// The server `main` constructs the entry class itself.
    #[display("self construction")]
    SelfConstruction,
    /// The last suitable constructor call in `main`.
    #[display("backward scan")]
    BackwardScan,
}

/// The outcome of locating the game class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedEntrypoint {
    /// The entry class, with `.` as the package separator.
    pub entry_class: String,
    /// The game class, with `.` as the package separator.
    pub game_class: String,
    /// The heuristic that found the game class.
    pub route: Route,
    /// Whether the game constructor may take the run directory as its first argument. Only the
    /// self construction route can rule it out. Only meaningful for servers.
    pub server_has_file: bool,
}

impl LocatedEntrypoint {
    /// Checks whether the game class is the entry class itself.
    #[must_use]
    pub fn is_self_hosted(&self) -> bool {
        self.entry_class == self.game_class
    }
}

/// What a heuristic reports when it matches.
#[derive(Debug)]
struct Candidate {
    game_class: String,
    server_has_file: bool,
}

/// The class under inspection, with the `main` method resolved on demand.
#[derive(Debug, Clone, Copy)]
struct Inspection<'a> {
    env: EnvType,
    class: &'a Class,
}

impl<'a> Inspection<'a> {
    fn main_method(self) -> Result<&'a Method, TransformError> {
        self.class
            .find_method(is_main_method)
            .ok_or_else(|| TransformError::NoMainMethod {
                class: self.class.dotted_name(),
            })
    }

    fn main_instructions(
        self,
    ) -> Result<impl DoubleEndedIterator<Item = &'a Instruction>, TransformError> {
        let main = self.main_method()?;
        Ok(main
            .body
            .iter()
            .flat_map(|body| body.instructions.iter()))
    }
}

type Heuristic = fn(Inspection<'_>) -> Result<Option<Candidate>, TransformError>;

/// The heuristics in the order they are tried. The first match wins.
const HEURISTICS: [(Route, Heuristic); 3] = [
    (Route::LegacyField, legacy_field),
    (Route::SelfConstruction, self_construction),
    (Route::BackwardScan, backward_scan),
];

/// Finds the game class of `entry_class`.
/// # Errors
/// - [`TransformError::NoMainMethod`] if a heuristic needs `main` and the class has none.
/// - [`TransformError::NoEntryPointHeuristicMatch`] if no heuristic matches.
pub fn locate(env: EnvType, entry_class: &Class) -> Result<LocatedEntrypoint, TransformError> {
    let inspection = Inspection {
        env,
        class: entry_class,
    };
    for (route, heuristic) in HEURISTICS {
        if let Some(candidate) = heuristic(inspection)? {
            return Ok(LocatedEntrypoint {
                entry_class: entry_class.dotted_name(),
                game_class: candidate.game_class,
                route,
                server_has_file: candidate.server_has_file,
            });
        }
    }
    Err(TransformError::NoEntryPointHeuristicMatch {
        class: entry_class.dotted_name(),
    })
}

/// Checks whether the method is `public static void main(String[])`.
#[must_use]
pub fn is_main_method(method: &Method) -> bool {
    let visibility_and_static = method::AccessFlags::PUBLIC
        | method::AccessFlags::PRIVATE
        | method::AccessFlags::PROTECTED
        | method::AccessFlags::STATIC;
    method.name == "main"
        && method.access_flags.intersection(visibility_and_static)
            == method::AccessFlags::PUBLIC | method::AccessFlags::STATIC
        && matches!(method.descriptor.return_type, ReturnType::Void)
        && matches!(
            method.descriptor.parameters_types.as_slice(),
            [FieldType::Array(element)] if element.is_class(STRING)
        )
}

fn legacy_field(inspection: Inspection<'_>) -> Result<Option<Candidate>, TransformError> {
    if inspection.env != EnvType::Client {
        return Ok(None);
    }
    let mut game_fields = inspection.class.find_fields(|field| {
        !field.is_static()
            && field
                .field_type
                .class_ref()
                .is_some_and(|it| !it.is_platform_class())
    });
    let candidate = match (game_fields.next(), game_fields.next()) {
        (Some(field), None) => field.field_type.class_ref().map(|it| Candidate {
            game_class: it.dotted_name(),
            server_has_file: true,
        }),
        _ => None,
    };
    Ok(candidate)
}

fn self_construction(inspection: Inspection<'_>) -> Result<Option<Candidate>, TransformError> {
    if inspection.env != EnvType::Server {
        return Ok(None);
    }
    let entry_name = inspection.class.binary_name.as_str();
    let candidate = inspection.main_instructions()?.find_map(|insn| match insn.invocation() {
        Some((InvokeKind::Special, method))
            if method.is_constructor() && method.owner.binary_name == entry_name =>
        {
            Some(Candidate {
                game_class: method.owner.dotted_name(),
                server_has_file: method
                    .descriptor
                    .first_parameter()
                    .is_some_and(|it| it.is_class(FILE)),
            })
        }
        _ => None,
    });
    Ok(candidate)
}

fn backward_scan(inspection: Inspection<'_>) -> Result<Option<Candidate>, TransformError> {
    let env = inspection.env;
    let candidate = inspection
        .main_instructions()?
        .rev()
        .find_map(|insn| {
            let (kind, method) = insn.invocation()?;
            let matches = match env {
                EnvType::Client => {
                    matches!(kind, InvokeKind::Special | InvokeKind::Virtual)
                        && !method.owner.is_platform_class()
                }
                EnvType::Server => {
                    kind == InvokeKind::Special
                        && method.is_constructor()
                        && method
                            .descriptor
                            .first_parameter()
                            .is_some_and(|it| it.is_class(FILE))
                }
            };
            matches.then(|| method.owner.dotted_name())
        })
        .map(|game_class| Candidate {
            game_class,
            server_has_file: true,
        });
    Ok(candidate)
}
