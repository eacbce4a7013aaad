//! Routing the brand reported by the game through the brand hook.

use super::TransformerConfig;
use crate::jvm::{
    Class,
    code::{Instruction, PositionOutOfBounds},
};

const STRING: &str = "java/lang/String";

/// Wraps every `areturn` of the brand accessors of `class` with a call to the brand hook.
///
/// Returns whether `class` declares a brand accessor, even if it has no `areturn` to wrap.
/// # Errors
/// - [`PositionOutOfBounds`] if an insertion point is not in the method.
pub fn apply_branding_patch(
    class: &mut Class,
    config: &TransformerConfig,
) -> Result<bool, PositionOutOfBounds> {
    let class_name = class.make_ref();
    let mut applied = false;
    for method in class.find_methods_mut(|it| {
        config.brand_methods.contains(&it.name) && it.descriptor.returns_class(STRING)
    }) {
        tracing::debug!("Applying brand name hook to {}::{}", class_name, method.name);
        applied = true;
        let Some(body) = method.body.as_mut() else {
            continue;
        };
        let returns = body.instructions.positions(Instruction::is_reference_return);
        // Backwards so that earlier positions stay valid.
        for pos in returns.into_iter().rev() {
            body.insert_before(
                pos,
                vec![Instruction::invoke_static(config.hooks.brand.clone())],
            )?;
        }
    }
    Ok(applied)
}
