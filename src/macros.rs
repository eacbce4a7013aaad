/// Links to a section of the JVM specification in doc comments.
macro_rules! see_jvm_spec {
    ($chapter:literal, $section:literal $(, $sub:literal)*) => {
        concat!(
            "See the [JVM Specification §",
            $chapter, ".", $section, $(".", $sub,)*
            "](https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-",
            $chapter,
            ".html#jvms-",
            $chapter, ".", $section, $(".", $sub,)*
            ") for more information."
        )
    };
}

/// Stores `$with` into the `Option` `$container`, failing the parse if it was already set.
macro_rules! fill_once {
    ($container:ident, $with:expr, $what:literal) => {
        if $container.replace($with).is_some() {
            Err($crate::jvm::bytecode::ParseError::malform(concat!(
                "There should be at most one ",
                $what
            )))?;
        }
    };
}

pub(crate) use fill_once;
pub(crate) use see_jvm_spec;
