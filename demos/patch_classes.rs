//! Runs the entry point pass over a class path and writes the patched class files.
//!
//! ```text
//! cargo run --example patch_classes -- --env client \
//!     --entrypoint net.minecraft.client.main.Main \
//!     --class-path minecraft.jar --output patched
//! ```
use std::{fs, path::PathBuf};

use clap::Parser;
use entrypatch::{
    entrypoint::{ClassPathLauncher, EntrypointTransformer, EnvType},
    jvm::class_loader::{
        ClassLoader, ClassPath,
        class_paths::{DirectoryClassPath, JarClassPath},
    },
};
use tracing_subscriber::EnvFilter;

/// Locates the game entry point and injects the loader hooks.
#[derive(Parser)]
#[command(name = "patch_classes")]
struct Cli {
    /// The environment, `client` or `server`.
    #[arg(long)]
    env: EnvType,

    /// The declared entry class, e.g., `net.minecraft.client.main.Main`.
    #[arg(long)]
    entrypoint: String,

    /// Directories or `.jar` files to load classes from, searched in order.
    #[arg(long = "class-path", required = true)]
    class_path: Vec<PathBuf>,

    /// The directory to write the patched class files to.
    #[arg(long, default_value = "patched")]
    output: PathBuf,
}

fn open_class_path(path: PathBuf) -> Box<dyn ClassPath> {
    if path.extension().is_some_and(|it| it == "jar") {
        Box::new(JarClassPath::new(path))
    } else {
        Box::new(DirectoryClassPath::new(path))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let cli = Cli::parse();
    let class_path: Vec<_> = cli.class_path.into_iter().map(open_class_path).collect();
    let launcher = ClassPathLauncher::new(cli.env, &cli.entrypoint, ClassLoader::new(class_path));

    let mut transformer = EntrypointTransformer::new();
    transformer.locate_entrypoints(&launcher)?;

    for (class_name, bytes) in transformer.registry().iter() {
        let path = cli
            .output
            .join(format!("{}.class", class_name.replace('.', "/")));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        tracing::info!(class = class_name, path = %path.display(), "Wrote patched class");
    }
    Ok(())
}
