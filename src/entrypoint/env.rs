//! The host environment the transformer runs in.

use std::str::FromStr;

use crate::jvm::class_loader::{self, ClassLoader, ClassPath};

/// The environment variant of the game being launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum EnvType {
    /// The game client.
    #[display("client")]
    Client,
    /// The dedicated server.
    #[display("server")]
    Server,
}

/// The name of an environment type is not recognized.
#[derive(Debug, thiserror::Error)]
#[error("Unknown environment type {0:?}, expected \"client\" or \"server\"")]
pub struct UnknownEnvType(pub String);

impl FromStr for EnvType {
    type Err = UnknownEnvType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "server" => Ok(Self::Server),
            _ => Err(UnknownEnvType(s.to_owned())),
        }
    }
}

/// What the transformer needs from the loader hosting it.
pub trait Launcher {
    /// Gets the environment the game is launched in.
    fn environment_type(&self) -> EnvType;

    /// Gets the declared entry class with `.` as the package separator, e.g.,
    /// `net.minecraft.client.main.Main`.
    fn entrypoint(&self) -> &str;

    /// Gets the content of the class file for the class named `name`, with `.` as the package
    /// separator, or `None` if there is no such class.
    ///
    /// A class that exists but cannot be read is also `None`, so the pass reports it as
    /// [`TransformError::ClassNotFound`](super::TransformError::ClassNotFound). Implementations
    /// should log the underlying cause.
    fn class_bytes(&self, name: &str) -> Option<Vec<u8>>;
}

/// A [`Launcher`] reading classes through a [`ClassLoader`].
///
/// Errors other than a missing class, such as an unreadable directory or a broken jar, are
/// logged at `warn` level and the class is reported as absent.
#[derive(Debug)]
pub struct ClassPathLauncher<P> {
    env_type: EnvType,
    entrypoint: String,
    class_loader: ClassLoader<P>,
}

impl<P> ClassPathLauncher<P> {
    /// Creates a launcher for the entry class `entrypoint`, which may use either `.` or `/` as
    /// the package separator.
    pub fn new(env_type: EnvType, entrypoint: impl AsRef<str>, class_loader: ClassLoader<P>) -> Self {
        Self {
            env_type,
            entrypoint: entrypoint.as_ref().replace('/', "."),
            class_loader,
        }
    }
}

impl<P: ClassPath> Launcher for ClassPathLauncher<P> {
    fn environment_type(&self) -> EnvType {
        self.env_type
    }

    fn entrypoint(&self) -> &str {
        &self.entrypoint
    }

    fn class_bytes(&self, name: &str) -> Option<Vec<u8>> {
        match self.class_loader.load_class_bytes(name.replace('.', "/")) {
            Ok(bytes) => Some(bytes),
            Err(class_loader::Error::NotFound(_)) => None,
            Err(err) => {
                tracing::warn!(class = name, %err, "Failed to read class file");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jvm::class_loader::class_paths::MemoryClassPath;

    #[test]
    fn env_type_from_str() {
        assert_eq!("client".parse::<EnvType>().unwrap(), EnvType::Client);
        assert_eq!("SERVER".parse::<EnvType>().unwrap(), EnvType::Server);
        assert!("applet".parse::<EnvType>().is_err());
        assert_eq!(EnvType::Server.to_string(), "server");
    }

    #[test]
    fn launcher_translates_names() {
        let mut class_path = MemoryClassPath::new();
        class_path.insert("net/minecraft/server/MinecraftServer", vec![7]);
        let launcher = ClassPathLauncher::new(
            EnvType::Server,
            "net/minecraft/server/MinecraftServer",
            ClassLoader::new([class_path]),
        );
        assert_eq!(launcher.entrypoint(), "net.minecraft.server.MinecraftServer");
        assert_eq!(
            launcher.class_bytes("net.minecraft.server.MinecraftServer"),
            Some(vec![7])
        );
        assert_eq!(launcher.class_bytes("net.minecraft.server.Missing"), None);
    }

    #[cfg(feature = "jar")]
    #[test]
    fn unreadable_class_path_is_absent() {
        use crate::jvm::class_loader::class_paths::JarClassPath;

        let jar = std::env::temp_dir().join("entrypatch-launcher-missing.jar");
        let launcher = ClassPathLauncher::new(
            EnvType::Client,
            "net.minecraft.client.main.Main",
            ClassLoader::new([JarClassPath::new(jar)]),
        );
        assert_eq!(launcher.class_bytes("net.minecraft.client.main.Main"), None);
    }
}
