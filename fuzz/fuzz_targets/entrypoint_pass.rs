#![no_main]

use entrypatch::{
    entrypoint::{EntrypointTransformer, EnvType, Launcher},
    jvm::Class,
};
use libfuzzer_sys::fuzz_target;

struct SingleClass<'a> {
    env_type: EnvType,
    name: String,
    bytes: &'a [u8],
}

impl Launcher for SingleClass<'_> {
    fn environment_type(&self) -> EnvType {
        self.env_type
    }

    fn entrypoint(&self) -> &str {
        &self.name
    }

    fn class_bytes(&self, name: &str) -> Option<Vec<u8>> {
        (name == self.name).then(|| self.bytes.to_vec())
    }
}

fuzz_target!(|data: &[u8]| {
    let Some((&selector, bytes)) = data.split_first() else {
        return;
    };
    let Ok(class) = Class::from_bytes(bytes) else {
        return;
    };
    let env_type = if selector & 1 == 0 {
        EnvType::Client
    } else {
        EnvType::Server
    };
    let launcher = SingleClass {
        env_type,
        name: class.dotted_name(),
        bytes,
    };
    let _ = EntrypointTransformer::new().locate_entrypoints(&launcher);
});
