#![no_main]

use entrypatch::jvm::Class;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(class) = Class::from_bytes(data) {
        let _ = class.to_bytes();
    }
});
