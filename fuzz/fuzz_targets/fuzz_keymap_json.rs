#![forbid(unsafe_code)]
#![no_main]

use keyzone_runtime::{Engine, KeymapConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if text.len() > 16 * 1024 {
        return;
    }

    let Ok(config) = KeymapConfig::from_json_str(text) else {
        return;
    };

    // Loading is atomic: a keymap with problems installs nothing.
    let problems = config.validate();
    let mut engine = Engine::new(());
    let before = engine.bindings().len();
    let loaded = engine.load_keymap(&config);
    if !problems.is_empty() {
        assert!(loaded.is_err());
        assert_eq!(engine.bindings().len(), before);
    }
});
