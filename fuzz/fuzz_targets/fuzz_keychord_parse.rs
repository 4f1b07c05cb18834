#![forbid(unsafe_code)]
#![no_main]

use keyzone_core::KeyChord;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if text.len() > 256 {
        return;
    }

    let Ok(chord) = KeyChord::parse(text) else {
        return;
    };

    // The canonical form must parse back to the same chord.
    let canonical = chord.to_string();
    let again = KeyChord::parse(&canonical).expect("canonical chord must reparse");
    assert_eq!(chord, again, "display of {text:?} is {canonical:?}");
});
