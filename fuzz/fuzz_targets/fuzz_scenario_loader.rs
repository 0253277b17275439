#![no_main]

use libfuzzer_sys::fuzz_target;
use twinstep::config::ConfigLoader;

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml) = std::str::from_utf8(data) {
        // Any input may be rejected, none may panic
        let _ = ConfigLoader::with_defaults().load_from_str(yaml, "fuzz.yaml");
    }
});
