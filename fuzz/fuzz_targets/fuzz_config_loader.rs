#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Config loading must never panic: arbitrary TOML either parses into a
    // Config or fails cleanly, and validation of whatever parsed is total.
    if let Ok(cfg) = toml::from_str::<geotrack_config::Config>(data) {
        let _ = cfg.validate();
        let _ = cfg.enabled_profiles();
    }
});
