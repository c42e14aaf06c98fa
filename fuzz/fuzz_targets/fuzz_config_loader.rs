#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation may reject input but must never panic.
    if let Ok(cfg) = toml::from_str::<drive_config::Config>(data) {
        if cfg.validate().is_ok() {
            // A valid config must survive a print/reload cycle.
            let printed = cfg.to_toml().unwrap();
            let again = drive_config::load_toml(&printed).unwrap();
            assert!(again.validate().is_ok());
        }
    }
});
