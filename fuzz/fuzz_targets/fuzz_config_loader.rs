#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    if let Ok(cfg) = vent_config::load_toml(data) {
        if cfg.validate().is_ok() {
            let p = &cfg.parameters;
            for b in [
                &p.inspiratory_pressure,
                &p.respiratory_rate,
                &p.tidal_volume,
                &p.ie_ratio,
            ] {
                assert!(b.min <= b.default && b.default <= b.max);
                assert!(b.step > 0);
            }
        }
    }
});
