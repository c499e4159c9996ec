#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing, validation and the core conversions must reject bad input without panicking.
    let Ok(cfg) = toml::from_str::<insertion_config::Config>(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    let _ = insertion_core::MotionCfg::try_from(&cfg);
    let _ = insertion_core::ImpedanceSchedule::try_from(&cfg.impedance);
});
