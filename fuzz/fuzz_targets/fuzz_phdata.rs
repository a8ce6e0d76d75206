#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // The phdata parser must reject arbitrary input without panicking; any
    // Ok result must carry finite voltages.
    if let Ok(cal) = hydro_config::phdata::parse_phdata(data) {
        assert!(cal.neutral_mv.is_finite());
        assert!(cal.acid_mv.is_finite());
    }
});
