//! Conversions from the on-disk config schemas into the core's own types.
//!
//! The core keeps its own structs so it never depends on serde or on the
//! exact TOML layout; this module is the single place the two meet.

use crate::dosing::DosingCfg;
use crate::frame::{EcCal, PhCal};
use crate::machine::ControlCfg;
use crate::timesource::TimeCfg;

// ---- time --------------------------------------------------------------

impl From<&hydro_config::TimeCfg> for TimeCfg {
    fn from(c: &hydro_config::TimeCfg) -> Self {
        Self {
            resync_interval_s: c.resync_interval_s,
            drift_threshold_s: c.drift_threshold_s,
            fetch_timeout_ms: c.fetch_timeout_ms,
            timezone: c.timezone.clone(),
            ..Self::default()
        }
    }
}

// ---- control -----------------------------------------------------------

impl From<&hydro_config::ControlCfg> for ControlCfg {
    fn from(c: &hydro_config::ControlCfg) -> Self {
        Self {
            refill_timeout_s: c.refill_timeout_s,
            irrigation_s: c.irrigation_s,
            drain_wait_s: c.drain_wait_s,
            recirculation_s: c.recirculation_s,
            dosing_s: c.dosing_s,
            mixing_s: c.mixing_s,
            dosing_cooldown_s: c.dosing_cooldown_s,
            watering_hours: c.watering_hours.clone(),
            recirc_window_s: c.recirc_window_s,
        }
    }
}

// ---- dosing ------------------------------------------------------------

impl From<&hydro_config::DosingCfg> for DosingCfg {
    fn from(c: &hydro_config::DosingCfg) -> Self {
        Self {
            ph_min: c.ph_min,
            ph_max: c.ph_max,
            ec_min_ms: c.ec_min_ms,
            ec_max_ms: c.ec_max_ms,
        }
    }
}

// ---- probe calibrations ------------------------------------------------

impl From<&hydro_config::EcCfg> for EcCal {
    fn from(c: &hydro_config::EcCfg) -> Self {
        Self {
            volts_at_zero: c.volts_at_zero,
            volts_at_span: c.volts_at_span,
            span_ms: c.span_ms,
        }
    }
}

impl From<&hydro_config::PhCalibration> for PhCal {
    fn from(c: &hydro_config::PhCalibration) -> Self {
        Self {
            neutral_mv: c.neutral_mv,
            acid_mv: c.acid_mv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_cfg_keeps_year_window_defaults() {
        let t = TimeCfg::from(&hydro_config::TimeCfg::default());
        assert_eq!(t.rtc_year_min, 2000);
        assert_eq!(t.rtc_year_max, 2100);
        assert_eq!(t.resync_interval_s, 600);
    }

    #[test]
    fn control_cfg_round_trips_watering_hours() {
        let c = ControlCfg::from(&hydro_config::ControlCfg::default());
        assert!(c.watering_hours.contains(&21));
        assert!(!c.watering_hours.contains(&14));
    }
}
