#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and pH probe calibration file handling for the rig.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - `phdata` loads the two-point pH probe calibration from its legacy
//!   `key=value` file and regenerates it from defaults when corrupt.

pub mod phdata;

use serde::Deserialize;

pub use phdata::PhCalibration;

/// Time resolution knobs for the layered clock service.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TimeCfg {
    /// Re-attempt a network time sync after this many seconds.
    pub resync_interval_s: u64,
    /// Correct the RTC when it disagrees with network time by more than this.
    pub drift_threshold_s: i64,
    /// Hard bound on a single network time fetch (ms).
    pub fetch_timeout_ms: u64,
    /// IANA timezone passed to the network time provider.
    pub timezone: String,
}

impl Default for TimeCfg {
    fn default() -> Self {
        Self {
            resync_interval_s: 600,
            drift_threshold_s: 300,
            fetch_timeout_ms: 15_000,
            timezone: "Europe/Rome".to_string(),
        }
    }
}

/// Phase durations and schedule for the irrigation state machine.
/// All durations are in seconds; zero means "advance on the next tick".
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ControlCfg {
    pub refill_timeout_s: u64,
    pub irrigation_s: u64,
    pub drain_wait_s: u64,
    pub recirculation_s: u64,
    pub dosing_s: u64,
    pub mixing_s: u64,
    pub dosing_cooldown_s: u64,
    /// Hours of day (0-23) at which automatic irrigation fires once per day.
    pub watering_hours: Vec<u8>,
    /// Hourly recirculation triggers within the first N seconds of minute 0.
    pub recirc_window_s: u32,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            refill_timeout_s: 120,
            irrigation_s: 180,
            drain_wait_s: 300,
            recirculation_s: 120,
            dosing_s: 10,
            mixing_s: 300,
            dosing_cooldown_s: 15 * 60,
            watering_hours: vec![7, 8, 9, 10, 11, 12, 13, 15, 16, 17, 18, 19, 21],
            recirc_window_s: 30,
        }
    }
}

/// In-band windows for pH and EC; dosing triggers outside them.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct DosingCfg {
    pub ph_min: f32,
    pub ph_max: f32,
    pub ec_min_ms: f32,
    pub ec_max_ms: f32,
}

impl Default for DosingCfg {
    fn default() -> Self {
        Self {
            ph_min: 5.5,
            ph_max: 6.5,
            ec_min_ms: 1.0,
            ec_max_ms: 2.0,
        }
    }
}

/// Two-point EC probe calibration: volts at zero and at the span reading.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct EcCfg {
    pub volts_at_zero: f32,
    pub volts_at_span: f32,
    pub span_ms: f32,
}

impl Default for EcCfg {
    fn default() -> Self {
        Self {
            volts_at_zero: 0.0,
            volts_at_span: 2.5,
            span_ms: 1.5,
        }
    }
}

/// Cadence of the cooperative control loop.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct CycleCfg {
    /// Sleep between cycles (seconds).
    pub interval_s: u64,
}

impl Default for CycleCfg {
    fn default() -> Self {
        Self { interval_s: 30 }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub time: TimeCfg,
    pub control: ControlCfg,
    pub dosing: DosingCfg,
    pub ec: EcCfg,
    pub cycle: CycleCfg,
    pub logging: Logging,
    /// Path of the pH probe calibration file; defaults to "phdata.txt".
    pub phdata_path: Option<String>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Time
        if self.time.resync_interval_s == 0 {
            eyre::bail!("time.resync_interval_s must be >= 1");
        }
        if self.time.drift_threshold_s < 0 {
            eyre::bail!("time.drift_threshold_s must be >= 0");
        }
        if self.time.fetch_timeout_ms == 0 {
            eyre::bail!("time.fetch_timeout_ms must be >= 1");
        }
        if self.time.timezone.is_empty() {
            eyre::bail!("time.timezone must not be empty");
        }

        // Control
        for h in &self.control.watering_hours {
            if *h > 23 {
                eyre::bail!("control.watering_hours entries must be in 0..=23, got {h}");
            }
        }
        if self.control.recirc_window_s > 59 {
            eyre::bail!("control.recirc_window_s must be in 0..=59");
        }

        // Dosing bands
        if !(self.dosing.ph_min.is_finite() && self.dosing.ph_max.is_finite()) {
            eyre::bail!("dosing pH bounds must be finite");
        }
        if self.dosing.ph_min >= self.dosing.ph_max {
            eyre::bail!("dosing.ph_min must be < dosing.ph_max");
        }
        if !(self.dosing.ec_min_ms.is_finite() && self.dosing.ec_max_ms.is_finite()) {
            eyre::bail!("dosing EC bounds must be finite");
        }
        if self.dosing.ec_min_ms >= self.dosing.ec_max_ms {
            eyre::bail!("dosing.ec_min_ms must be < dosing.ec_max_ms");
        }

        // EC calibration
        if self.ec.volts_at_span <= self.ec.volts_at_zero {
            eyre::bail!("ec.volts_at_span must be > ec.volts_at_zero");
        }
        if self.ec.span_ms <= 0.0 || !self.ec.span_ms.is_finite() {
            eyre::bail!("ec.span_ms must be > 0");
        }

        // Cycle
        if self.cycle.interval_s == 0 {
            eyre::bail!("cycle.interval_s must be >= 1");
        }

        Ok(())
    }
}
