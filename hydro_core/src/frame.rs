//! Per-cycle sensor snapshot and probe calibrations.
//!
//! The bridge reports raw channel values once per cycle; `SensorFrame::derive`
//! turns them into the calibrated metrics the controller and the persistence
//! layer consume. A frame is immutable after derivation.

use hydro_traits::RawSensors;

/// Fallback when the temperature channel reports garbage (NaN/Inf).
const DEFAULT_TEMPERATURE_C: f32 = 25.0;

/// Two-point EC probe calibration: volts at 0 mS/cm and at the span reading.
#[derive(Debug, Clone, Copy)]
pub struct EcCal {
    pub volts_at_zero: f32,
    pub volts_at_span: f32,
    /// EC in mS/cm produced at `volts_at_span`.
    pub span_ms: f32,
}

impl Default for EcCal {
    fn default() -> Self {
        Self {
            volts_at_zero: 0.0,
            volts_at_span: 2.5,
            span_ms: 1.5,
        }
    }
}

impl EcCal {
    /// Linear conversion, rounded to 3 decimals. Inputs at or below the zero
    /// point and degenerate calibrations yield 0.0; values above the span
    /// extrapolate proportionally.
    pub fn ms_from_volts(&self, volts: f32) -> f32 {
        if !volts.is_finite() || volts <= self.volts_at_zero {
            return 0.0;
        }
        let span_v = self.volts_at_span - self.volts_at_zero;
        if span_v <= 0.0 {
            return 0.0;
        }
        let ec = self.span_ms * (volts - self.volts_at_zero) / span_v;
        (ec * 1000.0).round() / 1000.0
    }
}

/// Two-point pH probe calibration (pH 7.0 and pH 4.0 buffer voltages in mV),
/// the model used by the DFRobot probe this rig ships with.
#[derive(Debug, Clone, Copy)]
pub struct PhCal {
    pub neutral_mv: f32,
    pub acid_mv: f32,
}

impl Default for PhCal {
    fn default() -> Self {
        Self {
            neutral_mv: 1500.0,
            acid_mv: 2032.44,
        }
    }
}

impl PhCal {
    /// Convert a probe voltage in millivolts to pH, rounded to 2 decimals.
    pub fn ph_from_mv(&self, millivolts: f32) -> f32 {
        let neutral = (self.neutral_mv - 1500.0) / 3.0;
        let acid = (self.acid_mv - 1500.0) / 3.0;
        let denom = neutral - acid;
        if denom == 0.0 || !denom.is_finite() {
            // Degenerate calibration; report neutral rather than NaN.
            return 7.0;
        }
        let slope = (7.0 - 4.0) / denom;
        let intercept = 7.0 - slope * neutral;
        let ph = slope * (millivolts - 1500.0) / 3.0 + intercept;
        (ph * 100.0).round() / 100.0
    }
}

/// Immutable snapshot of one sensing cycle: raw channels plus derived metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorFrame {
    pub temperature_c: f32,
    pub ec_volts: f32,
    pub ph_millivolts: f32,
    pub float_raw: f32,
    pub ph_value: f32,
    pub ec_ms: f32,
    pub float_ok: bool,
}

impl SensorFrame {
    pub fn derive(raw: &RawSensors, ph: &PhCal, ec: &EcCal) -> Self {
        let temperature_c = if raw.temperature_c.is_finite() {
            raw.temperature_c
        } else {
            DEFAULT_TEMPERATURE_C
        };
        Self {
            temperature_c,
            ec_volts: raw.ec_volts,
            ph_millivolts: raw.ph_millivolts,
            float_raw: raw.float_raw,
            ph_value: ph.ph_from_mv(raw.ph_millivolts),
            ec_ms: ec.ms_from_volts(raw.ec_volts),
            float_ok: raw.float_raw >= 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ec_zero_and_negative_voltage_read_zero() {
        let cal = EcCal::default();
        assert_eq!(cal.ms_from_volts(0.0), 0.0);
        assert_eq!(cal.ms_from_volts(-1.2), 0.0);
    }

    #[test]
    fn ec_span_point_hits_span_value() {
        let cal = EcCal::default();
        assert_eq!(cal.ms_from_volts(2.5), 1.5);
    }

    #[test]
    fn ec_above_span_extrapolates_proportionally() {
        let cal = EcCal::default();
        // 5.0 V is twice the span voltage -> twice the span EC
        assert_eq!(cal.ms_from_volts(5.0), 3.0);
    }

    #[test]
    fn ec_rounds_to_three_decimals() {
        let cal = EcCal::default();
        let v = cal.ms_from_volts(1.0);
        assert_eq!(v, 0.6); // 1.5 * 1.0/2.5
        let v = cal.ms_from_volts(1.234);
        assert_eq!(v, (1.5 * 1.234 / 2.5 * 1000.0_f32).round() / 1000.0);
    }

    #[test]
    fn ec_degenerate_span_reads_zero() {
        let cal = EcCal {
            volts_at_zero: 2.5,
            volts_at_span: 2.5,
            span_ms: 1.5,
        };
        assert_eq!(cal.ms_from_volts(3.0), 0.0);
    }

    #[test]
    fn ph_calibration_hits_buffer_points() {
        let cal = PhCal::default();
        assert_eq!(cal.ph_from_mv(1500.0), 7.0);
        assert_eq!(cal.ph_from_mv(2032.44), 4.0);
    }

    #[test]
    fn frame_derivation_substitutes_bad_temperature() {
        let raw = RawSensors {
            temperature_c: f32::NAN,
            ec_volts: 2.5,
            ph_millivolts: 1500.0,
            float_raw: 1.0,
        };
        let frame = SensorFrame::derive(&raw, &PhCal::default(), &EcCal::default());
        assert_eq!(frame.temperature_c, 25.0);
        assert_eq!(frame.ec_ms, 1.5);
        assert_eq!(frame.ph_value, 7.0);
        assert!(frame.float_ok);
    }

    #[test]
    fn float_threshold_is_half() {
        let mk = |float_raw| SensorFrame::derive(
            &RawSensors {
                temperature_c: 20.0,
                ec_volts: 1.0,
                ph_millivolts: 1500.0,
                float_raw,
            },
            &PhCal::default(),
            &EcCal::default(),
        );
        assert!(mk(0.5).float_ok);
        assert!(mk(1.0).float_ok);
        assert!(!mk(0.49).float_ok);
        assert!(!mk(0.0).float_ok);
    }
}
