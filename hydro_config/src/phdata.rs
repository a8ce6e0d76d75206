//! pH probe calibration file (`phdata.txt`).
//!
//! Legacy two-line `key=value` format written by the probe vendor tooling:
//!
//! ```text
//! neutralVoltage=1500.0
//! acidVoltage=2032.44
//! ```
//!
//! A missing or corrupt file is regenerated from defaults rather than
//! failing the controller at startup.

use std::fs;
use std::path::Path;

pub const DEFAULT_NEUTRAL_MV: f32 = 1500.0;
pub const DEFAULT_ACID_MV: f32 = 2032.44;

/// Two-point pH probe calibration (pH 7.0 and pH 4.0 buffer voltages, mV).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhCalibration {
    pub neutral_mv: f32,
    pub acid_mv: f32,
}

impl Default for PhCalibration {
    fn default() -> Self {
        Self {
            neutral_mv: DEFAULT_NEUTRAL_MV,
            acid_mv: DEFAULT_ACID_MV,
        }
    }
}

impl PhCalibration {
    fn render(&self) -> String {
        format!(
            "neutralVoltage={}\nacidVoltage={}\n",
            self.neutral_mv, self.acid_mv
        )
    }
}

/// Parse phdata file contents. Strict on line prefixes and numeric values;
/// extra trailing lines are ignored, matching the vendor reader.
pub fn parse_phdata(s: &str) -> eyre::Result<PhCalibration> {
    let mut lines = s.lines();
    let neutral_line = lines.next().unwrap_or("").trim();
    let acid_line = lines.next().unwrap_or("").trim();

    let neutral = neutral_line
        .strip_prefix("neutralVoltage=")
        .ok_or_else(|| eyre::eyre!("line 1 must start with 'neutralVoltage='"))?;
    let acid = acid_line
        .strip_prefix("acidVoltage=")
        .ok_or_else(|| eyre::eyre!("line 2 must start with 'acidVoltage='"))?;

    let neutral_mv: f32 = neutral
        .trim()
        .parse()
        .map_err(|e| eyre::eyre!("invalid neutralVoltage value: {e}"))?;
    let acid_mv: f32 = acid
        .trim()
        .parse()
        .map_err(|e| eyre::eyre!("invalid acidVoltage value: {e}"))?;

    if !neutral_mv.is_finite() || !acid_mv.is_finite() {
        eyre::bail!("calibration voltages must be finite");
    }

    Ok(PhCalibration {
        neutral_mv,
        acid_mv,
    })
}

/// Load the calibration from `path`, regenerating the file from defaults
/// when it is missing or unreadable as valid phdata. The returned bool
/// reports whether the file was (re)created.
pub fn load_or_init(path: &Path) -> eyre::Result<(PhCalibration, bool)> {
    match fs::read_to_string(path) {
        Ok(contents) => match parse_phdata(&contents) {
            Ok(cal) => Ok((cal, false)),
            Err(_) => {
                let cal = PhCalibration::default();
                fs::write(path, cal.render())
                    .map_err(|e| eyre::eyre!("rewrite {}: {e}", path.display()))?;
                Ok((cal, true))
            }
        },
        Err(_) => {
            let cal = PhCalibration::default();
            fs::write(path, cal.render())
                .map_err(|e| eyre::eyre!("create {}: {e}", path.display()))?;
            Ok((cal, true))
        }
    }
}
