//! Dosing policy: decides when pH/EC are out of band and which corrective
//! pump to run. Pure functions; cooldown enforcement lives in the machine.

use hydro_traits::ActuatorCommand;

/// In-band windows for pH and EC (inclusive bounds).
#[derive(Debug, Clone, Copy)]
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

/// True iff pH or EC falls outside its configured band.
pub fn needs_dosing(cfg: &DosingCfg, ph: f32, ec_ms: f32) -> bool {
    if ph < cfg.ph_min || ph > cfg.ph_max {
        return true;
    }
    if ec_ms < cfg.ec_min_ms || ec_ms > cfg.ec_max_ms {
        return true;
    }
    false
}

/// Pick the corrective pump. pH-high wins over EC-low; pH-too-low and
/// EC-too-high have no corrective actuator on this rig and return None.
pub fn choose_dosing(cfg: &DosingCfg, ph: f32, ec_ms: f32) -> Option<ActuatorCommand> {
    if ph > cfg.ph_max {
        Some(ActuatorCommand::PhDownOn)
    } else if ec_ms < cfg.ec_min_ms {
        Some(ActuatorCommand::NutrientsOn)
    } else {
        None
    }
}
