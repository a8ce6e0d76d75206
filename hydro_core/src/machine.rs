//! Irrigation/dosing state machine.
//!
//! `tick` is a pure decision step: given the resolved time and the current
//! sensor frame it returns the actuator commands to issue and the transition
//! taken, mutating only its own explicit state. Command execution belongs to
//! the caller, which keeps the machine testable without a live device.
//!
//! The set of legal transitions is encoded as data in [`EDGES`]; every
//! guard-driven transition is checked against it.

use chrono::{NaiveDateTime, Timelike};
use hydro_traits::ActuatorCommand;

use crate::dosing::{self, DosingCfg};
use crate::frame::SensorFrame;
use crate::schedule::{ScheduleTracker, date_key};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatingState {
    Idle,
    Refilling,
    Irrigating,
    Draining,
    Dosing,
    Mixing,
    Recirculating,
    Error,
}

impl OperatingState {
    pub fn as_str(self) -> &'static str {
        match self {
            OperatingState::Idle => "IDLE",
            OperatingState::Refilling => "REFILLING",
            OperatingState::Irrigating => "IRRIGATING",
            OperatingState::Draining => "DRAINING",
            OperatingState::Dosing => "DOSING",
            OperatingState::Mixing => "MIXING",
            OperatingState::Recirculating => "RECIRCULATING",
            OperatingState::Error => "ERROR",
        }
    }

    /// Status code shown on the LCD for this state (firmware contract).
    pub fn status_code(self) -> u8 {
        match self {
            OperatingState::Idle => 0,
            OperatingState::Irrigating => 1,
            OperatingState::Dosing => 2,
            OperatingState::Mixing => 3,
            OperatingState::Recirculating => 4,
            OperatingState::Refilling => 5,
            OperatingState::Error => 6,
            OperatingState::Draining => 7,
        }
    }
}

impl core::fmt::Display for OperatingState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Legal guard-driven transitions. External commands may bypass this table;
/// internal ticks may not. Error has no outgoing edge: it is terminal until
/// an external reset.
pub const EDGES: &[(OperatingState, OperatingState)] = &[
    (OperatingState::Idle, OperatingState::Refilling),
    (OperatingState::Idle, OperatingState::Irrigating),
    (OperatingState::Idle, OperatingState::Dosing),
    (OperatingState::Idle, OperatingState::Recirculating),
    (OperatingState::Refilling, OperatingState::Idle),
    (OperatingState::Refilling, OperatingState::Error),
    (OperatingState::Irrigating, OperatingState::Draining),
    (OperatingState::Draining, OperatingState::Recirculating),
    (OperatingState::Dosing, OperatingState::Mixing),
    (OperatingState::Mixing, OperatingState::Idle),
    (OperatingState::Recirculating, OperatingState::Idle),
];

pub fn is_edge(from: OperatingState, to: OperatingState) -> bool {
    EDGES.contains(&(from, to))
}

/// Phase durations and schedule. All durations are in seconds; zero means
/// "advance on the next tick".
#[derive(Debug, Clone)]
pub struct ControlCfg {
    pub refill_timeout_s: u64,
    pub irrigation_s: u64,
    pub drain_wait_s: u64,
    pub recirculation_s: u64,
    pub dosing_s: u64,
    pub mixing_s: u64,
    pub dosing_cooldown_s: u64,
    /// Hours of day (0-23) with one automatic irrigation each.
    pub watering_hours: Vec<u8>,
    /// Hourly recirculation fires when minute == 0 and second < this window.
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: OperatingState,
    pub to: OperatingState,
}

/// What one tick (or one external command) decided.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub transition: Option<Transition>,
    pub commands: Vec<ActuatorCommand>,
}

/// Commands accepted from the outward command surface. These force
/// transitions bypassing the guard table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalCommand {
    StartIrrigation,
    StopAll,
    StartRecirculation,
    RefillOn,
}

impl ExternalCommand {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "start_irrigation" => Some(Self::StartIrrigation),
            "stop_all" => Some(Self::StopAll),
            "start_recirculation" => Some(Self::StartRecirculation),
            "refill_on" => Some(Self::RefillOn),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StartIrrigation => "start_irrigation",
            Self::StopAll => "stop_all",
            Self::StartRecirculation => "start_recirculation",
            Self::RefillOn => "refill_on",
        }
    }
}

/// Acknowledgement returned to the command surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandAck {
    pub status: &'static str,
    pub cmd: String,
}

pub struct ControlStateMachine {
    cfg: ControlCfg,
    dosing: DosingCfg,
    state: OperatingState,
    entered_at: NaiveDateTime,
    schedule: ScheduleTracker,
    last_dosing_at: Option<NaiveDateTime>,
}

impl core::fmt::Debug for ControlStateMachine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ControlStateMachine")
            .field("state", &self.state)
            .field("entered_at", &self.entered_at)
            .field("last_dosing_at", &self.last_dosing_at)
            .finish()
    }
}

impl ControlStateMachine {
    pub fn new(cfg: ControlCfg, dosing: DosingCfg, start: NaiveDateTime) -> Self {
        Self {
            cfg,
            dosing,
            state: OperatingState::Idle,
            entered_at: start,
            schedule: ScheduleTracker::new(),
            last_dosing_at: None,
        }
    }

    pub fn state(&self) -> OperatingState {
        self.state
    }

    pub fn entered_at(&self) -> NaiveDateTime {
        self.entered_at
    }

    pub fn last_dosing_at(&self) -> Option<NaiveDateTime> {
        self.last_dosing_at
    }

    pub fn schedule(&self) -> &ScheduleTracker {
        &self.schedule
    }

    /// Seconds spent in the current state, clamped at 0 for non-monotonic
    /// time sources.
    pub fn elapsed_s(&self, now: NaiveDateTime) -> i64 {
        (now - self.entered_at).num_seconds().max(0)
    }

    fn cooldown_elapsed(&self, now: NaiveDateTime) -> bool {
        match self.last_dosing_at {
            None => true,
            Some(t) => (now - t).num_seconds() > self.cfg.dosing_cooldown_s as i64,
        }
    }

    fn enter(&mut self, to: OperatingState, now: NaiveDateTime) -> Transition {
        debug_assert!(
            is_edge(self.state, to),
            "illegal transition {} -> {}",
            self.state,
            to
        );
        let t = Transition {
            from: self.state,
            to,
        };
        self.state = to;
        self.entered_at = now;
        tracing::info!(from = %t.from, to = %t.to, "state transition");
        t
    }

    /// Forced entry used by external commands; bypasses the edge table.
    fn force_enter(&mut self, to: OperatingState, now: NaiveDateTime) -> Transition {
        let t = Transition {
            from: self.state,
            to,
        };
        self.state = to;
        self.entered_at = now;
        tracing::info!(from = %t.from, to = %t.to, "forced state transition");
        t
    }

    /// One decision step. At most one transition per tick; within Idle the
    /// guards are evaluated level-check first, then schedule, then dosing,
    /// then the hourly recirculation window.
    pub fn tick(&mut self, now: NaiveDateTime, frame: &SensorFrame) -> TickOutcome {
        let mut out = TickOutcome::default();
        let elapsed = self.elapsed_s(now);

        match self.state {
            OperatingState::Idle => {
                if !frame.float_ok {
                    out.commands.push(ActuatorCommand::RefillOn);
                    out.transition = Some(self.enter(OperatingState::Refilling, now));
                } else if let Some(hour) = self.scheduled_slot(now) {
                    let key = date_key(now.date());
                    tracing::info!(hour, "scheduled irrigation due");
                    self.schedule.mark_fired(hour, &key);
                    out.commands.push(ActuatorCommand::StartIrrigation);
                    out.transition = Some(self.enter(OperatingState::Irrigating, now));
                } else if dosing::needs_dosing(&self.dosing, frame.ph_value, frame.ec_ms)
                    && self.cooldown_elapsed(now)
                {
                    if let Some(cmd) =
                        dosing::choose_dosing(&self.dosing, frame.ph_value, frame.ec_ms)
                    {
                        out.commands.push(cmd);
                    } else {
                        tracing::warn!(
                            ph = frame.ph_value,
                            ec_ms = frame.ec_ms,
                            "out of band but no corrective pump for this excursion"
                        );
                    }
                    out.transition = Some(self.enter(OperatingState::Dosing, now));
                } else if now.minute() == 0 && now.second() < self.cfg.recirc_window_s {
                    out.commands.push(ActuatorCommand::StartRecirculation);
                    out.transition = Some(self.enter(OperatingState::Recirculating, now));
                }
            }
            OperatingState::Refilling => {
                if frame.float_ok {
                    out.commands.push(ActuatorCommand::RefillOff);
                    out.transition = Some(self.enter(OperatingState::Idle, now));
                } else if elapsed > self.cfg.refill_timeout_s as i64 {
                    tracing::error!(elapsed_s = elapsed, "refill timeout, failing safe");
                    out.commands.push(ActuatorCommand::RefillOff);
                    out.transition = Some(self.enter(OperatingState::Error, now));
                }
            }
            OperatingState::Irrigating => {
                if elapsed > self.cfg.irrigation_s as i64 {
                    out.commands.push(ActuatorCommand::StopIrrigation);
                    out.transition = Some(self.enter(OperatingState::Draining, now));
                }
            }
            OperatingState::Draining => {
                if elapsed > self.cfg.drain_wait_s as i64 {
                    out.commands.push(ActuatorCommand::StartRecirculation);
                    out.transition = Some(self.enter(OperatingState::Recirculating, now));
                }
            }
            OperatingState::Dosing => {
                if elapsed > self.cfg.dosing_s as i64 {
                    out.commands.push(ActuatorCommand::PhDownOff);
                    out.commands.push(ActuatorCommand::NutrientsOff);
                    self.last_dosing_at = Some(now);
                    out.commands.push(ActuatorCommand::StartRecirculation);
                    out.transition = Some(self.enter(OperatingState::Mixing, now));
                }
            }
            OperatingState::Mixing => {
                if elapsed > self.cfg.mixing_s as i64 {
                    out.commands.push(ActuatorCommand::StopRecirculation);
                    out.transition = Some(self.enter(OperatingState::Idle, now));
                }
            }
            OperatingState::Recirculating => {
                if elapsed > self.cfg.recirculation_s as i64 {
                    out.commands.push(ActuatorCommand::StopRecirculation);
                    out.transition = Some(self.enter(OperatingState::Idle, now));
                }
            }
            OperatingState::Error => {
                // Terminal: no internal guard leaves Error.
            }
        }

        out
    }

    fn scheduled_slot(&self, now: NaiveDateTime) -> Option<u8> {
        let hour = now.hour() as u8;
        if !self.cfg.watering_hours.contains(&hour) {
            return None;
        }
        let key = date_key(now.date());
        if self.schedule.has_fired_today(hour, &key) {
            return None;
        }
        Some(hour)
    }

    /// Apply an external command, forcing the corresponding transition and
    /// returning the actuator commands to issue. `StopAll` de-energizes
    /// everything and returns to Idle; it is also the only way out of Error.
    pub fn apply(&mut self, cmd: ExternalCommand, now: NaiveDateTime) -> TickOutcome {
        let mut out = TickOutcome::default();
        match cmd {
            ExternalCommand::StartIrrigation => {
                out.commands.push(ActuatorCommand::StartIrrigation);
                out.transition = Some(self.force_enter(OperatingState::Irrigating, now));
            }
            ExternalCommand::StopAll => {
                out.commands.extend([
                    ActuatorCommand::StopIrrigation,
                    ActuatorCommand::StopRecirculation,
                    ActuatorCommand::RefillOff,
                    ActuatorCommand::PhDownOff,
                    ActuatorCommand::NutrientsOff,
                ]);
                out.transition = Some(self.force_enter(OperatingState::Idle, now));
            }
            ExternalCommand::StartRecirculation => {
                out.commands.push(ActuatorCommand::StartRecirculation);
                out.transition = Some(self.force_enter(OperatingState::Recirculating, now));
            }
            ExternalCommand::RefillOn => {
                out.commands.push(ActuatorCommand::RefillOn);
                out.transition = Some(self.force_enter(OperatingState::Refilling, now));
            }
        }
        out
    }
}

#[cfg(test)]
mod edge_table_tests {
    use super::*;

    #[test]
    fn error_has_no_outgoing_edge() {
        assert!(!EDGES.iter().any(|(from, _)| *from == OperatingState::Error));
    }

    #[test]
    fn error_reachable_only_from_refilling() {
        let sources: Vec<_> = EDGES
            .iter()
            .filter(|(_, to)| *to == OperatingState::Error)
            .map(|(from, _)| *from)
            .collect();
        assert_eq!(sources, vec![OperatingState::Refilling]);
    }
}
