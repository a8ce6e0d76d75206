#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core control logic for the hydroponic rig (hardware-agnostic).
//!
//! All device interactions go through the `hydro_traits` seams; this crate
//! only decides, it never performs I/O itself.
//!
//! ## Architecture
//!
//! - **Time resolution**: layered network/RTC/last-valid/system fallback with
//!   drift correction (`timesource` module)
//! - **Sensor derivation**: raw bridge tuple to calibrated frame (`frame`)
//! - **Dosing policy**: pure in-band checks and pump selection (`dosing`)
//! - **Schedule tracking**: once-per-hour-per-day irrigation dedup (`schedule`)
//! - **State machine**: guard/action transitions returning actuator commands
//!   instead of performing RPC (`machine`)
//! - **Runner**: the cooperative sense-decide-act cycle (`runner`)

pub mod conversions;
pub mod dosing;
pub mod error;
pub mod frame;
pub mod hw_error;
pub mod machine;
pub mod mocks;
pub mod runner;
pub mod schedule;
pub mod timesource;

pub use error::{CtrlError, Result};
pub use frame::{EcCal, PhCal, SensorFrame};
pub use machine::{
    CommandAck, ControlCfg, ControlStateMachine, EDGES, ExternalCommand, OperatingState,
    TickOutcome, Transition,
};
pub use runner::{ControlLoop, CycleOutcome};
pub use schedule::ScheduleTracker;
pub use timesource::{ClockResolver, TimeCfg};
