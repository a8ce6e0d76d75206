pub mod clock;

pub use clock::{Clock, MonotonicClock};

use chrono::NaiveDateTime;
use std::time::Duration;

/// Raw sensor snapshot as reported by the device bridge, one tuple per cycle.
///
/// `float_raw` is the float-switch channel as a scalar; anything >= 0.5 is
/// treated as "level OK" downstream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSensors {
    pub temperature_c: f32,
    pub ec_volts: f32,
    pub ph_millivolts: f32,
    pub float_raw: f32,
}

/// Actuator commands the controller may emit. One enum variant per RPC
/// command understood by the device firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActuatorCommand {
    RefillOn,
    RefillOff,
    StartIrrigation,
    StopIrrigation,
    StartRecirculation,
    StopRecirculation,
    PhDownOn,
    PhDownOff,
    NutrientsOn,
    NutrientsOff,
}

impl ActuatorCommand {
    /// Wire name of the RPC call carrying this command.
    pub fn wire_name(self) -> &'static str {
        match self {
            ActuatorCommand::RefillOn => "refill_on",
            ActuatorCommand::RefillOff => "refill_off",
            ActuatorCommand::StartIrrigation => "start_irrigation",
            ActuatorCommand::StopIrrigation => "stop_irrigation",
            ActuatorCommand::StartRecirculation => "start_recirculation",
            ActuatorCommand::StopRecirculation => "stop_recirculation",
            ActuatorCommand::PhDownOn => "ph_down_on",
            ActuatorCommand::PhDownOff => "ph_down_off",
            ActuatorCommand::NutrientsOn => "nutrients_on",
            ActuatorCommand::NutrientsOff => "nutrients_off",
        }
    }
}

impl core::fmt::Display for ActuatorCommand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Calendar timestamp read from or written to the battery-backed RTC.
/// Field validation (year range, calendar sanity) is the caller's job;
/// implementations pass the payload through unchecked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtcDateTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

/// Sensor side of the device bridge.
pub trait SensorBus {
    fn read_sensors(&mut self) -> Result<RawSensors, Box<dyn std::error::Error + Send + Sync>>;
}

/// Actuator side of the device bridge.
pub trait ActuatorBus {
    fn dispatch(
        &mut self,
        cmd: ActuatorCommand,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Battery-backed hardware clock (DS1302 or similar) behind the bridge.
pub trait Rtc {
    fn read_datetime(&mut self)
    -> Result<RtcDateTime, Box<dyn std::error::Error + Send + Sync>>;
    fn write_datetime(
        &mut self,
        dt: RtcDateTime,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Remote wall-clock source. Implementations must bound the call by
/// `timeout` and report any transport or parse problem as an error.
pub trait NetworkTime {
    fn fetch(
        &mut self,
        timezone: &str,
        timeout: Duration,
    ) -> Result<NaiveDateTime, Box<dyn std::error::Error + Send + Sync>>;
}

/// 16x2 character display behind the bridge. Lines longer than 16 chars
/// are truncated by the implementation.
pub trait Lcd {
    fn clear(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn print_line1(&mut self, text: &str)
    -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn print_line2(&mut self, text: &str)
    -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn show_status(&mut self, code: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Time-series persistence for derived metrics.
pub trait SampleSink {
    fn write_sample(
        &mut self,
        measure: &str,
        value: f64,
        ts_ms: i64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Realtime fan-out towards the UI; mirrors every persisted sample and
/// announces state transitions.
pub trait EventChannel {
    fn send_sample(
        &mut self,
        topic: &str,
        value: f64,
        ts_ms: i64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn send_state(&mut self, state: &str)
    -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
