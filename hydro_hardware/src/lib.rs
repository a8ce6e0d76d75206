//! Device bridges for the rig: a fully simulated rig for development and
//! tests, tracing-backed sink/channel stand-ins, and an optional HTTP
//! network-time client behind the `http` feature.

pub mod error;
#[cfg(feature = "http")]
pub mod net;

pub use error::HwError;

use std::sync::{Arc, Mutex};

use hydro_traits::{
    ActuatorBus, ActuatorCommand, EventChannel, Lcd, NetworkTime, RawSensors, Rtc, RtcDateTime,
    SampleSink, SensorBus,
};

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Shared state of the simulated rig. Tank level moves with the pumps:
/// refilling raises it a step per sensor read, irrigating lowers it.
#[derive(Debug)]
struct RigState {
    tank_level: f32,
    temperature_c: f32,
    ec_volts: f32,
    ph_millivolts: f32,
    refill_on: bool,
    irrigating: bool,
    recirculating: bool,
    ph_down_on: bool,
    nutrients_on: bool,
}

impl Default for RigState {
    fn default() -> Self {
        Self {
            tank_level: 1.0,
            temperature_c: 22.0,
            ec_volts: 2.0,
            ph_millivolts: 1680.0,
            refill_on: false,
            irrigating: false,
            recirculating: false,
            ph_down_on: false,
            nutrients_on: false,
        }
    }
}

/// Handle pair factory for the simulated rig. Clone-cheap handles share one
/// state so the actuator side is visible to the sensor side.
#[derive(Debug, Clone, Default)]
pub struct SimRig {
    state: Arc<Mutex<RigState>>,
}

impl SimRig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sensors(&self) -> SimSensors {
        SimSensors {
            state: Arc::clone(&self.state),
        }
    }

    pub fn actuators(&self) -> SimActuators {
        SimActuators {
            state: Arc::clone(&self.state),
        }
    }

    /// Drain the tank below the float threshold, as if plants drank it.
    pub fn drain_tank(&self) {
        if let Ok(mut s) = self.state.lock() {
            s.tank_level = 0.0;
        }
    }

    pub fn set_probes(&self, ec_volts: f32, ph_millivolts: f32) {
        if let Ok(mut s) = self.state.lock() {
            s.ec_volts = ec_volts;
            s.ph_millivolts = ph_millivolts;
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimSensors {
    state: Arc<Mutex<RigState>>,
}

impl SensorBus for SimSensors {
    fn read_sensors(&mut self) -> Result<RawSensors, BoxedError> {
        let mut s = self
            .state
            .lock()
            .map_err(|_| HwError::Unavailable("sim state poisoned".into()))?;
        if s.refill_on {
            s.tank_level = (s.tank_level + 0.2).min(1.0);
        } else if s.irrigating {
            s.tank_level = (s.tank_level - 0.05).max(0.0);
        }
        // Dosing pumps nudge the probes towards their targets.
        if s.ph_down_on {
            s.ph_millivolts -= 5.0;
        }
        if s.nutrients_on {
            s.ec_volts = (s.ec_volts + 0.05).min(5.0);
        }
        Ok(RawSensors {
            temperature_c: s.temperature_c,
            ec_volts: s.ec_volts,
            ph_millivolts: s.ph_millivolts,
            float_raw: if s.tank_level >= 0.5 { 1.0 } else { 0.0 },
        })
    }
}

#[derive(Debug, Clone)]
pub struct SimActuators {
    state: Arc<Mutex<RigState>>,
}

impl ActuatorBus for SimActuators {
    fn dispatch(&mut self, cmd: ActuatorCommand) -> Result<(), BoxedError> {
        let mut s = self
            .state
            .lock()
            .map_err(|_| HwError::Unavailable("sim state poisoned".into()))?;
        tracing::debug!(%cmd, "sim actuator");
        match cmd {
            ActuatorCommand::RefillOn => s.refill_on = true,
            ActuatorCommand::RefillOff => s.refill_on = false,
            ActuatorCommand::StartIrrigation => s.irrigating = true,
            ActuatorCommand::StopIrrigation => s.irrigating = false,
            ActuatorCommand::StartRecirculation => s.recirculating = true,
            ActuatorCommand::StopRecirculation => s.recirculating = false,
            ActuatorCommand::PhDownOn => s.ph_down_on = true,
            ActuatorCommand::PhDownOff => s.ph_down_on = false,
            ActuatorCommand::NutrientsOn => s.nutrients_on = true,
            ActuatorCommand::NutrientsOff => s.nutrients_on = false,
        }
        Ok(())
    }
}

/// 16x2 display simulated onto the log at debug level. Lines are truncated
/// to the panel width like the real panel would.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimLcd;

const LCD_COLS: usize = 16;

fn clip(text: &str) -> &str {
    match text.char_indices().nth(LCD_COLS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

impl Lcd for SimLcd {
    fn clear(&mut self) -> Result<(), BoxedError> {
        Ok(())
    }

    fn print_line1(&mut self, text: &str) -> Result<(), BoxedError> {
        tracing::debug!(line = 1, text = clip(text), "lcd");
        Ok(())
    }

    fn print_line2(&mut self, text: &str) -> Result<(), BoxedError> {
        tracing::debug!(line = 2, text = clip(text), "lcd");
        Ok(())
    }

    fn show_status(&mut self, code: u8) -> Result<(), BoxedError> {
        tracing::debug!(code, "lcd status");
        Ok(())
    }
}

/// Simulated battery-backed RTC: remembers whatever was last written and can
/// be marked unhealthy to exercise the fallback chain.
#[derive(Debug, Clone)]
pub struct SimRtc {
    inner: Arc<Mutex<(RtcDateTime, bool)>>,
}

impl Default for SimRtc {
    fn default() -> Self {
        Self::new(RtcDateTime {
            year: 2026,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
        })
    }
}

impl SimRtc {
    pub fn new(now: RtcDateTime) -> Self {
        Self {
            inner: Arc::new(Mutex::new((now, true))),
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        if let Ok(mut g) = self.inner.lock() {
            g.1 = healthy;
        }
    }
}

impl Rtc for SimRtc {
    fn read_datetime(&mut self) -> Result<RtcDateTime, BoxedError> {
        let g = self
            .inner
            .lock()
            .map_err(|_| HwError::Unavailable("sim rtc poisoned".into()))?;
        if !g.1 {
            return Err(HwError::Unavailable("rtc battery flat".into()).into());
        }
        Ok(g.0)
    }

    fn write_datetime(&mut self, dt: RtcDateTime) -> Result<(), BoxedError> {
        let mut g = self
            .inner
            .lock()
            .map_err(|_| HwError::Unavailable("sim rtc poisoned".into()))?;
        g.0 = dt;
        Ok(())
    }
}

/// Network time source that answers with the host clock, standing in for
/// the HTTP client when the `http` feature is off.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimNetworkTime;

impl NetworkTime for SimNetworkTime {
    fn fetch(
        &mut self,
        _timezone: &str,
        _timeout: std::time::Duration,
    ) -> Result<chrono::NaiveDateTime, BoxedError> {
        Ok(chrono::Local::now().naive_local())
    }
}

/// Sample sink that emits each sample as a structured log line, the default
/// until a real time-series backend is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl SampleSink for TracingSink {
    fn write_sample(&mut self, measure: &str, value: f64, ts_ms: i64) -> Result<(), BoxedError> {
        tracing::info!(measure, value, ts_ms, "sample");
        Ok(())
    }
}

/// Event channel mirrored onto the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingChannel;

impl EventChannel for TracingChannel {
    fn send_sample(&mut self, topic: &str, value: f64, ts_ms: i64) -> Result<(), BoxedError> {
        tracing::debug!(topic, value, ts_ms, "broadcast");
        Ok(())
    }

    fn send_state(&mut self, state: &str) -> Result<(), BoxedError> {
        tracing::info!(state, "state_changed");
        Ok(())
    }
}
