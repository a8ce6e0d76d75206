//! The cooperative control loop.
//!
//! One `cycle` does, in order: resolve time, read sensors, derive the frame,
//! persist and broadcast the metrics, refresh the display, run one state
//! machine tick, then dispatch the resulting actuator commands. Transient
//! collaborator failures are logged and degrade the cycle (stale frame,
//! skipped sample) rather than aborting the loop; the loop only stops when
//! the shutdown flag is raised.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::NaiveDateTime;
use hydro_traits::{
    ActuatorBus, ActuatorCommand, Clock, EventChannel, Lcd, NetworkTime, Rtc, SampleSink,
    SensorBus,
};

use crate::frame::{EcCal, PhCal, SensorFrame};
use crate::hw_error::map_hw_error;
use crate::machine::{CommandAck, ControlStateMachine, ExternalCommand, TickOutcome, Transition};
use crate::timesource::ClockResolver;

/// What one full cycle did, for tests and for the CLI's bounded-run mode.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub now: NaiveDateTime,
    pub frame: SensorFrame,
    pub transition: Option<Transition>,
    pub commands: Vec<ActuatorCommand>,
}

pub struct ControlLoop<SB, AB, L, R, N, SK, EV> {
    sensors: SB,
    actuators: AB,
    lcd: L,
    resolver: ClockResolver<R, N>,
    sink: SK,
    channel: EV,
    machine: ControlStateMachine,
    ph_cal: PhCal,
    ec_cal: EcCal,
    clock: Arc<dyn Clock + Send + Sync>,
    interval: Duration,
    last_frame: Option<SensorFrame>,
}

impl<SB, AB, L, R, N, SK, EV> ControlLoop<SB, AB, L, R, N, SK, EV>
where
    SB: SensorBus,
    AB: ActuatorBus,
    L: Lcd,
    R: Rtc,
    N: NetworkTime,
    SK: SampleSink,
    EV: EventChannel,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sensors: SB,
        actuators: AB,
        lcd: L,
        resolver: ClockResolver<R, N>,
        sink: SK,
        channel: EV,
        machine: ControlStateMachine,
        ph_cal: PhCal,
        ec_cal: EcCal,
        clock: Arc<dyn Clock + Send + Sync>,
        interval: Duration,
    ) -> Self {
        Self {
            sensors,
            actuators,
            lcd,
            resolver,
            sink,
            channel,
            machine,
            ph_cal,
            ec_cal,
            clock,
            interval,
            last_frame: None,
        }
    }

    pub fn machine(&self) -> &ControlStateMachine {
        &self.machine
    }

    /// Run one sense-decide-act cycle. Returns None only when no frame has
    /// ever been acquired (first cycle with a dead sensor bus).
    pub fn cycle(&mut self) -> Option<CycleOutcome> {
        let now = self.resolver.resolve();

        let frame = match self.sensors.read_sensors() {
            Ok(raw) => {
                let f = SensorFrame::derive(&raw, &self.ph_cal, &self.ec_cal);
                self.last_frame = Some(f);
                f
            }
            Err(e) => {
                tracing::warn!(error = %map_hw_error(e.as_ref()), "sensor read failed");
                match self.last_frame {
                    Some(f) => {
                        tracing::warn!("reusing previous sensor frame");
                        f
                    }
                    None => {
                        tracing::error!("no sensor frame available yet, skipping cycle");
                        return None;
                    }
                }
            }
        };

        let ts_ms = now.and_utc().timestamp_millis();
        self.publish(&frame, ts_ms);
        self.refresh_display(&frame);

        let outcome = self.machine.tick(now, &frame);
        self.act(&outcome);

        Some(CycleOutcome {
            now,
            frame,
            transition: outcome.transition,
            commands: outcome.commands,
        })
    }

    /// Loop until `shutdown` is raised, sleeping the configured interval
    /// between cycles.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        tracing::info!(interval_s = self.interval.as_secs(), "control loop started");
        while !shutdown.load(Ordering::SeqCst) {
            self.cycle();
            self.clock.sleep(self.interval);
        }
        tracing::info!("control loop stopped");
    }

    /// Apply an external command immediately, outside the cycle cadence.
    pub fn apply_command(&mut self, cmd: ExternalCommand) -> CommandAck {
        let now = self.resolver.resolve();
        let outcome = self.machine.apply(cmd, now);
        self.act(&outcome);
        CommandAck {
            status: "ok",
            cmd: cmd.as_str().to_owned(),
        }
    }

    fn act(&mut self, outcome: &TickOutcome) {
        if let Some(t) = outcome.transition {
            if let Err(e) = self.channel.send_state(t.to.as_str()) {
                tracing::warn!(error = %e, "state broadcast failed");
            }
            if let Err(e) = self.lcd.show_status(t.to.status_code()) {
                tracing::warn!(error = %e, "lcd status update failed");
            }
        }
        for cmd in &outcome.commands {
            if let Err(e) = self.actuators.dispatch(*cmd) {
                tracing::error!(%cmd, error = %map_hw_error(e.as_ref()), "actuator dispatch failed");
            }
        }
    }

    /// Persist the six derived metrics and mirror them on the realtime
    /// channel. Failures are per-measure, not fatal.
    fn publish(&mut self, frame: &SensorFrame, ts_ms: i64) {
        let samples: [(&str, f64); 6] = [
            ("temp_c", f64::from(frame.temperature_c)),
            ("ph_mv", f64::from(frame.ph_millivolts)),
            ("ph_value", f64::from(frame.ph_value)),
            ("ec_v", f64::from(frame.ec_volts)),
            ("ec_ms", f64::from(frame.ec_ms)),
            ("float_ok", if frame.float_ok { 1.0 } else { 0.0 }),
        ];
        for (measure, value) in samples {
            if let Err(e) = self.sink.write_sample(measure, value, ts_ms) {
                tracing::warn!(measure, error = %e, "sample write failed");
            }
            if let Err(e) = self.channel.send_sample(measure, value, ts_ms) {
                tracing::warn!(measure, error = %e, "sample broadcast failed");
            }
        }
    }

    fn refresh_display(&mut self, frame: &SensorFrame) {
        let level = if frame.float_ok { "OK " } else { "LOW" };
        let line1 = format!("T:{:4.1}C H2O:{level}", frame.temperature_c);
        let line2 = format!("EC:{:4.2}V pH:{:4.2}", frame.ec_volts, frame.ph_value);
        if let Err(e) = self.lcd.print_line1(&line1) {
            tracing::warn!(error = %e, "lcd line1 update failed");
        }
        if let Err(e) = self.lcd.print_line2(&line2) {
            tracing::warn!(error = %e, "lcd line2 update failed");
        }
    }
}
