//! Layered wall-clock resolution.
//!
//! The controller runs on hardware whose system clock may be wrong at boot,
//! so every cycle resolves "now" through a fallback chain: network time
//! (rate-limited), then the battery-backed RTC, then the last value this
//! resolver produced, then the host system clock as a final resort. A
//! successful network fetch also disciplines the RTC when the two disagree
//! by more than a configured threshold.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use hydro_traits::{Clock, NetworkTime, Rtc, RtcDateTime};

/// Time-resolution knobs.
#[derive(Debug, Clone)]
pub struct TimeCfg {
    /// Minimum spacing between network fetch attempts, seconds.
    pub resync_interval_s: u64,
    /// RTC vs network disagreement beyond this many seconds rewrites the RTC.
    pub drift_threshold_s: i64,
    pub fetch_timeout_ms: u64,
    /// IANA zone name passed to the network time provider.
    pub timezone: String,
    pub rtc_year_min: i32,
    pub rtc_year_max: i32,
}

impl Default for TimeCfg {
    fn default() -> Self {
        Self {
            resync_interval_s: 600,
            drift_threshold_s: 300,
            fetch_timeout_ms: 15_000,
            timezone: "Europe/Rome".to_owned(),
            rtc_year_min: 2000,
            rtc_year_max: 2100,
        }
    }
}

pub struct ClockResolver<R, N> {
    rtc: R,
    net: N,
    cfg: TimeCfg,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    last_valid: Option<NaiveDateTime>,
    /// ms-since-epoch of the last network sync attempt that succeeded.
    last_net_sync_ms: Option<u64>,
}

impl<R, N> core::fmt::Debug for ClockResolver<R, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ClockResolver")
            .field("last_valid", &self.last_valid)
            .field("last_net_sync_ms", &self.last_net_sync_ms)
            .finish()
    }
}

impl<R: Rtc, N: NetworkTime> ClockResolver<R, N> {
    pub fn new(rtc: R, net: N, cfg: TimeCfg, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let epoch = clock.now();
        Self {
            rtc,
            net,
            cfg,
            clock,
            epoch,
            last_valid: None,
            last_net_sync_ms: None,
        }
    }

    pub fn last_valid(&self) -> Option<NaiveDateTime> {
        self.last_valid
    }

    fn sync_due(&self) -> bool {
        match self.last_net_sync_ms {
            None => true,
            Some(at) => self.clock.ms_since(self.epoch) - at > self.cfg.resync_interval_s * 1000,
        }
    }

    /// Resolve the current wall-clock time. Never fails: every layer of the
    /// chain has a fallback, ending at the host system clock.
    pub fn resolve(&mut self) -> NaiveDateTime {
        if self.sync_due() {
            let timeout = Duration::from_millis(self.cfg.fetch_timeout_ms);
            match self.net.fetch(&self.cfg.timezone, timeout) {
                Ok(net_now) => {
                    self.last_net_sync_ms = Some(self.clock.ms_since(self.epoch));
                    self.last_valid = Some(net_now);
                    self.discipline_rtc(net_now);
                    return net_now;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "network time fetch failed");
                }
            }
        }

        if let Some(rtc_now) = self.read_rtc() {
            self.last_valid = Some(rtc_now);
            return rtc_now;
        }

        if let Some(last) = self.last_valid {
            tracing::warn!("rtc unreadable, reusing last resolved time");
            return last;
        }

        let sys = chrono::Local::now().naive_local();
        tracing::warn!(%sys, "no trusted time source, falling back to system clock");
        sys
    }

    /// Compare the RTC against a trusted network time and rewrite it when it
    /// drifts past the threshold or cannot be read at all.
    fn discipline_rtc(&mut self, net_now: NaiveDateTime) {
        match self.read_rtc() {
            Some(rtc_now) => {
                let drift = (net_now - rtc_now).num_seconds().abs();
                if drift > self.cfg.drift_threshold_s {
                    tracing::warn!(drift_s = drift, "rtc drift beyond threshold, rewriting");
                    self.write_rtc(net_now);
                }
            }
            None => self.write_rtc(net_now),
        }
    }

    /// Read and validate the RTC. Implausible payloads (year out of range,
    /// impossible calendar fields) are treated as a failed read.
    fn read_rtc(&mut self) -> Option<NaiveDateTime> {
        let raw = match self.rtc.read_datetime() {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "rtc read failed");
                return None;
            }
        };
        if raw.year < self.cfg.rtc_year_min || raw.year > self.cfg.rtc_year_max {
            tracing::warn!(year = raw.year, "rtc year out of plausible range");
            return None;
        }
        let date = NaiveDate::from_ymd_opt(raw.year, raw.month, raw.day)?;
        match date.and_hms_opt(raw.hour, raw.minute, raw.second) {
            Some(dt) => Some(dt),
            None => {
                tracing::warn!(?raw, "rtc reported impossible time of day");
                None
            }
        }
    }

    /// Fire-and-forget RTC rewrite; a failure is logged, not propagated.
    fn write_rtc(&mut self, dt: NaiveDateTime) {
        let payload = RtcDateTime {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
        };
        if let Err(e) = self.rtc.write_datetime(payload) {
            tracing::warn!(error = %e, "rtc write failed");
        }
    }
}
