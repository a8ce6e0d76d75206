//! HTTP network-time client (timeapi.io), behind the `http` feature.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use hydro_traits::NetworkTime;
use serde::Deserialize;

use crate::error::HwError;

const ENDPOINT: &str = "https://timeapi.io/api/Time/current/zone";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZoneTime {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    seconds: u32,
}

/// Blocking client for the zone-time endpoint. Each fetch builds a fresh
/// client so the per-call timeout is honored exactly.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeApiClient;

impl TimeApiClient {
    pub fn new() -> Self {
        Self
    }
}

impl NetworkTime for TimeApiClient {
    fn fetch(
        &mut self,
        timezone: &str,
        timeout: Duration,
    ) -> Result<NaiveDateTime, Box<dyn std::error::Error + Send + Sync>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HwError::Rpc(e.to_string()))?;
        let resp = client
            .get(ENDPOINT)
            .query(&[("timeZone", timezone)])
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    HwError::Timeout
                } else {
                    HwError::Rpc(e.to_string())
                }
            })?
            .error_for_status()
            .map_err(|e| HwError::Rpc(e.to_string()))?;
        let t: ZoneTime = resp
            .json()
            .map_err(|e| HwError::InvalidPayload(e.to_string()))?;

        let date = NaiveDate::from_ymd_opt(t.year, t.month, t.day)
            .ok_or_else(|| HwError::InvalidPayload(format!("bad date {t:?}")))?;
        let dt = date
            .and_hms_opt(t.hour, t.minute, t.seconds)
            .ok_or_else(|| HwError::InvalidPayload(format!("bad time {t:?}")))?;
        Ok(dt)
    }
}
