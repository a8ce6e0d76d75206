//! No-op collaborator implementations.
//!
//! Used by the CLI self-check and by tests that only care about the decision
//! logic, not about where samples or display lines end up.

use hydro_traits::{EventChannel, Lcd, SampleSink};

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Sample sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl SampleSink for NullSink {
    fn write_sample(&mut self, _measure: &str, _value: f64, _ts_ms: i64) -> Result<(), BoxedError> {
        Ok(())
    }
}

/// Event channel that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullChannel;

impl EventChannel for NullChannel {
    fn send_sample(&mut self, _topic: &str, _value: f64, _ts_ms: i64) -> Result<(), BoxedError> {
        Ok(())
    }

    fn send_state(&mut self, _state: &str) -> Result<(), BoxedError> {
        Ok(())
    }
}

/// Display that accepts and discards every line.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLcd;

impl Lcd for NullLcd {
    fn clear(&mut self) -> Result<(), BoxedError> {
        Ok(())
    }

    fn print_line1(&mut self, _text: &str) -> Result<(), BoxedError> {
        Ok(())
    }

    fn print_line2(&mut self, _text: &str) -> Result<(), BoxedError> {
        Ok(())
    }

    fn show_status(&mut self, _code: u8) -> Result<(), BoxedError> {
        Ok(())
    }
}
