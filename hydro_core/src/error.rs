use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum CtrlError {
    #[error("bridge error: {0}")]
    Bridge(String),
    #[error("bridge fault: {0}")]
    BridgeFault(String),
    #[error("timeout waiting for bridge")]
    Timeout,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
