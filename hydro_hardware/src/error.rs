use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("bridge timeout")]
    Timeout,
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("device unavailable: {0}")]
    Unavailable(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
