use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("force sensor timeout")]
    Timeout,
    #[error("unknown controller: {0}")]
    UnknownController(String),
    #[error("controller not loaded: {0}")]
    NotLoaded(String),
    #[error("switch to {to} rejected")]
    SwitchRejected { to: String },
    #[error("{expected} is not running (active: {active})")]
    WrongController { expected: String, active: String },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
