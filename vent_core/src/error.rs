use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum VentError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("scheduler error: {0}")]
    Scheduler(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing actuator driver")]
    MissingActuator,
    #[error("missing pressure sensor")]
    MissingPressureSensor,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
