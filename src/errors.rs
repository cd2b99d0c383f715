use thiserror::Error;

/// Fatal failures surfaced to the caller. Order-level anomalies
/// (insufficient cash or shares, missing prices) are absorbed inside the
/// simulation loop and reported via warnings instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no market data available for the requested symbols and window")]
    DataUnavailable,

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("unknown strategy '{0}'")]
    UnknownStrategy(String),
}
