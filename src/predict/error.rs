use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Propagation error: {0}")]
    Propagation(String),
    #[error("Invalid prediction window: horizon {horizon_hours}h, step {step_hours}h")]
    InvalidWindow { horizon_hours: u32, step_hours: u32 },
    #[error("Timestamp out of range: {0}")]
    TimeOutOfRange(i64),
    #[error("Prediction aborted after {samples} samples")]
    Aborted { samples: u32 },
}

impl From<sgp4::Error> for PredictError {
    fn from(err: sgp4::Error) -> Self {
        PredictError::Propagation(err.to_string())
    }
}
