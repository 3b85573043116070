use thiserror::Error;

use crate::model::{Ms, ReservationId, UnknownCategory};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid window: end {end} is not after start {start}")]
    InvalidWindow { start: Ms, end: Ms },
    #[error("window starts at {start}, before now ({now})")]
    PastWindow { start: Ms, now: Ms },
    #[error("out of range: {0}")]
    OutOfRange(String),
    #[error("reservation not found: {0}")]
    NotFound(ReservationId),
    #[error("reservation already approved: {0}")]
    AlreadyApproved(ReservationId),
    #[error("reservation already rejected: {0}")]
    AlreadyRejected(ReservationId),
    #[error("reservation {reservation} conflicts with {conflicting}")]
    Conflict {
        reservation: ReservationId,
        conflicting: ReservationId,
    },
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("store failure: {0}")]
    StoreFailure(String),
}

impl EngineError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidRequest(_) => "invalid_request",
            EngineError::InvalidWindow { .. } => "invalid_window",
            EngineError::PastWindow { .. } => "past_window",
            EngineError::OutOfRange(_) => "out_of_range",
            EngineError::NotFound(_) => "not_found",
            EngineError::AlreadyApproved(_) => "already_approved",
            EngineError::AlreadyRejected(_) => "already_rejected",
            EngineError::Conflict { .. } => "conflict",
            EngineError::Forbidden(_) => "forbidden",
            EngineError::StoreFailure(_) => "store_failure",
        }
    }
}

impl From<UnknownCategory> for EngineError {
    fn from(e: UnknownCategory) -> Self {
        EngineError::InvalidRequest(e.to_string())
    }
}
