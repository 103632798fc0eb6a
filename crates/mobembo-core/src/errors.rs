use thiserror::Error;

/// Every failure the booking core reports to its callers. Business
/// rejections carry enough detail to surface verbatim; storage faults
/// stay opaque.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("schedule not found")]
    ScheduleNotFound,

    #[error("schedule is no longer open for booking")]
    ScheduleUnavailable,

    #[error("only {remaining} seat(s) remaining")]
    InsufficientSeats { remaining: i32 },

    #[error("at least one seat must be booked")]
    InvalidSeatCount,

    #[error("booking not found")]
    BookingNotFound,

    #[error("a payment already exists for this booking")]
    PaymentAlreadyExists,

    #[error("caller identity is required")]
    Unauthenticated,

    #[error("caller does not have access to this booking")]
    Forbidden,

    #[error("payment was declined: {reason}")]
    PaymentDeclined { reason: String },

    #[error("storage failure")]
    Store(#[source] anyhow::Error),
}

impl BookingError {
    pub fn store<E: Into<anyhow::Error>>(err: E) -> Self {
        BookingError::Store(err.into())
    }
}
