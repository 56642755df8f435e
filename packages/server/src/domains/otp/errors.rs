use thiserror::Error;

/// Everything that can go wrong issuing or checking a one-time code
#[derive(Error, Debug)]
pub enum OtpError {
    #[error("Phone number must be a mobile number in +55XXXXXXXXXXX format")]
    InvalidPhone,

    #[error("User id is required")]
    InvalidUserId,

    #[error("Code must be exactly 6 digits")]
    InvalidCode,

    #[error("Too many codes requested, try again in {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: i64 },

    #[error("No active code for this user")]
    NoActiveCode,

    #[error("Code has expired, request a new one")]
    Expired,

    #[error("Too many incorrect attempts, request a new code")]
    TooManyAttempts,

    #[error("Incorrect code, {remaining_attempts} attempts remaining")]
    IncorrectCode { remaining_attempts: u32 },

    /// The code is stored; only the SMS failed
    #[error("Failed to deliver code: {0}")]
    Delivery(String),

    #[error("Code store error: {0}")]
    Store(#[from] anyhow::Error),
}
