//! OTP activities - business logic functions called by the HTTP layer

mod send_otp;
mod verify_otp;

pub use send_otp::send_otp;
pub use verify_otp::verify_otp;
