// HTTP routes
pub mod device;
pub mod documents;
pub mod handoff;
pub mod health;
pub mod otp;
pub mod verification;

pub use device::*;
pub use documents::*;
pub use handoff::*;
pub use health::*;
pub use otp::*;
pub use verification::*;
