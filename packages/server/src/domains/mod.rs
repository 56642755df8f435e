//! Business domains
//!
//! Each domain exposes plain functions or structs that take `ServerDeps`
//! (or pieces of it). The HTTP layer in `server` is a thin shell over them.

pub mod capture;
pub mod device;
pub mod handoff;
pub mod otp;
pub mod verification;
