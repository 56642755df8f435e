// Identity Verification - core library
//
// Phone ownership via SMS one-time codes, and document verification via a
// mobile capture flow that can be handed off from a desktop by QR code.
//
// Business logic lives in domains/*, infrastructure seams in kernel/, and
// the axum HTTP shell in server/.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
