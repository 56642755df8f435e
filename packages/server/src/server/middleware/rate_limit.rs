// Per-IP rate limiting with tower-governor
//
// Configuration:
// - 10 requests per second per IP with bursts of 20
// - Applied to the whole router in app.rs (build_app)
// - Sits in front of the OTP endpoints, on top of the per (user, phone)
//   issuance limit enforced by the OTP domain

/// Steady-state requests per second per client IP
pub const RATE_LIMIT_PER_SECOND: u64 = 10;

/// Requests a client may make in a burst before being throttled
pub const RATE_LIMIT_BURST: u32 = 20;
