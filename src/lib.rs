//! Auto-resolve - deterministic battle resolution for space and land combat

pub mod autoresolve;
pub mod contrast;
pub mod core;
pub mod scenario;
pub mod units;
