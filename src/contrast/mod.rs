//! Rock-paper-scissors contrast weighting
//!
//! - `table`: category weight lists and terrain effectiveness
//! - `profile`: per-side force profiles built from those categories
//! - `loader`: TOML data loading

pub mod loader;
pub mod profile;
pub mod table;

pub use profile::{ForceBucket, ForceProfile, GROUND_TOTAL, SPACE_TOTAL};
pub use table::{ContrastTable, ContrastTarget, ContrastWeight};
