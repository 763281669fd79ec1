//! Row-level cleaning rules, unit conversions and identity resolution

pub mod numeric;
pub mod ratio;
pub mod substitution;
pub mod text;
pub mod units;

