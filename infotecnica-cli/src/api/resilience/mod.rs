//! Request concurrency control for detail fetches

pub mod concurrency;

pub use concurrency::ConcurrencyLimiter;
