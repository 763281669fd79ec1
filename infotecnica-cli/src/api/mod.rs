//! HTTP access to the Infotécnica portal and the REUC registry

pub mod client;
pub mod constants;
pub mod detail;
pub mod error;
pub mod pagination;
pub mod resilience;
pub mod reuc;
pub mod transport;

pub use client::InfotecnicaClient;
pub use constants::{Resource, fichas};
pub use detail::{DetailRequest, fetch_details};
pub use reuc::ReucClient;
