//! Runtime layer for the energy dashboard.
//!
//! Keeps loaded house data alive between filter requests and reloads it only
//! when the input files change.

pub mod load_cache;
pub mod session;

pub use meter_core as core;
pub use meter_data as data;
