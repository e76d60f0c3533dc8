//! Data ingestion layer for the energy dashboard.
//!
//! Reads `labels.dat` and the per-channel `channel_<id>.dat` files of one
//! house, merges them into a single time-indexed table, and answers filter
//! requests with resampled buckets, anomalies and summary statistics.

pub mod analysis;
pub mod anomaly;
pub mod catalog;
pub mod merger;
pub mod reader;
pub mod resampler;

pub use meter_core as core;
