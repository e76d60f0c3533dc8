//! Terminal UI layer for the energy dashboard.
//!
//! Provides themes, the dashboard and data tabs built on [`ratatui`], the
//! synchronous event loop, and the paginated text report.

pub mod app;
pub mod components;
pub mod dashboard_view;
pub mod report;
pub mod table_view;
pub mod themes;

pub use meter_core as core;
