//! Reusable line builders shared by the dashboard views.

pub mod filter_panel;
pub mod header;
pub mod metrics;
