//! Shared domain layer for the energy dashboard.
//!
//! Holds the table and filter models, the error taxonomy, statistics helpers,
//! time conversion, number formatting and CLI settings used by every other
//! crate in the workspace.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod stats;
pub mod time_utils;

pub use error::{MeterError, Result};
