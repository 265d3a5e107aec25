//! Load a table, narrow it with per-column selections and a date range, and
//! compute the headline numbers and grouped series a dashboard displays.

pub mod config;
pub mod data;
pub mod report;
pub mod state;

pub use config::{DashboardConfig, Variant};
pub use report::DashboardReport;
pub use state::Session;
