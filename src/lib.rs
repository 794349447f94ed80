pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod format;
pub mod insights;
pub mod logging;
pub mod panel;
pub mod render;
