//! Utility functions and helpers
//!
//! Paths, logging and small timing helpers used throughout the application.

pub mod app_paths;
pub mod feedback_timer;
pub mod logging;
