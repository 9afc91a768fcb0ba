//! Configuration module
//!
//! User settings loaded from the TOML config file.

pub mod config;

pub use config::Config;
