//! Terminal user interface
//!
//! Ratatui front-end over the shared `AppStateContainer`.

pub mod rendering;
pub mod tui_app;

pub use tui_app::{run_tui, TuiApp};
