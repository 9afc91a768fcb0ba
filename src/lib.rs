pub mod api_client;
pub mod app_state_container;
pub mod classic;
pub mod config;
pub mod data_exporter;
pub mod query_templates;
pub mod schema_file;
pub mod services;
pub mod sql_highlighter;
pub mod state;
pub mod table_display;
pub mod ui;
pub mod utils;
pub mod yank_manager;
