// Library surface for headless/integration tests and reuse.
// The binary in main.rs only wires terminal, config and logging around it.
pub mod app;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod csv_export;
pub mod format;
pub mod log_store;
pub mod logging;
pub mod record;
pub mod runtime;
pub mod session;
pub mod tracker;
pub mod ui;
