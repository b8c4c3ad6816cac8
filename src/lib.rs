// Library surface for the binary and the integration tests.
pub mod app;
pub mod app_dirs;
pub mod autosave;
pub mod celebration;
pub mod clock;
pub mod config;
pub mod editor;
pub mod error;
pub mod goal;
pub mod logging;
pub mod modes;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod stats;
pub mod storage;
pub mod ui;
