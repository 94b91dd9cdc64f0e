pub mod api;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod http;
pub mod models;
pub mod session;
pub mod settings;
pub mod state;
pub mod store;
