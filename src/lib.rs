pub mod api;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod models;
pub mod server;
pub mod store;
