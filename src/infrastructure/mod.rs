//! Infrastructure layer - Framework implementations
//!
//! This layer contains:
//! - Database connection and migrations (db)
//! - HTTP server setup (server)
//! - Configuration loading (config)
//! - Session verification (auth)
//! - Receipt numbering (receipts)
//! - Application state (state)

pub mod auth;
pub mod config;
pub mod db;
pub mod receipts;
pub mod server;
pub mod state;

pub use state::AppState;
