//! Integrations with third-party services
pub mod integrations;
