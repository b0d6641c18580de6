//! Services Layer
//!
//! Business logic behind the HTTP handlers. Handlers parse and authorise;
//! services own the transactions.

pub mod content_service;
pub mod donation_service;
pub mod payment_service;
pub mod version_service;

pub use payment_service::{RefreshSource, StatusOutcome};
