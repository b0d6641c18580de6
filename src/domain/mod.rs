//! Domain layer - Business abstractions
//!
//! Error taxonomy plus the traits sitting at the seams to the outside world
//! (payment gateway, receipt numbering).

pub mod errors;
pub mod gateway;
pub mod receipts;

pub use errors::DomainError;
pub use gateway::{BillRequest, GatewayError, GatewayTransaction, PaymentGateway};
pub use receipts::ReceiptNumberGenerator;
