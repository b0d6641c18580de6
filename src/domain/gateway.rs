//! Payment gateway contract
//!
//! The reconciler only ever talks to this trait. The ToyyibPay client in
//! `modules::integrations::toyyibpay` is the production implementation.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::donation::PaymentStatus;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Payment gateway did not answer in time")]
    Timeout,
    #[error("Payment gateway unreachable: {0}")]
    Transport(String),
    #[error("Payment gateway rejected the request: {0}")]
    Rejected(String),
    #[error("Unexpected payment gateway response: {0}")]
    Decode(String),
}

/// One payment attempt against a bill, as reported by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayTransaction {
    /// Provider status code, verbatim
    pub raw_status: String,
    /// Result of the fixed status table; `None` for codes we do not know
    pub status: Option<PaymentStatus>,
    pub transaction_id: Option<String>,
    pub paid_at: Option<String>,
    pub amount: Option<String>,
}

/// Bill creation request for a new checkout
#[derive(Debug, Clone)]
pub struct BillRequest {
    pub reference: String,
    pub name: String,
    pub description: String,
    /// Minor currency units (sen)
    pub amount: i64,
    pub payer_name: String,
    pub payer_email: String,
    pub payer_phone: Option<String>,
    pub return_url: String,
    pub callback_url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Whether this gateway talks to the provider's sandbox
    fn is_sandbox(&self) -> bool;

    /// Where the payer completes a bill
    fn payment_url(&self, bill_code: &str) -> String;

    /// Create a bill and return its bill code
    async fn create_bill(&self, request: &BillRequest) -> Result<String, GatewayError>;

    /// Transactions recorded against a bill, most recent first.
    /// An empty list is a valid answer.
    async fn bill_transactions(
        &self,
        bill_code: &str,
    ) -> Result<Vec<GatewayTransaction>, GatewayError>;
}
