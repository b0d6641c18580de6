//! Application state containing the database and shared collaborators

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::domain::{PaymentGateway, ReceiptNumberGenerator};
use crate::infrastructure::config::Config;
use crate::infrastructure::receipts::SequentialReceiptNumbers;
use crate::modules::integrations::toyyibpay::ToyyibPayClient;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    pub config: Arc<Config>,
    /// `None` when gateway credentials are not configured
    pub gateway: Option<Arc<dyn PaymentGateway>>,
    pub receipts: Arc<dyn ReceiptNumberGenerator>,
}

impl AppState {
    /// Build the state from configuration, wiring the ToyyibPay client when
    /// credentials are present
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let gateway: Option<Arc<dyn PaymentGateway>> =
            config
                .gateway
                .clone()
                .and_then(|gw| match ToyyibPayClient::new(gw) {
                    Ok(client) => Some(Arc::new(client) as Arc<dyn PaymentGateway>),
                    Err(e) => {
                        tracing::error!("Failed to initialise payment gateway: {}", e);
                        None
                    }
                });

        Self {
            db,
            config: Arc::new(config),
            gateway,
            receipts: Arc::new(SequentialReceiptNumbers),
        }
    }

    /// Replace the payment gateway (tests, alternative providers)
    pub fn with_gateway(mut self, gateway: Option<Arc<dyn PaymentGateway>>) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn with_receipts(mut self, receipts: Arc<dyn ReceiptNumberGenerator>) -> Self {
        self.receipts = receipts;
        self
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn gateway(&self) -> Option<&dyn PaymentGateway> {
        self.gateway.as_deref()
    }
}

impl AsRef<DatabaseConnection> for AppState {
    fn as_ref(&self) -> &DatabaseConnection {
        &self.db
    }
}

// Implement FromRef to allow extracting DatabaseConnection from AppState
impl axum::extract::FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
