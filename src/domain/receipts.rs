use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, DbErr};

/// Allocates receipt numbers for completed donations.
///
/// Called exactly once per completion, inside the completion transaction, so
/// a rolled-back completion never consumes a number.
#[async_trait]
pub trait ReceiptNumberGenerator: Send + Sync {
    async fn next_receipt_number(
        &self,
        txn: &DatabaseTransaction,
        completed_at: DateTime<Utc>,
    ) -> Result<String, DbErr>;
}
