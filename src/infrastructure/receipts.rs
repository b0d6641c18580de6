//! Default receipt numbering: `RCP-<year>-<sequence>`, one sequence per year.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use sea_orm::{ActiveModelTrait, DatabaseTransaction, DbErr, EntityTrait, Set};

use crate::domain::ReceiptNumberGenerator;
use crate::models::receipt_sequence::{self, Entity as ReceiptSequence};

pub struct SequentialReceiptNumbers;

pub fn format_receipt_number(year: i32, sequence: i64) -> String {
    format!("RCP-{}-{:06}", year, sequence)
}

#[async_trait]
impl ReceiptNumberGenerator for SequentialReceiptNumbers {
    async fn next_receipt_number(
        &self,
        txn: &DatabaseTransaction,
        completed_at: DateTime<Utc>,
    ) -> Result<String, DbErr> {
        let year = completed_at.year();

        let next = match ReceiptSequence::find_by_id(year).one(txn).await? {
            Some(row) => {
                let next = row.last_value + 1;
                let mut active: receipt_sequence::ActiveModel = row.into();
                active.last_value = Set(next);
                active.update(txn).await?;
                next
            }
            None => {
                receipt_sequence::ActiveModel {
                    year: Set(year),
                    last_value: Set(1),
                }
                .insert(txn)
                .await?;
                1
            }
        };

        Ok(format_receipt_number(year, next))
    }
}
