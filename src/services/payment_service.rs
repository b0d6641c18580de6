//! Payment Status Reconciler
//!
//! Brings a donation in line with what the payment gateway reports for its
//! bill. Every check is written to the donation's audit trail, and every
//! status write is a compare-and-swap on the status that was read, so two
//! concurrent refreshes cannot both complete the same donation.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domain::{
    DomainError, GatewayError, GatewayTransaction, PaymentGateway, ReceiptNumberGenerator,
};
use crate::models::donation::{self, Entity as Donation, Environment, PaymentStatus};
use crate::models::donation_log;
use crate::models::project;
use crate::services::version_service::{self, NewActivity};

pub const DEFAULT_EXPIRY_REASON: &str = "Marked as expired by administrator";
pub const GATEWAY_NOT_CONFIGURED: &str = "Payment gateway not configured";

/// What triggered a status refresh; recorded as the log event type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshSource {
    Admin,
    Callback,
}

impl RefreshSource {
    pub fn event_type(&self) -> &'static str {
        match self {
            RefreshSource::Admin => "admin_status_refresh",
            RefreshSource::Callback => "payment_callback",
        }
    }
}

/// Result of a reconciliation or an administrative override
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOutcome {
    pub success: bool,
    pub message: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_number: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub no_change: bool,
}

impl StatusOutcome {
    fn unchanged(status: PaymentStatus, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            status,
            previous_status: None,
            receipt_number: None,
            no_change: true,
        }
    }

    fn changed(previous: PaymentStatus, status: PaymentStatus, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            status,
            previous_status: Some(previous),
            receipt_number: None,
            no_change: false,
        }
    }
}

/// Fields of a gateway callback that can identify the donation.
/// The reported status is not read: the gateway is queried instead.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CallbackNotice {
    pub order_id: Option<String>,
    pub billcode: Option<String>,
    pub refno: Option<String>,
    pub status: Option<String>,
}

pub(crate) fn gateway_environment(gateway: &dyn PaymentGateway) -> Environment {
    if gateway.is_sandbox() {
        Environment::Sandbox
    } else {
        Environment::Live
    }
}

pub async fn find_by_reference<C: ConnectionTrait>(
    db: &C,
    reference: &str,
) -> Result<donation::Model, DomainError> {
    Donation::find()
        .filter(donation::Column::PaymentReference.eq(reference))
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Donation"))
}

/// Append an audit entry for a donation
pub async fn append_log<C: ConnectionTrait>(
    db: &C,
    donation_id: i32,
    event_type: &str,
    data: Value,
) -> Result<(), DbErr> {
    donation_log::ActiveModel {
        donation_id: Set(donation_id),
        event_type: Set(event_type.to_string()),
        event_data: Set(Some(data.to_string())),
        created_at: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(())
}

fn failure_reason(raw_status: &str) -> String {
    format!("Payment unsuccessful (gateway status {})", raw_status)
}

/// Query the gateway for `reference` and apply the status it reports.
pub async fn refresh_status(
    db: &DatabaseConnection,
    gateway: Option<&dyn PaymentGateway>,
    receipts: &dyn ReceiptNumberGenerator,
    reference: &str,
    source: RefreshSource,
) -> Result<StatusOutcome, DomainError> {
    let donation = find_by_reference(db, reference).await?;
    let current = donation.payment_status;

    if current.is_terminal() {
        return Ok(StatusOutcome::unchanged(current, "Donation already completed"));
    }

    let gateway = match gateway {
        Some(gw) if gateway_environment(gw) == donation.environment => gw,
        Some(_) => {
            tracing::warn!(
                "Donation {} belongs to the {} environment, gateway is not",
                reference,
                donation.environment.as_str()
            );
            return Err(DomainError::Upstream(GATEWAY_NOT_CONFIGURED.to_string()));
        }
        None => return Err(DomainError::Upstream(GATEWAY_NOT_CONFIGURED.to_string())),
    };

    let Some(bill_code) = donation.bill_code.clone() else {
        return Err(DomainError::Precondition("No bill code to check".to_string()));
    };

    let transactions = match gateway.bill_transactions(&bill_code).await {
        Ok(transactions) => transactions,
        Err(GatewayError::Timeout) => {
            tracing::warn!("Status check for {} timed out", reference);
            append_log(
                db,
                donation.id,
                "status_check_timeout",
                json!({ "source": source.event_type(), "billCode": bill_code }),
            )
            .await?;
            return Ok(StatusOutcome::unchanged(
                current,
                "Payment gateway timed out, status unchanged",
            ));
        }
        Err(e) => {
            tracing::error!("Status check for {} failed: {}", reference, e);
            return Err(DomainError::Upstream(e.to_string()));
        }
    };

    let Some(latest) = transactions.into_iter().next() else {
        append_log(
            db,
            donation.id,
            "no_transactions",
            json!({ "source": source.event_type(), "billCode": bill_code }),
        )
        .await?;
        return Ok(StatusOutcome::unchanged(current, "No transactions yet"));
    };

    let Some(new_status) = latest.status else {
        tracing::warn!(
            "Unknown gateway status {:?} for {}",
            latest.raw_status,
            reference
        );
        append_log(
            db,
            donation.id,
            "unknown_gateway_status",
            json!({ "source": source.event_type(), "rawStatus": latest.raw_status }),
        )
        .await?;
        return Ok(StatusOutcome::unchanged(current, "Unrecognised gateway status"));
    };

    if new_status == current {
        append_log(
            db,
            donation.id,
            source.event_type(),
            json!({
                "result": "unchanged",
                "status": current,
                "rawStatus": latest.raw_status,
            }),
        )
        .await?;
        return Ok(StatusOutcome::unchanged(current, "Status unchanged"));
    }

    match new_status {
        PaymentStatus::Completed => complete(db, receipts, &donation, &latest, source).await,
        PaymentStatus::Failed => {
            let reason = failure_reason(&latest.raw_status);
            transition(db, &donation, new_status, Some(reason), &latest, source).await
        }
        _ => transition(db, &donation, new_status, None, &latest, source).await,
    }
}

/// First transition to `completed`: receipt, status, project total and log
/// commit together or not at all.
async fn complete(
    db: &DatabaseConnection,
    receipts: &dyn ReceiptNumberGenerator,
    donation: &donation::Model,
    latest: &GatewayTransaction,
    source: RefreshSource,
) -> Result<StatusOutcome, DomainError> {
    let completed_at = Utc::now();
    let now = completed_at.to_rfc3339();
    let txn = db.begin().await?;

    let receipt_number = receipts.next_receipt_number(&txn, completed_at).await?;

    let result = Donation::update_many()
        .set(donation::ActiveModel {
            payment_status: Set(PaymentStatus::Completed),
            completed_at: Set(Some(now.clone())),
            receipt_number: Set(Some(receipt_number.clone())),
            transaction_id: Set(latest
                .transaction_id
                .clone()
                .or_else(|| donation.transaction_id.clone())),
            updated_at: Set(now.clone()),
            ..Default::default()
        })
        .filter(donation::Column::Id.eq(donation.id))
        .filter(donation::Column::PaymentStatus.eq(donation.payment_status))
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        txn.rollback().await?;
        return lost_race(db, &donation.payment_reference).await;
    }

    if let Some(project_id) = donation.project_id {
        project::Entity::update_many()
            .col_expr(
                project::Column::TotalRaised,
                Expr::col(project::Column::TotalRaised).add(donation.amount),
            )
            .filter(project::Column::Id.eq(project_id))
            .exec(&txn)
            .await?;
    }

    append_log(
        &txn,
        donation.id,
        source.event_type(),
        json!({
            "previousStatus": donation.payment_status,
            "newStatus": PaymentStatus::Completed,
            "rawStatus": latest.raw_status,
            "transactionId": latest.transaction_id,
            "receiptNumber": receipt_number,
            "amount": donation.amount,
        }),
    )
    .await?;

    txn.commit().await?;

    tracing::info!(
        "Donation {} completed, receipt {}",
        donation.payment_reference,
        receipt_number
    );

    let mut outcome = StatusOutcome::changed(
        donation.payment_status,
        PaymentStatus::Completed,
        "Payment completed",
    );
    outcome.receipt_number = Some(receipt_number);
    Ok(outcome)
}

async fn transition(
    db: &DatabaseConnection,
    donation: &donation::Model,
    new_status: PaymentStatus,
    reason: Option<String>,
    latest: &GatewayTransaction,
    source: RefreshSource,
) -> Result<StatusOutcome, DomainError> {
    let now = Utc::now().to_rfc3339();
    let txn = db.begin().await?;

    let mut changes = donation::ActiveModel {
        payment_status: Set(new_status),
        updated_at: Set(now),
        ..Default::default()
    };
    if reason.is_some() {
        changes.failure_reason = Set(reason.clone());
    }
    if latest.transaction_id.is_some() {
        changes.transaction_id = Set(latest.transaction_id.clone());
    }

    let result = Donation::update_many()
        .set(changes)
        .filter(donation::Column::Id.eq(donation.id))
        .filter(donation::Column::PaymentStatus.eq(donation.payment_status))
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        txn.rollback().await?;
        return lost_race(db, &donation.payment_reference).await;
    }

    append_log(
        &txn,
        donation.id,
        source.event_type(),
        json!({
            "previousStatus": donation.payment_status,
            "newStatus": new_status,
            "rawStatus": latest.raw_status,
            "transactionId": latest.transaction_id,
            "failureReason": reason,
        }),
    )
    .await?;

    txn.commit().await?;

    tracing::info!(
        "Donation {} moved {} -> {}",
        donation.payment_reference,
        donation.payment_status,
        new_status
    );

    Ok(StatusOutcome::changed(
        donation.payment_status,
        new_status,
        format!("Payment status updated to {}", new_status),
    ))
}

/// Another writer changed the donation between our read and our write
async fn lost_race(db: &DatabaseConnection, reference: &str) -> Result<StatusOutcome, DomainError> {
    let current = find_by_reference(db, reference).await?;
    tracing::info!(
        "Donation {} changed concurrently, now {}",
        reference,
        current.payment_status
    );

    let mut outcome = StatusOutcome::unchanged(
        current.payment_status,
        "Donation was updated by another request",
    );
    outcome.receipt_number = current.receipt_number;
    Ok(outcome)
}

/// Administrative override for a donation that will never be paid
pub async fn mark_expired(
    db: &DatabaseConnection,
    reference: &str,
    reason: Option<&str>,
    actor: &str,
) -> Result<StatusOutcome, DomainError> {
    let donation = find_by_reference(db, reference).await?;

    let previous = match donation.payment_status {
        PaymentStatus::Completed => {
            return Err(DomainError::Precondition(
                "Cannot mark a completed donation as expired".to_string(),
            ));
        }
        PaymentStatus::Expired => {
            return Ok(StatusOutcome::unchanged(
                PaymentStatus::Expired,
                "Donation already expired",
            ));
        }
        status => status,
    };

    let reason = reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_EXPIRY_REASON)
        .to_string();
    let now = Utc::now().to_rfc3339();

    let txn = db.begin().await?;

    let result = Donation::update_many()
        .set(donation::ActiveModel {
            payment_status: Set(PaymentStatus::Expired),
            failure_reason: Set(Some(reason.clone())),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(donation::Column::Id.eq(donation.id))
        .filter(donation::Column::PaymentStatus.eq(previous))
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        txn.rollback().await?;
        return Err(DomainError::Conflict(
            "Donation status changed while expiring, refresh and retry".to_string(),
        ));
    }

    append_log(
        &txn,
        donation.id,
        "admin_marked_expired",
        json!({ "previousStatus": previous, "reason": reason, "actor": actor }),
    )
    .await?;

    version_service::log_activity(
        &txn,
        NewActivity {
            action: "donation_marked_expired".to_string(),
            description: format!("Marked donation {} as expired", reference),
            actor: Some(actor.to_string()),
            metadata: Some(json!({
                "reference": reference,
                "previousStatus": previous,
                "reason": reason,
            })),
            ..Default::default()
        },
    )
    .await?;

    txn.commit().await?;

    tracing::info!("{} marked donation {} as expired", actor, reference);

    Ok(StatusOutcome::changed(
        previous,
        PaymentStatus::Expired,
        "Donation marked as expired",
    ))
}

/// Gateway callback: locate the donation and reconcile it from the gateway
pub async fn handle_callback(
    db: &DatabaseConnection,
    gateway: Option<&dyn PaymentGateway>,
    receipts: &dyn ReceiptNumberGenerator,
    notice: &CallbackNotice,
) -> Result<StatusOutcome, DomainError> {
    tracing::debug!(
        "Callback received: order_id={:?} billcode={:?} refno={:?} status={:?}",
        notice.order_id,
        notice.billcode,
        notice.refno,
        notice.status
    );

    let donation = match (notice.order_id.as_deref(), notice.billcode.as_deref()) {
        (Some(reference), _) if !reference.is_empty() => find_by_reference(db, reference).await?,
        (_, Some(bill_code)) if !bill_code.is_empty() => Donation::find()
            .filter(donation::Column::BillCode.eq(bill_code))
            .one(db)
            .await?
            .ok_or_else(|| DomainError::not_found("Donation"))?,
        _ => {
            return Err(DomainError::Validation(
                "callback carries neither order_id nor billcode".to_string(),
            ));
        }
    };

    refresh_status(
        db,
        gateway,
        receipts,
        &donation.payment_reference,
        RefreshSource::Callback,
    )
    .await
}
