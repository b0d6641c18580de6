//! Donation Service - checkout and the read side of donations
//!
//! Status transitions after checkout belong to `payment_service`.

use chrono::Utc;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::{BillRequest, DomainError, PaymentGateway};
use crate::models::donation::{self, Entity as Donation, Environment, PaymentStatus};
use crate::models::donation_log::{self, Entity as DonationLog};
use crate::models::project;
use crate::services::payment_service::{
    GATEWAY_NOT_CONFIGURED, append_log, find_by_reference, gateway_environment,
};

/// Smallest accepted donation, in sen
pub const MIN_DONATION_AMOUNT: i64 = 100;
pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Minor units (sen)
    pub amount: i64,
    pub donor_name: String,
    pub donor_email: String,
    #[serde(default)]
    pub donor_phone: Option<String>,
    #[serde(default)]
    pub project_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub reference: String,
    pub bill_code: String,
    pub payment_url: String,
}

/// What a donor may see about their own donation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicStatus {
    pub reference: String,
    pub status: PaymentStatus,
    pub amount: i64,
    pub receipt_number: Option<String>,
    pub completed_at: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationFilter {
    pub status: Option<PaymentStatus>,
    pub environment: Option<Environment>,
    pub project_id: Option<i32>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct DonationPage {
    pub donations: Vec<donation::Model>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationStats {
    pub environment: Option<Environment>,
    pub total_count: i64,
    pub by_status: BTreeMap<String, i64>,
    /// Sum of completed donations, in sen
    pub completed_amount: i64,
}

/// `DON-` followed by 12 upper-case hex digits
pub fn new_reference() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("DON-{}", id[..12].to_uppercase())
}

fn validate_checkout(request: &CheckoutRequest) -> Result<(), DomainError> {
    if request.amount < MIN_DONATION_AMOUNT {
        return Err(DomainError::Validation(format!(
            "amount must be at least {} sen",
            MIN_DONATION_AMOUNT
        )));
    }
    if request.donor_name.trim().is_empty() {
        return Err(DomainError::Validation("donorName is required".to_string()));
    }
    let email = request.donor_email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(DomainError::Validation(
            "donorEmail must be a valid email address".to_string(),
        ));
    }
    Ok(())
}

/// Create a pending donation and its gateway bill
pub async fn checkout(
    db: &DatabaseConnection,
    gateway: Option<&dyn PaymentGateway>,
    public_base_url: &str,
    request: CheckoutRequest,
) -> Result<CheckoutResponse, DomainError> {
    validate_checkout(&request)?;

    let gateway =
        gateway.ok_or_else(|| DomainError::Upstream(GATEWAY_NOT_CONFIGURED.to_string()))?;

    let project = match request.project_id {
        Some(id) => Some(
            project::Entity::find_by_id(id)
                .one(db)
                .await?
                .ok_or_else(|| DomainError::Validation(format!("Unknown project {}", id)))?,
        ),
        None => None,
    };

    let reference = new_reference();
    let now = Utc::now().to_rfc3339();

    let pending = donation::ActiveModel {
        amount: Set(request.amount),
        donor_name: Set(request.donor_name.trim().to_string()),
        donor_email: Set(request.donor_email.trim().to_string()),
        donor_phone: Set(request.donor_phone.clone()),
        payment_status: Set(PaymentStatus::Pending),
        payment_reference: Set(reference.clone()),
        project_id: Set(request.project_id),
        environment: Set(gateway_environment(gateway)),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let bill = BillRequest {
        reference: reference.clone(),
        name: "Donation".to_string(),
        description: match &project {
            Some(p) => format!("Donation to {}", p.title_en),
            None => "General donation".to_string(),
        },
        amount: request.amount,
        payer_name: pending.donor_name.clone(),
        payer_email: pending.donor_email.clone(),
        payer_phone: request.donor_phone,
        return_url: format!("{}/donate/thank-you?ref={}", public_base_url, reference),
        callback_url: format!("{}/api/payments/callback", public_base_url),
    };

    let bill_code = match gateway.create_bill(&bill).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Bill creation for {} failed: {}", reference, e);
            let mut failed: donation::ActiveModel = pending.clone().into();
            failed.payment_status = Set(PaymentStatus::Failed);
            failed.failure_reason = Set(Some(e.to_string()));
            failed.updated_at = Set(Utc::now().to_rfc3339());
            failed.update(db).await?;
            append_log(
                db,
                pending.id,
                "bill_creation_failed",
                json!({ "error": e.to_string() }),
            )
            .await?;
            return Err(DomainError::Upstream(e.to_string()));
        }
    };

    let mut active: donation::ActiveModel = pending.clone().into();
    active.bill_code = Set(Some(bill_code.clone()));
    active.updated_at = Set(Utc::now().to_rfc3339());
    active.update(db).await?;

    append_log(
        db,
        pending.id,
        "bill_created",
        json!({ "billCode": bill_code, "amount": request.amount }),
    )
    .await?;

    tracing::info!("Checkout {} created bill {}", reference, bill_code);

    Ok(CheckoutResponse {
        payment_url: gateway.payment_url(&bill_code),
        reference,
        bill_code,
    })
}

pub async fn public_status(
    db: &DatabaseConnection,
    reference: &str,
) -> Result<PublicStatus, DomainError> {
    let donation = find_by_reference(db, reference).await?;

    Ok(PublicStatus {
        reference: donation.payment_reference,
        status: donation.payment_status,
        amount: donation.amount,
        receipt_number: donation.receipt_number,
        completed_at: donation.completed_at,
    })
}

pub async fn list_donations(
    db: &DatabaseConnection,
    filter: DonationFilter,
) -> Result<DonationPage, DomainError> {
    let mut condition = Condition::all();

    if let Some(status) = filter.status {
        condition = condition.add(donation::Column::PaymentStatus.eq(status));
    }
    if let Some(environment) = filter.environment {
        condition = condition.add(donation::Column::Environment.eq(environment));
    }
    if let Some(project_id) = filter.project_id {
        condition = condition.add(donation::Column::ProjectId.eq(project_id));
    }

    let limit = filter.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let page = filter.page.unwrap_or(1).max(1);

    let paginator = Donation::find()
        .filter(condition)
        .order_by_desc(donation::Column::Id)
        .paginate(db, limit);

    let total = paginator.num_items().await?;
    let donations = paginator.fetch_page(page - 1).await?;

    Ok(DonationPage {
        donations,
        total,
        page,
        limit,
    })
}

pub async fn donation_stats(
    db: &DatabaseConnection,
    environment: Option<Environment>,
) -> Result<DonationStats, DomainError> {
    let mut condition = Condition::all();
    if let Some(environment) = environment {
        condition = condition.add(donation::Column::Environment.eq(environment));
    }

    let counts: Vec<(String, i64)> = Donation::find()
        .select_only()
        .column(donation::Column::PaymentStatus)
        .column_as(donation::Column::Id.count(), "count")
        .filter(condition.clone())
        .group_by(donation::Column::PaymentStatus)
        .into_tuple()
        .all(db)
        .await?;

    let completed: Option<Option<i64>> = Donation::find()
        .select_only()
        .column_as(donation::Column::Amount.sum(), "total")
        .filter(condition)
        .filter(donation::Column::PaymentStatus.eq(PaymentStatus::Completed))
        .into_tuple()
        .one(db)
        .await?;

    Ok(DonationStats {
        environment,
        total_count: counts.iter().map(|(_, n)| n).sum(),
        by_status: counts.into_iter().collect(),
        completed_amount: completed.flatten().unwrap_or(0),
    })
}

/// The audit trail of one donation, oldest first
pub async fn donation_logs(
    db: &DatabaseConnection,
    reference: &str,
) -> Result<Vec<donation_log::Model>, DomainError> {
    let donation = find_by_reference(db, reference).await?;

    Ok(DonationLog::find()
        .filter(donation_log::Column::DonationId.eq(donation.id))
        .order_by_asc(donation_log::Column::Id)
        .all(db)
        .await?)
}

/// Delete every sandbox donation with its logs. Live rows are never touched.
pub async fn purge_sandbox(db: &DatabaseConnection) -> Result<u64, DomainError> {
    let txn = db.begin().await?;

    let ids: Vec<i32> = Donation::find()
        .select_only()
        .column(donation::Column::Id)
        .filter(donation::Column::Environment.eq(Environment::Sandbox))
        .into_tuple()
        .all(&txn)
        .await?;

    if ids.is_empty() {
        txn.rollback().await?;
        return Ok(0);
    }

    DonationLog::delete_many()
        .filter(donation_log::Column::DonationId.is_in(ids.clone()))
        .exec(&txn)
        .await?;

    let result = Donation::delete_many()
        .filter(donation::Column::Id.is_in(ids))
        .filter(donation::Column::Environment.eq(Environment::Sandbox))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!("Purged {} sandbox donations", result.rows_affected);
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(amount: i64, name: &str, email: &str) -> CheckoutRequest {
        CheckoutRequest {
            amount,
            donor_name: name.to_string(),
            donor_email: email.to_string(),
            donor_phone: None,
            project_id: None,
        }
    }

    #[test]
    fn test_reference_format() {
        let reference = new_reference();
        assert!(reference.starts_with("DON-"));
        assert_eq!(reference.len(), 16);
        assert!(reference[4..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(reference, new_reference());
    }

    #[test]
    fn test_checkout_validation() {
        assert!(validate_checkout(&request(5000, "Aminah", "aminah@example.my")).is_ok());
        assert!(matches!(
            validate_checkout(&request(99, "Aminah", "aminah@example.my")),
            Err(DomainError::Validation(_))
        ));
        assert!(validate_checkout(&request(5000, "  ", "aminah@example.my")).is_err());
        assert!(validate_checkout(&request(5000, "Aminah", "not-an-email")).is_err());
    }
}
