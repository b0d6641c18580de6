//! ToyyibPay payment gateway client
//!
//! API reference: https://toyyibpay.com/apireference/
//! Both endpoints take form-encoded POST bodies and answer with JSON arrays.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;

use crate::domain::{BillRequest, GatewayError, GatewayTransaction, PaymentGateway};
use crate::infrastructure::config::GatewayConfig;
use crate::models::donation::PaymentStatus;

const USER_AGENT: &str = "Kasih/0.4 (+https://kasih.org.my)";
const PAYMENT_DATE_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Fixed mapping of `billpaymentStatus` codes.
///
/// 1 = successful, 2 = pending, 3 = unsuccessful, 4 = pending (awaiting bank).
/// Anything else is unknown and must never be read as a completed payment.
pub fn map_status(code: &str) -> Option<PaymentStatus> {
    match code.trim() {
        "1" => Some(PaymentStatus::Completed),
        "2" | "4" => Some(PaymentStatus::Pending),
        "3" => Some(PaymentStatus::Failed),
        _ => None,
    }
}

pub struct ToyyibPayClient {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl ToyyibPayClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to build client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/index.php/api/{}", self.config.base_url(), name)
    }

    async fn post_form(&self, name: &str, form: &[(&str, String)]) -> Result<Value, GatewayError> {
        let res = self
            .client
            .post(self.endpoint(name))
            .form(form)
            .send()
            .await
            .map_err(classify)?;

        if !res.status().is_success() {
            return Err(GatewayError::Rejected(format!(
                "{} returned HTTP {}",
                name,
                res.status()
            )));
        }

        let body = res.text().await.map_err(classify)?;
        // The API answers some errors with bare text instead of JSON
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}

fn classify(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(e.to_string())
    }
}

/// Gateway fields come back as strings or numbers depending on the endpoint.
fn field(entry: &Value, key: &str) -> Option<String> {
    match entry.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a `getBillTransactions` answer into transactions, newest first.
pub fn parse_transactions(body: &Value) -> Vec<GatewayTransaction> {
    let Some(entries) = body.as_array() else {
        tracing::debug!("getBillTransactions returned no transaction list: {}", body);
        return Vec::new();
    };

    let mut transactions: Vec<GatewayTransaction> = entries
        .iter()
        .filter(|e| e.is_object())
        .map(|entry| {
            let raw_status = field(entry, "billpaymentStatus").unwrap_or_default();
            GatewayTransaction {
                status: map_status(&raw_status),
                raw_status,
                transaction_id: field(entry, "billpaymentInvoiceNo"),
                paid_at: field(entry, "billPaymentDate"),
                amount: field(entry, "billpaymentAmount"),
            }
        })
        .collect();

    // Newest first; undated entries keep their relative order at the end
    transactions.sort_by_key(|t| {
        std::cmp::Reverse(
            t.paid_at
                .as_deref()
                .and_then(|d| NaiveDateTime::parse_from_str(d, PAYMENT_DATE_FORMAT).ok()),
        )
    });

    transactions
}

#[async_trait]
impl PaymentGateway for ToyyibPayClient {
    fn is_sandbox(&self) -> bool {
        self.config.sandbox
    }

    fn payment_url(&self, bill_code: &str) -> String {
        format!("{}/{}", self.config.base_url(), bill_code)
    }

    async fn create_bill(&self, request: &BillRequest) -> Result<String, GatewayError> {
        let form = [
            ("userSecretKey", self.config.secret_key.clone()),
            ("categoryCode", self.config.category_code.clone()),
            ("billName", request.name.chars().take(30).collect()),
            ("billDescription", request.description.chars().take(100).collect()),
            ("billPriceSetting", "1".to_string()),
            ("billPayorInfo", "1".to_string()),
            ("billAmount", request.amount.to_string()),
            ("billReturnUrl", request.return_url.clone()),
            ("billCallbackUrl", request.callback_url.clone()),
            ("billExternalReferenceNo", request.reference.clone()),
            ("billTo", request.payer_name.clone()),
            ("billEmail", request.payer_email.clone()),
            ("billPhone", request.payer_phone.clone().unwrap_or_default()),
            ("billPaymentChannel", "2".to_string()),
        ];

        let body = self.post_form("createBill", &form).await?;

        // Failures come back as bare text such as "[KEY-DID-NOT-EXIST]"
        let Some(entries) = body.as_array() else {
            return Err(GatewayError::Rejected(format!("createBill: {}", body)));
        };

        entries
            .first()
            .and_then(|entry| field(entry, "BillCode"))
            .ok_or_else(|| GatewayError::Decode(format!("createBill without BillCode: {}", body)))
    }

    async fn bill_transactions(
        &self,
        bill_code: &str,
    ) -> Result<Vec<GatewayTransaction>, GatewayError> {
        let body = self
            .post_form("getBillTransactions", &[("billCode", bill_code.to_string())])
            .await?;

        Ok(parse_transactions(&body))
    }
}
