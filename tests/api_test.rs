use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use kasih::auth::create_jwt;
use kasih::config::Config;
use kasih::db;
use kasih::domain::{BillRequest, GatewayError, GatewayTransaction, PaymentGateway};
use kasih::infrastructure::AppState;
use kasih::models::donation::{self, Environment, PaymentStatus};
use kasih::server::build_router;
use kasih::toyyibpay::map_status;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

/// Sandbox gateway that reports a successful payment for every bill
struct PaidGateway;

#[async_trait]
impl PaymentGateway for PaidGateway {
    fn is_sandbox(&self) -> bool {
        true
    }

    fn payment_url(&self, bill_code: &str) -> String {
        format!("https://dev.toyyibpay.com/{}", bill_code)
    }

    async fn create_bill(&self, _request: &BillRequest) -> Result<String, GatewayError> {
        Ok("k9x2mq".to_string())
    }

    async fn bill_transactions(
        &self,
        _bill_code: &str,
    ) -> Result<Vec<GatewayTransaction>, GatewayError> {
        Ok(vec![GatewayTransaction {
            raw_status: "1".to_string(),
            status: map_status("1"),
            transaction_id: Some("TP-2026-77".to_string()),
            paid_at: Some("02-03-2026 09:15:00".to_string()),
            amount: Some("50.00".to_string()),
        }])
    }
}

async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

async fn setup_app(gateway: Option<Arc<dyn PaymentGateway>>) -> (Router, DatabaseConnection) {
    let db = setup_test_db().await;
    let state = AppState::new(db.clone(), Config::for_tests()).with_gateway(gateway);
    (build_router(state), db)
}

fn admin_token() -> String {
    create_jwt("test-secret", "admin@kasih.org.my", "admin").unwrap()
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn pending_donation(db: &DatabaseConnection, reference: &str, bill_code: &str) {
    let now = chrono::Utc::now().to_rfc3339();
    donation::ActiveModel {
        amount: Set(5000),
        donor_name: Set("Nurul Huda".to_string()),
        donor_email: Set("nurul@example.my".to_string()),
        payment_status: Set(PaymentStatus::Pending),
        payment_reference: Set(reference.to_string()),
        bill_code: Set(Some(bill_code.to_string())),
        environment: Set(Environment::Sandbox),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create donation");
}

#[tokio::test]
async fn test_health_check() {
    let (app, _db) = setup_app(None).await;
    let (status, body) = send(&app, "GET", "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["gateway"], "not_configured");
}

#[tokio::test]
async fn test_admin_routes_require_session() {
    let (app, _db) = setup_app(None).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/donations/refresh-status",
        None,
        Some(json!({ "reference": "DON-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, "GET", "/api/admin/activity", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_status_errors() {
    let (app, db) = setup_app(None).await;
    let token = admin_token();
    pending_donation(&db, "DON-ABC", "bill-abc").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/donations/refresh-status",
        Some(&token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/donations/refresh-status",
        Some(&token),
        Some(json!({ "reference": "DON-NOPE" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Donation not found");

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/donations/refresh-status",
        Some(&token),
        Some(json!({ "reference": "DON-ABC" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Payment gateway not configured");
}

#[tokio::test]
async fn test_refresh_status_completes_donation() {
    let (app, db) = setup_app(Some(Arc::new(PaidGateway))).await;
    let token = admin_token();
    pending_donation(&db, "DON-PAY", "bill-pay").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/donations/refresh-status",
        Some(&token),
        Some(json!({ "reference": "DON-PAY" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["previousStatus"], "pending");
    assert!(body["receiptNumber"].as_str().unwrap().starts_with("RCP-"));

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/donations/refresh-status",
        Some(&token),
        Some(json!({ "reference": "DON-PAY" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["noChange"], true);

    let (status, body) = send(&app, "GET", "/api/donations/DON-PAY/status", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["donation"]["status"], "completed");

    let (_, body) = send(
        &app,
        "GET",
        "/api/admin/donations/DON-PAY/logs",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["logs"].as_array().unwrap().len(), 1);
    assert_eq!(body["logs"][0]["eventType"], "admin_status_refresh");
}

#[tokio::test]
async fn test_mark_expired_endpoint() {
    let (app, db) = setup_app(None).await;
    let token = admin_token();
    pending_donation(&db, "REF123", "bill-123").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/donations/mark-expired",
        Some(&token),
        Some(json!({ "reference": "REF123", "reason": "user abandoned" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "expired");

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/donations/mark-expired",
        Some(&token),
        Some(json!({ "reference": "REF123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["noChange"], true);

    let (_, body) = send(&app, "GET", "/api/admin/activity", Some(&token), None).await;
    assert_eq!(body["entries"][0]["action"], "donation_marked_expired");
    assert_eq!(body["entries"][0]["actor"], "admin@kasih.org.my");
}

#[tokio::test]
async fn test_checkout_and_callback() {
    let (app, db) = setup_app(Some(Arc::new(PaidGateway))).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/donations/checkout",
        None,
        Some(json!({
            "amount": 5000,
            "donorName": "Tan Mei Ling",
            "donorEmail": "meiling@example.my"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["billCode"], "k9x2mq");
    assert_eq!(body["paymentUrl"], "https://dev.toyyibpay.com/k9x2mq");
    let reference = body["reference"].as_str().unwrap().to_string();
    assert!(reference.starts_with("DON-"));

    let (status, _) = send(
        &app,
        "POST",
        "/api/donations/checkout",
        None,
        Some(json!({ "amount": 50, "donorName": "X", "donorEmail": "x@example.my" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Gateway callback: form-encoded, says "failed", gateway says paid
    let request = Request::builder()
        .method("POST")
        .uri("/api/payments/callback")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "refno=TP-2026-77&status=3&billcode=k9x2mq&order_id={}",
            reference
        )))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored = kasih::services::payment_service::find_by_reference(&db, &reference)
        .await
        .unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Completed);
}

#[tokio::test]
async fn test_content_and_versions_endpoints() {
    let (app, _db) = setup_app(None).await;
    let token = admin_token();

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/content/site_content",
        Some(&token),
        Some(json!({
            "section_key": "about",
            "title_en": "About us",
            "body_en": "We help families in need.",
            "body_ms": "Kami membantu keluarga yang memerlukan."
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["item"]["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/admin/content/site_content/{}", id),
        Some(&token),
        Some(json!({ "title_en": "Who we are" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/admin/content/site_content/{}/versions", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let versions = body["versions"].as_array().unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0]["data"]["title_en"], "Who we are");
    let first_version = versions[1]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/admin/versions/{}/restore", first_version),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["restored"]["new_version_number"], 3);

    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/admin/content/site_content/{}", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["item"]["data"]["title_en"], "About us");

    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/content/newsletter",
        Some(&token),
        Some(json!({ "subject": "Hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/api/admin/versions/9999/restore", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "GET", "/api/admin/stats/versions", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["total_versions"], 3);
}
