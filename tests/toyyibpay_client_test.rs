use kasih::config::GatewayConfig;
use kasih::domain::{BillRequest, GatewayError, PaymentGateway};
use kasih::models::donation::PaymentStatus;
use kasih::toyyibpay::ToyyibPayClient;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, timeout: Duration) -> ToyyibPayClient {
    ToyyibPayClient::new(GatewayConfig {
        secret_key: "sk-test".to_string(),
        category_code: "cat-test".to_string(),
        sandbox: true,
        base_url: Some(server.uri()),
        timeout,
    })
    .expect("Failed to build client")
}

fn bill_request() -> BillRequest {
    BillRequest {
        reference: "DON-0A1B2C3D4E5F".to_string(),
        name: "Donation".to_string(),
        description: "General donation".to_string(),
        amount: 5000,
        payer_name: "Farid Ismail".to_string(),
        payer_email: "farid@example.my".to_string(),
        payer_phone: Some("0123456789".to_string()),
        return_url: "http://localhost:8000/donate/thank-you".to_string(),
        callback_url: "http://localhost:8000/api/payments/callback".to_string(),
    }
}

#[tokio::test]
async fn test_bill_transactions_parses_latest_first() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/index.php/api/getBillTransactions"))
        .and(body_string_contains("billCode=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "billName": "Donation",
                "billpaymentStatus": "3",
                "billpaymentInvoiceNo": "TP-1",
                "billPaymentDate": "05-03-2026 08:00:00",
                "billpaymentAmount": "50.00"
            },
            {
                "billName": "Donation",
                "billpaymentStatus": "1",
                "billpaymentInvoiceNo": "TP-2",
                "billPaymentDate": "05-03-2026 08:10:00",
                "billpaymentAmount": "50.00"
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    let txs = client.bill_transactions("abc123").await.unwrap();

    assert_eq!(txs.len(), 2);
    assert_eq!(txs[0].transaction_id.as_deref(), Some("TP-2"));
    assert_eq!(txs[0].status, Some(PaymentStatus::Completed));
}

#[tokio::test]
async fn test_bill_transactions_no_data_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/index.php/api/getBillTransactions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("No data found"))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    assert!(client.bill_transactions("abc123").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bill_transactions_http_error_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/index.php/api/getBillTransactions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    let result = client.bill_transactions("abc123").await;
    assert!(matches!(result, Err(GatewayError::Rejected(_))));
}

#[tokio::test]
async fn test_slow_gateway_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/index.php/api/getBillTransactions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_millis(200));
    let result = client.bill_transactions("abc123").await;
    assert!(matches!(result, Err(GatewayError::Timeout)));
}

#[tokio::test]
async fn test_create_bill_returns_bill_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/index.php/api/createBill"))
        .and(body_string_contains("billExternalReferenceNo=DON-0A1B2C3D4E5F"))
        .and(body_string_contains("billAmount=5000"))
        .and(body_string_contains("categoryCode=cat-test"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!([{ "BillCode": "gw7kq1" }])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    let code = client.create_bill(&bill_request()).await.unwrap();

    assert_eq!(code, "gw7kq1");
    assert_eq!(client.payment_url(&code), format!("{}/gw7kq1", server.uri()));
}

#[tokio::test]
async fn test_create_bill_error_message_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/index.php/api/createBill"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[KEY-DID-NOT-EXIST]"))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    let result = client.create_bill(&bill_request()).await;
    assert!(matches!(result, Err(GatewayError::Rejected(_))));
}
