#![allow(clippy::unwrap_used)]
// Integration tests for `FormClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use estatedesk_api::{
    Error, FormClient, FormPayload, PaymentRecordDetail, SubmissionResult, TransportConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, FormClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = FormClient::new(base_url, &TransportConfig::default()).unwrap();
    (server, client)
}

fn payload() -> FormPayload {
    let mut payload = FormPayload::new();
    payload.push("name", "Maple Court");
    payload.push("address", "12 Maple Rd");
    payload
}

// ── Form fetch ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_form_returns_html() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/admin/forms/community/new/"))
        .and(header("X-Requested-With", "XMLHttpRequest"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"html": "<form><input name=\"name\"></form>"})),
        )
        .mount(&server)
        .await;

    let html = client.fetch_form("/admin/forms/community/new/").await.unwrap();
    assert!(html.contains("name=\"name\""));
}

#[tokio::test]
async fn test_fetch_form_without_html_is_form_load_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/admin/forms/community/new/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"form": "nope"})))
        .mount(&server)
        .await;

    let result = client.fetch_form("/admin/forms/community/new/").await;
    assert!(
        matches!(result, Err(Error::FormLoad { ref reason, .. }) if reason.contains("html")),
        "expected FormLoad error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_fetch_form_not_found_is_form_load_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/admin/forms/community/99/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found."})))
        .mount(&server)
        .await;

    let err = client.fetch_form("/admin/forms/community/99/").await.unwrap_err();
    assert_eq!(err.user_message(), "Not found.");
}

// ── Form submit ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_submit_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/admin/forms/community/new/"))
        .and(header("X-CSRFToken", "abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "message": "saved", "data": {"id": 3}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = client
        .submit_form("/admin/forms/community/new/", &payload(), Some("abc"))
        .await;

    assert_eq!(
        result,
        SubmissionResult::Success {
            message: Some("saved".into()),
            payload: json!({"id": 3}),
        }
    );
}

#[tokio::test]
async fn test_submit_validation_failure() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/admin/forms/community/new/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "errors": {"name": ["This field is required."]}
        })))
        .mount(&server)
        .await;

    let result = client
        .submit_form("/admin/forms/community/new/", &payload(), Some("abc"))
        .await;

    let SubmissionResult::ValidationFailure { field_errors } = result else {
        panic!("expected ValidationFailure, got {result:?}");
    };
    assert_eq!(field_errors["name"], "This field is required.");
}

#[tokio::test]
async fn test_submit_server_error_is_transport_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/admin/forms/community/new/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result = client
        .submit_form("/admin/forms/community/new/", &payload(), None)
        .await;

    assert_eq!(
        result,
        SubmissionResult::TransportError {
            message: "request failed (HTTP 500)".into()
        }
    );
}

#[tokio::test]
async fn test_submit_without_token_omits_header() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(header_exists("X-CSRFToken"))
        .respond_with(ResponseTemplate::new(403))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/admin/forms/community/new/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let result = client
        .submit_form("/admin/forms/community/new/", &payload(), None)
        .await;
    assert!(result.is_success());
}

// ── Record API ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_delete_success() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/community/communities/5/"))
        .and(header("X-CSRFToken", "tok"))
        .and(header("X-Requested-With", "XMLHttpRequest"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client
        .delete("/api/community/communities/5/", Some("tok"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_failure_extracts_detail() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/community/communities/5/"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"detail": "community has buildings"})),
        )
        .mount(&server)
        .await;

    let err = client
        .delete("/api/community/communities/5/", Some("tok"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::Rejected { status: 409, ref message } if message == "community has buildings"),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_post_action_sends_json() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/maintenance/requests/8/assign/"))
        .and(body_json(json!({"assigned_to": "Wang Wei"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "assigned"})))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client
        .post_action(
            "/api/maintenance/requests/8/assign/",
            &json!({"assigned_to": "Wang Wei"}),
            Some("tok"),
        )
        .await
        .unwrap();
    assert_eq!(reply.message.as_deref(), Some("assigned"));
}

#[tokio::test]
async fn test_post_action_error_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/maintenance/requests/8/close/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "already closed"})))
        .mount(&server)
        .await;

    let err = client
        .post_action("/api/maintenance/requests/8/close/", &json!({}), None)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.user_message(), "already closed");
}

#[tokio::test]
async fn test_batch_delete_success_false_is_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/payment/bills/batch_delete/"))
        .and(body_json(json!({"bill_ids": ["1", "2"]})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": false, "error": "bill 2 is paid"})),
        )
        .mount(&server)
        .await;

    let err = client
        .delete_with_body(
            "/api/payment/bills/batch_delete/",
            &json!({"bill_ids": ["1", "2"]}),
            Some("tok"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "bill 2 is paid");
}

#[tokio::test]
async fn test_properties_by_community() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/admin/api/properties-by-community/"))
        .and(query_param("community_id", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": [
                {"id": "10", "name": "A-1-101", "full_address": "Block A Unit 1 Room 101"},
                {"id": "11", "full_address": "Block A Unit 1 Room 102"}
            ]
        })))
        .mount(&server)
        .await;

    let options = client.properties_by_community("4").await.unwrap();
    assert_eq!(options.len(), 2);
    assert_eq!(options[0].label(), "A-1-101");
    assert_eq!(options[1].label(), "Block A Unit 1 Room 102");
}

// ── Cookies ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_seeded_cookie_is_sent() {
    let (server, client) = setup().await;
    assert!(client.add_cookie("sessionid=s3cr3t"));

    Mock::given(method("GET"))
        .and(path("/admin/forms/owner/new/"))
        .and(header("cookie", "sessionid=s3cr3t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"html": "<form></form>"})))
        .expect(1)
        .mount(&server)
        .await;

    client.fetch_form("/admin/forms/owner/new/").await.unwrap();
    assert_eq!(client.cookie_header().as_deref(), Some("sessionid=s3cr3t"));
}

// ── Record detail ───────────────────────────────────────────────────

#[tokio::test]
async fn test_record_detail_accepts_numbers_and_nulls() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/payment/records/7c1e/"))
        .and(header("X-Requested-With", "XMLHttpRequest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "7c1e",
            "transaction_id": "4200001",
            "out_trade_no": "PAY20260314001",
            "payer": "Li Wei",
            "amount": 356.5,
            "payment_method": "bank_transfer",
            "payment_time": "2026-03-14T09:12:00",
            "status": "success",
            "refund_amount": "0.00",
            "operator": null
        })))
        .mount(&server)
        .await;

    let record: PaymentRecordDetail = client.record("/api/payment/records/7c1e/").await.unwrap();
    assert_eq!(record.amount.as_deref(), Some("356.5"));
    assert_eq!(record.payer.as_deref(), Some("Li Wei"));
    assert_eq!(record.refund_amount.as_deref(), Some("0.00"));
    assert_eq!(record.operator, None);
    assert_eq!(record.property_unit, None);
}

#[tokio::test]
async fn test_record_detail_errors_carry_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/payment/records/missing/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found."})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/payment/records/busy/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client
        .record::<PaymentRecordDetail>("/api/payment/records/missing/")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.user_message(), "Not found.");
    assert!(!err.is_transient());

    let err = client
        .record::<PaymentRecordDetail>("/api/payment/records/busy/")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Rejected { status: 503, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_unreachable_site_is_transient_without_status() {
    let client = FormClient::new(
        Url::parse("http://127.0.0.1:9/").unwrap(),
        &TransportConfig::default(),
    )
    .unwrap();

    let err = client
        .delete("/api/community/buildings/1/", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert!(err.is_transient());
    assert_eq!(err.status(), None);
}
