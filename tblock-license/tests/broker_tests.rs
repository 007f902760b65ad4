use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::json;
use tblock_license::{BrokerConfig, LicenseBroker, LicenseError, LicenseKey};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn broker_for(server: &MockServer) -> LicenseBroker {
    LicenseBroker::new(BrokerConfig {
        endpoint: format!("{}/verify", server.uri()),
        timeout: Duration::from_secs(2),
    })
    .unwrap()
}

fn key(raw: &str) -> LicenseKey {
    LicenseKey::parse(raw).unwrap()
}

// ── Config defaults ─────────────────────────────────────────────

#[test]
fn broker_config_default() {
    let cfg = BrokerConfig::default();
    assert_eq!(
        cfg.endpoint,
        "https://tblock-licence-api-t4cao.ondigitalocean.app/verify"
    );
    assert_eq!(cfg.timeout, Duration::from_secs(10));
}

// ── Success ─────────────────────────────────────────────────────

#[tokio::test]
async fn exchange_returns_decoded_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/verify"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "license_key": "ABC-123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "allowed": true,
            "payload_key": BASE64.encode([0u8; 32]),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payload_key = broker_for(&server).exchange(&key("ABC-123")).await.unwrap();
    assert_eq!(payload_key.as_bytes(), &[0u8; 32]);
}

#[tokio::test]
async fn exchange_forwards_key_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({ "license_key": "weird key/with+chars" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "allowed": true,
            "payload_key": BASE64.encode([5u8; 32]),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payload_key = broker_for(&server)
        .exchange(&key("weird key/with+chars"))
        .await
        .unwrap();
    assert_eq!(payload_key.as_bytes(), &[5u8; 32]);
}

#[tokio::test]
async fn exchange_does_not_check_key_length() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "allowed": true,
            "payload_key": BASE64.encode([1u8; 16]),
        })))
        .mount(&server)
        .await;

    let payload_key = broker_for(&server).exchange(&key("K")).await.unwrap();
    assert_eq!(payload_key.len(), 16);
}

// ── Decision table ──────────────────────────────────────────────

#[tokio::test]
async fn non_success_status_is_rejected_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("unknown license"))
        .mount(&server)
        .await;

    let err = broker_for(&server).exchange(&key("K")).await.unwrap_err();
    match err {
        LicenseError::Rejected { status, body } => {
            assert_eq!(status, 403);
            assert_eq!(body, "unknown license");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn rejected_body_is_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("x".repeat(4096)))
        .mount(&server)
        .await;

    let err = broker_for(&server).exchange(&key("K")).await.unwrap_err();
    let LicenseError::Rejected { body, .. } = err else {
        panic!("expected Rejected");
    };
    assert_eq!(body.len(), 512);
}

#[tokio::test]
async fn not_allowed_is_denied() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "allowed": false,
            "payload_key": BASE64.encode([0u8; 32]),
        })))
        .mount(&server)
        .await;

    let err = broker_for(&server).exchange(&key("K")).await.unwrap_err();
    assert!(matches!(err, LicenseError::Denied));
}

#[tokio::test]
async fn missing_allowed_is_denied() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "payload_key": "AAAA" })),
        )
        .mount(&server)
        .await;

    let err = broker_for(&server).exchange(&key("K")).await.unwrap_err();
    assert!(matches!(err, LicenseError::Denied));
}

#[tokio::test]
async fn missing_payload_key_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "allowed": true })))
        .mount(&server)
        .await;

    let err = broker_for(&server).exchange(&key("K")).await.unwrap_err();
    assert!(matches!(err, LicenseError::Protocol(_)));
}

#[tokio::test]
async fn empty_payload_key_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "allowed": true, "payload_key": "" })),
        )
        .mount(&server)
        .await;

    let err = broker_for(&server).exchange(&key("K")).await.unwrap_err();
    assert!(matches!(err, LicenseError::Protocol(_)));
}

#[tokio::test]
async fn invalid_base64_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "allowed": true, "payload_key": "!!not base64!!" })),
        )
        .mount(&server)
        .await;

    let err = broker_for(&server).exchange(&key("K")).await.unwrap_err();
    assert!(format!("{err}").contains("base64"));
}

#[tokio::test]
async fn non_json_body_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let err = broker_for(&server).exchange(&key("K")).await.unwrap_err();
    assert!(matches!(err, LicenseError::Protocol(_)));
}

// ── Transport ───────────────────────────────────────────────────

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "allowed": true, "payload_key": "AAAA" }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let broker = LicenseBroker::new(BrokerConfig {
        endpoint: format!("{}/verify", server.uri()),
        timeout: Duration::from_millis(200),
    })
    .unwrap();

    let err = broker.exchange(&key("K")).await.unwrap_err();
    assert!(matches!(err, LicenseError::Transport(_)));
}

#[tokio::test]
async fn connection_refused_is_transport_error() {
    // Bind then drop a listener to get a port nothing is serving.
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let broker = LicenseBroker::new(BrokerConfig {
        endpoint: format!("http://{addr}/verify"),
        timeout: Duration::from_secs(2),
    })
    .unwrap();

    let err = broker.exchange(&key("K")).await.unwrap_err();
    assert!(matches!(err, LicenseError::Transport(_)));
}

#[tokio::test]
async fn single_attempt_per_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let _ = broker_for(&server).exchange(&key("K")).await;
}
