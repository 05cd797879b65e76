//! VirusTotal client against a mock upstream.

use std::time::Duration;

use scancheck::config::VirusTotalConfig;
use scancheck::error::CheckError;
use scancheck::types::SafetyLevel;
use scancheck::virustotal::VirusTotalClient;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base: &str, key: Option<&str>) -> VirusTotalConfig {
    VirusTotalConfig {
        api_key: key.map(str::to_string),
        base_url: base.to_string(),
        analysis_delay: Duration::ZERO,
        timeout: Duration::from_secs(5),
    }
}

fn analysis_body() -> serde_json::Value {
    json!({
        "data": {
            "attributes": {
                "last_analysis_stats": {"malicious": 2, "suspicious": 1, "harmless": 60, "undetected": 10, "timeout": 0},
                "last_analysis_results": {
                    "EngineA": {"category": "malicious", "result": "phishing", "engine_name": "EngineA", "method": "blacklist"},
                    "EngineB": {"category": "harmless", "result": "clean", "engine_name": "EngineB", "method": "blacklist"},
                    "EngineC": {"category": "undetected", "result": "unrated", "engine_name": "EngineC", "method": "blacklist"}
                }
            }
        }
    })
}

#[tokio::test]
async fn submits_then_fetches_by_url_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v3/urls"))
        .and(header("x-apikey", "test-key"))
        .and(body_string_contains("url=http%3A%2F%2Fok.test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"type": "analysis"}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/urls/aHR0cDovL29rLnRlc3Q"))
        .and(header("x-apikey", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(analysis_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = VirusTotalClient::new(&test_config(&server.uri(), Some("test-key"))).unwrap();
    let r = client.check_url("  http://ok.test ").await.expect("check ok");

    assert_eq!(r.url, "http://ok.test");
    assert_eq!((r.malicious, r.suspicious, r.harmless, r.undetected), (2, 1, 60, 10));
    assert_eq!(r.total, 3);
    assert_eq!(r.safety_level, SafetyLevel::Dangerous);
    assert_eq!(r.details["EngineA"].result.as_deref(), Some("phishing"));
}

#[tokio::test]
async fn missing_key_makes_no_request() {
    let server = MockServer::start().await;
    let client = VirusTotalClient::new(&test_config(&server.uri(), None)).unwrap();

    let err = client.check_url("http://ok.test").await.unwrap_err();
    assert!(matches!(err, CheckError::NotConfigured));
    assert_eq!(err.to_string(), "VirusTotal API key not configured on server");
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn submit_rejection_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = VirusTotalClient::new(&test_config(&server.uri(), Some("k"))).unwrap();
    let err = client.check_url("http://ok.test").await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to submit URL to VirusTotal");
}

#[tokio::test]
async fn analysis_rejection_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = VirusTotalClient::new(&test_config(&server.uri(), Some("k"))).unwrap();
    let err = client.check_url("http://ok.test").await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to retrieve analysis results");
}

#[tokio::test]
async fn malformed_analysis_is_unexpected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let client = VirusTotalClient::new(&test_config(&server.uri(), Some("k"))).unwrap();
    let err = client.check_url("http://ok.test").await.unwrap_err();
    assert!(err.to_string().starts_with("Unexpected error: "));
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let mut cfg = test_config(&server.uri(), Some("k"));
    cfg.timeout = Duration::from_millis(200);
    let client = VirusTotalClient::new(&cfg).unwrap();
    let err = client.check_url("http://ok.test").await.unwrap_err();
    assert!(matches!(err, CheckError::Timeout));
}
