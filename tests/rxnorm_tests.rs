//! RxNorm name standardisation against a mock upstream.

use std::time::Duration;

use scancheck::barcode::BarcodeService;
use scancheck::config::ShelfPolicy;
use scancheck::rxnorm::{Concept, RxNormClient};
use scancheck::types::ScanRequest;
use serde_json::json;
use time::macros::date;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> RxNormClient {
    RxNormClient::new(server.uri(), Duration::from_secs(5)).unwrap()
}

async fn mount_drugs(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/REST/drugs.json"))
        .and(query_param("name", "Paracetamol"))
        .respond_with(response)
        .mount(server)
        .await;
}

fn drugs_body() -> serde_json::Value {
    json!({
        "drugGroup": {
            "name": "Paracetamol",
            "conceptGroup": [
                {"tty": "BPCK"},
                {"tty": "SCD", "conceptProperties": []},
                {"tty": "SBD", "conceptProperties": [
                    {"rxcui": "161", "name": "acetaminophen", "tty": "SBD"},
                    {"rxcui": "313782", "name": "acetaminophen 325 MG Oral Tablet", "tty": "SBD"}
                ]}
            ]
        }
    })
}

#[tokio::test]
async fn lookup_skips_groups_without_properties() {
    let server = MockServer::start().await;
    mount_drugs(&server, ResponseTemplate::new(200).set_body_json(drugs_body())).await;

    let concept = client(&server).lookup("Paracetamol").await.unwrap();
    assert_eq!(concept, Some(Concept { name: "acetaminophen".into(), rxcui: "161".into() }));
}

#[tokio::test]
async fn lookup_without_concepts_is_none() {
    let server = MockServer::start().await;
    mount_drugs(&server, ResponseTemplate::new(200).set_body_json(json!({"drugGroup": {"name": null}}))).await;

    assert_eq!(client(&server).lookup("Paracetamol").await.unwrap(), None);
    assert_eq!(
        client(&server).standardize("Paracetamol").await,
        ("Paracetamol".to_string(), None)
    );
}

#[tokio::test]
async fn server_error_falls_back_to_input_name() {
    let server = MockServer::start().await;
    mount_drugs(&server, ResponseTemplate::new(500)).await;

    assert!(client(&server).lookup("Paracetamol").await.is_err());
    assert_eq!(
        client(&server).standardize("Paracetamol").await,
        ("Paracetamol".to_string(), None)
    );
}

#[tokio::test]
async fn malformed_body_falls_back_to_input_name() {
    let server = MockServer::start().await;
    mount_drugs(&server, ResponseTemplate::new(200).set_body_string("not json")).await;

    assert!(client(&server).lookup("Paracetamol").await.is_err());
    assert_eq!(
        client(&server).standardize("Paracetamol").await,
        ("Paracetamol".to_string(), None)
    );
}

#[tokio::test]
async fn scan_message_carries_standardised_name_and_rxcui() {
    let server = MockServer::start().await;
    mount_drugs(&server, ResponseTemplate::new(200).set_body_json(drugs_body())).await;

    let svc = BarcodeService::new(Some(client(&server)), "Paracetamol", ShelfPolicy::default());
    let req = ScanRequest { barcode: "(17)200101(10)B1".into(), is_sealed: true };
    let res = svc.scan_on(&req, date!(2025 - 01 - 01)).await.unwrap();

    assert_eq!(res.name, "acetaminophen");
    assert_eq!(res.rxcui.as_deref(), Some("161"));
    assert_eq!(
        res.message.as_deref(),
        Some("acetaminophen (RxCUI: 161) Batch B1: ❌ EXPIRED. Must be disposed.")
    );
}
