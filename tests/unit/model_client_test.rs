use companion_engine::models::internal::{HistoryEntry, OwnerContext, Role};
use companion_engine::services::{HttpModelClient, ModelClient, ModelError};
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpModelClient {
    HttpModelClient::new(
        format!("{}/", server.uri()),
        "companion-test".to_string(),
        Duration::from_secs(2),
    )
    .unwrap()
}

#[tokio::test]
async fn test_invoke_sends_history_and_owner() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4();
    let clinician_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_partial_json(json!({
            "model": "companion-test",
            "system_prompt": "Be kind.",
            "messages": [{ "role": "user", "content": "hello" }],
            "owner_id": patient_id.to_string(),
            "caller_id": clinician_id.to_string(),
            "training": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "Hi there" })))
        .expect(1)
        .mount(&server)
        .await;

    let context = OwnerContext::ClinicianViewingPatient {
        clinician_id,
        patient_id,
    };
    let reply = client(&server)
        .invoke(&[HistoryEntry::new(Role::User, "hello")], "Be kind.", &context)
        .await
        .unwrap();

    assert_eq!(reply.message, "Hi there");
}

#[tokio::test]
async fn test_invoke_maps_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let context = OwnerContext::Patient {
        patient_id: Uuid::new_v4(),
    };
    let err = client(&server).invoke(&[], "", &context).await.unwrap_err();

    match err {
        ModelError::ApiError { status, message } => {
            assert_eq!(status, 502);
            assert_eq!(message, "upstream down");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_invoke_rejects_empty_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "" })))
        .mount(&server)
        .await;

    let context = OwnerContext::Patient {
        patient_id: Uuid::new_v4(),
    };
    let err = client(&server).invoke(&[], "", &context).await.unwrap_err();
    assert!(matches!(err, ModelError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_invoke_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "message": "late" }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = HttpModelClient::new(
        server.uri(),
        "companion-test".to_string(),
        Duration::from_millis(50),
    )
    .unwrap();
    let context = OwnerContext::Patient {
        patient_id: Uuid::new_v4(),
    };

    let err = client.invoke(&[], "", &context).await.unwrap_err();
    assert!(matches!(err, ModelError::HttpError(_)));
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    assert!(client(&server).health_check().await.unwrap());
}
