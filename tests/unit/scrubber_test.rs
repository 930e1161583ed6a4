use companion_engine::services::{HttpScrubber, ScrubError, Scrubber};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_scrub_returns_anonymized_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/anonymize"))
        .and(body_json(json!({ "text": "I'm Dana from Leeds" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "anonymized": "I'm [NAME] from [CITY]" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let scrubber = HttpScrubber::new(server.uri(), Duration::from_secs(2)).unwrap();
    let text = scrubber.scrub("I'm Dana from Leeds").await.unwrap();
    assert_eq!(text, "I'm [NAME] from [CITY]");
}

#[tokio::test]
async fn test_scrub_surfaces_api_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/anonymize"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let scrubber = HttpScrubber::new(server.uri(), Duration::from_secs(2)).unwrap();
    let err = scrubber.scrub("anything").await.unwrap_err();
    assert!(matches!(err, ScrubError::ApiError { status: 500, .. }));
}

#[tokio::test]
async fn test_scrub_rejects_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/anonymize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "wrong field" })))
        .mount(&server)
        .await;

    let scrubber = HttpScrubber::new(server.uri(), Duration::from_secs(2)).unwrap();
    assert!(matches!(
        scrubber.scrub("anything").await,
        Err(ScrubError::HttpError(_))
    ));
}
