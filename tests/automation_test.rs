use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use credrelay::automation::profiles::ProfileClient;
use credrelay::automation::{AutomationEngine, JobRequest, NO_ENDPOINT, PROFILE_NOT_RESOLVED};
use credrelay::services::notifier::Notifier;

fn engine_for(server: &MockServer) -> AutomationEngine {
    AutomationEngine::with_profiles(
        ProfileClient::new(server.uri(), None),
        Notifier::default(),
    )
}

fn request(platform: &str) -> JobRequest {
    JobRequest {
        platform: platform.to_string(),
        username: "a@x.com".to_string(),
        password: "p".to_string(),
        profile_ref: None,
        otp: None,
        dry_run: false,
    }
}

#[tokio::test]
async fn test_unmatched_profile_fails_without_starting_a_browser() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "p-1", "name": "twitter" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/profiles/p-1/start"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = engine_for(&server).run("job-1", request("facebook")).await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some(PROFILE_NOT_RESOLVED));
}

#[tokio::test]
async fn test_start_without_endpoint_is_a_hard_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "p-7", "name": "facebook" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/profiles/p-7/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "started" })))
        .mount(&server)
        .await;

    let result = engine_for(&server).run("job-2", request("facebook")).await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some(NO_ENDPOINT));
}

#[tokio::test]
async fn test_direct_profile_ref_skips_the_directory_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/profiles/my-profile/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let mut req = request("facebook");
    req.profile_ref = Some("my-profile".to_string());
    let result = engine_for(&server).run("job-3", req).await;

    // The start step was reached (and failed on the empty endpoint)
    assert_eq!(result.error.as_deref(), Some(NO_ENDPOINT));
}

#[tokio::test]
async fn test_dry_run_makes_no_external_calls() {
    let server = MockServer::start().await;

    let mut req = request("facebook");
    req.dry_run = true;
    let result = engine_for(&server).run("job-4", req).await;

    assert!(result.needs_otp, "facebook expects a second factor");
    assert!(
        server.received_requests().await.unwrap().is_empty(),
        "dry runs never touch the profile service"
    );
}

#[tokio::test]
async fn test_profile_resolution_is_case_insensitive() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "p-2", "name": "Facebook" },
            { "id": "p-3", "name": "facebook" }
        ])))
        .mount(&server)
        .await;

    let client = ProfileClient::new(server.uri(), None);
    let resolved = client.resolve("FACEBOOK").await.unwrap();
    assert_eq!(resolved.as_deref(), Some("p-2"), "first hit wins");

    let missing = client.resolve("linkedin").await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_directory_error_reports_profile_not_resolved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profiles"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = engine_for(&server).run("job-5", request("facebook")).await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some(PROFILE_NOT_RESOLVED));
}
