//! Integration tests for the visit API client
//!
//! Runs the client against a local responder to check the request it sends
//! and how each kind of response is classified.

mod common;

use std::time::Duration;

use common::{closed_addr, MockApi, Reply};
use hjemis::data::FailureKind;
use hjemis::{Config, Coordinates, Endpoints, FetchError, Region, VisitClient};

fn client_for(api: &MockApi) -> VisitClient {
    let config = Config::new(55.68, 12.57)
        .with_endpoints(api.endpoints())
        .with_contact_url("https://example.org/contact");
    VisitClient::new(&config).expect("client should build")
}

#[tokio::test]
async fn test_request_carries_query_and_headers() {
    let api = MockApi::start(vec![Reply::ok("[]")]);
    let client = client_for(&api);

    client
        .fetch_visits(Coordinates::new(55.68, 12.57))
        .await
        .expect("fetch should succeed");

    let requests = api.requests();
    assert_eq!(requests.len(), 1);
    let head = requests[0].to_lowercase();
    let request_line = head.lines().next().unwrap_or_default().to_string();

    assert!(request_line.starts_with("get /dk.json?"), "{}", request_line);
    assert!(request_line.contains("coordinates%5blat%5d=55.68"), "{}", request_line);
    assert!(request_line.contains("coordinates%5blng%5d=12.57"), "{}", request_line);
    assert!(request_line.contains("format=json"), "{}", request_line);
    assert!(head.contains("accept: application/json"), "{}", head);
    assert!(
        head.contains(&format!(
            "user-agent: hjemis/{} (+https://example.org/contact)",
            env!("CARGO_PKG_VERSION")
        )),
        "{}",
        head
    );
}

#[tokio::test]
async fn test_default_user_agent_names_contact() {
    let api = MockApi::start(vec![Reply::ok("[]")]);
    let config = Config::new(55.68, 12.57).with_endpoints(api.endpoints());
    VisitClient::new(&config)
        .unwrap()
        .fetch_visits(config.coordinates())
        .await
        .expect("fetch should succeed");

    let head = api.requests()[0].to_lowercase();
    assert!(
        head.contains(&format!(
            "user-agent: hjemis/{} (+https://crates.io/crates/hjemis)",
            env!("CARGO_PKG_VERSION")
        )),
        "{}",
        head
    );
}

#[tokio::test]
async fn test_norwegian_coordinates_use_norway_endpoint() {
    let body = r#"[{"google_estimate_time": "2024-06-01T18:30:00+02:00", "address": "Storgata 1", "distance": 220}]"#;
    let api = MockApi::start(vec![Reply::ok(body)]);
    let client = client_for(&api);

    let result = client
        .fetch_visits(Coordinates::new(59.91, 10.75))
        .await
        .expect("fetch should succeed");

    assert_eq!(result.region, Region::Norway);
    assert_eq!(result.events.len(), 1);
    assert_eq!(result.events[0].address.as_deref(), Some("Storgata 1"));
    assert_eq!(result.events[0].distance.as_deref(), Some("220"));
    assert!(api.requests()[0].starts_with("GET /no.json?"));
}

#[tokio::test]
async fn test_threshold_latitude_uses_denmark_endpoint() {
    let api = MockApi::start(vec![Reply::ok("[]")]);
    let client = client_for(&api);

    let result = client
        .fetch_visits(Coordinates::new(57.9, 10.0))
        .await
        .unwrap();

    assert_eq!(result.region, Region::Denmark);
    assert!(api.requests()[0].starts_with("GET /dk.json?"));
}

#[tokio::test]
async fn test_empty_list_is_success() {
    let api = MockApi::start(vec![Reply::ok("[]")]);
    let result = client_for(&api)
        .fetch_visits(Coordinates::new(55.68, 12.57))
        .await
        .unwrap();
    assert!(result.events.is_empty());
    assert_eq!(result.region, Region::Denmark);
}

#[tokio::test]
async fn test_null_and_empty_bodies_are_success() {
    for body in ["null", "NULL", ""] {
        let api = MockApi::start(vec![Reply::ok(body)]);
        let result = client_for(&api)
            .fetch_visits(Coordinates::new(55.68, 12.57))
            .await
            .unwrap_or_else(|e| panic!("body {:?} should succeed: {}", body, e));
        assert!(result.events.is_empty());
    }
}

#[tokio::test]
async fn test_non_200_status_is_http_status_failure() {
    let api = MockApi::start(vec![Reply::status(503, "Service Unavailable")]);
    let err = client_for(&api)
        .fetch_visits(Coordinates::new(55.68, 12.57))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::HttpStatus(503)));
}

#[tokio::test]
async fn test_non_200_success_status_is_still_a_failure() {
    let api = MockApi::start(vec![Reply::status(204, "")]);
    let err = client_for(&api)
        .fetch_visits(Coordinates::new(55.68, 12.57))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::HttpStatus(204)));
}

#[tokio::test]
async fn test_malformed_body() {
    let api = MockApi::start(vec![Reply::ok("{not json")]);
    let err = client_for(&api)
        .fetch_visits(Coordinates::new(55.68, 12.57))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Malformed);
}

#[tokio::test]
async fn test_object_body_is_unexpected_shape() {
    let api = MockApi::start(vec![Reply::ok(r#"{"error": "rate limited"}"#)]);
    let err = client_for(&api)
        .fetch_visits(Coordinates::new(55.68, 12.57))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::UnexpectedShape("object")));
}

#[tokio::test]
async fn test_connection_refused_is_network_failure() {
    let addr = closed_addr().await;
    let config = Config::new(55.68, 12.57).with_endpoints(Endpoints {
        denmark: format!("http://{}/dk.json", addr),
        norway: format!("http://{}/no.json", addr),
    });
    let err = VisitClient::new(&config)
        .unwrap()
        .fetch_visits(config.coordinates())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Network);
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let api = MockApi::start(vec![Reply::ok("[]").delayed(Duration::from_secs(5))]);
    let config = Config::new(55.68, 12.57)
        .with_endpoints(api.endpoints())
        .with_request_timeout(Duration::from_millis(200));
    let err = VisitClient::new(&config)
        .unwrap()
        .fetch_visits(config.coordinates())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Network);
}
