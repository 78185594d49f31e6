use rybbit_feeder::domain::VisitEvent;
use rybbit_feeder::sender::{ClientConfig, ClientError, Collector, CollectorClient};
use serde_json::json;
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path},
};

fn client(server: &MockServer) -> CollectorClient {
    CollectorClient::new(ClientConfig {
        host: server.uri(),
        timeout: Duration::from_secs(2),
        ..ClientConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_probe_hits_health_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(client.probe().await.is_ok());

    let stats = client.connection_stats();
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.successful_requests, 1);
}

#[tokio::test]
async fn test_probe_fails_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503).set_body_string("starting"))
        .mount(&server)
        .await;

    let client = client(&server);
    match client.probe().await {
        Err(ClientError::HttpError { status, message }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "starting");
        }
        other => panic!("expected HttpError, got {other:?}"),
    }
    assert_eq!(client.connection_stats().failed_requests, 1);
}

#[tokio::test]
async fn test_deliver_posts_wrapped_event() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/track"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "type": "event",
            "payload": {
                "api_key": "secret",
                "site_id": "1",
                "type": "pageview",
                "pathname": "/hello",
                "hostname": "example.com",
                "ip_address": "198.51.100.4",
                "user_agent": "Mozilla/5.0",
                "language": "en-US",
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"success\":true}"))
        .expect(1)
        .mount(&server)
        .await;

    let event = VisitEvent::pageview("secret", "1", "/hello")
        .with_hostname("example.com")
        .with_ip_address(Some("198.51.100.4".into()))
        .with_user_agent("Mozilla/5.0")
        .with_language(Some("en-US".into()));

    let delivery = client(&server).deliver(&event).await.unwrap();
    assert!(delivery.status.is_success());
    assert_eq!(delivery.body.as_ref(), b"{\"success\":true}");
}

#[tokio::test]
async fn test_deliver_reports_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/track"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid site"))
        .mount(&server)
        .await;

    let event = VisitEvent::pageview("secret", "1", "/");
    let result = client(&server).deliver(&event).await;
    assert!(matches!(
        result,
        Err(ClientError::HttpError { status: 400, .. })
    ));
}

#[tokio::test]
async fn test_deliver_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/track"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = CollectorClient::new(ClientConfig {
        host: server.uri(),
        timeout: Duration::from_millis(100),
        ..ClientConfig::default()
    })
    .unwrap();

    let result = client.deliver(&VisitEvent::pageview("k", "1", "/")).await;
    assert!(matches!(result, Err(ClientError::RequestTimeout(_))));
}

#[tokio::test]
async fn test_unreachable_collector_is_network_error() {
    // nothing listens on the discard port
    let client = CollectorClient::new(ClientConfig {
        host: "http://127.0.0.1:9".into(),
        timeout: Duration::from_secs(2),
        connection_timeout: Duration::from_secs(1),
        ..ClientConfig::default()
    })
    .unwrap();

    assert!(matches!(
        client.probe().await,
        Err(ClientError::NetworkError(_) | ClientError::RequestTimeout(_))
    ));
}
