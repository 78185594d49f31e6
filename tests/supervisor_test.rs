use rybbit_feeder::app::{Config, WebsiteMapping, check_collector};
use rybbit_feeder::reliability::{RetryPolicy, SupervisorOutcome};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn config(host: String) -> Config {
    Config {
        host,
        api_key: "key".into(),
        websites: vec![WebsiteMapping::new("example.com", "1")],
        retry_policy: RetryPolicy::new(Duration::from_millis(5), Duration::from_millis(40), 8),
        ..Config::default()
    }
}

#[test]
fn test_default_backoff_sequence() {
    let policy = RetryPolicy::default();
    let expected = [0, 30, 60, 120, 240, 480, 960, 1920, 3600, 3600, 3600];
    for (attempt, secs) in expected.into_iter().enumerate() {
        assert_eq!(
            policy.delay(attempt as u32),
            Duration::from_secs(secs),
            "attempt {attempt}"
        );
    }
}

#[tokio::test]
async fn test_ready_after_three_failed_probes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(3)
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = check_collector(&config(server.uri()), CancellationToken::new()).await;
    match outcome {
        SupervisorOutcome::Ready(engine) => assert_eq!(engine.sites().resolve("example.com"), Some("1")),
        other => panic!("expected Ready, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_filter_config_is_fatal_after_probe() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = Config {
        ignore_ips: vec!["300.1.1.1/8".into()],
        ..config(server.uri())
    };
    let outcome = check_collector(&config, CancellationToken::new()).await;
    assert!(matches!(outcome, SupervisorOutcome::Disabled(_)));
}

#[tokio::test]
async fn test_missing_websites_never_probes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = Config {
        websites: Vec::new(),
        ..config(server.uri())
    };
    let outcome = check_collector(&config, CancellationToken::new()).await;
    assert!(matches!(outcome, SupervisorOutcome::Disabled(_)));
}

#[tokio::test]
async fn test_cancellation_stops_retrying() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        check_collector(&config(server.uri()), cancel),
    )
    .await
    .expect("supervisor should stop once cancelled");
    assert!(matches!(outcome, SupervisorOutcome::Cancelled));
}
