//! End-to-end pipeline tests against a mock scoring service

use payguard_core::{extract_payment, EstimateSource, Recommendation, RiskLevel, UpiHandle};
use risk_engine::{
    Config, Error, HeuristicConfig, ReportChannel, RequestMethod, RiskPipeline, SignalBook,
};
use rust_decimal::Decimal;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(endpoint: Option<String>) -> Config {
    let mut config = Config::default();
    config.remote.endpoint = endpoint;
    config.remote.timeout_ms = 300;
    config.heuristic = HeuristicConfig {
        jitter: 0.0,
        ..HeuristicConfig::default()
    };
    config
}

fn handle(s: &str) -> UpiHandle {
    UpiHandle::parse(s).unwrap()
}

#[tokio::test]
async fn test_known_scammer_is_blocked() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/risk"))
        .and(query_param("identifier", "known-scammer@upi"))
        .and(query_param("amount", "500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "confidence": 0.91,
            "reportCount": 12,
            "features": {"report_frequency": 96.0, "amount_deviation": 12.4}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = RiskPipeline::from_config(&config(Some(server.uri())), SignalBook::default())
        .unwrap();
    let assessment = pipeline
        .estimate_risk(&handle("known-scammer@upi"), Decimal::from(500))
        .await
        .unwrap();

    assert_eq!(assessment.percentage.value(), 91);
    assert_eq!(assessment.level, RiskLevel::High);
    assert_eq!(assessment.report_count, 12);
    assert_eq!(assessment.recommendation, Recommendation::Block);
    assert_eq!(assessment.source, EstimateSource::Remote);
    assert!(!assessment.degraded);
    assert_eq!(assessment.feature_scores["report_frequency"], 96);
    assert_eq!(assessment.feature_scores["amount_deviation"], 12);
    assert_eq!(assessment.safety_score(), 9);
}

#[tokio::test]
async fn test_slow_service_falls_back_to_heuristic() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/risk"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"confidence": 0.99, "reportCount": 40}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let pipeline = RiskPipeline::from_config(&config(Some(server.uri())), SignalBook::default())
        .unwrap();
    let started = Instant::now();
    let assessment = pipeline
        .estimate_risk(&handle("slow@bank"), Decimal::from(500))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(assessment.degraded);
    assert_eq!(assessment.source, EstimateSource::Heuristic);
    assert_eq!(assessment.report_count, 0);
    assert!(assessment.feature_scores.contains_key("handle_pattern"));
}

#[tokio::test]
async fn test_server_error_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/risk"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let signals = SignalBook::default();
    let payee = handle("refund.desk@okaxis");
    for _ in 0..5 {
        signals.file_report(payee.clone(), ReportChannel::Message, None, "Fake refund SMS");
    }

    let pipeline = RiskPipeline::from_config(&config(Some(server.uri())), signals).unwrap();
    let assessment = pipeline
        .estimate_risk(&payee, Decimal::from(500))
        .await
        .unwrap();

    assert!(assessment.degraded);
    assert_eq!(assessment.source, EstimateSource::Heuristic);
    assert_eq!(assessment.report_count, 5);
    assert_eq!(assessment.feature_scores["report_frequency"], 100);
    assert_eq!(assessment.recommendation, Recommendation::Verify);
}

#[tokio::test]
async fn test_malformed_response_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/risk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"score": "high"})))
        .mount(&server)
        .await;

    let pipeline = RiskPipeline::from_config(&config(Some(server.uri())), SignalBook::default())
        .unwrap();
    let assessment = pipeline
        .estimate_risk(&handle("merchant@upi"), Decimal::from(100))
        .await
        .unwrap();

    assert!(assessment.degraded);
    assert_eq!(assessment.recommendation, Recommendation::Allow);
}

#[tokio::test]
async fn test_missing_report_count_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/risk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"confidence": 0.91})))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = RiskPipeline::from_config(&config(Some(server.uri())), SignalBook::default())
        .unwrap();
    let assessment = pipeline
        .estimate_risk(&handle("merchant@upi"), Decimal::from(100))
        .await
        .unwrap();

    assert!(assessment.degraded);
    assert_eq!(assessment.source, EstimateSource::Heuristic);
    assert_eq!(assessment.recommendation, Recommendation::Allow);
}

#[tokio::test]
async fn test_unreachable_service_falls_back() {
    // Nothing listens on port 1
    let pipeline = RiskPipeline::from_config(
        &config(Some("http://127.0.0.1:1".to_string())),
        SignalBook::default(),
    )
    .unwrap();
    let assessment = pipeline
        .estimate_risk(&handle("merchant@upi"), Decimal::from(100))
        .await
        .unwrap();

    assert!(assessment.degraded);
    assert_eq!(assessment.source, EstimateSource::Heuristic);
}

#[tokio::test]
async fn test_post_with_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/risk"))
        .and(header("authorization", "Bearer secret"))
        .and(body_json(json!({"identifier": "merchant@upi", "amount": "100"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "confidence": 0.42,
            "reportCount": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config(Some(server.uri()));
    config.remote.method = RequestMethod::Post;
    config.remote.api_key = Some("secret".to_string());

    let pipeline = RiskPipeline::from_config(&config, SignalBook::default()).unwrap();
    let descriptor =
        extract_payment("upi://pay?pa=merchant@upi&pn=Test%20Merchant&am=100").unwrap();
    let assessment = pipeline.assess_payment(&descriptor).await.unwrap();

    assert_eq!(assessment.percentage.value(), 42);
    assert_eq!(assessment.level, RiskLevel::Medium);
    assert_eq!(assessment.recommendation, Recommendation::Verify);
    assert!(!assessment.degraded);
}

#[tokio::test]
async fn test_cancellation_abandons_assessment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/risk"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"confidence": 0.1, "reportCount": 0}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let mut config = config(Some(server.uri()));
    config.remote.timeout_ms = 10_000;
    let pipeline = RiskPipeline::from_config(&config, SignalBook::default()).unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let result = pipeline
        .estimate_risk_cancellable(&handle("merchant@upi"), Decimal::from(100), &cancel)
        .await;

    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_demo_mode_without_endpoint() {
    let pipeline = RiskPipeline::from_config(&config(None), SignalBook::default()).unwrap();
    let descriptor =
        extract_payment(r#"{"upi_id":"merchant@upi","name":"Test Merchant"}"#).unwrap();
    let assessment = pipeline.assess_payment(&descriptor).await.unwrap();

    assert!(assessment.degraded);
    assert_eq!(assessment.source, EstimateSource::Heuristic);
    assert_eq!(assessment.recommendation, Recommendation::Allow);
}
