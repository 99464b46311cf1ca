use std::sync::Arc;
use std::time::Duration;

use archetype_harness::gateway::openrouter::OpenRouterAdapter;
use archetype_harness::gateway::{ChatGateway, GatewayConfig, MemoryUsageSink, ProviderGateway};
use archetype_harness::{
    BatchOptions, Classifier, ClassifierConfig, ModelSource, RichnessTier, Strategy, Subject,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "content": content }, "finish_reason": "stop" }],
        "usage": { "prompt_tokens": 120, "completion_tokens": 40, "cost": 0.00002 }
    }))
}

fn gateway(server: &MockServer, sink: Arc<MemoryUsageSink>) -> Arc<dyn ChatGateway> {
    let adapter =
        OpenRouterAdapter::with_config("sk-test", server.uri(), Duration::from_secs(5), None, None)
            .unwrap();
    let config = GatewayConfig {
        max_retries: 0,
        ..GatewayConfig::default()
    };
    Arc::new(ProviderGateway::with_config(adapter, sink, config))
}

fn rembrandt() -> Subject {
    Subject::new("Rembrandt van Rijn")
        .with_biography("Dutch draughtsman, painter and printmaker. ".repeat(30))
        .with_era("Dutch Golden Age")
        .with_nationality("Dutch")
        .with_birth_year(1606)
}

#[tokio::test]
async fn two_openrouter_models_feed_full_analysis() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": "vendor/model-a" })))
        .respond_with(completion(
            "**L/S:** -40 (works alone late in life)\n**A/R:** +85\n**E/M:** -60\n**F/C:** 30\n\nType: LREC",
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": "vendor/model-b" })))
        .respond_with(completion(
            "```json\n{\"axisScores\": {\"L_S\": -20, \"A_R\": 90, \"E_M\": -70, \"F_C\": 50}, \"aptType\": \"LREC\"}\n```",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let sink = Arc::new(MemoryUsageSink::new());
    let gw = gateway(&server, sink.clone());
    let classifier = Classifier::new(ClassifierConfig::default()).with_models(vec![
        ModelSource::from_gateway(gw.clone(), "vendor/model-a"),
        ModelSource::from_gateway(gw, "vendor/model-b"),
    ]);

    let report = classifier
        .classify_batch(&[rembrandt()], BatchOptions::default())
        .await;
    let r = &report.results[0];

    assert_eq!(r.tier, Some(RichnessTier::Rich));
    assert_eq!(r.strategy, Strategy::FullAnalysis);
    assert_eq!(r.sources, ["heuristic", "vendor/model-a", "vendor/model-b"]);
    // baroque heuristic (50, 90, -60, 40) at 0.3, each model at 0.35
    let social = 0.3 * 50.0 + 0.35 * -40.0 + 0.35 * -20.0;
    assert!((r.scores.as_array()[0] - social).abs() < 1e-6);
    assert_eq!(r.type_code.to_string(), "LREC");

    let records = sink.records();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|rec| rec.batch_id == Some(report.batch_id)));
    assert!(records
        .iter()
        .all(|rec| rec.subject.as_deref() == Some("Rembrandt van Rijn")));
    assert_eq!(sink.summary().cost_nanodollars, 40_000);
}

#[tokio::test]
async fn auth_failure_demotes_to_heuristic() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "invalid key", "code": 401 }
        })))
        .mount(&server)
        .await;

    let sink = Arc::new(MemoryUsageSink::new());
    let classifier = Classifier::new(ClassifierConfig::default())
        .with_models(vec![ModelSource::from_gateway(gateway(&server, sink.clone()), "vendor/model-a")]);

    let r = classifier
        .classify(&rembrandt(), &classifier.session())
        .await;

    assert_eq!(r.strategy, Strategy::PureInference);
    assert_eq!(r.sources, ["heuristic"]);
    assert!(r.rationale.contains("vendor/model-a unavailable (auth_failed)"));
    assert_eq!(sink.summary().errors, 1);
}

#[tokio::test]
async fn slow_provider_is_cut_off_by_source_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion("L/S: 10").set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let classifier = Classifier::new(ClassifierConfig::default()).with_models(vec![
        ModelSource::from_gateway(gateway(&server, Arc::new(MemoryUsageSink::new())), "vendor/slow")
            .with_timeout(Duration::from_millis(200)),
    ]);

    let r = classifier
        .classify(&rembrandt(), &classifier.session())
        .await;

    assert_eq!(r.strategy, Strategy::PureInference);
    assert!(r.rationale.contains("vendor/slow unavailable (timeout)"));
}
