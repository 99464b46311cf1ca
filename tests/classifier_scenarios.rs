use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use archetype_harness::axes::TypeCode;
use archetype_harness::category::Category;
use archetype_harness::gateway::{Attribution, ProviderError};
use archetype_harness::prompts::PromptInstance;
use archetype_harness::sources::{
    AnalysisProvider, EstimateContext, SourceEstimate, SourceKind,
};
use archetype_harness::{
    BatchOptions, ClassificationResult, Classifier, ClassifierConfig, ModelSource, RichnessTier,
    ScoringSource, SourceError, Strategy, Subject,
};
use async_trait::async_trait;

enum Reply {
    Text(&'static str),
    Fail,
    Panic,
}

struct MockProvider {
    reply: Reply,
    calls: AtomicUsize,
}

impl MockProvider {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisProvider for MockProvider {
    async fn analyze(
        &self,
        _prompt: &PromptInstance,
        _attribution: Attribution,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Reply::Text(text) => Ok(text.to_string()),
            Reply::Fail => Err(ProviderError::provider("mock", "quota exhausted", true)),
            Reply::Panic => panic!("provider adapter bug"),
        }
    }
}

struct FaultySource;

#[async_trait]
impl ScoringSource for FaultySource {
    fn id(&self) -> &str {
        "faulty"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Heuristic
    }

    async fn estimate(
        &self,
        _subject: &Subject,
        _ctx: &EstimateContext,
    ) -> Result<SourceEstimate, SourceError> {
        Err(SourceError::Fault("forced".to_string()))
    }
}

const MODEL_A: &str = "L/S: 10\nA/R: 80\nE/M: -50\nF/C: 30\nType: SREC\nRationale: court painter with a large workshop";
const MODEL_B: &str = r#"{"axis_scores": {"L_S": 30, "A_R": 70, "E_M": -40, "F_C": 10}, "type_code": "SREC", "rationale": "public commissions"}"#;

fn rich_baroque() -> Subject {
    Subject::new("Peter Paul Rubens")
        .with_biography("Flemish painter of altarpieces, court portraits and mythologies. ".repeat(20))
        .with_era("baroque")
        .with_nationality("Flemish")
        .with_birth_year(1577)
}

fn classifier_with(models: Vec<(&str, Arc<MockProvider>)>) -> Classifier {
    let sources = models
        .into_iter()
        .map(|(id, p)| ModelSource::new(id, p))
        .collect();
    Classifier::new(ClassifierConfig::default()).with_models(sources)
}

fn approx(a: [f64; 4], b: [f64; 4]) {
    for (x, y) in a.iter().zip(b) {
        assert!((x - y).abs() < 1e-6, "{a:?} != {b:?}");
    }
}

fn assert_well_formed(r: &ClassificationResult) {
    for (_, v) in r.scores.iter() {
        assert!((-100.0..=100.0).contains(&v), "{v} out of range");
    }
    assert_eq!(r.scores.type_code(), r.type_code);
    assert!(r.alternates.len() <= 2);
    assert!(!r.alternates.contains(&r.type_code));
    assert!(r.confidence <= 95);
}

#[tokio::test]
async fn scenario_a_unknown_artist_is_heuristic_only() {
    let classifier = classifier_with(vec![("m1", MockProvider::new(Reply::Text(MODEL_A)))]);
    let session = classifier.session();
    let r = classifier
        .classify(&Subject::new("Unknown Artist"), &session)
        .await;

    assert_eq!(r.tier, Some(RichnessTier::None));
    assert_eq!(r.strategy, Strategy::PureInference);
    assert_eq!(r.category, Some(Category::Unknown));
    assert_eq!(r.scores, Category::Unknown.profile().scores);
    assert!(r.confidence <= 55);
    assert_well_formed(&r);
}

#[tokio::test]
async fn scenario_b_rich_subject_merges_three_sources() {
    let a = MockProvider::new(Reply::Text(MODEL_A));
    let b = MockProvider::new(Reply::Text(MODEL_B));
    let classifier = classifier_with(vec![("m1", a.clone()), ("m2", b.clone())]);
    let session = classifier.session();
    let r = classifier.classify(&rich_baroque(), &session).await;

    assert_eq!(r.tier, Some(RichnessTier::Rich));
    assert_eq!(r.richness_score, Some(75));
    assert_eq!(r.strategy, Strategy::FullAnalysis);
    assert_eq!(r.sources, ["heuristic", "m1", "m2"]);
    approx(
        r.scores.as_array(),
        [
            0.3 * 50.0 + 0.35 * 10.0 + 0.35 * 30.0,
            0.3 * 90.0 + 0.35 * 80.0 + 0.35 * 70.0,
            0.3 * -60.0 + 0.35 * -50.0 + 0.35 * -40.0,
            0.3 * 40.0 + 0.35 * 30.0 + 0.35 * 10.0,
        ],
    );
    assert_eq!(r.type_code, TypeCode::SREC);
    assert!(!r.adjusted);
    assert!(r.confidence >= 70, "confidence {}", r.confidence);
    assert!(r.rationale.contains("court painter"));
    assert_eq!(a.calls(), 1);
    assert_eq!(b.calls(), 1);
    assert_well_formed(&r);
}

#[tokio::test]
async fn scenario_c_unreadable_response_is_reweighted() {
    let garbled = MockProvider::new(Reply::Text("I'd rather not put numbers on artists."));
    let b = MockProvider::new(Reply::Text(MODEL_B));
    let classifier = classifier_with(vec![("garbled", garbled), ("m2", b)]);
    let session = classifier.session();
    let r = classifier.classify(&rich_baroque(), &session).await;

    assert_eq!(r.strategy, Strategy::FullAnalysis);
    assert_eq!(r.sources, ["heuristic", "m2"]);
    let w = 0.3 + 0.35;
    approx(
        r.scores.as_array(),
        [
            (0.3 * 50.0 + 0.35 * 30.0) / w,
            (0.3 * 90.0 + 0.35 * 70.0) / w,
            (0.3 * -60.0 + 0.35 * -40.0) / w,
            (0.3 * 40.0 + 0.35 * 10.0) / w,
        ],
    );
    assert!(r.rationale.contains("garbled response unreadable"));
    assert_well_formed(&r);
}

#[tokio::test]
async fn scenario_d_default_prone_code_is_diversified() {
    let classifier = Classifier::new(ClassifierConfig::default());
    let subjects: Vec<Subject> = (0..20)
        .map(|i| Subject::new(format!("Neoclassicist {i}")).with_movement("Neoclassicism"))
        .collect();
    let report = classifier
        .classify_batch(&subjects, BatchOptions::default().concurrency(1))
        .await;

    assert_eq!(report.results.len(), 20);
    for r in &report.results[..10] {
        assert_eq!(r.type_code, TypeCode::SRMC);
        assert!(!r.adjusted);
    }
    for r in &report.results[10..] {
        assert!(r.adjusted, "{} not adjusted", r.subject);
        assert_ne!(r.type_code, TypeCode::SRMC);
        assert!(Category::Neoclassical.profile().alternates.contains(&r.type_code));
        // substituted code and vector agree
        assert_eq!(r.scores, r.type_code.profile().canonical_scores());
        assert!(r.rationale.contains("replaced with"));
    }
    assert_eq!(report.stats.adjusted_count, 10);
    assert_eq!(report.stats.type_counts.get("SRMC"), Some(&10));
    assert_eq!(report.stats.type_counts.get("SRMF"), Some(&5));
    assert_eq!(report.stats.type_counts.get("LRMC"), Some(&5));
}

#[tokio::test]
async fn diversity_holds_under_concurrency() {
    let classifier = Classifier::new(ClassifierConfig::default());
    let subjects: Vec<Subject> = (0..40)
        .map(|i| Subject::new(format!("Academician {i}")).with_movement("neoclassical"))
        .collect();
    let report = classifier
        .classify_batch(&subjects, BatchOptions::default().concurrency(8))
        .await;

    assert_eq!(report.stats.type_counts.get("SRMC"), Some(&10));
    assert_eq!(report.stats.adjusted_count, 30);
}

#[tokio::test]
async fn fresh_batches_do_not_share_counts() {
    let classifier = Classifier::new(ClassifierConfig::default());
    let subjects: Vec<Subject> = (0..10)
        .map(|i| Subject::new(format!("N{i}")).with_movement("Neoclassicism"))
        .collect();
    for _ in 0..2 {
        let report = classifier
            .classify_batch(&subjects, BatchOptions::default())
            .await;
        assert_eq!(report.stats.adjusted_count, 0);
    }
}

#[tokio::test]
async fn faulting_heuristic_yields_fallback() {
    let panicking = MockProvider::new(Reply::Panic);
    let classifier = classifier_with(vec![("m1", panicking)]).with_heuristic(Arc::new(FaultySource));
    let session = classifier.session();
    let r = classifier.classify(&rich_baroque(), &session).await;

    assert_eq!(r.strategy, Strategy::Fallback);
    assert!(r.confidence <= 30);
    assert!(r.rationale.contains("fallback"));
    assert_well_formed(&r);
    assert_eq!(session.distribution().total(), 0);
}

#[tokio::test]
async fn panicking_model_yields_fallback() {
    let classifier = classifier_with(vec![("m1", MockProvider::new(Reply::Panic))]);
    let session = classifier.session();
    let r = classifier.classify(&rich_baroque(), &session).await;

    assert!(r.is_fallback());
    assert!(r.confidence <= 30);
    assert!(r.rationale.contains("provider adapter bug"));
    assert_well_formed(&r);
}

#[tokio::test]
async fn identical_inputs_give_identical_results() {
    let classifier = classifier_with(vec![
        ("m1", MockProvider::new(Reply::Text(MODEL_A))),
        ("m2", MockProvider::new(Reply::Text(MODEL_B))),
    ]);
    let first = classifier.classify(&rich_baroque(), &classifier.session()).await;
    let second = classifier.classify(&rich_baroque(), &classifier.session()).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn repeated_failures_demote_the_batch() {
    let down = MockProvider::new(Reply::Fail);
    let classifier = classifier_with(vec![("down", down.clone())]);
    let subjects: Vec<Subject> = (0..6).map(|_| rich_baroque()).collect();
    let report = classifier
        .classify_batch(&subjects, BatchOptions::default().concurrency(1))
        .await;

    assert_eq!(down.calls(), 3);
    assert_eq!(report.disabled_sources, ["down"]);
    assert_eq!(report.stats.fallback_count, 0);
    for r in &report.results {
        assert_eq!(r.strategy, Strategy::PureInference);
        assert_eq!(r.scores, Category::Baroque.profile().scores);
    }
}

#[tokio::test]
async fn moderate_subject_refines_uncertain_axes() {
    // romantic: (-30, 40, -80, -40); no axis under 30, so no refinement call
    let m = MockProvider::new(Reply::Text(MODEL_A));
    let classifier = classifier_with(vec![("m1", m.clone())]);
    let subject = Subject::new("Caspar David Friedrich")
        .with_movement("Romanticism")
        .with_nationality("German")
        .with_era("19th century")
        .with_birth_year(1774);
    let r = classifier.classify(&subject, &classifier.session()).await;
    assert_eq!(r.tier, Some(RichnessTier::Moderate));
    assert_eq!(r.strategy, Strategy::HybridAnalysis);
    assert_eq!(m.calls(), 0);
    assert_eq!(r.scores, Category::Romantic.profile().scores);

    // contemporary: (0, -40, -20, -30); L/S and E/M are refined
    let subject = Subject::new("Living Painter")
        .with_movement("Contemporary")
        .with_nationality("British")
        .with_era("21st century")
        .with_birth_year(1970);
    let r = classifier.classify(&subject, &classifier.session()).await;
    assert_eq!(r.strategy, Strategy::HybridAnalysis);
    assert_eq!(m.calls(), 1);
    approx(
        r.scores.as_array(),
        [0.4 * 10.0, -40.0, 0.6 * -20.0 + 0.4 * -50.0, -30.0],
    );
    assert_well_formed(&r);
}

#[tokio::test]
async fn limited_subject_gets_validation_nudge() {
    let approve = MockProvider::new(Reply::Text("Verdict: APPROPRIATE"));
    let classifier = classifier_with(vec![("m1", approve)]);
    let subject = Subject::new("Jean-Honoré Fragonard").with_movement("Rococo").with_birth_year(1732);
    let r = classifier.classify(&subject, &classifier.session()).await;

    assert_eq!(r.tier, Some(RichnessTier::Limited));
    assert_eq!(r.strategy, Strategy::AssistedInference);
    assert_eq!(r.scores, Category::Rococo.profile().scores);
    // 50 + 5 (richness 25) + 7.5 (three decisive axes) + 10 = 72.5
    assert_eq!(r.confidence, 73);
    assert!(r.rationale.contains("validation: appropriate"));
}

#[tokio::test]
async fn result_serializes_with_snake_case_fields() {
    let classifier = Classifier::new(ClassifierConfig::default());
    let r = classifier
        .classify(&Subject::new("Claude Monet").with_movement("Impressionism"), &classifier.session())
        .await;
    let json = serde_json::to_value(&r).unwrap();
    assert_eq!(json["type_code"], "LREF");
    assert_eq!(json["strategy"], "pure_inference");
    assert_eq!(json["scores"]["L_S"], -20.0);
    assert_eq!(json["adjusted"], false);

    let back: ClassificationResult = serde_json::from_value(json).unwrap();
    assert_eq!(back, r);
}
