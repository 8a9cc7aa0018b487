use async_trait::async_trait;
use rankscope_core::{AnalysisOptions, AnalysisRequest, Category, Device, SourceKind, Subject};
use rankscope_engine::{
    aggregate, AnalysisEngine, EngineConfig, FailureReason, OrchestrationError, RunState,
    SelectorWarning,
};
use rankscope_sources::{
    AuditPayload, CategoryScore, ContentPayload, ContentProvider, Heading,
    LanguageScoringProvider, NarrativePayload, PayloadMeta, PerformanceAuditProvider,
    ScorePayload, SearchEntry, SearchPayload, SearchProvider, SourceError,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const TARGET: &str = "https://example.com";

/// Per-URL scripted behavior shared by the mock providers.
#[derive(Default)]
struct Script {
    failures: HashMap<String, SourceError>,
    /// URLs whose calls never finish on their own
    hanging: Vec<String>,
}

impl Script {
    async fn check(&self, url: &str) -> rankscope_sources::Result<()> {
        if self.hanging.iter().any(|h| h == url) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        match self.failures.get(url) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

struct MockAudit {
    script: Script,
    calls: AtomicU32,
    /// Time each audit takes
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl PerformanceAuditProvider for MockAudit {
    async fn audit(&self, url: &str, device: Device) -> rankscope_sources::Result<AuditPayload> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.script.check(url).await?;
        let base = match device {
            Device::Mobile => 0.62,
            Device::Desktop => 0.91,
        };
        let categories = Category::AUDIT
            .into_iter()
            .map(|c| (c, CategoryScore::new(base)))
            .collect();
        Ok(AuditPayload {
            url: url.to_string(),
            device,
            categories,
            meta: PayloadMeta::new("mock-audit"),
        })
    }

    fn source_id(&self) -> &str {
        "mock-audit"
    }
}

struct MockSearch {
    urls: Vec<&'static str>,
    failure: Option<SourceError>,
    /// Never answer on its own
    hanging: bool,
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, keyword: &str) -> rankscope_sources::Result<SearchPayload> {
        if self.hanging {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(SearchPayload {
            keyword: keyword.to_string(),
            entries: self
                .urls
                .iter()
                .zip(1..)
                .map(|(url, rank)| SearchEntry {
                    url: (*url).to_string(),
                    rank,
                    title: Some(format!("Result {rank}")),
                    snippet: String::new(),
                })
                .collect(),
            meta: PayloadMeta::new("mock-search"),
        })
    }

    fn source_id(&self) -> &str {
        "mock-search"
    }
}

struct MockContent {
    script: Script,
}

#[async_trait]
impl ContentProvider for MockContent {
    async fn fetch(&self, url: &str) -> rankscope_sources::Result<ContentPayload> {
        self.script.check(url).await?;
        Ok(ContentPayload {
            url: url.to_string(),
            title: Some("Running shoes".to_string()),
            meta_description: None,
            headings: vec![Heading {
                level: 1,
                text: "Best running shoes".to_string(),
            }],
            text: "Our pick of running shoes for every runner.".to_string(),
            meta: PayloadMeta::new("mock-content"),
        })
    }

    fn source_id(&self) -> &str {
        "mock-content"
    }
}

/// Fixed rubric scores; narratives echo the pages they are about.
struct MockScorer {
    narratives: bool,
    /// Competitor URLs whose comparison fails
    failing_comparisons: Vec<String>,
}

#[async_trait]
impl LanguageScoringProvider for MockScorer {
    async fn score(
        &self,
        content: &ContentPayload,
        keyword: &str,
    ) -> rankscope_sources::Result<ScorePayload> {
        let dimensions: BTreeMap<String, f64> = [
            ("keyword_density", 80.0),
            ("heading_structure", 60.0),
            ("meta_tags", 90.0),
            ("readability", 70.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Ok(ScorePayload {
            url: content.url.clone(),
            keyword: keyword.to_string(),
            dimensions,
            recommendations: vec!["Add a meta description".to_string()],
            summary: Some("Solid page".to_string()),
            meta: PayloadMeta::new("mock-llm"),
        })
    }

    fn source_id(&self) -> &str {
        "mock-llm"
    }

    fn writes_narratives(&self) -> bool {
        self.narratives
    }

    async fn compare(
        &self,
        target: &ContentPayload,
        competitor: &ContentPayload,
        keyword: &str,
    ) -> rankscope_sources::Result<NarrativePayload> {
        if self.failing_comparisons.contains(&competitor.url) {
            return Err(SourceError::malformed("comparison reply was empty"));
        }
        Ok(NarrativePayload {
            url: target.url.clone(),
            competitor_url: Some(competitor.url.clone()),
            keyword: keyword.to_string(),
            text: format!("{} versus {}", target.url, competitor.url),
            meta: PayloadMeta::new("mock-llm"),
        })
    }

    async fn report(
        &self,
        content: &ContentPayload,
        audits: &[AuditPayload],
        keyword: &str,
    ) -> rankscope_sources::Result<NarrativePayload> {
        Ok(NarrativePayload {
            url: content.url.clone(),
            competitor_url: None,
            keyword: keyword.to_string(),
            text: format!("Report on {} from {} audits", content.url, audits.len()),
            meta: PayloadMeta::new("mock-llm"),
        })
    }
}

struct Fixture {
    audit: Script,
    audit_delay: Duration,
    content: Script,
    search: MockSearch,
    scorer: MockScorer,
}

impl Fixture {
    fn healthy() -> Self {
        Self {
            audit: Script::default(),
            audit_delay: Duration::ZERO,
            content: Script::default(),
            search: MockSearch {
                urls: vec![
                    "https://example.com/",
                    "https://runfast.com/shoes",
                    "https://shoezone.net/running",
                    "https://trackgear.org/",
                ],
                failure: None,
                hanging: false,
            },
            scorer: MockScorer {
                narratives: false,
                failing_comparisons: vec![],
            },
        }
    }

    fn build(self) -> (AnalysisEngine, Arc<MockAudit>) {
        let audit = Arc::new(MockAudit {
            script: self.audit,
            calls: AtomicU32::new(0),
            delay: self.audit_delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let mut config = EngineConfig::default();
        config.governor.jitter = false;
        config.governor.base_delay_ms = 10;
        let engine = AnalysisEngine::new(
            audit.clone(),
            Arc::new(self.search),
            Arc::new(MockContent {
                script: self.content,
            }),
            Arc::new(self.scorer),
            config,
        );
        (engine, audit)
    }
}

fn request(competitors: usize) -> AnalysisRequest {
    AnalysisRequest::new(
        TARGET,
        "running shoes",
        AnalysisOptions::default().with_competitor_count(competitors),
    )
    .unwrap()
}

#[tokio::test]
async fn test_healthy_run_completes() {
    let (engine, _) = Fixture::healthy().build();

    let report = engine
        .run(&request(2), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert!(report.partial_failures.is_empty());
    assert!(report.warnings.is_empty());

    let entities: Vec<(Subject, &str, Option<u32>)> = report
        .entity_reports
        .iter()
        .map(|e| (e.subject, e.url.as_str(), e.rank))
        .collect();
    assert_eq!(
        entities,
        vec![
            (Subject::Target, TARGET, None),
            (Subject::Competitor, "https://runfast.com/shoes", Some(2)),
            (Subject::Competitor, "https://shoezone.net/running", Some(3)),
        ]
    );

    let target = report.target().unwrap();
    // Four audit categories on two devices plus content
    assert_eq!(target.metrics.len(), 9);
    assert_eq!(
        target
            .metric(Category::Performance, Some(Device::Mobile))
            .unwrap()
            .score,
        62.0
    );
    assert_eq!(target.metric(Category::Content, None).unwrap().score, 74.5);
    assert_eq!(target.content_findings, vec!["Add a meta description"]);

    assert_eq!(report.comparative_summary.deltas.len(), 2);
    assert_eq!(report.comparative_summary.radar.len(), 6);
}

#[tokio::test]
async fn test_summary_matches_reaggregation() {
    let (engine, _) = Fixture::healthy().build();
    let request = request(3);

    let report = engine
        .run(&request, CancellationToken::new())
        .await
        .unwrap();
    let again = aggregate(&report.entity_reports, &request.options().devices);

    assert_eq!(
        serde_json::to_string(&report.comparative_summary).unwrap(),
        serde_json::to_string(&again).unwrap()
    );
}

#[tokio::test]
async fn test_target_audit_auth_failure_is_partial() {
    let mut fixture = Fixture::healthy();
    fixture
        .audit
        .failures
        .insert(TARGET.to_string(), SourceError::auth("invalid API key"));
    let (engine, _) = fixture.build();

    let report = engine
        .run(&request(2), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.state, RunState::PartiallyCompleted);
    let target = report.target().unwrap();
    assert!(!target.has_performance_metric());
    assert!(target.has_content_metric());

    assert_eq!(report.partial_failures.len(), 1);
    let failure = &report.partial_failures[0];
    assert_eq!(failure.url, TARGET);
    assert_eq!(failure.source, SourceKind::PerformanceAudit);
    assert_eq!(failure.reason, FailureReason::AuthFailure);

    // Deltas never invent values for the missing side
    assert!(report.comparative_summary.deltas.iter().all(|d| d
        .deltas
        .keys()
        .all(|k| k.category == Category::Content)));
}

#[tokio::test]
async fn test_target_without_data_is_fatal() {
    let mut fixture = Fixture::healthy();
    fixture
        .audit
        .failures
        .insert(TARGET.to_string(), SourceError::auth("invalid API key"));
    fixture.content.failures.insert(
        TARGET.to_string(),
        SourceError::UpstreamError {
            status: Some(404),
            detail: "not found".to_string(),
        },
    );
    let (engine, _) = fixture.build();

    let err = engine
        .run(&request(2), CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        OrchestrationError::FatalDataUnavailable { url, failures } => {
            assert_eq!(url, TARGET);
            assert!(failures
                .iter()
                .any(|f| f.source == SourceKind::PageContent));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_search_failure_means_no_competitors() {
    let mut fixture = Fixture::healthy();
    fixture.search.failure = Some(SourceError::auth("zone disabled"));
    let (engine, _) = fixture.build();

    let report = engine
        .run(&request(3), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.state, RunState::PartiallyCompleted);
    assert_eq!(report.entity_reports.len(), 1);
    assert!(report.warnings.is_empty());
    assert_eq!(report.partial_failures[0].source, SourceKind::SearchResults);
}

#[tokio::test]
async fn test_insufficient_competitors_warns() {
    let mut fixture = Fixture::healthy();
    fixture.search.urls = vec!["https://example.com/", "https://runfast.com/"];
    let (engine, _) = fixture.build();

    let report = engine
        .run(&request(3), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.entity_reports.len(), 2);
    assert_eq!(
        report.warnings,
        vec![SelectorWarning::InsufficientCompetitors {
            requested: 3,
            found: 1
        }]
    );
}

#[tokio::test]
async fn test_cancelled_before_primary() {
    let (engine, audit) = Fixture::healthy().build();
    let token = CancellationToken::new();
    token.cancel();

    let err = engine.run(&request(2), token).await.unwrap_err();

    assert!(matches!(
        err,
        OrchestrationError::Cancelled {
            stage: RunState::FetchingPrimary
        }
    ));
    assert_eq!(audit.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_run_timeout_abandons_competitor_calls() {
    let mut fixture = Fixture::healthy();
    fixture
        .audit
        .hanging
        .push("https://runfast.com/shoes".to_string());
    let (engine, _) = fixture.build();
    let request = AnalysisRequest::new(
        TARGET,
        "running shoes",
        AnalysisOptions::default()
            .with_competitor_count(2)
            .with_run_timeout(Duration::from_secs(30)),
    )
    .unwrap();

    let report = engine
        .run(&request, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.state, RunState::PartiallyCompleted);
    assert_eq!(report.entity_reports.len(), 3);
    let cancelled: Vec<_> = report
        .partial_failures
        .iter()
        .filter(|f| f.reason == FailureReason::Cancelled)
        .collect();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].url, "https://runfast.com/shoes");
    assert_eq!(cancelled[0].source, SourceKind::PerformanceAudit);

    // The other competitor is untouched
    assert!(report.entity_reports[2].has_performance_metric());
}

#[tokio::test]
async fn test_second_run_served_from_cache() {
    let (engine, audit) = Fixture::healthy().build();

    engine
        .run(&request(1), CancellationToken::new())
        .await
        .unwrap();
    let after_first = audit.calls.load(Ordering::SeqCst);
    engine
        .run(&request(1), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(after_first, 4);
    assert_eq!(audit.calls.load(Ordering::SeqCst), after_first);
}

#[tokio::test]
async fn test_report_exports() {
    let (engine, _) = Fixture::healthy().build();

    let report = engine
        .run(&request(1), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.to_rows().len(), 18);
    let csv = report.to_csv();
    let header = csv.lines().next().unwrap();
    assert_eq!(
        header,
        "url,subject,category,device,score,heading_structure,keyword_density,meta_tags,readability"
    );

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["state"], "Completed");
    assert_eq!(
        json["entity_reports"][0]["metrics"]["performance:mobile"]["score"],
        62.0
    );
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_runs_share_provider_ceiling() {
    let mut fixture = Fixture::healthy();
    fixture.audit_delay = Duration::from_millis(100);
    let (engine, audit) = fixture.build();
    let ceiling = engine.config().governor.max_concurrent_per_provider;
    let request = AnalysisRequest::new(
        TARGET,
        "running shoes",
        AnalysisOptions::default()
            .with_competitor_count(3)
            .with_cache_window(Duration::ZERO),
    )
    .unwrap();

    let (first, second) = tokio::join!(
        engine.run(&request, CancellationToken::new()),
        engine.run(&request, CancellationToken::new())
    );

    assert_eq!(first.unwrap().state, RunState::Completed);
    assert_eq!(second.unwrap().state, RunState::Completed);
    // Two runs of four pages on two devices each
    assert_eq!(audit.calls.load(Ordering::SeqCst), 16);
    assert_eq!(audit.peak.load(Ordering::SeqCst), ceiling);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_search_keeps_measured_target() {
    let mut fixture = Fixture::healthy();
    fixture.search.hanging = true;
    let (engine, _) = fixture.build();
    let request = AnalysisRequest::new(
        TARGET,
        "running shoes",
        AnalysisOptions::default()
            .with_competitor_count(2)
            .with_run_timeout(Duration::from_secs(30)),
    )
    .unwrap();

    let report = engine
        .run(&request, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.state, RunState::PartiallyCompleted);
    assert_eq!(report.entity_reports.len(), 1);
    let target = report.target().unwrap();
    assert_eq!(target.metrics.len(), 9);

    assert_eq!(report.partial_failures.len(), 1);
    let failure = &report.partial_failures[0];
    assert_eq!(failure.url, TARGET);
    assert_eq!(failure.source, SourceKind::SearchResults);
    assert_eq!(failure.reason, FailureReason::Cancelled);
}

#[tokio::test]
async fn test_narratives_attached_to_report() {
    let mut fixture = Fixture::healthy();
    fixture.scorer.narratives = true;
    let (engine, _) = fixture.build();

    let report = engine
        .run(&request(2), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Completed);
    let target = report.target().unwrap();
    assert_eq!(
        target.narrative.as_deref(),
        Some("Report on https://example.com from 2 audits")
    );

    let comparisons: Vec<Option<&str>> = report
        .comparative_summary
        .deltas
        .iter()
        .map(|d| d.comparison.as_deref())
        .collect();
    assert_eq!(
        comparisons,
        vec![
            Some("https://example.com versus https://runfast.com/shoes"),
            Some("https://example.com versus https://shoezone.net/running"),
        ]
    );

    // Narratives never become metrics
    assert_eq!(target.metrics.len(), 9);
}

#[tokio::test]
async fn test_failed_comparison_is_partial() {
    let mut fixture = Fixture::healthy();
    fixture.scorer.narratives = true;
    fixture
        .scorer
        .failing_comparisons
        .push("https://runfast.com/shoes".to_string());
    let (engine, _) = fixture.build();

    let report = engine
        .run(&request(2), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.state, RunState::PartiallyCompleted);
    assert_eq!(report.partial_failures.len(), 1);
    let failure = &report.partial_failures[0];
    assert_eq!(failure.url, "https://runfast.com/shoes");
    assert_eq!(failure.source, SourceKind::LanguageScore);
    assert_eq!(failure.reason, FailureReason::MalformedResponse);

    let runfast = &report.entity_reports[1];
    assert!(runfast.narrative.is_none());
    assert!(runfast.has_content_metric());
    assert!(report.entity_reports[2].narrative.is_some());
}

#[tokio::test]
async fn test_narratives_can_be_turned_off() {
    let mut fixture = Fixture::healthy();
    fixture.scorer.narratives = true;
    let (engine, _) = fixture.build();
    let request = AnalysisRequest::new(
        TARGET,
        "running shoes",
        AnalysisOptions::default()
            .with_competitor_count(1)
            .with_narratives(false),
    )
    .unwrap();

    let report = engine
        .run(&request, CancellationToken::new())
        .await
        .unwrap();

    assert!(report.entity_reports.iter().all(|e| e.narrative.is_none()));
    assert!(report.comparative_summary.deltas[0].comparison.is_none());
}
