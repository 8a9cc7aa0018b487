//! Analysis orchestrator.
//!
//! This module provides the `AnalysisEngine`, which drives one analysis run
//! through its stages: fetching the target's data and the search results,
//! selecting competitors, fetching their data (along with the model-written
//! report and comparisons), normalizing every payload and aggregating the
//! comparative summary. Source failures are recorded in the
//! report; only a target without any usable metric or a cancellation before
//! the target's own data arrived fail the run.

use crate::aggregator::aggregate;
use crate::error::{OrchestrationError, Result};
use crate::normalizer::MetricNormalizer;
use crate::report::{AnalysisReport, EntityReport, FailureReason, PartialFailure, RunState};
use crate::selector::CompetitorSelector;
use chrono::Utc;
use futures::future::{join, join_all};
use rankscope_core::{
    AnalysisRequest, AppConfig, Device, GovernorConfig, ScoringConfig, SelectorConfig, SourceKind,
    Subject,
};
use rankscope_sources::{
    AuditAdapter, AuditPayload, ContentAdapter, ContentPayload, ContentProvider, Governor,
    LanguageScoringProvider, PayloadCache, PerformanceAuditProvider, ProviderPermits,
    ScoreAdapter, SearchAdapter, SearchProvider, SourceAdapter, SourceError, SourcePayload,
    SourceRequest,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Outcome of one source call, tagged with the source that produced it.
type Fetched = (SourceKind, rankscope_sources::Result<SourcePayload>);

/// Engine-wide settings, fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Retry, timeout and concurrency policy for source calls
    pub governor: GovernorConfig,
    /// Search result filtering
    pub selector: SelectorConfig,
    /// Content rubric weights
    pub scoring: ScoringConfig,
}

impl EngineConfig {
    /// Engine settings from the application configuration.
    #[must_use]
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            governor: config.governor.clone(),
            selector: config.selector.clone(),
            scoring: config.scoring.clone(),
        }
    }
}

/// Runs SEO analyses against the four external sources.
pub struct AnalysisEngine {
    audit: AuditAdapter,
    search: SearchAdapter,
    content: ContentAdapter,
    score: ScoreAdapter,
    config: EngineConfig,
    selector: CompetitorSelector,
    normalizer: MetricNormalizer,
    /// Concurrency ceiling per source, shared by every run
    permits: Arc<ProviderPermits>,
    /// Payload caches shared across runs, one per cache window
    caches: Mutex<BTreeMap<Duration, Arc<PayloadCache>>>,
}

impl AnalysisEngine {
    /// Create a new engine over the given providers.
    #[must_use]
    pub fn new(
        audit: Arc<dyn PerformanceAuditProvider>,
        search: Arc<dyn SearchProvider>,
        content: Arc<dyn ContentProvider>,
        score: Arc<dyn LanguageScoringProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            audit: AuditAdapter::new(audit),
            search: SearchAdapter::new(search),
            content: ContentAdapter::new(content),
            score: ScoreAdapter::new(score),
            selector: CompetitorSelector::new(&config.selector),
            normalizer: MetricNormalizer::new(&config.scoring),
            permits: Arc::new(ProviderPermits::new(
                config.governor.max_concurrent_per_provider,
            )),
            config,
            caches: Mutex::new(BTreeMap::new()),
        }
    }

    /// Active engine settings.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one analysis.
    ///
    /// Cancelling `cancel` (or reaching the request's run timeout) abandons
    /// in-flight calls. If any of the target's own fetches was abandoned this
    /// fails the run with [`OrchestrationError::Cancelled`]; every other
    /// abandoned call, including the search, is reported as a partial failure.
    ///
    /// # Returns
    /// A report in state `Completed` or `PartiallyCompleted`
    pub async fn run(
        &self,
        request: &AnalysisRequest,
        cancel: CancellationToken,
    ) -> Result<AnalysisReport> {
        let options = request.options();
        let started_at = Utc::now();
        let mut tracker = StateTracker::new(Uuid::new_v4());

        tracing::info!(
            run_id = %tracker.run_id,
            url = request.url(),
            keyword = request.keyword(),
            competitors = options.competitor_count,
            "Starting analysis"
        );

        // Cancelled when the run returns, which also stops the timeout task
        let cancel = cancel.child_token();
        let _run_guard = cancel.clone().drop_guard();
        if let Some(timeout) = options.run_timeout {
            let token = cancel.clone();
            let run_id = tracker.run_id;
            tokio::spawn(async move {
                tokio::select! {
                    () = token.cancelled() => {}
                    () = tokio::time::sleep(timeout) => {
                        tracing::warn!(%run_id, "Run timeout of {:?} reached, cancelling", timeout);
                        token.cancel();
                    }
                }
            });
        }

        let mut governor = Governor::new(&self.config.governor, options.max_retries)
            .with_permits(self.permits.clone());
        if let Some(cache) = self.cache_for(options.cache_window) {
            governor = governor.with_cache(cache);
        }
        let run = RunContext {
            engine: self,
            governor,
            cancel,
            keyword: request.keyword().to_string(),
            devices: options.devices.iter().copied().collect(),
            narratives: options.narratives && self.score.writes_narratives(),
        };

        // Primary stage: target audits, target content and the search at once
        tracker.advance(RunState::FetchingPrimary);
        let (target_results, search_result) =
            join(run.fetch_page(request.url()), run.search()).await;

        // A cancelled search only costs the competitors
        let target_cancelled = target_results
            .iter()
            .any(|(_, r)| matches!(r, Err(SourceError::Cancelled)));
        if target_cancelled {
            tracker.advance(RunState::Failed);
            return Err(OrchestrationError::Cancelled {
                stage: RunState::FetchingPrimary,
            });
        }

        let mut failures = FailureLog::default();

        tracker.advance(RunState::SelectingCompetitors);
        let mut warnings = Vec::new();
        let candidates = match search_result {
            Ok(SourcePayload::SearchResults(results)) => {
                let selection =
                    self.selector
                        .select(&results, request.url(), options.competitor_count);
                warnings.extend(selection.warning);
                selection.candidates
            }
            Ok(other) => {
                failures.record_error(
                    request.url(),
                    SourceKind::SearchResults,
                    &SourceError::malformed(format!(
                        "expected search results, got {}",
                        other.kind()
                    )),
                );
                Vec::new()
            }
            Err(e) => {
                failures.record_error(request.url(), SourceKind::SearchResults, &e);
                Vec::new()
            }
        };
        tracing::debug!(
            run_id = %tracker.run_id,
            "Selected {} competitor(s): {:?}",
            candidates.len(),
            candidates.iter().map(|c| c.url.as_str()).collect::<Vec<_>>()
        );

        // The target's report is written while competitor data arrives;
        // each comparison needs both pages
        tracker.advance(RunState::FetchingCompetitorData);
        let target_page = page_content(&target_results);
        let (competitor_results, target_report) = join(
            join_all(candidates.iter().map(|c| run.fetch_page(&c.url))),
            run.report(target_page, audit_payloads(&target_results)),
        )
        .await;
        let comparisons = join_all(
            competitor_results
                .iter()
                .map(|results| run.compare(target_page, page_content(results))),
        )
        .await;

        tracker.advance(RunState::Normalizing);
        let mut target = EntityReport::new(Subject::Target, request.url(), None);
        self.absorb(
            &mut target,
            target_results.into_iter().chain(target_report),
            &mut failures,
        );

        let mut entities = vec![];
        let mut competitors = Vec::with_capacity(candidates.len());
        for ((candidate, results), comparison) in
            candidates.iter().zip(competitor_results).zip(comparisons)
        {
            let mut entity =
                EntityReport::new(Subject::Competitor, &candidate.url, Some(candidate.rank));
            self.absorb(
                &mut entity,
                results.into_iter().chain(comparison),
                &mut failures,
            );
            competitors.push(entity);
        }

        if !target.has_performance_metric() && !target.has_content_metric() {
            tracker.advance(RunState::Failed);
            tracing::error!(
                run_id = %tracker.run_id,
                url = request.url(),
                "No usable data for target"
            );
            return Err(OrchestrationError::FatalDataUnavailable {
                url: request.url().to_string(),
                failures: failures.into_vec(),
            });
        }

        tracker.advance(RunState::Aggregating);
        entities.push(target);
        entities.extend(competitors);
        let comparative_summary = aggregate(&entities, &options.devices);

        let partial_failures = failures.into_vec();
        let state = if partial_failures.is_empty() {
            RunState::Completed
        } else {
            RunState::PartiallyCompleted
        };
        tracker.advance(state);

        tracing::info!(
            run_id = %tracker.run_id,
            entities = entities.len(),
            failures = partial_failures.len(),
            "Analysis finished: {}",
            state
        );

        Ok(AnalysisReport {
            run_id: tracker.run_id,
            request: request.clone(),
            state,
            entity_reports: entities,
            comparative_summary,
            partial_failures,
            warnings,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Fold fetched payloads into `entity`, recording failures.
    fn absorb(
        &self,
        entity: &mut EntityReport,
        results: impl IntoIterator<Item = Fetched>,
        failures: &mut FailureLog,
    ) {
        for (kind, result) in results {
            let payload = match result {
                Ok(payload) => payload,
                Err(e) => {
                    failures.record_error(&entity.url, kind, &e);
                    continue;
                }
            };

            let normalized = self.normalizer.normalize(&payload);
            for metric in normalized.metrics {
                entity.insert_metric(metric);
            }
            for diagnostic in normalized.diagnostics {
                failures.record(
                    &entity.url,
                    diagnostic.source,
                    FailureReason::Normalization,
                    diagnostic.detail,
                );
            }

            match payload {
                SourcePayload::LanguageScore(score) => {
                    entity.content_findings = score.recommendations;
                    entity.content_summary = score.summary;
                }
                SourcePayload::Narrative(narrative) => entity.narrative = Some(narrative.text),
                _ => {}
            }
        }
    }

    fn cache_for(&self, window: Duration) -> Option<Arc<PayloadCache>> {
        if window.as_secs() == 0 {
            return None;
        }
        let mut caches = self.caches.lock().unwrap_or_else(PoisonError::into_inner);
        Some(
            caches
                .entry(window)
                .or_insert_with(|| Arc::new(PayloadCache::new(window)))
                .clone(),
        )
    }
}

/// Per-run state shared by every fetch of the run.
struct RunContext<'a> {
    engine: &'a AnalysisEngine,
    governor: Governor,
    cancel: CancellationToken,
    keyword: String,
    devices: Vec<Device>,
    /// Whether to request the SEO report and comparisons
    narratives: bool,
}

impl RunContext<'_> {
    async fn call(&self, adapter: &dyn SourceAdapter, request: SourceRequest) -> Fetched {
        let kind = request.kind();
        (kind, self.governor.call(adapter, &request, &self.cancel).await)
    }

    async fn search(&self) -> rankscope_sources::Result<SourcePayload> {
        let request = SourceRequest::Search {
            keyword: self.keyword.clone(),
        };
        self.call(&self.engine.search, request).await.1
    }

    /// Audits on every device plus the content and scoring chain for `url`.
    async fn fetch_page(&self, url: &str) -> Vec<Fetched> {
        let audits = join_all(self.devices.iter().map(|device| {
            self.call(
                &self.engine.audit,
                SourceRequest::Audit {
                    url: url.to_string(),
                    device: *device,
                },
            )
        }));
        let (mut results, content) = join(audits, self.content_chain(url)).await;
        results.extend(content);
        results
    }

    /// Fetch content, then score it. Scoring is skipped when the content
    /// could not be fetched.
    async fn content_chain(&self, url: &str) -> Vec<Fetched> {
        let content = self
            .call(
                &self.engine.content,
                SourceRequest::Content {
                    url: url.to_string(),
                },
            )
            .await;

        let request = match &content.1 {
            Ok(SourcePayload::PageContent(page)) => SourceRequest::Score {
                content: Box::new(page.clone()),
                keyword: self.keyword.clone(),
            },
            _ => return vec![content],
        };

        let score = self.call(&self.engine.score, request).await;
        vec![content, score]
    }

    /// SEO report over the target's content and audits.
    async fn report(
        &self,
        content: Option<&ContentPayload>,
        audits: Vec<AuditPayload>,
    ) -> Option<Fetched> {
        let content = content.filter(|_| self.narratives)?;
        let request = SourceRequest::Report {
            content: Box::new(content.clone()),
            audits,
            keyword: self.keyword.clone(),
        };
        Some(self.call(&self.engine.score, request).await)
    }

    /// Head-to-head analysis of the target against one competitor.
    async fn compare(
        &self,
        target: Option<&ContentPayload>,
        competitor: Option<&ContentPayload>,
    ) -> Option<Fetched> {
        let (target, competitor) = target.zip(competitor).filter(|_| self.narratives)?;
        let request = SourceRequest::Compare {
            target: Box::new(target.clone()),
            competitor: Box::new(competitor.clone()),
            keyword: self.keyword.clone(),
        };
        Some(self.call(&self.engine.score, request).await)
    }
}

fn page_content(results: &[Fetched]) -> Option<&ContentPayload> {
    results.iter().find_map(|(_, result)| match result {
        Ok(SourcePayload::PageContent(page)) => Some(page),
        _ => None,
    })
}

fn audit_payloads(results: &[Fetched]) -> Vec<AuditPayload> {
    results
        .iter()
        .filter_map(|(_, result)| match result {
            Ok(SourcePayload::PerformanceAudit(audit)) => Some(audit.clone()),
            _ => None,
        })
        .collect()
}

/// Forward-only run state with a log line per transition.
struct StateTracker {
    run_id: Uuid,
    state: RunState,
}

impl StateTracker {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            state: RunState::Initiated,
        }
    }

    fn advance(&mut self, next: RunState) {
        debug_assert!(next > self.state, "{} -> {}", self.state, next);
        tracing::info!(run_id = %self.run_id, "Run state {} -> {}", self.state, next);
        self.state = next;
    }
}

/// Partial failures keyed by (url, source, reason); the first detail wins.
#[derive(Default)]
struct FailureLog {
    entries: BTreeMap<(String, SourceKind, FailureReason), String>,
}

impl FailureLog {
    fn record(&mut self, url: &str, source: SourceKind, reason: FailureReason, detail: String) {
        self.entries
            .entry((url.to_string(), source, reason))
            .or_insert(detail);
    }

    fn record_error(&mut self, url: &str, source: SourceKind, error: &SourceError) {
        self.record(url, source, FailureReason::from(error), error.to_string());
    }

    fn into_vec(self) -> Vec<PartialFailure> {
        self.entries
            .into_iter()
            .map(|((url, source, reason), detail)| PartialFailure {
                url,
                source,
                reason,
                detail,
            })
            .collect()
    }
}
