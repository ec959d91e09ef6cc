//! # Recommendation Orchestrator
//!
//! This module coordinates one recommendation request:
//! 1. Validate the request into a [`Query`]
//! 2. Check the caller's rate limit (before any external call)
//! 3. Embed the query
//! 4. Rank the catalog with the level pre-filter
//! 5. Start streaming the explanation
//!
//! Each request moves through [`RequestState`]s and ends in `Done` or
//! `Failed(reason)`. An optional request deadline covers every step,
//! including the explanation stream.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use catalog::{Catalog, CatalogStats};
use model_client::{EmbeddingBackend, GenerationBackend, InferenceClient};
use pipeline::{CourseFilter, SimilarityRanker};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::{EngineConfig, QueryExpansion};
use crate::embedder::QueryEmbedder;
use crate::error::{EngineError, Result};
use crate::explainer::{CourseSummary, ExplanationGenerator, ExplanationStream, MatchSummary};
use crate::query::{Query, RecommendationRequest};
use crate::rate_limiter::{EvictorGuard, RateLimiter};

/// Lifecycle of a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    RateChecked,
    Embedded,
    Ranked,
    Explaining,
    Done,
    Failed(&'static str),
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestState::Received => write!(f, "received"),
            RequestState::RateChecked => write!(f, "rate_checked"),
            RequestState::Embedded => write!(f, "embedded"),
            RequestState::Ranked => write!(f, "ranked"),
            RequestState::Explaining => write!(f, "explaining"),
            RequestState::Done => write!(f, "done"),
            RequestState::Failed(reason) => write!(f, "failed({})", reason),
        }
    }
}

/// A started recommendation: ranked matches plus the explanation stream
pub struct Recommendation {
    pub request_id: Uuid,
    pub matches: Vec<MatchSummary>,
    pub stream: ExplanationStream,
}

/// Main orchestrator that coordinates the recommendation pipeline
#[derive(Clone)]
pub struct RecommendationOrchestrator {
    catalog: Arc<Catalog>,
    embedder: QueryEmbedder,
    ranker: Arc<SimilarityRanker>,
    rate_limiter: Arc<RateLimiter>,
    // Shared by clones; eviction stops when the last one is dropped
    _evictor: Option<Arc<EvictorGuard>>,
    explainer: Arc<ExplanationGenerator>,
    top_k: usize,
    max_query_chars: usize,
    request_timeout: Option<Duration>,
}

impl RecommendationOrchestrator {
    /// Assemble an orchestrator from a loaded catalog and backends.
    ///
    /// Fails with `Configuration` if the settings are invalid or the
    /// configured embedding dimension disagrees with the catalog.
    pub fn from_parts(
        catalog: Arc<Catalog>,
        embedding: Arc<dyn EmbeddingBackend>,
        generation: Arc<dyn GenerationBackend>,
        config: &EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        if let Some(dimension) = config.embedding_dimension {
            catalog.ensure_dimension(dimension)?;
        }

        let mut embedder = QueryEmbedder::new(embedding, catalog.dimension());
        if config.query_expansion == QueryExpansion::IdealCourse {
            embedder = embedder.with_ideal_course(generation.clone(), config.generator_model.clone());
        }

        let rate_limiter = Arc::new(
            RateLimiter::new(config.rate_limit_requests, config.rate_limit_window())
                .with_idle_eviction(config.rate_limit_idle_evict()),
        );
        let evictor = rate_limiter.start_eviction().map(Arc::new);

        Ok(Self {
            catalog,
            embedder,
            ranker: Arc::new(SimilarityRanker::new().with_min_score(config.min_similarity)),
            rate_limiter,
            _evictor: evictor,
            explainer: Arc::new(
                ExplanationGenerator::new(generation, config.recommender_model.clone())
                    .with_max_tokens(config.generation_max_tokens),
            ),
            top_k: config.top_k,
            max_query_chars: config.max_query_chars,
            request_timeout: config.request_timeout(),
        })
    }

    /// Load the catalog and connect to the inference service.
    ///
    /// # Arguments
    /// * `config` - Engine settings; `catalog_path` and `inference_addr` are used here
    pub async fn connect(config: &EngineConfig) -> anyhow::Result<Self> {
        let catalog = load_catalog(config).await?;
        let client = InferenceClient::connect(config.inference_addr.clone(), config.client_options())
            .await?;
        Self::with_client(catalog, client, config)
    }

    /// Like [`RecommendationOrchestrator::connect`], but the inference
    /// service is only contacted when a recommendation is requested.
    pub async fn connect_lazy(config: &EngineConfig) -> anyhow::Result<Self> {
        let catalog = load_catalog(config).await?;
        let client =
            InferenceClient::connect_lazy(config.inference_addr.clone(), config.client_options())?;
        Self::with_client(catalog, client, config)
    }

    fn with_client(
        catalog: Catalog,
        client: InferenceClient,
        config: &EngineConfig,
    ) -> anyhow::Result<Self> {
        let client = Arc::new(client);
        let orchestrator = Self::from_parts(Arc::new(catalog), client.clone(), client, config)?;
        info!(
            courses = orchestrator.catalog.len(),
            top_k = orchestrator.top_k,
            expansion = ?orchestrator.embedder.expansion(),
            inference = config.inference_addr.as_str(),
            "Recommendation engine ready"
        );
        Ok(orchestrator)
    }

    /// Main entry point: start a recommendation for `identity`.
    ///
    /// On success the matches are available immediately and the
    /// explanation streams through `Recommendation::stream`. Dropping the
    /// returned value (or this future) cancels any in-flight generation.
    pub async fn recommend(
        &self,
        identity: &str,
        request: &RecommendationRequest,
    ) -> Result<Recommendation> {
        let request_id = Uuid::new_v4();
        let query = Query::from_request(request, self.max_query_chars)
            .map_err(|e| self.fail(request_id, RequestState::Received, e))?;
        self.recommend_query(request_id, identity, query).await
    }

    #[instrument(skip(self, query))]
    async fn recommend_query(
        &self,
        request_id: Uuid,
        identity: &str,
        query: Query,
    ) -> Result<Recommendation> {
        let start_time = Instant::now();
        let deadline = self.request_timeout.map(|t| (start_time + t, t));
        let mut state = RequestState::Received;
        debug!(%request_id, identity, %state, levels = ?query.levels(), "Request received");

        // Rate check happens before any external call
        if !self.rate_limiter.allow(identity) {
            let retry_after = self
                .rate_limiter
                .retry_after(identity)
                .unwrap_or(self.rate_limiter.window());
            return Err(self.fail(request_id, state, EngineError::RateLimited { retry_after }));
        }
        state = RequestState::RateChecked;

        let vector = with_deadline(deadline, self.embedder.embed(&query))
            .await
            .map_err(|e| self.fail(request_id, state, e))?;
        state = RequestState::Embedded;
        let embed_time = start_time.elapsed();

        let matches: Vec<MatchSummary> = self
            .ranker
            .rank(&vector, &self.catalog, &query.course_filter(), self.top_k)
            .map_err(|e| self.fail(request_id, state, e.into()))?
            .iter()
            .map(MatchSummary::from)
            .collect();
        state = RequestState::Ranked;
        if matches.is_empty() {
            info!(%request_id, "No courses matched after filtering");
        }

        let stream = with_deadline(deadline, self.explainer.explain(&query, &matches))
            .await
            .map_err(|e| self.fail(request_id, state, e))?;
        state = RequestState::Explaining;

        let mut stream = stream.with_request_id(request_id);
        if let Some((at, timeout)) = deadline {
            stream = stream.with_deadline(at, timeout);
        }

        info!(
            %request_id,
            %state,
            matches = matches.len(),
            top_score = matches.first().map(|m| m.score),
            embed_ms = embed_time.as_millis() as u64,
            total_ms = start_time.elapsed().as_millis() as u64,
            "Recommendation started"
        );
        Ok(Recommendation {
            request_id,
            matches,
            stream,
        })
    }

    /// Nearest neighbours of an existing course, excluding the course itself
    #[instrument(skip(self))]
    pub fn similar_courses(&self, code: &str, limit: usize) -> Result<Vec<MatchSummary>> {
        let course = self
            .catalog
            .get(code)
            .ok_or_else(|| EngineError::UnknownCourse(code.to_string()))?;
        let filter = CourseFilter::default().excluding(code);

        Ok(self
            .ranker
            .rank(&course.embedding, &self.catalog, &filter, limit)?
            .iter()
            .map(MatchSummary::from)
            .collect())
    }

    /// Text search over codes, titles and descriptions
    pub fn search_courses(&self, text: &str, limit: usize) -> Vec<CourseSummary> {
        self.catalog
            .search_text(text, limit)
            .into_iter()
            .map(CourseSummary::from)
            .collect()
    }

    pub fn catalog_stats(&self) -> CatalogStats {
        self.catalog.stats()
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn ranker(&self) -> &SimilarityRanker {
        &self.ranker
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    fn fail(&self, request_id: Uuid, state: RequestState, error: EngineError) -> EngineError {
        let failed = RequestState::Failed(error.kind());
        warn!(%request_id, from = %state, state = %failed, "Request failed: {}", error);
        error
    }
}

async fn load_catalog(config: &EngineConfig) -> anyhow::Result<Catalog> {
    let path = config.catalog_path.clone();
    let catalog = tokio::task::spawn_blocking(move || Catalog::load_from_file(&path))
        .await
        .context("Catalog loading task panicked")?
        .with_context(|| format!("Failed to load course catalog {:?}", config.catalog_path))?;
    Ok(catalog)
}

/// Run `future`, mapping an elapsed deadline to `Timeout`
async fn with_deadline<T>(
    deadline: Option<(Instant, Duration)>,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    match deadline {
        Some((at, timeout)) => tokio::time::timeout_at(at, future)
            .await
            .map_err(|_| EngineError::Timeout(timeout))?,
        None => future.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explainer::StreamOutcome;
    use async_trait::async_trait;
    use catalog::Course;
    use model_client::{GenerationRequest, ModelClientError, TextStream};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    // ============================================================================
    // Test Fixtures
    // ============================================================================

    const ML_QUERY: &str = "I liked introductory machine learning, what's next?";

    /// Embedding axes: [machine learning, programming, history]
    fn build_test_catalog() -> Arc<Catalog> {
        let course = |code: &str, title: &str, level, embedding: Vec<f32>| Course {
            code: code.to_string(),
            title: title.to_string(),
            description: format!("{} description", title),
            level,
            department: None,
            embedding,
        };

        Arc::new(
            Catalog::from_courses(vec![
                course("HISTORY110", "Medieval Europe", 100, vec![0.0, 0.1, 1.0]),
                course("EECS353", "Applied Machine Learning", 300, vec![0.9, 0.4, 0.0]),
                course("EECS280", "Programming and Data Structures", 200, vec![0.2, 1.0, 0.0]),
            ])
            .expect("test catalog is valid"),
        )
    }

    /// Maps known queries to fixed vectors and counts calls
    struct FakeEmbedder {
        vectors: HashMap<String, Vec<f32>>,
        calls: AtomicUsize,
        delay: Option<Duration>,
        fail: bool,
    }

    impl FakeEmbedder {
        fn new() -> Self {
            let mut vectors = HashMap::new();
            vectors.insert(ML_QUERY.to_string(), vec![0.85, 0.5, 0.05]);
            vectors.insert("old kingdoms".to_string(), vec![0.0, 0.0, 1.0]);
            Self {
                vectors,
                calls: AtomicUsize::new(0),
                delay: None,
                fail: false,
            }
        }
    }

    #[async_trait]
    impl EmbeddingBackend for FakeEmbedder {
        async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ModelClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(ModelClientError::Embedding("service down".into()));
            }
            Ok(self
                .vectors
                .get(text)
                .cloned()
                .unwrap_or_else(|| vec![0.3, 0.3, 0.3]))
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Script {
        Complete,
        FailMidStream,
        Endless,
    }

    /// Streams a short write-up; counts calls and records cancellation
    struct FakeGenerator {
        script: Script,
        calls: AtomicUsize,
        cancelled: Arc<AtomicBool>,
    }

    impl FakeGenerator {
        fn new(script: Script) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
                cancelled: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    #[async_trait]
    impl GenerationBackend for FakeGenerator {
        async fn generate(
            &self,
            _request: GenerationRequest,
        ) -> std::result::Result<TextStream, ModelClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (sender, stream) = TextStream::channel(2);
            let script = self.script;
            let cancelled = self.cancelled.clone();

            tokio::spawn(async move {
                match script {
                    Script::Complete => {
                        for chunk in ["1. **EECS353: Applied Machine Learning**\n", "Rationale: next step.\n"] {
                            sender.send_chunk(chunk).await;
                        }
                    }
                    Script::FailMidStream => {
                        sender.send_chunk("1. **EECS353").await;
                        sender
                            .fail(ModelClientError::Generation("stream reset".into()))
                            .await;
                    }
                    Script::Endless => loop {
                        tokio::select! {
                            _ = sender.closed() => {
                                cancelled.store(true, Ordering::SeqCst);
                                return;
                            }
                            _ = tokio::time::sleep(Duration::from_millis(10)) => {
                                let _ = sender.send_chunk("more ").await;
                            }
                        }
                    },
                }
            });
            Ok(stream)
        }
    }

    fn build_orchestrator(
        embedder: Arc<FakeEmbedder>,
        generator: Arc<FakeGenerator>,
        config: EngineConfig,
    ) -> RecommendationOrchestrator {
        RecommendationOrchestrator::from_parts(build_test_catalog(), embedder, generator, &config)
            .expect("Failed to create orchestrator")
    }

    fn request(query: &str, levels: Option<Vec<i64>>) -> RecommendationRequest {
        RecommendationRequest {
            query: query.to_string(),
            levels,
        }
    }

    // ============================================================================
    // End-to-end scenarios
    // ============================================================================

    #[tokio::test]
    async fn test_ml_query_ranks_ml_course_first() {
        let embedder = Arc::new(FakeEmbedder::new());
        let generator = Arc::new(FakeGenerator::new(Script::Complete));
        let orchestrator =
            build_orchestrator(embedder.clone(), generator.clone(), EngineConfig::default());

        let recommendation = orchestrator
            .recommend("student-1", &request(ML_QUERY, None))
            .await
            .expect("recommend failed");

        assert_eq!(recommendation.matches[0].course.code, "EECS353");
        assert_eq!(recommendation.matches[0].course.level, 300);
        assert_eq!(recommendation.matches.len(), 3);

        let mut stream = recommendation.stream;
        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next().await {
            chunks.push(chunk.expect("chunk failed"));
        }
        assert_eq!(chunks.len(), 2);
        assert!(chunks.concat().contains("EECS353"));
        assert_eq!(stream.outcome(), StreamOutcome::Complete);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_level_without_courses_yields_no_matches_explanation() {
        let embedder = Arc::new(FakeEmbedder::new());
        let generator = Arc::new(FakeGenerator::new(Script::Complete));
        let orchestrator =
            build_orchestrator(embedder.clone(), generator.clone(), EngineConfig::default());

        let recommendation = orchestrator
            .recommend("student-1", &request(ML_QUERY, Some(vec![500])))
            .await
            .expect("empty result is not an error");

        assert!(recommendation.matches.is_empty());
        let text = recommendation.stream.collect_text().await.unwrap();
        assert!(text.contains("No suitable courses found"));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_eleventh_request_is_rate_limited_without_embedding() {
        let embedder = Arc::new(FakeEmbedder::new());
        let generator = Arc::new(FakeGenerator::new(Script::Complete));
        let config = EngineConfig {
            rate_limit_requests: 10,
            rate_limit_window_secs: 60,
            ..EngineConfig::default()
        };
        let orchestrator = build_orchestrator(embedder.clone(), generator, config);

        for i in 0..10 {
            assert!(
                orchestrator
                    .recommend("student-1", &request(ML_QUERY, None))
                    .await
                    .is_ok(),
                "request {} should be admitted",
                i + 1
            );
        }

        let err = orchestrator
            .recommend("student-1", &request(ML_QUERY, None))
            .await
            .err()
            .expect("11th request should fail");
        assert!(matches!(err, EngineError::RateLimited { .. }));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 10);

        // Another identity is unaffected
        assert!(
            orchestrator
                .recommend("student-2", &request(ML_QUERY, None))
                .await
                .is_ok()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_identities_are_evicted() {
        let embedder = Arc::new(FakeEmbedder::new());
        let generator = Arc::new(FakeGenerator::new(Script::Complete));
        let config = EngineConfig {
            rate_limit_window_secs: 60,
            rate_limit_idle_evict_secs: 600,
            ..EngineConfig::default()
        };
        let orchestrator = build_orchestrator(embedder, generator, config);

        for identity in ["student-1", "student-2", "student-3"] {
            orchestrator
                .recommend(identity, &request(ML_QUERY, None))
                .await
                .unwrap();
        }
        assert_eq!(orchestrator.rate_limiter().tracked_identities(), 3);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(orchestrator.rate_limiter().tracked_identities(), 3);

        tokio::time::sleep(Duration::from_secs(400)).await;
        assert_eq!(orchestrator.rate_limiter().tracked_identities(), 0);

        // A clone keeps the evictor alive; dropping every handle stops it
        let limiter = orchestrator.rate_limiter().clone();
        let clone = orchestrator.clone();
        drop(orchestrator);
        clone.recommend("student-4", &request(ML_QUERY, None)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(700)).await;
        assert_eq!(limiter.tracked_identities(), 0);

        drop(clone);
        limiter.allow("student-5");
        tokio::time::sleep(Duration::from_secs(700)).await;
        assert_eq!(limiter.tracked_identities(), 1);
    }

    // ============================================================================
    // Failure paths
    // ============================================================================

    #[tokio::test]
    async fn test_invalid_query_makes_no_external_call() {
        let embedder = Arc::new(FakeEmbedder::new());
        let generator = Arc::new(FakeGenerator::new(Script::Complete));
        let config = EngineConfig {
            rate_limit_requests: 1,
            ..EngineConfig::default()
        };
        let orchestrator = build_orchestrator(embedder.clone(), generator, config);

        for bad in [request("   ", None), request("databases", Some(vec![250]))] {
            let err = orchestrator.recommend("student-1", &bad).await.err().unwrap();
            assert!(matches!(err, EngineError::InvalidQuery(_)));
        }
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        // Rejected queries do not consume the quota
        assert!(
            orchestrator
                .recommend("student-1", &request(ML_QUERY, None))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_embedding_failure_skips_generation() {
        let embedder = Arc::new(FakeEmbedder {
            fail: true,
            ..FakeEmbedder::new()
        });
        let generator = Arc::new(FakeGenerator::new(Script::Complete));
        let orchestrator =
            build_orchestrator(embedder, generator.clone(), EngineConfig::default());

        let err = orchestrator
            .recommend("student-1", &request(ML_QUERY, None))
            .await
            .err()
            .unwrap();

        assert!(matches!(err, EngineError::EmbeddingUnavailable(_)));
        assert!(err.is_retryable());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_is_signalled() {
        let embedder = Arc::new(FakeEmbedder::new());
        let generator = Arc::new(FakeGenerator::new(Script::FailMidStream));
        let orchestrator = build_orchestrator(embedder, generator, EngineConfig::default());

        let mut stream = orchestrator
            .recommend("student-1", &request(ML_QUERY, None))
            .await
            .unwrap()
            .stream;

        assert_eq!(stream.next().await.unwrap().unwrap(), "1. **EECS353");
        assert!(matches!(
            stream.next().await,
            Some(Err(EngineError::GenerationUnavailable(_)))
        ));
        assert!(stream.next().await.is_none());
        assert_eq!(stream.outcome(), StreamOutcome::Truncated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_embedding_hits_request_timeout() {
        let embedder = Arc::new(FakeEmbedder {
            delay: Some(Duration::from_secs(30)),
            ..FakeEmbedder::new()
        });
        let generator = Arc::new(FakeGenerator::new(Script::Complete));
        let config = EngineConfig {
            request_timeout_secs: Some(5),
            ..EngineConfig::default()
        };
        let orchestrator = build_orchestrator(embedder, generator.clone(), config);

        let err = orchestrator
            .recommend("student-1", &request(ML_QUERY, None))
            .await
            .err()
            .unwrap();

        assert_eq!(err, EngineError::Timeout(Duration::from_secs(5)));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_timeout_covers_streaming() {
        let embedder = Arc::new(FakeEmbedder::new());
        let generator = Arc::new(FakeGenerator::new(Script::Endless));
        let config = EngineConfig {
            request_timeout_secs: Some(2),
            ..EngineConfig::default()
        };
        let orchestrator = build_orchestrator(embedder, generator.clone(), config);

        let mut stream = orchestrator
            .recommend("student-1", &request(ML_QUERY, None))
            .await
            .unwrap()
            .stream;

        let mut failure = None;
        while let Some(chunk) = stream.next().await {
            if let Err(e) = chunk {
                failure = Some(e);
            }
        }
        assert_eq!(failure, Some(EngineError::Timeout(Duration::from_secs(2))));
        assert!(stream.chunks_emitted() > 0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(generator.cancelled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_dropping_stream_cancels_generation() {
        let embedder = Arc::new(FakeEmbedder::new());
        let generator = Arc::new(FakeGenerator::new(Script::Endless));
        let orchestrator =
            build_orchestrator(embedder, generator.clone(), EngineConfig::default());

        let mut recommendation = orchestrator
            .recommend("student-1", &request(ML_QUERY, None))
            .await
            .unwrap();
        assert!(recommendation.stream.next().await.unwrap().is_ok());
        drop(recommendation);

        let mut waited = Duration::ZERO;
        while !generator.cancelled.load(Ordering::SeqCst) && waited < Duration::from_secs(5) {
            tokio::time::sleep(Duration::from_millis(10)).await;
            waited += Duration::from_millis(10);
        }
        assert!(generator.cancelled.load(Ordering::SeqCst));
    }

    #[test]
    fn test_configured_dimension_must_match_catalog() {
        let config = EngineConfig {
            embedding_dimension: Some(1536),
            ..EngineConfig::default()
        };
        let result = RecommendationOrchestrator::from_parts(
            build_test_catalog(),
            Arc::new(FakeEmbedder::new()),
            Arc::new(FakeGenerator::new(Script::Complete)),
            &config,
        );

        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    // ============================================================================
    // Read-only operations
    // ============================================================================

    #[tokio::test]
    async fn test_similar_courses_excludes_source() {
        let orchestrator = build_orchestrator(
            Arc::new(FakeEmbedder::new()),
            Arc::new(FakeGenerator::new(Script::Complete)),
            EngineConfig::default(),
        );

        let similar = orchestrator.similar_courses("EECS353", 5).unwrap();
        assert_eq!(similar.len(), 2);
        assert_eq!(similar[0].course.code, "EECS280");
        assert!(similar.iter().all(|m| m.course.code != "EECS353"));

        assert!(matches!(
            orchestrator.similar_courses("NOPE101", 5),
            Err(EngineError::UnknownCourse(_))
        ));
    }

    #[tokio::test]
    async fn test_search_and_stats() {
        let orchestrator = build_orchestrator(
            Arc::new(FakeEmbedder::new()),
            Arc::new(FakeGenerator::new(Script::Complete)),
            EngineConfig::default(),
        );

        let found = orchestrator.search_courses("machine", 10);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, "EECS353");

        let stats = orchestrator.catalog_stats();
        assert_eq!(stats.total_courses, 3);
        assert_eq!(stats.embedding_dimension, 3);
    }

    #[tokio::test]
    async fn test_connect_lazy_loads_catalog_without_service() {
        let path = std::env::temp_dir().join(format!("engine_lazy_{}.jsonl", std::process::id()));
        std::fs::write(
            &path,
            "{\"code\": \"EECS445\", \"title\": \"Machine Learning\", \"level\": 400, \"embedding\": [1.0, 0.0]}\n\
             {\"code\": \"EECS545\", \"title\": \"Machine Learning\", \"level\": 500, \"embedding\": [0.9, 0.1]}\n",
        )
        .unwrap();
        let config = EngineConfig {
            catalog_path: path.clone(),
            inference_addr: "http://127.0.0.1:1".to_string(),
            ..EngineConfig::default()
        };

        let orchestrator = RecommendationOrchestrator::connect_lazy(&config)
            .await
            .expect("lazy connect should not contact the service");
        let similar = orchestrator.similar_courses("EECS445", 3).unwrap();
        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].course.code, "EECS545");

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_connect_fails_for_missing_catalog() {
        let config = EngineConfig {
            catalog_path: "/nonexistent/courses.jsonl".into(),
            ..EngineConfig::default()
        };
        assert!(RecommendationOrchestrator::connect_lazy(&config).await.is_err());
    }

    #[test]
    fn test_request_state_display() {
        assert_eq!(RequestState::RateChecked.to_string(), "rate_checked");
        assert_eq!(
            RequestState::Failed("rate_limited").to_string(),
            "failed(rate_limited)"
        );
    }
}
