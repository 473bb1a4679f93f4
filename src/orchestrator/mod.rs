//! Main orchestrator - runs one query through the agent pipeline
//!
//! INPUT → (TRANSCRIBE) → GATHER → ANALYZE → NARRATE → (SYNTHESIZE) → COMPLETE

use crate::agents::{AgentRegistry, AgentStatus};
use crate::config::OrchestratorConfig;
use crate::error::OrchestrationError;
use crate::models::{InputType, QueryRequest, ResponseEnvelope, ResponseType};
use crate::pipeline::{
    analysis, gather, narrative, voice, PipelineContext, PipelineSettings, RequestState,
};
use crate::symbols::{StaticSymbolResolver, SymbolResolver};
use crate::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

const DEFAULT_REQUEST_DEADLINE: Duration = Duration::from_secs(30);

/// Coordinates the agent set; shared read-only across requests
pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    symbols: Arc<dyn SymbolResolver>,
    settings: PipelineSettings,
    request_deadline: Duration,
}

impl Orchestrator {
    pub fn new(registry: Arc<AgentRegistry>, symbols: Arc<dyn SymbolResolver>) -> Self {
        Self {
            registry,
            symbols,
            settings: PipelineSettings::default(),
            request_deadline: DEFAULT_REQUEST_DEADLINE,
        }
    }

    pub fn from_config(registry: Arc<AgentRegistry>, config: &OrchestratorConfig) -> Self {
        Self {
            registry,
            symbols: Arc::new(StaticSymbolResolver::new(config.watchlist.clone())),
            settings: PipelineSettings::from(config),
            request_deadline: config.request_deadline,
        }
    }

    pub fn with_request_deadline(mut self, deadline: Duration) -> Self {
        self.request_deadline = deadline;
        self
    }

    /// Initialize all agents; true only if every agent came up
    pub async fn initialize(&self) -> bool {
        self.registry.initialize().await
    }

    /// Best-effort teardown of every agent
    pub async fn cleanup(&self) {
        self.registry.cleanup().await
    }

    pub fn is_ready(&self) -> bool {
        self.registry.is_ready()
    }

    pub fn agent_statuses(&self) -> Vec<AgentStatus> {
        self.registry.statuses()
    }

    /// Answer one query. Always returns an envelope; fatal conditions are
    /// reported through its `error` field.
    pub async fn process_query(&self, request: QueryRequest) -> ResponseEnvelope {
        self.process_query_with_cancellation(request, CancellationToken::new())
            .await
    }

    /// As `process_query`, abandoning all in-flight agent calls once
    /// `cancel` fires or the request deadline elapses.
    pub async fn process_query_with_cancellation(
        &self,
        request: QueryRequest,
        cancel: CancellationToken,
    ) -> ResponseEnvelope {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "query",
            %request_id,
            input_type = ?request.input_type,
            response_type = ?request.response_type,
        );

        async move {
            let start = Instant::now();
            let deadline_ms = self.request_deadline.as_millis() as u64;

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(OrchestrationError::Cancelled),
                result = tokio::time::timeout(self.request_deadline, self.run(request_id, request)) => {
                    result.unwrap_or(Err(OrchestrationError::DeadlineExceeded(deadline_ms)))
                }
            };

            let elapsed_ms = start.elapsed().as_millis() as u64;

            match outcome {
                Ok(envelope) => {
                    info!(
                        elapsed_ms,
                        confidence = envelope.confidence,
                        degraded = envelope.error.is_some(),
                        "Query processed"
                    );
                    envelope
                }
                Err(e) => {
                    if e.is_fatal() {
                        error!(elapsed_ms, error = %e, "Query processing failed");
                    } else {
                        warn!(elapsed_ms, error = %e, "Query aborted by agent error");
                    }
                    ResponseEnvelope::failure(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, request_id: Uuid, request: QueryRequest) -> Result<ResponseEnvelope> {
        if !self.registry.is_ready() {
            return Err(OrchestrationError::NotInitialized);
        }

        let mut ctx = PipelineContext::new(request_id, request.query.clone());

        // === TRANSCRIBE ===
        if request.input_type == InputType::Voice {
            ctx.advance(RequestState::Transcribing);
            match voice::normalize_input(&self.registry, &request).await {
                Ok(text) => ctx.query = text,
                Err(e) => {
                    ctx.advance(RequestState::Failed);
                    return Err(e);
                }
            }
        }

        // === GATHER ===
        ctx.advance(RequestState::Gathering);
        let symbols = self.symbols.resolve(&ctx.query);
        debug!(?symbols, "Symbols resolved");
        gather::gather(&self.registry, &symbols, self.settings, &mut ctx).await;

        // === ANALYZE ===
        ctx.advance(RequestState::Analyzing);
        analysis::analyze(&self.registry, &mut ctx).await;

        // === NARRATE ===
        ctx.advance(RequestState::Narrating);
        let mut envelope = narrative::narrate(&self.registry, &mut ctx).await;

        // === SYNTHESIZE ===
        if request.response_type == ResponseType::Voice {
            ctx.advance(RequestState::Synthesizing);
            let text = envelope.content.clone().unwrap_or_default();
            match voice::synthesize(&self.registry, &text).await {
                Ok(speech) => envelope = envelope.with_speech(speech),
                Err(e) => {
                    ctx.advance(RequestState::Failed);
                    return Err(e);
                }
            }
        }

        ctx.advance(RequestState::Completed);

        if !ctx.errors.is_empty() {
            info!(
                degraded = ctx.errors.len(),
                keys = ?ctx.errors.iter().map(|e| e.key).collect::<Vec<_>>(),
                "Completed with degraded inputs"
            );
        }
        debug!(trace = ?ctx.trace, "Pipeline trace");

        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentRole, Capability, MockAgent};
    use crate::models::NARRATIVE_FALLBACK_CONTENT;
    use serde_json::json;

    struct Agents {
        market: Arc<MockAgent>,
        scraper: Arc<MockAgent>,
        retriever: Arc<MockAgent>,
        analyzer: Arc<MockAgent>,
        narrator: Arc<MockAgent>,
        voice: Arc<MockAgent>,
    }

    impl Agents {
        fn defaults() -> Self {
            Self {
                market: Arc::new(MockAgent::new(AgentRole::MarketData)),
                scraper: Arc::new(MockAgent::new(AgentRole::Scraper)),
                retriever: Arc::new(MockAgent::new(AgentRole::Retriever)),
                analyzer: Arc::new(MockAgent::new(AgentRole::Analyzer)),
                narrator: Arc::new(MockAgent::new(AgentRole::Narrator)),
                voice: Arc::new(MockAgent::new(AgentRole::Voice)),
            }
        }

        fn registry(&self) -> AgentRegistry {
            let mut registry = AgentRegistry::new(Duration::from_secs(1));
            registry.register(self.market.clone());
            registry.register(self.scraper.clone());
            registry.register(self.retriever.clone());
            registry.register(self.analyzer.clone());
            registry.register(self.narrator.clone());
            registry.register(self.voice.clone());
            registry
        }

        fn orchestrator(&self) -> Orchestrator {
            let resolver = |_: &str| vec!["TSM".to_string()];
            Orchestrator::new(Arc::new(self.registry()), Arc::new(resolver))
        }

        async fn downstream_calls(&self) -> usize {
            self.market.calls().await.len()
                + self.scraper.calls().await.len()
                + self.retriever.calls().await.len()
                + self.analyzer.calls().await.len()
                + self.narrator.calls().await.len()
        }
    }

    async fn ready(agents: &Agents) -> Orchestrator {
        let orchestrator = agents.orchestrator();
        assert!(orchestrator.initialize().await);
        orchestrator
    }

    fn assert_well_formed(envelope: &ResponseEnvelope) {
        assert!(envelope.content.is_some());
        assert!((0.0..=1.0).contains(&envelope.confidence));
        assert!(chrono::DateTime::parse_from_rfc3339(&envelope.timestamp).is_ok());
    }

    #[tokio::test]
    async fn test_asia_tech_scenario() {
        let mut agents = Agents::defaults();
        agents.market = Arc::new(
            MockAgent::new(AgentRole::MarketData)
                .respond(Capability::FetchQuotes, json!({"TSM": {"price": 100}})),
        );
        agents.retriever = Arc::new(MockAgent::new(AgentRole::Retriever).respond(
            Capability::Search,
            json!({"results": [{"text": "TSMC capex update", "metadata": {}, "score": 0.8}]}),
        ));
        agents.analyzer = Arc::new(
            MockAgent::new(AgentRole::Analyzer)
                .respond(Capability::Analyze, json!({"sentiment": "neutral"})),
        );
        agents.narrator = Arc::new(MockAgent::new(AgentRole::Narrator).respond(
            Capability::Generate,
            json!({"narrative": "...", "confidence": 0.85, "sources": ["TSM"]}),
        ));

        let orchestrator = ready(&agents).await;
        let envelope = orchestrator
            .process_query(QueryRequest::text("Asia tech risk"))
            .await;

        assert_well_formed(&envelope);
        assert_eq!(envelope.content.as_deref(), Some("..."));
        assert_eq!(envelope.confidence, 0.85);
        assert_eq!(envelope.sources, vec!["TSM"]);
        assert!(envelope.error.is_none());
        assert!(envelope.audio_data.is_none());

        let narrated = &agents.narrator.calls().await[0].payload;
        assert_eq!(narrated["market_data"]["market_data"]["TSM"]["price"], 100);
        assert_eq!(narrated["analysis"]["risk"]["sentiment"], "neutral");
    }

    #[tokio::test]
    async fn test_not_initialized_fails_fast() {
        let agents = Agents::defaults();
        let orchestrator = agents.orchestrator();

        let envelope = orchestrator
            .process_query(QueryRequest::text("Asia tech risk"))
            .await;

        assert_eq!(envelope.error.as_deref(), Some("Agents not initialized"));
        assert!(envelope.content.is_none());
        assert_eq!(agents.downstream_calls().await, 0);
    }

    #[tokio::test]
    async fn test_failed_initialization_leaves_orchestrator_unready() {
        let mut agents = Agents::defaults();
        agents.scraper = Arc::new(MockAgent::new(AgentRole::Scraper).not_ready());
        let orchestrator = agents.orchestrator();

        assert!(!orchestrator.initialize().await);
        assert!(!orchestrator.is_ready());

        let envelope = orchestrator
            .process_query(QueryRequest::text("Asia tech risk"))
            .await;
        assert!(envelope.is_error());
    }

    #[tokio::test]
    async fn test_every_degraded_source_still_answers() {
        let mut agents = Agents::defaults();
        agents.market = Arc::new(
            MockAgent::new(AgentRole::MarketData)
                .fail(Capability::FetchQuotes, "down")
                .fail(Capability::FetchEarnings, "down"),
        );
        agents.scraper =
            Arc::new(MockAgent::new(AgentRole::Scraper).fail(Capability::MarketNews, "down"));
        agents.retriever =
            Arc::new(MockAgent::new(AgentRole::Retriever).fail(Capability::Search, "down"));
        agents.analyzer =
            Arc::new(MockAgent::new(AgentRole::Analyzer).fail(Capability::Analyze, "down"));

        let orchestrator = ready(&agents).await;
        let envelope = orchestrator
            .process_query(QueryRequest::text("Asia tech risk"))
            .await;

        assert_well_formed(&envelope);
        assert!(envelope.error.is_none());

        let analysis = &agents.narrator.calls().await[0].payload["analysis"];
        assert!(analysis["sentiment"]["error"].is_string());
        assert!(analysis["risk"]["error"].is_string());
        assert!(analysis["earnings"]["error"].is_string());
    }

    #[tokio::test]
    async fn test_slow_source_times_out_and_degrades() {
        let mut agents = Agents::defaults();
        agents.scraper = Arc::new(
            MockAgent::new(AgentRole::Scraper).with_latency(Duration::from_millis(300)),
        );
        let registry = {
            let mut registry = AgentRegistry::new(Duration::from_millis(100));
            registry.register(agents.market.clone());
            registry.register(agents.scraper.clone());
            registry.register(agents.retriever.clone());
            registry.register(agents.analyzer.clone());
            registry.register(agents.narrator.clone());
            registry.register(agents.voice.clone());
            registry
        };
        let orchestrator = Orchestrator::new(
            Arc::new(registry),
            Arc::new(|_: &str| vec!["TSM".to_string()]),
        );
        assert!(orchestrator.initialize().await);

        let envelope = orchestrator
            .process_query(QueryRequest::text("Asia tech risk"))
            .await;

        assert_well_formed(&envelope);
        assert!(envelope.error.is_none());
        let narrated = &agents.narrator.calls().await[0].payload;
        assert_eq!(narrated["news"], json!([]));
    }

    #[tokio::test]
    async fn test_narrator_transport_error_returns_apology() {
        let mut agents = Agents::defaults();
        agents.narrator = Arc::new(
            MockAgent::new(AgentRole::Narrator).fail(Capability::Generate, "connection refused"),
        );

        let orchestrator = ready(&agents).await;
        let envelope = orchestrator
            .process_query(QueryRequest::text("Asia tech risk"))
            .await;

        assert_eq!(envelope.content.as_deref(), Some(NARRATIVE_FALLBACK_CONTENT));
        assert!(envelope.error.unwrap().contains("connection refused"));
        assert_eq!(envelope.confidence, 0.0);
        assert!(envelope.sources.is_empty());
    }

    #[tokio::test]
    async fn test_voice_round_trip() {
        let mut agents = Agents::defaults();
        agents.voice = Arc::new(
            MockAgent::new(AgentRole::Voice)
                .respond(
                    Capability::SpeechToText,
                    json!({"text": "What's our risk exposure in Asia tech stocks today?"}),
                )
                .respond(
                    Capability::TextToSpeech,
                    json!({"audio_data": [1, 2, 3, 4], "sample_rate": 16000}),
                ),
        );

        let orchestrator = ready(&agents).await;
        let envelope = orchestrator
            .process_query(QueryRequest::voice(vec![0; 64]))
            .await;

        assert_well_formed(&envelope);
        assert_eq!(envelope.audio_data, Some(vec![1, 2, 3, 4]));
        assert_eq!(envelope.sample_rate, Some(16000));
        assert!(envelope.error.is_none());

        let search = &agents.retriever.calls().await[0].payload;
        assert_eq!(
            search["query"],
            "What's our risk exposure in Asia tech stocks today?"
        );

        let spoken = &agents.voice.calls_to(Capability::TextToSpeech).await[0].payload;
        assert_eq!(spoken["text"], envelope.content.unwrap().as_str());
    }

    #[tokio::test]
    async fn test_transcription_failure_skips_pipeline() {
        let mut agents = Agents::defaults();
        agents.voice = Arc::new(
            MockAgent::new(AgentRole::Voice).fail(Capability::SpeechToText, "unintelligible"),
        );

        let orchestrator = ready(&agents).await;
        let envelope = orchestrator
            .process_query(QueryRequest::voice(vec![0; 64]))
            .await;

        let error = envelope.error.unwrap();
        assert!(error.starts_with("Speech-to-text error"));
        assert!(error.contains("unintelligible"));
        assert!(envelope.content.is_none());
        assert_eq!(agents.downstream_calls().await, 0);
    }

    #[tokio::test]
    async fn test_synthesis_failure_is_fatal() {
        let mut agents = Agents::defaults();
        agents.voice = Arc::new(
            MockAgent::new(AgentRole::Voice).fail(Capability::TextToSpeech, "vocoder crashed"),
        );

        let orchestrator = ready(&agents).await;
        let request = QueryRequest::text("Asia tech risk").with_response_type(ResponseType::Voice);
        let envelope = orchestrator.process_query(request).await;

        let error = envelope.error.unwrap();
        assert!(error.starts_with("Text-to-speech error"));
        assert!(envelope.audio_data.is_none());
        // Narration succeeded upstream before synthesis failed
        assert_eq!(agents.narrator.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_stages_respect_happens_before() {
        let latency = Duration::from_millis(40);
        let mut agents = Agents::defaults();
        agents.market = Arc::new(MockAgent::new(AgentRole::MarketData).with_latency(latency));
        agents.scraper = Arc::new(MockAgent::new(AgentRole::Scraper).with_latency(latency));
        agents.retriever = Arc::new(MockAgent::new(AgentRole::Retriever).with_latency(latency));
        agents.analyzer = Arc::new(MockAgent::new(AgentRole::Analyzer).with_latency(latency));

        let orchestrator = ready(&agents).await;
        orchestrator
            .process_query(QueryRequest::text("Asia tech risk"))
            .await;

        let mut gather_calls = agents.market.calls().await;
        gather_calls.extend(agents.scraper.calls().await);
        gather_calls.extend(agents.retriever.calls().await);
        let analysis_calls = agents.analyzer.calls().await;
        let narrate_call = &agents.narrator.calls().await[0];

        let gather_done = gather_calls.iter().map(|c| c.finished).max().unwrap();
        let analysis_start = analysis_calls.iter().map(|c| c.started).min().unwrap();
        let analysis_done = analysis_calls.iter().map(|c| c.finished).max().unwrap();

        assert!(gather_done <= analysis_start);
        assert!(analysis_done <= narrate_call.started);
    }

    #[tokio::test]
    async fn test_request_deadline_cancels_in_flight_calls() {
        let mut agents = Agents::defaults();
        agents.narrator = Arc::new(
            MockAgent::new(AgentRole::Narrator).with_latency(Duration::from_millis(500)),
        );
        let orchestrator = ready(&agents)
            .await
            .with_request_deadline(Duration::from_millis(100));

        let envelope = orchestrator
            .process_query(QueryRequest::text("Asia tech risk"))
            .await;

        assert!(envelope.error.unwrap().contains("deadline"));
        // The narrator call was dropped before it could be recorded
        assert!(agents.narrator.calls().await.is_empty());
        assert!(orchestrator.is_ready());
    }

    #[tokio::test]
    async fn test_cancellation_token_aborts_request() {
        let mut agents = Agents::defaults();
        agents.market = Arc::new(
            MockAgent::new(AgentRole::MarketData).with_latency(Duration::from_millis(500)),
        );
        let orchestrator = ready(&agents).await;

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let envelope = orchestrator
            .process_query_with_cancellation(QueryRequest::text("Asia tech risk"), token)
            .await;

        assert_eq!(envelope.error.as_deref(), Some("request cancelled"));
        assert!(agents.analyzer.calls().await.is_empty());
        assert!(orchestrator.is_ready());
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_independent() {
        let agents = Agents::defaults();
        let orchestrator = Arc::new(ready(&agents).await);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move {
                    orchestrator
                        .process_query(QueryRequest::text(format!("query {}", i)))
                        .await
                })
            })
            .collect();

        for handle in handles {
            let envelope = handle.await.unwrap();
            assert_well_formed(&envelope);
            assert!(envelope.error.is_none());
        }
        assert_eq!(agents.narrator.calls().await.len(), 4);
    }

    #[tokio::test]
    async fn test_cleanup_reaches_every_agent() {
        let agents = Agents::defaults();
        let orchestrator = ready(&agents).await;

        orchestrator.cleanup().await;

        assert!(agents.market.was_cleaned_up());
        assert!(agents.voice.was_cleaned_up());
        assert!(agents.narrator.was_cleaned_up());
    }
}
