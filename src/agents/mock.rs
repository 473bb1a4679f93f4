//! Scripted in-process agent for development & testing
//!
//! Keeps the pipeline runnable without any remote agent service.
//! Unscripted capabilities answer with canned data shaped like the
//! real services' responses.

use super::{Agent, AgentRole, Capability};
use crate::error::OrchestrationError;
use crate::Result;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
enum Scripted {
    Respond(Value),
    Fail(String),
}

#[derive(Debug, Clone)]
enum InitOutcome {
    Ready,
    NotReady,
    Error(String),
}

/// One observed invocation
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub capability: Capability,
    pub payload: Value,
    pub started: Instant,
    pub finished: Instant,
}

impl CallRecord {
    /// True when the two calls were in flight at the same time
    pub fn overlaps(&self, other: &CallRecord) -> bool {
        self.started < other.finished && other.started < self.finished
    }
}

pub struct MockAgent {
    role: AgentRole,
    script: HashMap<Capability, Scripted>,
    latency: Duration,
    init: InitOutcome,
    cleanup_error: Option<String>,
    calls: Mutex<Vec<CallRecord>>,
    init_calls: AtomicUsize,
    cleaned_up: AtomicBool,
}

impl MockAgent {
    pub fn new(role: AgentRole) -> Self {
        Self {
            role,
            script: HashMap::new(),
            latency: Duration::ZERO,
            init: InitOutcome::Ready,
            cleanup_error: None,
            calls: Mutex::new(Vec::new()),
            init_calls: AtomicUsize::new(0),
            cleaned_up: AtomicBool::new(false),
        }
    }

    pub fn respond(mut self, capability: Capability, response: Value) -> Self {
        self.script.insert(capability, Scripted::Respond(response));
        self
    }

    pub fn fail(mut self, capability: Capability, reason: &str) -> Self {
        self.script
            .insert(capability, Scripted::Fail(reason.to_string()));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn not_ready(mut self) -> Self {
        self.init = InitOutcome::NotReady;
        self
    }

    pub fn init_error(mut self, reason: &str) -> Self {
        self.init = InitOutcome::Error(reason.to_string());
        self
    }

    pub fn cleanup_error(mut self, reason: &str) -> Self {
        self.cleanup_error = Some(reason.to_string());
        self
    }

    pub async fn calls(&self) -> Vec<CallRecord> {
        self.calls.lock().await.clone()
    }

    pub async fn calls_to(&self, capability: Capability) -> Vec<CallRecord> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.capability == capability)
            .cloned()
            .collect()
    }

    pub fn init_count(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn was_cleaned_up(&self) -> bool {
        self.cleaned_up.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Agent for MockAgent {
    fn role(&self) -> AgentRole {
        self.role
    }

    async fn initialize(&self) -> Result<bool> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match &self.init {
            InitOutcome::Ready => Ok(true),
            InitOutcome::NotReady => Ok(false),
            InitOutcome::Error(reason) => Err(OrchestrationError::AgentCall {
                role: self.role,
                reason: reason.clone(),
            }),
        }
    }

    async fn call(&self, capability: Capability, payload: Value) -> Result<Value> {
        let started = Instant::now();

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let outcome = match self.script.get(&capability) {
            Some(Scripted::Respond(value)) => Ok(value.clone()),
            Some(Scripted::Fail(reason)) => Err(OrchestrationError::AgentCall {
                role: self.role,
                reason: reason.clone(),
            }),
            None if capability.role() == self.role => Ok(canned_response(capability, &payload)),
            None => Err(OrchestrationError::AgentCall {
                role: self.role,
                reason: format!("capability {} not supported", capability),
            }),
        };

        self.calls.lock().await.push(CallRecord {
            capability,
            payload,
            started,
            finished: Instant::now(),
        });

        outcome
    }

    async fn cleanup(&self) -> Result<()> {
        self.cleaned_up.store(true, Ordering::SeqCst);

        match &self.cleanup_error {
            Some(reason) => Err(OrchestrationError::AgentCall {
                role: self.role,
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn symbols_of(payload: &Value) -> Vec<String> {
    payload
        .get("symbols")
        .and_then(Value::as_array)
        .map(|symbols| {
            symbols
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn canned_response(capability: Capability, payload: &Value) -> Value {
    match capability {
        Capability::FetchQuotes => {
            let quotes: serde_json::Map<String, Value> = symbols_of(payload)
                .into_iter()
                .map(|symbol| {
                    (
                        symbol,
                        json!({
                            "current_price": 150.50,
                            "change_percent": 1.2,
                            "volume": 1000000,
                        }),
                    )
                })
                .collect();
            json!({ "data": quotes })
        }
        Capability::FetchEarnings => {
            let earnings: serde_json::Map<String, Value> = symbols_of(payload)
                .into_iter()
                .map(|symbol| {
                    (
                        symbol,
                        json!({
                            "eps_actual": 1.10,
                            "eps_estimate": 1.00,
                        }),
                    )
                })
                .collect();
            json!({ "earnings": earnings })
        }
        Capability::MarketNews => json!({
            "articles": [{
                "title": "Asian chipmakers extend rally",
                "summary": "Semiconductor names led regional gains on strong AI demand.",
                "url": "https://example.com/markets/asia-chips",
                "timestamp": "2024-01-01T08:00:00Z",
            }]
        }),
        Capability::Search => json!({
            "results": [{
                "text": "TSMC guided Q4 revenue above consensus.",
                "metadata": {"source": "earnings_call"},
                "score": 0.91,
            }]
        }),
        Capability::Analyze => match payload.get("analysis_type").and_then(Value::as_str) {
            Some("market_sentiment") => json!({"sentiment": "neutral", "score": 0.0}),
            Some("portfolio_risk") => json!({"risk_level": "medium", "asia_tech_allocation": 0.22}),
            Some("earnings_analysis") => json!({"surprises": []}),
            _ => json!({}),
        },
        Capability::Generate => {
            let sources: Vec<String> = payload
                .get("market_data")
                .and_then(|m| m.get("market_data"))
                .and_then(Value::as_object)
                .map(|m| m.keys().cloned().collect())
                .unwrap_or_default();
            json!({
                "narrative": "Asia tech exposure is stable with neutral sentiment and no major earnings surprises.",
                "confidence": 0.85,
                "sources": sources,
            })
        }
        Capability::SpeechToText => json!({
            "text": "What's our risk exposure in Asia tech stocks today?",
            "confidence": 1.0,
        }),
        Capability::TextToSpeech => json!({
            "audio_data": vec![0u8; 32],
            "sample_rate": 22050,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_failure_is_returned() {
        let agent = MockAgent::new(AgentRole::Scraper).fail(Capability::MarketNews, "blocked");
        let result = agent.call(Capability::MarketNews, json!({"limit": 5})).await;

        assert!(result.is_err());
        assert_eq!(agent.calls_to(Capability::MarketNews).await.len(), 1);
    }

    #[tokio::test]
    async fn test_canned_quotes_cover_requested_symbols() {
        let agent = MockAgent::new(AgentRole::MarketData);
        let value = agent
            .call(Capability::FetchQuotes, json!({"symbols": ["TSM", "BABA"]}))
            .await
            .unwrap();

        assert!(value["data"]["TSM"].is_object());
        assert!(value["data"]["BABA"].is_object());
    }

    #[tokio::test]
    async fn test_foreign_capability_is_rejected() {
        let agent = MockAgent::new(AgentRole::Voice);
        assert!(agent.call(Capability::Search, json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_init_outcomes() {
        assert!(MockAgent::new(AgentRole::Analyzer).initialize().await.unwrap());
        assert!(!MockAgent::new(AgentRole::Analyzer).not_ready().initialize().await.unwrap());
        assert!(MockAgent::new(AgentRole::Analyzer)
            .init_error("model missing")
            .initialize()
            .await
            .is_err());
    }
}
