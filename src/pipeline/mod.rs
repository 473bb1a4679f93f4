//! Request-scoped pipeline state and stages
//!
//! Accepted → (Transcribing) → Gathering → Analyzing → Narrating
//! → (Synthesizing) → Completed
//!
//! Each stage joins all of its sub-calls before returning, then folds the
//! settled results into the context. Sibling sub-calls never touch the
//! context directly.

use crate::config::OrchestratorConfig;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use tracing::{debug, warn};
use uuid::Uuid;

pub mod analysis;
pub mod gather;
pub mod narrative;
pub mod voice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    Accepted,
    Transcribing,
    Gathering,
    Analyzing,
    Narrating,
    Synthesizing,
    Completed,
    Failed,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestState::Accepted => "Accepted",
            RequestState::Transcribing => "Transcribing",
            RequestState::Gathering => "Gathering",
            RequestState::Analyzing => "Analyzing",
            RequestState::Narrating => "Narrating",
            RequestState::Synthesizing => "Synthesizing",
            RequestState::Completed => "Completed",
            RequestState::Failed => "Failed",
        };
        write!(f, "{}", s)
    }
}

/// Per-request knobs taken from `OrchestratorConfig`
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub news_limit: usize,
    pub retrieval_k: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            news_limit: 5,
            retrieval_k: 3,
        }
    }
}

impl From<&OrchestratorConfig> for PipelineSettings {
    fn from(config: &OrchestratorConfig) -> Self {
        Self {
            news_limit: config.news_limit,
            retrieval_k: config.retrieval_k,
        }
    }
}

/// A sub-call failure that was replaced by a default
#[derive(Debug, Clone, Serialize)]
pub struct StageError {
    pub stage: RequestState,
    pub key: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GatherResult {
    pub market_data: Map<String, Value>,
    pub earnings_data: Map<String, Value>,
    pub news: Vec<Value>,
    pub relevant_docs: Vec<Value>,
}

impl GatherResult {
    /// Market branch slice as sent to the analyzer and narrator
    pub fn market_json(&self) -> Value {
        json!({
            "market_data": self.market_data,
            "earnings_data": self.earnings_data,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub sentiment: Value,
    pub risk: Value,
    pub earnings: Value,
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self {
            sentiment: json!({}),
            risk: json!({}),
            earnings: json!({}),
        }
    }
}

pub fn error_marker(reason: &str) -> Value {
    json!({ "error": reason })
}

/// In-flight aggregate for one request; never shared across requests
#[derive(Debug)]
pub struct PipelineContext {
    pub request_id: Uuid,
    pub query: String,
    pub state: RequestState,
    pub gathered: GatherResult,
    pub analysis: AnalysisResult,
    pub errors: Vec<StageError>,
    pub trace: Vec<String>,
}

impl PipelineContext {
    pub fn new(request_id: Uuid, query: String) -> Self {
        Self {
            request_id,
            query,
            state: RequestState::Accepted,
            gathered: GatherResult::default(),
            analysis: AnalysisResult::default(),
            errors: Vec::new(),
            trace: vec![format!("{}: query received", RequestState::Accepted)],
        }
    }

    pub fn advance(&mut self, next: RequestState) {
        debug!(
            request_id = %self.request_id,
            from = %self.state,
            to = %next,
            "Pipeline transition"
        );
        self.trace.push(format!("{}", next));
        self.state = next;
    }

    /// Record a degraded sub-call against the current stage
    pub fn degrade(&mut self, key: &'static str, reason: String) {
        warn!(
            request_id = %self.request_id,
            stage = %self.state,
            key,
            error = %reason,
            "Sub-call failed, continuing with default"
        );
        self.trace
            .push(format!("{}: {} degraded ({})", self.state, key, reason));
        self.errors.push(StageError {
            stage: self.state,
            key,
            reason,
        });
    }
}
