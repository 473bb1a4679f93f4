//! Agent trait and role/capability tags
//!
//! Every collaborator (market data, scraping, retrieval, analysis,
//! narration, voice) is reached through one uniform call:
//! `call(capability, payload) -> Result<payload>`.

use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub mod http;
pub mod mock;
pub mod registry;

pub use http::HttpAgent;
pub use mock::MockAgent;
pub use registry::{create_http_registry, create_mock_registry, AgentRegistry, AgentStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    MarketData,
    Scraper,
    Retriever,
    Analyzer,
    Narrator,
    Voice,
}

impl AgentRole {
    pub const ALL: [AgentRole; 6] = [
        AgentRole::MarketData,
        AgentRole::Scraper,
        AgentRole::Retriever,
        AgentRole::Analyzer,
        AgentRole::Narrator,
        AgentRole::Voice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::MarketData => "market_data",
            AgentRole::Scraper => "scraper",
            AgentRole::Retriever => "retriever",
            AgentRole::Analyzer => "analyzer",
            AgentRole::Narrator => "narrator",
            AgentRole::Voice => "voice",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    FetchQuotes,
    FetchEarnings,
    MarketNews,
    Search,
    Analyze,
    Generate,
    SpeechToText,
    TextToSpeech,
}

impl Capability {
    /// Role that owns this capability
    pub fn role(&self) -> AgentRole {
        match self {
            Capability::FetchQuotes | Capability::FetchEarnings => AgentRole::MarketData,
            Capability::MarketNews => AgentRole::Scraper,
            Capability::Search => AgentRole::Retriever,
            Capability::Analyze => AgentRole::Analyzer,
            Capability::Generate => AgentRole::Narrator,
            Capability::SpeechToText | Capability::TextToSpeech => AgentRole::Voice,
        }
    }

    /// Endpoint path used by HTTP-backed agents
    pub fn path(&self) -> &'static str {
        match self {
            Capability::FetchQuotes => "/quotes",
            Capability::FetchEarnings => "/earnings",
            Capability::MarketNews => "/news",
            Capability::Search => "/search",
            Capability::Analyze => "/analyze",
            Capability::Generate => "/generate",
            Capability::SpeechToText => "/stt",
            Capability::TextToSpeech => "/tts",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Capability::FetchQuotes => "fetch_quotes",
            Capability::FetchEarnings => "fetch_earnings",
            Capability::MarketNews => "market_news",
            Capability::Search => "search",
            Capability::Analyze => "analyze",
            Capability::Generate => "generate",
            Capability::SpeechToText => "speech_to_text",
            Capability::TextToSpeech => "text_to_speech",
        };
        f.write_str(s)
    }
}

/// One external capability provider
#[async_trait::async_trait]
pub trait Agent: Send + Sync {
    fn role(&self) -> AgentRole;

    /// One-time startup; `Ok(false)` and `Err` both count as failure
    async fn initialize(&self) -> Result<bool>;

    async fn call(&self, capability: Capability, payload: Value) -> Result<Value>;

    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }
}
