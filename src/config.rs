//! Runtime configuration loaded from the environment (`.env` supported)

use crate::agents::AgentRole;
use crate::error::OrchestrationError;
use crate::Result;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_WATCHLIST: &[&str] = &[
    "TSM",       // TSMC
    "SSNLF",     // Samsung
    "BABA",      // Alibaba
    "TCEHY",     // Tencent
    "9984.T",    // SoftBank
    "035420.KS", // NAVER
];

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub endpoints: HashMap<AgentRole, String>,
    pub agent_timeout: Duration,
    pub request_deadline: Duration,
    pub news_limit: usize,
    pub retrieval_k: usize,
    pub watchlist: Vec<String>,
    pub port: u16,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        let endpoints = AgentRole::ALL
            .iter()
            .enumerate()
            .map(|(i, role)| (*role, format!("http://localhost:{}", 8001 + i)))
            .collect();

        Self {
            endpoints,
            agent_timeout: Duration::from_secs(5),
            request_deadline: Duration::from_secs(30),
            news_limit: 5,
            retrieval_k: 3,
            watchlist: DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect(),
            port: 8000,
        }
    }
}

fn endpoint_var(role: AgentRole) -> &'static str {
    match role {
        AgentRole::MarketData => "MARKET_DATA_AGENT_URL",
        AgentRole::Scraper => "SCRAPER_AGENT_URL",
        AgentRole::Retriever => "RETRIEVER_AGENT_URL",
        AgentRole::Analyzer => "ANALYZER_AGENT_URL",
        AgentRole::Narrator => "NARRATOR_AGENT_URL",
        AgentRole::Voice => "VOICE_AGENT_URL",
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| OrchestrationError::Config(format!("{} has invalid value {:?}", key, raw)))
}

fn parse_watchlist(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl OrchestratorConfig {
    /// Build from process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        for role in AgentRole::ALL {
            if let Some(url) = lookup(endpoint_var(role)) {
                config.endpoints.insert(role, url);
            }
        }

        if let Some(raw) = lookup("AGENT_TIMEOUT_SECS") {
            config.agent_timeout = Duration::from_secs(parse_var("AGENT_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = lookup("REQUEST_DEADLINE_SECS") {
            config.request_deadline =
                Duration::from_secs(parse_var("REQUEST_DEADLINE_SECS", &raw)?);
        }
        if let Some(raw) = lookup("NEWS_LIMIT") {
            config.news_limit = parse_var("NEWS_LIMIT", &raw)?;
        }
        if let Some(raw) = lookup("RETRIEVAL_K") {
            config.retrieval_k = parse_var("RETRIEVAL_K", &raw)?;
        }
        if let Some(raw) = lookup("WATCHLIST_SYMBOLS") {
            let watchlist = parse_watchlist(&raw);
            if !watchlist.is_empty() {
                config.watchlist = watchlist;
            }
        }
        if let Some(raw) = lookup("PORT").or_else(|| lookup("API_PORT")) {
            config.port = parse_var("PORT", &raw)?;
        }

        Ok(config)
    }

    pub fn endpoint(&self, role: AgentRole) -> &str {
        self.endpoints
            .get(&role)
            .map(String::as_str)
            .unwrap_or("http://localhost:8000")
    }
}
