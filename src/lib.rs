//! Finance Assistant Orchestrator
//!
//! Coordinates a fixed set of specialist agents (market data, scraper,
//! retriever, analyzer, narrator, voice) to answer one market-brief query:
//! - Optional speech-to-text on the way in
//! - Concurrent gathering of quotes, earnings, news and retrieved documents
//! - Concurrent sentiment, risk and earnings-surprise analysis
//! - A single narrative with confidence and sources
//! - Optional text-to-speech on the way out
//!
//! Sub-call failures degrade to empty inputs. Only transcription,
//! synthesis, missing initialization, deadline and cancellation fail a
//! request.
//!
//! PIPELINE:
//! INPUT → (TRANSCRIBE) → GATHER → ANALYZE → NARRATE → (SYNTHESIZE) → COMPLETE

pub mod agents;
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod symbols;

pub use error::Result;

// Re-export common types
pub use agents::{Agent, AgentRegistry, AgentRole, Capability};
pub use config::OrchestratorConfig;
pub use models::*;
pub use orchestrator::Orchestrator;
