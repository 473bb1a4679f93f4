//! Core data models for the finance assistant

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const NARRATIVE_FALLBACK_CONTENT: &str =
    "I apologize, but I encountered an error while generating the response.";

pub const NARRATIVE_MISSING_CONTENT: &str = "Unable to generate response";

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Text,
    Voice,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Text,
    Voice,
}

//
// ================= Request =================
//

/// A single user query entering the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub input_type: InputType,
    #[serde(default)]
    pub response_type: ResponseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_data: Option<Vec<u8>>,
}

impl QueryRequest {
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            input_type: InputType::Text,
            response_type: ResponseType::Text,
            audio_data: None,
        }
    }

    pub fn voice(audio_data: Vec<u8>) -> Self {
        Self {
            query: String::new(),
            input_type: InputType::Voice,
            response_type: ResponseType::Voice,
            audio_data: Some(audio_data),
        }
    }

    pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }
}

//
// ================= Voice Payloads =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechOutput {
    pub audio_data: Vec<u8>,
    pub sample_rate: u32,
}

//
// ================= Response =================
//

/// Terminal artifact returned to the caller of `process_query`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub sources: Vec<String>,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_data: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    pub fn answer(content: String, confidence: f64, sources: Vec<String>) -> Self {
        Self {
            content: Some(content),
            confidence: confidence.clamp(0.0, 1.0),
            sources,
            timestamp: Utc::now().to_rfc3339(),
            audio_data: None,
            sample_rate: None,
            error: None,
        }
    }

    /// Apology envelope used when the narrator could not produce text
    pub fn narrative_fallback(reason: impl fmt::Display) -> Self {
        Self {
            content: Some(NARRATIVE_FALLBACK_CONTENT.to_string()),
            confidence: 0.0,
            sources: Vec::new(),
            timestamp: Utc::now().to_rfc3339(),
            audio_data: None,
            sample_rate: None,
            error: Some(reason.to_string()),
        }
    }

    /// Error-only envelope for a request that could not complete
    pub fn failure(reason: impl fmt::Display) -> Self {
        Self {
            content: None,
            confidence: 0.0,
            sources: Vec::new(),
            timestamp: Utc::now().to_rfc3339(),
            audio_data: None,
            sample_rate: None,
            error: Some(reason.to_string()),
        }
    }

    pub fn with_speech(mut self, speech: SpeechOutput) -> Self {
        self.audio_data = Some(speech.audio_data);
        self.sample_rate = Some(speech.sample_rate);
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
