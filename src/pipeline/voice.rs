//! Input and output normalizers around the voice agent.
//!
//! Both directions are fatal on failure: there is no text fallback for a
//! transcription error, and no audio-less answer for a synthesis error.

use crate::agents::{AgentRegistry, Capability};
use crate::error::OrchestrationError;
use crate::models::{InputType, QueryRequest, SpeechOutput, Transcription};
use crate::Result;
use serde_json::json;
use tracing::debug;

/// Text that enters the pipeline: transcribed audio or the literal query
pub async fn normalize_input(registry: &AgentRegistry, request: &QueryRequest) -> Result<String> {
    if request.input_type == InputType::Text {
        return Ok(request.query.clone());
    }

    let audio = request
        .audio_data
        .as_ref()
        .ok_or_else(|| OrchestrationError::Transcription("No audio data provided".to_string()))?;

    let response = registry
        .call(Capability::SpeechToText, json!({ "audio_data": audio }))
        .await
        .map_err(|e| OrchestrationError::Transcription(e.to_string()))?;

    let transcription: Transcription = serde_json::from_value(response)
        .map_err(|e| OrchestrationError::Transcription(format!("malformed transcription: {}", e)))?;

    debug!(
        chars = transcription.text.len(),
        confidence = ?transcription.confidence,
        "Audio transcribed"
    );

    Ok(transcription.text)
}

/// Speak the narrative content
pub async fn synthesize(registry: &AgentRegistry, text: &str) -> Result<SpeechOutput> {
    let response = registry
        .call(Capability::TextToSpeech, json!({ "text": text }))
        .await
        .map_err(|e| OrchestrationError::Synthesis(e.to_string()))?;

    let speech: SpeechOutput = serde_json::from_value(response)
        .map_err(|e| OrchestrationError::Synthesis(format!("malformed audio payload: {}", e)))?;

    debug!(
        bytes = speech.audio_data.len(),
        sample_rate = speech.sample_rate,
        "Speech synthesized"
    );

    Ok(speech)
}
