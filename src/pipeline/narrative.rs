//! Narrative stage: one narrator call, always yields a well-formed envelope

use super::PipelineContext;
use crate::agents::{AgentRegistry, Capability};
use crate::models::{ResponseEnvelope, NARRATIVE_MISSING_CONTENT};
use serde_json::{json, Value};
use tracing::{debug, warn};

fn envelope_from(response: &Value) -> ResponseEnvelope {
    let content = response
        .get("narrative")
        .and_then(Value::as_str)
        .unwrap_or(NARRATIVE_MISSING_CONTENT)
        .to_string();

    let confidence = response
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    let sources = response
        .get("sources")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    ResponseEnvelope::answer(content, confidence, sources)
}

pub async fn narrate(registry: &AgentRegistry, ctx: &mut PipelineContext) -> ResponseEnvelope {
    let payload = json!({
        "query": ctx.query,
        "market_data": ctx.gathered.market_json(),
        "news": ctx.gathered.news,
        "analysis": ctx.analysis,
    });

    match registry.call(Capability::Generate, payload).await {
        Ok(response) => {
            let envelope = envelope_from(&response);
            debug!(
                request_id = %ctx.request_id,
                confidence = envelope.confidence,
                sources = envelope.sources.len(),
                "Narrative generated"
            );
            envelope
        }
        Err(e) => {
            warn!(
                request_id = %ctx.request_id,
                error = %e,
                "Narrative generation failed, using fallback content"
            );
            ctx.trace.push(format!("{}: narrator failed ({})", ctx.state, e));
            ResponseEnvelope::narrative_fallback(e)
        }
    }
}
