//! Market & context gathering
//!
//! Two independent branches run concurrently:
//! - market: quotes + earnings for the resolved symbols
//! - context: recent news + top-k retrieved documents for the query
//!
//! Every sub-call failure resolves to an empty value. This stage never
//! fails the request.

use super::{GatherResult, PipelineContext, PipelineSettings};
use crate::agents::{AgentRegistry, Capability};
use crate::Result;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Per-symbol mapping, either wrapped under `wrapper` or bare
fn extract_mapping(value: Value, wrapper: &str) -> std::result::Result<Map<String, Value>, String> {
    match value {
        Value::Object(mut obj) => match obj.remove(wrapper) {
            Some(Value::Object(inner)) => Ok(inner),
            Some(Value::Null) => Ok(Map::new()),
            Some(other) => Err(format!("'{}' is not an object: {}", wrapper, other)),
            None => Ok(obj),
        },
        other => Err(format!("expected an object, got {}", other)),
    }
}

fn extract_list(value: Value, key: &str) -> std::result::Result<Vec<Value>, String> {
    match value.get(key) {
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(other) => Err(format!("'{}' is not a list: {}", key, other)),
    }
}

fn settle<T: Default>(
    ctx: &mut PipelineContext,
    key: &'static str,
    outcome: Result<Value>,
    extract: impl FnOnce(Value) -> std::result::Result<T, String>,
) -> T {
    match outcome.map_err(|e| e.to_string()).and_then(extract) {
        Ok(value) => value,
        Err(reason) => {
            ctx.degrade(key, reason);
            T::default()
        }
    }
}

pub async fn gather(
    registry: &AgentRegistry,
    symbols: &[String],
    settings: PipelineSettings,
    ctx: &mut PipelineContext,
) {
    let symbols_payload = json!({ "symbols": symbols });
    let search_payload = json!({ "query": ctx.query, "k": settings.retrieval_k });
    let news_payload = json!({ "scrape_type": "market_news", "limit": settings.news_limit });

    let market_branch = async {
        tokio::join!(
            registry.call(Capability::FetchQuotes, symbols_payload.clone()),
            registry.call(Capability::FetchEarnings, symbols_payload.clone()),
        )
    };

    let context_branch = async {
        tokio::join!(
            registry.call(Capability::MarketNews, news_payload),
            registry.call(Capability::Search, search_payload),
        )
    };

    let ((quotes, earnings), (news, docs)) = tokio::join!(market_branch, context_branch);

    let gathered = GatherResult {
        market_data: settle(ctx, "market_data", quotes, |v| extract_mapping(v, "data")),
        earnings_data: settle(ctx, "earnings_data", earnings, |v| extract_mapping(v, "earnings")),
        news: settle(ctx, "news", news, |v| extract_list(v, "articles")),
        relevant_docs: settle(ctx, "relevant_docs", docs, |v| extract_list(v, "results")),
    };

    debug!(
        request_id = %ctx.request_id,
        symbols = gathered.market_data.len(),
        earnings = gathered.earnings_data.len(),
        news = gathered.news.len(),
        docs = gathered.relevant_docs.len(),
        "Gathering complete"
    );

    ctx.gathered = gathered;
}
