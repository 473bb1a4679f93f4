//! Analysis stage: sentiment, portfolio risk and earnings surprise
//! requested concurrently from the analyzer agent.

use super::{error_marker, AnalysisResult, GatherResult, PipelineContext};
use crate::agents::{AgentRegistry, Capability};
use crate::Result;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisType {
    MarketSentiment,
    PortfolioRisk,
    EarningsAnalysis,
}

impl AnalysisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::MarketSentiment => "market_sentiment",
            AnalysisType::PortfolioRisk => "portfolio_risk",
            AnalysisType::EarningsAnalysis => "earnings_analysis",
        }
    }

    /// Slice of gathered data this analysis needs
    fn data(&self, gathered: &GatherResult) -> Value {
        match self {
            AnalysisType::MarketSentiment => json!({
                "market_data": gathered.market_data,
                "news_data": gathered.news,
            }),
            AnalysisType::PortfolioRisk => json!({
                "portfolio": gathered.market_data,
                "market_data": gathered.market_json(),
            }),
            AnalysisType::EarningsAnalysis => json!({
                "earnings_data": gathered.earnings_data,
                "market_expectations": {},
            }),
        }
    }

    fn payload(&self, gathered: &GatherResult) -> Value {
        json!({
            "analysis_type": self.as_str(),
            "data": self.data(gathered),
        })
    }
}

fn settle(ctx: &mut PipelineContext, key: &'static str, outcome: Result<Value>) -> Value {
    match outcome {
        Ok(value) => value,
        Err(e) => {
            let reason = e.to_string();
            let marker = error_marker(&reason);
            ctx.degrade(key, reason);
            marker
        }
    }
}

pub async fn analyze(registry: &AgentRegistry, ctx: &mut PipelineContext) {
    let sentiment_payload = AnalysisType::MarketSentiment.payload(&ctx.gathered);
    let risk_payload = AnalysisType::PortfolioRisk.payload(&ctx.gathered);
    let earnings_payload = AnalysisType::EarningsAnalysis.payload(&ctx.gathered);

    let (sentiment, risk, earnings) = tokio::join!(
        registry.call(Capability::Analyze, sentiment_payload),
        registry.call(Capability::Analyze, risk_payload),
        registry.call(Capability::Analyze, earnings_payload),
    );

    let analysis = AnalysisResult {
        sentiment: settle(ctx, "sentiment", sentiment),
        risk: settle(ctx, "risk", risk),
        earnings: settle(ctx, "earnings", earnings),
    };
    ctx.analysis = analysis;

    debug!(request_id = %ctx.request_id, "Analysis complete");
}
