use finance_assistant_orchestrator::{
    agents::create_mock_registry, config::OrchestratorConfig, models::QueryRequest,
    orchestrator::Orchestrator,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Finance Assistant Orchestrator starting (mock agents)");

    let config = OrchestratorConfig::from_env()?;
    let registry = Arc::new(create_mock_registry(config.agent_timeout));
    let orchestrator = Orchestrator::from_config(registry, &config);

    if !orchestrator.initialize().await {
        error!("Agent initialization failed");
        return Err("agent initialization failed".into());
    }

    let request = QueryRequest::text("What's our risk exposure in Asia tech stocks today?");

    info!(query = %request.query, "Running orchestrator");

    let envelope = orchestrator.process_query(request).await;

    println!("\n=== MARKET BRIEF ===");
    println!("{}", serde_json::to_string_pretty(&envelope)?);

    orchestrator.cleanup().await;

    match envelope.error {
        Some(e) if envelope.content.is_none() => Err(e.into()),
        _ => Ok(()),
    }
}
