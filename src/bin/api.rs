use finance_assistant_orchestrator::{
    agents::create_http_registry, api::start_server, config::OrchestratorConfig,
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

    // Loads .env as well
    let config = OrchestratorConfig::from_env()?;

    info!("🚀 Finance Assistant Orchestrator - API Server");
    info!("📍 Port: {}", config.port);
    for (role, url) in &config.endpoints {
        info!(%role, %url, "Agent endpoint");
    }

    let registry = Arc::new(create_http_registry(&config)?);
    let orchestrator = Arc::new(Orchestrator::from_config(registry, &config));

    if !orchestrator.initialize().await {
        error!("❌ Agent initialization failed; check that every agent service is up");
        orchestrator.cleanup().await;
        std::process::exit(1);
    }

    info!("✅ Orchestrator initialized");
    info!("📡 Starting API server...");

    let served = start_server(orchestrator.clone(), config.port).await;

    orchestrator.cleanup().await;
    info!("Agents cleaned up");

    served?;
    Ok(())
}
