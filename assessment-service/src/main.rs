use anyhow::Context;
use assessment_flow::SimulatedScorer;
use assessment_service::{ServiceConfig, create_app};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// JSON logs by default, `LOG_FORMAT=pretty` for local development.
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "assessment_service=debug,assessment_flow=debug,tower_http=debug".into()
    });

    match log_format.as_str() {
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ServiceConfig::from_env()?;
    info!(
        min_latency = ?config.engine.min_latency,
        max_latency = ?config.engine.max_latency,
        scoring_timeout = ?config.engine.scoring_timeout,
        "Engine configured"
    );
    warn!("No inference model configured, using the simulated scorer");

    let app = create_app(Arc::new(SimulatedScorer), config.engine);
    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    let addr = listener.local_addr()?;

    info!("Clinical Risk Assessment Service starting on {}", addr);
    info!("Health check endpoint: http://{}/health", addr);
    info!("Assessments endpoint: POST http://{}/assessments", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
