use anyhow::{Context, Result};
use assessment_flow::EngineConfig;

const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub engine: EngineConfig,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT must be a port number, got {raw:?}"))?,
            Err(_) => DEFAULT_PORT,
        };
        let engine = EngineConfig::from_env().context("invalid engine configuration")?;

        Ok(Self { port, engine })
    }
}
