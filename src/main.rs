use std::sync::Arc;
use std::time::Duration;

use relay_base44::Base44Client;
use relay_ingest::IngestPipeline;
use relay_web_axum::{router, AppState};
use sms_relay::{config::AppConfig, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    telemetry::init(&config.logging);

    let store = Base44Client::with_timeout(
        config.base44.entities_url(),
        config.base44.api_key.clone(),
        Duration::from_secs(config.server.timeout_seconds),
    )?;
    let pipeline = IngestPipeline::new(Arc::new(store));
    let app = router(AppState { pipeline });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "sms-relay listening");
    axum::serve(listener, app).await?;
    Ok(())
}
