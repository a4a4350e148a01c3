use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use warmline::external::{
    HttpSummarizer, HttpTelephonyGateway, LocalMediaPlatform, NatsSpeechEngine,
};
use warmline::{create_router, AgentDirectory, AppState, Center, Config};

/// Warm-transfer support center service
#[derive(Parser)]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/warmline")]
    config: String,
}

/// How often the reaper looks for empty tracked rooms
const ROOM_REAP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} starting", cfg.service.name);

    let media = Arc::new(LocalMediaPlatform::new());
    let telephony = Arc::new(HttpTelephonyGateway::new(
        &cfg.telephony.base_url,
        &cfg.telephony.account_sid,
        &cfg.telephony.auth_token,
        &cfg.telephony.from_number,
    ));
    let summarizer = Arc::new(HttpSummarizer::new(
        &cfg.summarizer.base_url,
        &cfg.summarizer.api_key,
        &cfg.summarizer.model,
    ));
    let speech = Arc::new(
        NatsSpeechEngine::connect(&cfg.speech.nats_url)
            .await
            .context("Failed to connect to the speech transport")?,
    );
    let directory = Arc::new(AgentDirectory::new(
        cfg.directory.agents.clone(),
        cfg.directory.customers.clone(),
    ));

    info!("Agent directory loaded: {} agents", directory.agents().len());

    let center = Arc::new(Center::new(
        media,
        telephony,
        summarizer,
        speech,
        directory,
        &cfg.telephony.webhook_base_url,
    ));

    // Reclaim rooms nobody is left in
    let reaper = Arc::clone(&center);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(ROOM_REAP_INTERVAL);
        loop {
            interval.tick().await;
            let reaped = reaper.reap_idle_rooms().await;
            if reaped > 0 {
                info!("Reaped {} idle rooms", reaped);
            }
        }
    });

    let app = create_router(AppState::new(center));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    if let Err(e) = axum::serve(listener, app).await {
        warn!("Server exited with error: {}", e);
    }

    Ok(())
}
