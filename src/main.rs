//! Voice clone bot
//!
//! A Telegram bot that clones a user's voice from a sample and speaks any
//! text in it through a voice-cloning TTS API.

mod config;
mod error;
mod messages;
mod runtime;
mod session;
mod state_machine;
mod styles;
mod telegram;
mod voice_api;

use config::BotConfig;
use runtime::RuntimeManager;
use session::SessionStore;
use state_machine::FlowContext;
use std::sync::Arc;
use std::time::Duration;
use telegram::TelegramClient;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voice_api::{HttpVoiceGateway, LoggingGateway, VoiceGateway};

/// How long each getUpdates call waits for new updates
const LONG_POLL: Duration = Duration::from_secs(30);

/// How often expired sessions and stopped workers are swept
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound on waiting for workers at shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_clone_bot=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = BotConfig::from_env()?;
    tracing::info!(
        voice_api = %config.voice_api.base_url,
        flow = ?config.flow_variant,
        max_text_chars = config.max_text_chars,
        session_ttl_secs = config.session_ttl.as_secs(),
        "Configuration loaded"
    );

    let http_gateway: Arc<dyn VoiceGateway> =
        Arc::new(HttpVoiceGateway::new(config.voice_api.clone())?);
    let gateway = Arc::new(LoggingGateway::new(http_gateway));
    let chat = Arc::new(TelegramClient::new(
        &config.bot_token,
        &config.telegram_api_url,
    )?);
    let store = Arc::new(SessionStore::new(config.session_ttl));

    let manager = Arc::new(RuntimeManager::new(
        FlowContext::from_config(&config),
        store,
        Arc::clone(&chat),
        gateway,
        config.worker_idle,
    ));

    let cancel = CancellationToken::new();
    let sweeper = tokio::spawn(
        Arc::clone(&manager).run_sweeper(SWEEP_INTERVAL, cancel.clone()),
    );

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        tracing::info!("Shutdown requested");
        shutdown.cancel();
    });

    telegram::poll_updates(&chat, LONG_POLL, cancel.clone(), |inbound| {
        let manager = Arc::clone(&manager);
        async move { manager.dispatch(inbound).await }
    })
    .await;

    cancel.cancel();
    if tokio::time::timeout(SHUTDOWN_GRACE, manager.shutdown())
        .await
        .is_err()
    {
        tracing::warn!("Workers did not finish in time");
    }
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "Sweeper ended abnormally");
    }

    tracing::info!("Voice clone bot stopped");
    Ok(())
}
