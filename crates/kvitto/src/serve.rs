// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kvitto serve` command implementation.
//!
//! Starts the full bot: SQLite storage, the WhatsApp channel adapter, the
//! renderer / media-host / payment-provider clients, the conversation
//! engine, and the webhook gateway. Supports graceful shutdown via signal
//! handlers.

use std::sync::Arc;
use std::time::Instant;

use kvitto_config::KvittoConfig;
use kvitto_core::{ChannelAdapter, ChannelIngest, KvittoError, Repository, ServiceAdapter};
use kvitto_engine::{shutdown, Engine, PaywallReconciler};
use kvitto_gateway::{start_server, GatewayState, ServerConfig};
use kvitto_media::ImgbbMediaHost;
use kvitto_payments::VirtualAccountClient;
use kvitto_render::ScreenshotRenderer;
use kvitto_store::SqliteRepository;
use kvitto_whatsapp::WhatsAppChannel;
use tracing::{error, info};

/// Runs the `kvitto serve` command.
///
/// Wires every collaborator, connects the channel, and runs the
/// conversation engine and webhook gateway side by side until a shutdown
/// signal arrives or the channel fails.
pub async fn run_serve(config: KvittoConfig) -> Result<(), KvittoError> {
    // Initialize tracing subscriber.
    init_tracing(&config.bot.log_level);

    info!("starting kvitto serve");

    // Refuse to start while required credentials are missing. Collected
    // upfront so the operator sees every gap at once.
    if let Err(errors) = kvitto_config::validate_serve_credentials(&config) {
        kvitto_config::render_errors(&errors);
        return Err(KvittoError::Config(
            "serve credentials missing or invalid".to_string(),
        ));
    }

    // Initialize storage.
    let repo = {
        let repo = SqliteRepository::new(config.storage.clone());
        repo.initialize().await?;
        Arc::new(repo)
    };

    // Initialize the WhatsApp channel.
    let channel = {
        let channel = WhatsAppChannel::new(config.whatsapp.clone()).map_err(|e| {
            error!(error = %e, "failed to initialize WhatsApp channel");
            eprintln!(
                "error: WhatsApp Cloud API credentials required. Set whatsapp.access_token, \
                 whatsapp.phone_number_id, and whatsapp.verify_token via config or KVITTO_* env vars."
            );
            e
        })?;
        Arc::new(channel)
    };

    // Initialize the service clients.
    let renderer = Arc::new(ScreenshotRenderer::new(config.render.clone())?);
    let media = Arc::new(ImgbbMediaHost::new(config.media.clone())?);
    let payments = Arc::new(VirtualAccountClient::new(config.payments.clone())?);

    // Verify channel credentials before accepting traffic.
    channel.connect().await?;

    // Install signal handler.
    let cancel = shutdown::install_signal_handler();

    let engine = Engine::new(
        repo.clone() as Arc<dyn Repository>,
        channel.clone() as Arc<dyn ChannelAdapter>,
        renderer,
        media,
        payments,
        config.bot.clone(),
    );

    // The gateway shares the channel's webhook surface and its own view of
    // the repository for reconciliation and reads.
    let reconciler = Arc::new(PaywallReconciler::new(
        repo.clone() as Arc<dyn Repository>,
        channel.clone() as Arc<dyn ChannelAdapter>,
    ));
    let state = GatewayState {
        ingest: channel.clone() as Arc<dyn ChannelIngest>,
        reconciler,
        repo: repo.clone() as Arc<dyn Repository>,
        webhook_secret: config.payments.webhook_secret.clone(),
        admin_secret: config.gateway.admin_secret.clone(),
        start_time: Instant::now(),
    };
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };

    // Run the gateway alongside the engine. Either side exiting (signal,
    // bind failure, channel failure) cancels the other.
    let gateway_cancel = cancel.clone();
    let gateway = tokio::spawn(async move {
        let result = start_server(&server_config, state, gateway_cancel.clone()).await;
        if let Err(ref e) = result {
            error!(error = %e, "gateway stopped");
        }
        gateway_cancel.cancel();
        result
    });

    let engine_result = engine.run(cancel.clone()).await;
    cancel.cancel();

    match gateway.await {
        Ok(result) => result?,
        Err(e) => {
            return Err(KvittoError::Internal(format!("gateway task panicked: {e}")));
        }
    }
    engine_result?;

    // Teardown: release the channel first so no sends race the close.
    channel.shutdown().await?;
    repo.close().await?;

    info!("kvitto serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kvitto={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
