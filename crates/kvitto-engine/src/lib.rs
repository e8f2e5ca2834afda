// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation engine for the Kvitto receipt bot.
//!
//! The engine pulls inbound events off the messaging channel and routes
//! them to per-user session workers ([`session::SessionStore`]). Each
//! worker runs the pure transition function in [`step`] against a fresh
//! repository snapshot, queues the replies it produces, and carries out the
//! returned effects: persisting drafts, rendering and delivering receipts,
//! provisioning payment accounts.
//!
//! Payment confirmations enter through [`paywall::PaywallReconciler`],
//! which is driven by the HTTP gateway rather than the channel loop.

use std::sync::Arc;

use kvitto_config::BotConfig;
use kvitto_core::{
    ChannelAdapter, KvittoError, MediaHost, PaymentProvider, ReceiptRenderer, Repository,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub mod command;
pub mod flow;
pub mod lifecycle;
pub mod paywall;
mod prompt;
pub mod session;
pub mod shutdown;
pub mod step;

pub use command::Command;
pub use flow::Flow;
pub use lifecycle::{EditChange, NewReceiptData};
pub use paywall::{
    evaluate_access, evaluate_edit_access, AccessDecision, BlockReason, PaywallReconciler,
    ReconcileOutcome,
};
pub use session::SessionStore;
pub use step::{step, Effect, Outcome, UserView};

use session::WorkerCtx;

/// The channel-driven conversation loop.
pub struct Engine {
    channel: Arc<dyn ChannelAdapter>,
    sessions: Arc<SessionStore>,
}

impl Engine {
    pub fn new(
        repo: Arc<dyn Repository>,
        channel: Arc<dyn ChannelAdapter>,
        renderer: Arc<dyn ReceiptRenderer>,
        media: Arc<dyn MediaHost>,
        payments: Arc<dyn PaymentProvider>,
        bot: BotConfig,
    ) -> Self {
        let ctx = Arc::new(WorkerCtx {
            repo,
            channel: channel.clone(),
            renderer,
            media,
            payments,
            bot,
        });
        Self {
            channel,
            sessions: Arc::new(SessionStore::new(ctx)),
        }
    }

    /// The session router, for surfaces that inject events directly.
    pub fn sessions(&self) -> Arc<SessionStore> {
        self.sessions.clone()
    }

    /// Receive inbound events until the channel fails or shutdown is
    /// requested. Session workers drain naturally once this returns and
    /// the process tears down.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), KvittoError> {
        info!("conversation engine running");
        loop {
            tokio::select! {
                event = self.channel.receive() => match event {
                    Ok(event) => self.sessions.dispatch(event),
                    Err(e) => {
                        error!(error = %e, "channel receive failed; stopping engine");
                        break;
                    }
                },
                _ = cancel.cancelled() => {
                    info!("shutdown requested; stopping engine");
                    break;
                }
            }
        }
        info!(
            active_sessions = self.sessions.active_sessions(),
            "conversation engine stopped"
        );
        Ok(())
    }
}
