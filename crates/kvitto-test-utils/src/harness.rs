// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Full-stack test harness.
//!
//! `TestHarness` assembles the real engine over a temp SQLite database and
//! the mock collaborators, then runs the channel loop exactly as production
//! does. Tests drive it by injecting events into the mock channel and
//! asserting on what comes back out.

use std::sync::Arc;

use kvitto_config::{BotConfig, StorageConfig};
use kvitto_core::{
    InboundEvent, InboundMedia, InboundPayload, KvittoError, OutboundMessage, Repository,
    UserRecord,
};
use kvitto_engine::{Engine, PaywallReconciler};
use kvitto_store::SqliteRepository;
use tokio_util::sync::CancellationToken;

use crate::mock_channel::MockChannel;
use crate::mock_services::{MockMediaHost, MockPaymentProvider, MockRenderer};

/// Builder for a harness with swapped-in mock variants.
pub struct TestHarnessBuilder {
    channel: MockChannel,
    renderer: MockRenderer,
    media: MockMediaHost,
    payments: MockPaymentProvider,
    admins: Vec<String>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            channel: MockChannel::new(),
            renderer: MockRenderer::new(),
            media: MockMediaHost::new(),
            payments: MockPaymentProvider::new(),
            admins: Vec::new(),
        }
    }

    /// Swap in a configured renderer (delayed, failing).
    pub fn with_renderer(mut self, renderer: MockRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_channel(mut self, channel: MockChannel) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_media(mut self, media: MockMediaHost) -> Self {
        self.media = media;
        self
    }

    pub fn with_payments(mut self, payments: MockPaymentProvider) -> Self {
        self.payments = payments;
        self
    }

    /// Grant an address administrator powers.
    pub fn with_admin(mut self, address: impl Into<String>) -> Self {
        self.admins.push(address.into());
        self
    }

    /// Open the temp database, assemble the engine, and start the channel
    /// loop.
    pub async fn build(self) -> Result<TestHarness, KvittoError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| KvittoError::Storage {
            source: Box::new(e),
        })?;
        let repo = Arc::new(SqliteRepository::new(StorageConfig {
            database_path: temp_dir
                .path()
                .join("kvitto-test.db")
                .to_string_lossy()
                .into_owned(),
            wal_mode: true,
        }));
        repo.initialize().await?;

        let channel = Arc::new(self.channel);
        let renderer = Arc::new(self.renderer);
        let media = Arc::new(self.media);
        let payments = Arc::new(self.payments);

        let bot = BotConfig {
            admin_addresses: self.admins,
            reply_delay_ms: 0,
            reply_jitter_ms: 0,
            ..BotConfig::default()
        };

        let engine = Engine::new(
            repo.clone(),
            channel.clone(),
            renderer.clone(),
            media.clone(),
            payments.clone(),
            bot,
        );
        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        tokio::spawn(async move {
            let _ = engine.run(loop_cancel).await;
        });

        Ok(TestHarness {
            repo,
            channel,
            renderer,
            media,
            payments,
            cancel,
            _temp_dir: temp_dir,
        })
    }
}

/// A running engine over temp storage and mock collaborators.
pub struct TestHarness {
    pub repo: Arc<SqliteRepository>,
    pub channel: Arc<MockChannel>,
    pub renderer: Arc<MockRenderer>,
    pub media: Arc<MockMediaHost>,
    pub payments: Arc<MockPaymentProvider>,
    cancel: CancellationToken,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with all-default mocks.
    pub async fn start() -> Result<Self, KvittoError> {
        Self::builder().build().await
    }

    /// Inject a text message from the given sender.
    pub async fn send_text(&self, address: &str, text: &str) {
        self.channel
            .inject(InboundEvent {
                sender: address.to_string(),
                payload: InboundPayload::Text(text.to_string()),
            })
            .await;
    }

    /// Inject an image message from the given sender.
    pub async fn send_image(&self, address: &str) {
        self.channel
            .inject(InboundEvent {
                sender: address.to_string(),
                payload: InboundPayload::Image(InboundMedia {
                    bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
                    mime: "image/jpeg".to_string(),
                }),
            })
            .await;
    }

    /// Block until at least `count` messages have been sent, then return
    /// them all. Panics after a generous deadline so a hung test fails with
    /// the capture so far instead of timing out silently.
    pub async fn wait_for_sends(&self, count: usize) -> Vec<OutboundMessage> {
        for _ in 0..600 {
            if self.channel.sent_count().await >= count {
                return self.channel.sent_messages().await;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!(
            "timed out waiting for {count} sends; captured {:?}",
            self.channel.sent_messages().await
        );
    }

    /// Insert a user record directly, bypassing the conversation.
    pub async fn seed_user(&self, user: &UserRecord) -> Result<(), KvittoError> {
        self.repo.insert_user(user).await
    }

    /// A reconciler wired to this harness's repository and channel, as the
    /// payment webhook route would construct it.
    pub fn reconciler(&self) -> PaywallReconciler {
        PaywallReconciler::new(self.repo.clone(), self.channel.clone())
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
