// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock messaging transport for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with injectable inbound events
//! and captured outbound messages for assertion in tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use kvitto_core::{
    AdapterKind, ChannelAdapter, HealthStatus, InboundEvent, KvittoError, OutboundMessage,
    ServiceAdapter,
};

/// A mock messaging transport.
///
/// Two queues: events injected with [`MockChannel::inject`] come back out of
/// `receive()`, and everything passed to `send()` is captured for
/// [`MockChannel::sent_messages`].
pub struct MockChannel {
    inbound: Arc<Mutex<VecDeque<InboundEvent>>>,
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    notify: Arc<Notify>,
    fail_sends: AtomicBool,
}

impl MockChannel {
    /// A channel whose sends all succeed.
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            fail_sends: AtomicBool::new(false),
        }
    }

    /// A channel whose sends all fail. Nothing is captured.
    pub fn failing() -> Self {
        let channel = Self::new();
        channel.fail_sends.store(true, Ordering::SeqCst);
        channel
    }

    /// Flip send behavior mid-test.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Queue an inbound event; the next `receive()` call returns it.
    pub async fn inject(&self, event: InboundEvent) {
        self.inbound.lock().await.push_back(event);
        self.notify.notify_one();
    }

    /// Everything sent through this channel, in send order.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, KvittoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), KvittoError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    async fn connect(&self) -> Result<(), KvittoError> {
        Ok(())
    }

    async fn send(&self, message: OutboundMessage) -> Result<(), KvittoError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(KvittoError::Channel {
                message: "mock send failure".to_string(),
                source: None,
            });
        }
        self.sent.lock().await.push(message);
        Ok(())
    }

    async fn receive(&self) -> Result<InboundEvent, KvittoError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(event) = queue.pop_front() {
                    return Ok(event);
                }
            }
            // Wait until something is injected.
            self.notify.notified().await;
        }
    }
}
