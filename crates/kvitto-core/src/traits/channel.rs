// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging-transport traits.
//!
//! The engine only ever sees [`ChannelAdapter`]: inbound events in delivery
//! order, outbound sends with delivery hints. Webhook-fed transports
//! additionally implement [`ChannelIngest`] so the HTTP boundary can hand
//! them raw provider payloads without knowing their wire format.

use crate::error::KvittoError;
use crate::types::{InboundEvent, OutboundMessage};
use async_trait::async_trait;

use super::ServiceAdapter;

/// A connected messaging transport.
#[async_trait]
pub trait ChannelAdapter: ServiceAdapter {
    /// Establish the transport connection. Must be called before
    /// [`Self::receive`].
    async fn connect(&self) -> Result<(), KvittoError>;

    /// Deliver one outbound message. Failure is reported to the caller and
    /// logged; the engine does not retry.
    async fn send(&self, message: OutboundMessage) -> Result<(), KvittoError>;

    /// Wait for the next inbound event. Events from one sender arrive in
    /// delivery order. Errors mean the transport is gone.
    async fn receive(&self) -> Result<InboundEvent, KvittoError>;
}

/// Webhook ingestion surface for HTTP-fed transports.
#[async_trait]
pub trait ChannelIngest: Send + Sync + 'static {
    /// Verify (when a signature and secret are in play) and parse one raw
    /// webhook body, enqueueing any inbound events it carries. Returns the
    /// number of events accepted.
    async fn ingest(&self, signature: Option<&str>, body: &[u8]) -> Result<usize, KvittoError>;

    /// The token the provider must echo in the subscription handshake.
    fn verify_token(&self) -> &str;
}
