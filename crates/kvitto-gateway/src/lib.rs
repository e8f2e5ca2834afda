// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Kvitto receipt bot.
//!
//! Serves the webhook surface both providers push into: the messaging
//! channel's verification handshake and event deliveries, and the payment
//! provider's confirmation webhooks. Alongside those it exposes a
//! shared-secret admin export, a public receipt-verification lookup, and a
//! liveness endpoint. Conversation traffic flows through
//! [`kvitto_core::ChannelIngest`] into the engine's inbound queue; payment
//! confirmations go straight to the paywall reconciler and never touch a
//! live session.

pub mod handlers;
pub mod server;

pub use server::{router, start_server, GatewayState, ServerConfig};
