// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Kvitto integration tests.
//!
//! Provides mock adapters and a full-stack harness for fast, deterministic,
//! CI-runnable tests without WhatsApp, a renderer, a media host, or a
//! payment provider on the other end.
//!
//! # Components
//!
//! - [`MockChannel`] - messaging transport with event injection and send capture
//! - [`MockRenderer`] / [`MockMediaHost`] / [`MockPaymentProvider`] - canned
//!   service collaborators with configurable delay and failure modes
//! - [`TestHarness`] - engine + temp SQLite + mocks, driven like production

pub mod harness;
pub mod mock_channel;
pub mod mock_services;

pub use harness::TestHarness;
pub use mock_channel::MockChannel;
pub use mock_services::{MockMediaHost, MockPaymentProvider, MockRenderer};
