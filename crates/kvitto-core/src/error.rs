// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unified error type for the Kvitto workspace.
//!
//! Every fallible operation across crates returns [`KvittoError`]. The
//! variants follow the failure taxonomy of the system: configuration problems
//! are fatal at startup, storage problems abort the current event, and the
//! external-service family (channel, renderer, media host, payment provider)
//! is caught at the call boundary and turned into a single user-facing
//! apology plus a session reset.

use std::error::Error as StdError;
use thiserror::Error;

/// Boxed error source used by variants that wrap third-party failures.
type BoxedError = Box<dyn StdError + Send + Sync>;

/// The unified error type for all Kvitto operations.
#[derive(Debug, Error)]
pub enum KvittoError {
    /// Configuration is missing or invalid. Fatal at startup; the process
    /// must not begin serving.
    #[error("configuration error: {0}")]
    Config(String),

    /// The repository (SQLite) failed.
    #[error("storage error: {source}")]
    Storage {
        #[source]
        source: BoxedError,
    },

    /// The messaging channel failed to deliver or receive.
    #[error("channel error: {message}")]
    Channel {
        message: String,
        #[source]
        source: Option<BoxedError>,
    },

    /// The receipt renderer failed or returned an unusable document.
    #[error("render error: {message}")]
    Render {
        message: String,
        #[source]
        source: Option<BoxedError>,
    },

    /// The media host rejected or failed an upload.
    #[error("media host error: {message}")]
    MediaHost {
        message: String,
        #[source]
        source: Option<BoxedError>,
    },

    /// The payment provider API failed.
    #[error("payment provider error: {message}")]
    Payments {
        message: String,
        #[source]
        source: Option<BoxedError>,
    },

    /// An edit or resend target no longer exists.
    #[error("receipt {id} not found")]
    ReceiptNotFound { id: String },

    /// Catch-all for violated internal invariants.
    #[error("internal error: {0}")]
    Internal(String),
}

impl KvittoError {
    /// Build a channel error with a source.
    pub fn channel(message: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        Self::Channel {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Build a renderer error with a source.
    pub fn render(message: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        Self::Render {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Build a media-host error with a source.
    pub fn media_host(message: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        Self::MediaHost {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Build a payment-provider error with a source.
    pub fn payments(message: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        Self::Payments {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Whether this error belongs to the external-service family, i.e. the
    /// conversation engine answers it with an apology and a session reset
    /// rather than propagating it.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Self::Channel { .. } | Self::Render { .. } | Self::MediaHost { .. } | Self::Payments { .. }
        )
    }
}
