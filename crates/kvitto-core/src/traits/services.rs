// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thin client traits for the outbound service collaborators: the receipt
//! renderer, the logo media host, and the payment provider.

use crate::error::KvittoError;
use crate::types::{RenderRequest, RenderedReceipt, VirtualAccount};
use async_trait::async_trait;

/// Turns a structured render request into fetched image/document bytes.
#[async_trait]
pub trait ReceiptRenderer: Send + Sync + 'static {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedReceipt, KvittoError>;
}

/// Stores an uploaded image and returns its hosted URL.
#[async_trait]
pub trait MediaHost: Send + Sync + 'static {
    async fn upload_image(&self, bytes: &[u8], mime: &str) -> Result<String, KvittoError>;
}

/// Provisions dedicated virtual accounts for subscription payments.
#[async_trait]
pub trait PaymentProvider: Send + Sync + 'static {
    /// Create (or re-create) a dedicated account for the given user. The
    /// returned reference is the primary lookup subject for confirmation
    /// webhooks.
    async fn provision_account(
        &self,
        address: &str,
        display_name: &str,
    ) -> Result<VirtualAccount, KvittoError>;
}
