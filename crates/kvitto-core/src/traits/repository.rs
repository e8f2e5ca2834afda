// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable record store interface.
//!
//! The repository is the single source of truth for users and receipts. The
//! engine re-reads records at the start of every event and writes back
//! through the narrow per-field-group methods below, never a whole-record
//! overwrite, so a payment confirmation and a conversation event racing on
//! the same user record stay last-writer-wins per field.

use crate::error::KvittoError;
use crate::types::{
    BrandProfile, OutputFormat, ReceiptFields, ReceiptRecord, UserRecord, VirtualAccount,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Keyed find/insert/update over users and receipts.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    /// Open connections and run pending migrations.
    async fn initialize(&self) -> Result<(), KvittoError>;

    /// Close connections. Called once during graceful shutdown.
    async fn close(&self) -> Result<(), KvittoError>;

    // ---- Users ----

    async fn find_user(&self, address: &str) -> Result<Option<UserRecord>, KvittoError>;

    async fn find_user_by_payment_reference(
        &self,
        reference: &str,
    ) -> Result<Option<UserRecord>, KvittoError>;

    async fn insert_user(&self, user: &UserRecord) -> Result<(), KvittoError>;

    /// Write the brand-profile field group collected by the setup flow.
    async fn update_brand_profile(
        &self,
        address: &str,
        profile: &BrandProfile,
    ) -> Result<(), KvittoError>;

    async fn set_logo_url(&self, address: &str, url: &str) -> Result<(), KvittoError>;

    async fn set_output_format(
        &self,
        address: &str,
        format: OutputFormat,
    ) -> Result<(), KvittoError>;

    /// Record a provisioned virtual account (number, bank, reference).
    async fn set_virtual_account(
        &self,
        address: &str,
        account: &VirtualAccount,
    ) -> Result<(), KvittoError>;

    /// Mark the user paid. `paid_until` is `None` only for legacy lifetime
    /// records; annual confirmations always carry the new expiry.
    async fn mark_paid(
        &self,
        address: &str,
        paid_until: Option<DateTime<Utc>>,
    ) -> Result<(), KvittoError>;

    /// Atomically add one to the free-receipt counter, returning the new
    /// value. The paywall check compares this value to the trial limit.
    async fn increment_receipts_used(&self, address: &str) -> Result<i64, KvittoError>;

    /// Atomically add one to the free-edit counter, returning the new value.
    async fn increment_edits_used(&self, address: &str) -> Result<i64, KvittoError>;

    /// All user records, newest first. Admin surface only.
    async fn list_users(&self) -> Result<Vec<UserRecord>, KvittoError>;

    // ---- Receipts ----

    async fn insert_receipt(&self, receipt: &ReceiptRecord) -> Result<(), KvittoError>;

    async fn get_receipt(&self, id: &str) -> Result<Option<ReceiptRecord>, KvittoError>;

    /// The owner's most recently created receipt, if any.
    async fn latest_receipt(&self, owner: &str) -> Result<Option<ReceiptRecord>, KvittoError>;

    /// Write the mutable receipt field group (edit flow). The id and owner
    /// never change. Errors with [`KvittoError::ReceiptNotFound`] when the
    /// id does not exist.
    async fn update_receipt_fields(
        &self,
        id: &str,
        fields: &ReceiptFields,
    ) -> Result<(), KvittoError>;

    /// Total number of receipts across all users. Admin surface only.
    async fn count_receipts(&self) -> Result<i64, KvittoError>;
}
