// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Kvitto workspace.
//!
//! `UserRecord` and `ReceiptRecord` mirror the repository schema; the
//! inbound/outbound message types are the channel boundary; `RenderRequest`
//! is the structured description handed to the external renderer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The collaborator families an adapter can belong to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    Channel,
    Repository,
    Renderer,
    MediaHost,
    Payments,
}

/// Result of an adapter health probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

/// Which subscription scheme governs a user record.
///
/// New records are always `Annual`; `Lifetime` exists only so records from
/// the earlier one-time-fee generation keep their access. The plan is an
/// explicit field, never inferred from the shape of other fields.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    /// Expiry-based access, extended one year per confirmed payment.
    Annual,
    /// Paid once, never expires. Legacy records only.
    Lifetime,
}

/// Receipt output format preference.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Pdf,
}

impl OutputFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Pdf => "pdf",
        }
    }

    /// MIME type for outbound media.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Pdf => "application/pdf",
        }
    }
}

/// A merchant's durable record, keyed by messaging address.
///
/// Created on the first inbound message from a new address and never deleted.
/// All writes are narrow per-field-group updates (see the `Repository`
/// trait); the whole record is only ever read, never written back wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Messaging address, e.g. `2348012345678`. Unique key.
    pub address: String,
    pub business_name: Option<String>,
    pub brand_color: Option<String>,
    pub logo_url: Option<String>,
    pub business_address: Option<String>,
    pub contact_phone: Option<String>,
    /// Receipt template selector, 1-based.
    pub template: u8,
    pub output_format: OutputFormat,
    /// Payment-provider reference, set once a virtual account is provisioned.
    pub payment_reference: Option<String>,
    pub account_number: Option<String>,
    pub bank_name: Option<String>,
    pub plan: SubscriptionPlan,
    pub is_paid: bool,
    /// Subscription expiry. `None` for unpaid users and lifetime records.
    pub paid_until: Option<DateTime<Utc>>,
    pub receipts_used: i64,
    pub edits_used: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// A fresh record for a first-time sender. Annual plan, empty brand
    /// profile, zeroed counters.
    pub fn new(address: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            address: address.into(),
            business_name: None,
            brand_color: None,
            logo_url: None,
            business_address: None,
            contact_phone: None,
            template: 1,
            output_format: OutputFormat::Png,
            payment_reference: None,
            account_number: None,
            bank_name: None,
            plan: SubscriptionPlan::Annual,
            is_paid: false,
            paid_until: None,
            receipts_used: 0,
            edits_used: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Business name when set, otherwise the messaging address.
    pub fn display_name(&self) -> &str {
        self.business_name.as_deref().unwrap_or(&self.address)
    }

    /// Whether paid access is currently active: lifetime records are active
    /// while paid; annual records need a future expiry.
    pub fn subscription_active(&self, now: DateTime<Utc>) -> bool {
        if !self.is_paid {
            return false;
        }
        match self.plan {
            SubscriptionPlan::Lifetime => true,
            SubscriptionPlan::Annual => self.paid_until.is_some_and(|until| until > now),
        }
    }

    /// Whether the brand-setup flow has been completed at least once.
    pub fn setup_complete(&self) -> bool {
        self.business_name.is_some()
    }
}

/// A persisted receipt. Items and prices are parallel lists of equal length;
/// prices and total are decimal texts, with the total recomputed server-side
/// at every write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptRecord {
    /// Generated id, stable across edits and resends.
    pub id: String,
    /// Owning user's messaging address.
    pub owner: String,
    pub customer_name: String,
    pub items: Vec<String>,
    pub prices: Vec<String>,
    pub payment_method: String,
    pub total: String,
    pub created_at: DateTime<Utc>,
}

impl ReceiptRecord {
    pub fn new(
        owner: impl Into<String>,
        customer_name: impl Into<String>,
        items: Vec<String>,
        prices: Vec<String>,
        payment_method: impl Into<String>,
        total: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner: owner.into(),
            customer_name: customer_name.into(),
            items,
            prices,
            payment_method: payment_method.into(),
            total: total.into(),
            created_at: Utc::now(),
        }
    }

    /// The mutable field group, as the repository update methods take it.
    pub fn fields(&self) -> ReceiptFields {
        ReceiptFields {
            customer_name: self.customer_name.clone(),
            items: self.items.clone(),
            prices: self.prices.clone(),
            payment_method: self.payment_method.clone(),
            total: self.total.clone(),
        }
    }
}

/// Brand-profile fields written in one group when the setup flow completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandProfile {
    pub business_name: String,
    pub brand_color: String,
    pub business_address: Option<String>,
    pub contact_phone: Option<String>,
    pub template: u8,
    pub output_format: OutputFormat,
}

/// Mutable receipt fields written in one group by the edit flow. The id and
/// owner are never part of an update.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptFields {
    pub customer_name: String,
    pub items: Vec<String>,
    pub prices: Vec<String>,
    pub payment_method: String,
    pub total: String,
}

/// A dedicated bank account provisioned for one user by the payment
/// provider. Transfers into it produce the confirmation webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualAccount {
    pub account_number: String,
    pub bank_name: String,
    pub reference: String,
}

/// One delivery from the messaging transport.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    /// Sender's messaging address.
    pub sender: String,
    pub payload: InboundPayload,
}

/// What the sender sent.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundPayload {
    Text(String),
    Image(InboundMedia),
}

/// Downloaded media bytes attached to an inbound event.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMedia {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// One message for the outbound dispatcher to deliver.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub recipient: String,
    pub body: OutboundBody,
}

/// Text, or media bytes with delivery hints. A filename marks the media as
/// a document; without one it is sent as an inline image.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundBody {
    Text { text: String },
    Media {
        bytes: Vec<u8>,
        mime: String,
        filename: Option<String>,
        caption: Option<String>,
    },
}

impl OutboundMessage {
    pub fn text(recipient: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            body: OutboundBody::Text { text: text.into() },
        }
    }

    pub fn media(
        recipient: impl Into<String>,
        bytes: Vec<u8>,
        mime: impl Into<String>,
        filename: Option<String>,
        caption: Option<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            body: OutboundBody::Media {
                bytes,
                mime: mime.into(),
                filename,
                caption,
            },
        }
    }
}

/// A normalized payment-provider confirmation. The HTTP boundary has already
/// verified structure (and authenticity, when configured); the reconciler
/// only needs the lookup subjects and the amount for logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentEvent {
    /// Provider reference assigned at virtual-account provisioning.
    pub reference: Option<String>,
    /// Payer phone number, the fallback lookup subject.
    pub phone: Option<String>,
    pub amount: Option<Decimal>,
}

impl PaymentEvent {
    /// Whether at least one lookup subject is present. Events without any
    /// are malformed and rejected at the HTTP boundary.
    pub fn has_subject(&self) -> bool {
        self.reference.is_some() || self.phone.is_some()
    }
}

/// Structured description handed to the external renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub template: u8,
    pub format: OutputFormat,
    pub business_name: String,
    pub brand_color: Option<String>,
    pub logo_url: Option<String>,
    pub business_address: Option<String>,
    pub contact_phone: Option<String>,
    pub receipt_id: String,
    pub customer_name: String,
    pub items: Vec<String>,
    pub prices: Vec<String>,
    pub total: String,
    pub issued_at: DateTime<Utc>,
}

impl RenderRequest {
    /// Assemble a render request from a user's brand profile and a receipt.
    pub fn assemble(user: &UserRecord, receipt: &ReceiptRecord) -> Self {
        Self {
            template: user.template,
            format: user.output_format,
            business_name: user.display_name().to_string(),
            brand_color: user.brand_color.clone(),
            logo_url: user.logo_url.clone(),
            business_address: user.business_address.clone(),
            contact_phone: user.contact_phone.clone(),
            receipt_id: receipt.id.clone(),
            customer_name: receipt.customer_name.clone(),
            items: receipt.items.clone(),
            prices: receipt.prices.clone(),
            total: receipt.total.clone(),
            issued_at: receipt.created_at,
        }
    }
}

/// Fetched render output ready for the outbound dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedReceipt {
    pub bytes: Vec<u8>,
    pub mime: String,
}
