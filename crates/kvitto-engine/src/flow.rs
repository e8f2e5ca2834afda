// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation flow states and in-flight drafts.
//!
//! The session state is one tagged union: a draft only exists inside the
//! flow variant that is collecting it, so "no active flow" structurally
//! means "no draft to discard".

/// Brand-setup fields, asked in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupField {
    BusinessName,
    BrandColor,
    BusinessAddress,
    ContactPhone,
    Template,
    Format,
}

impl SetupField {
    fn label(&self) -> &'static str {
        match self {
            Self::BusinessName => "business_name",
            Self::BrandColor => "brand_color",
            Self::BusinessAddress => "business_address",
            Self::ContactPhone => "contact_phone",
            Self::Template => "template",
            Self::Format => "format",
        }
    }
}

/// Collected brand-setup answers. Fields fill front to back; the flow only
/// completes when every required one is present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetupDraft {
    pub business_name: Option<String>,
    pub brand_color: Option<String>,
    pub business_address: Option<String>,
    pub contact_phone: Option<String>,
    pub template: Option<u8>,
    pub output_format: Option<kvitto_core::OutputFormat>,
}

/// Receipt-creation fields, asked in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptField {
    CustomerName,
    Items,
    Prices,
    PaymentMethod,
}

impl ReceiptField {
    fn label(&self) -> &'static str {
        match self {
            Self::CustomerName => "customer_name",
            Self::Items => "items",
            Self::Prices => "prices",
            Self::PaymentMethod => "payment_method",
        }
    }
}

/// Collected receipt-creation answers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiptDraft {
    pub customer_name: Option<String>,
    pub items: Option<Vec<String>>,
    pub prices: Option<Vec<String>>,
    pub payment_method: Option<String>,
}

/// What the edit flow is currently collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    CustomerName,
    Items,
    Prices,
    PaymentMethod,
}

impl EditField {
    fn label(&self) -> &'static str {
        match self {
            Self::CustomerName => "customer_name",
            Self::Items => "items",
            Self::Prices => "prices",
            Self::PaymentMethod => "payment_method",
        }
    }
}

/// One user's conversation state.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Flow {
    /// No active flow. Unknown input gets the help menu.
    #[default]
    Idle,
    /// Walking through the brand-setup questions.
    Setup { awaiting: SetupField, draft: SetupDraft },
    /// Setup's terminal step: waiting for a logo image or `skip`.
    AwaitingLogo,
    /// Collecting a new receipt.
    NewReceipt {
        awaiting: ReceiptField,
        draft: ReceiptDraft,
    },
    /// Waiting for the edit-menu pick (1/2/3) against a fixed receipt.
    EditChoice { receipt_id: String },
    /// Collecting replacement values for one part of a receipt. `new_items`
    /// holds the item list while the matching prices are still pending.
    EditReceipt {
        receipt_id: String,
        awaiting: EditField,
        new_items: Option<Vec<String>>,
    },
    /// Paywall hit: waiting for a yes/no on the yearly fee.
    PaymentDecision,
}

impl std::fmt::Display for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Flow::Idle => write!(f, "idle"),
            Flow::Setup { awaiting, .. } => {
                write!(f, "awaiting_setup_field[{}]", awaiting.label())
            }
            Flow::AwaitingLogo => write!(f, "awaiting_logo_upload"),
            Flow::NewReceipt { awaiting, .. } => {
                write!(f, "awaiting_receipt_field[{}]", awaiting.label())
            }
            Flow::EditChoice { .. } => write!(f, "awaiting_edit_choice"),
            Flow::EditReceipt { awaiting, .. } => {
                write!(f, "awaiting_edit_field[{}]", awaiting.label())
            }
            Flow::PaymentDecision => write!(f, "awaiting_payment_decision"),
        }
    }
}

impl Flow {
    /// Whether this state holds a partially collected draft.
    pub fn has_draft(&self) -> bool {
        matches!(
            self,
            Flow::Setup { .. }
                | Flow::NewReceipt { .. }
                | Flow::EditChoice { .. }
                | Flow::EditReceipt { .. }
        )
    }
}
