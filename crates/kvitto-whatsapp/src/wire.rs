// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cloud API wire formats.
//!
//! Inbound: the webhook envelope (`entry` / `changes` / `value` nesting) as
//! Meta delivers it, with every list defaulting to empty so status-only
//! deliveries deserialize cleanly. Outbound: the `/messages` payload with
//! exactly one of `text`, `image`, or `document` populated.

use serde::{Deserialize, Serialize};

// ---- Inbound ----

#[derive(Debug, Deserialize)]
pub(crate) struct WebhookEnvelope {
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Entry {
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Change {
    pub value: ChangeValue,
}

/// Message deliveries carry `messages`; read receipts and delivery updates
/// carry `statuses` instead and are of no interest here.
#[derive(Debug, Deserialize)]
pub(crate) struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InboundMessage {
    pub from: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<TextBody>,
    pub image: Option<MediaRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextBody {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MediaRef {
    pub id: String,
    pub mime_type: Option<String>,
}

// ---- Media endpoints ----

/// Response of `GET /{media_id}`: a short-lived download URL.
#[derive(Debug, Deserialize)]
pub(crate) struct MediaLookup {
    pub url: String,
}

/// Response of `POST /{phone_number_id}/media`.
#[derive(Debug, Deserialize)]
pub(crate) struct MediaUpload {
    pub id: String,
}

// ---- Outbound ----

#[derive(Debug, Serialize)]
pub(crate) struct OutboundPayload<'a> {
    pub messaging_product: &'static str,
    pub to: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<OutboundText<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<OutboundMediaBody<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<OutboundMediaBody<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OutboundText<'a> {
    pub body: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct OutboundMediaBody<'a> {
    /// Uploaded-media handle from the `/media` endpoint.
    pub id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<&'a str>,
}

impl<'a> OutboundPayload<'a> {
    pub fn text(to: &'a str, body: &'a str) -> Self {
        Self {
            messaging_product: "whatsapp",
            to,
            kind: "text",
            text: Some(OutboundText { body }),
            image: None,
            document: None,
        }
    }

    pub fn image(to: &'a str, media_id: &'a str, caption: Option<&'a str>) -> Self {
        Self {
            messaging_product: "whatsapp",
            to,
            kind: "image",
            text: None,
            image: Some(OutboundMediaBody {
                id: media_id,
                caption,
                filename: None,
            }),
            document: None,
        }
    }

    pub fn document(
        to: &'a str,
        media_id: &'a str,
        caption: Option<&'a str>,
        filename: &'a str,
    ) -> Self {
        Self {
            messaging_product: "whatsapp",
            to,
            kind: "document",
            text: None,
            image: None,
            document: Some(OutboundMediaBody {
                id: media_id,
                caption,
                filename: Some(filename),
            }),
        }
    }
}
