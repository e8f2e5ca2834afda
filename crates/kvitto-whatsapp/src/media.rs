// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media transfer against the Cloud API.
//!
//! Inbound images arrive as a media id that must be resolved to a
//! short-lived download URL and then fetched; outbound renders are uploaded
//! first and sent by the returned handle. The client passed in carries the
//! bearer token as a default header.

use kvitto_core::KvittoError;
use tracing::debug;

use crate::wire::{MediaLookup, MediaUpload};

/// Resolve a media id and fetch its bytes.
pub(crate) async fn download_media(
    client: &reqwest::Client,
    api_base: &str,
    media_id: &str,
) -> Result<Vec<u8>, KvittoError> {
    let lookup_url = format!("{}/{media_id}", api_base.trim_end_matches('/'));
    let response = client
        .get(&lookup_url)
        .send()
        .await
        .map_err(|e| KvittoError::channel("media lookup failed", e))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(KvittoError::Channel {
            message: format!("media lookup returned {status}: {body}"),
            source: None,
        });
    }
    let lookup: MediaLookup = response
        .json()
        .await
        .map_err(|e| KvittoError::channel("failed to parse media lookup", e))?;

    let response = client
        .get(&lookup.url)
        .send()
        .await
        .map_err(|e| KvittoError::channel("media download failed", e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(KvittoError::Channel {
            message: format!("media download returned {status}"),
            source: None,
        });
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| KvittoError::channel("failed to read media bytes", e))?;

    debug!(media_id, size = bytes.len(), "downloaded inbound media");
    Ok(bytes.to_vec())
}

/// Upload media bytes, returning the handle to send with.
pub(crate) async fn upload_media(
    client: &reqwest::Client,
    api_base: &str,
    phone_number_id: &str,
    bytes: Vec<u8>,
    mime: &str,
    filename: &str,
) -> Result<String, KvittoError> {
    let url = format!("{}/{phone_number_id}/media", api_base.trim_end_matches('/'));
    let size = bytes.len();
    let part = reqwest::multipart::Part::bytes(bytes)
        .file_name(filename.to_string())
        .mime_str(mime)
        .map_err(|e| KvittoError::channel(format!("invalid media mime {mime:?}"), e))?;
    let form = reqwest::multipart::Form::new()
        .text("messaging_product", "whatsapp")
        .part("file", part);

    let response = client
        .post(&url)
        .multipart(form)
        .send()
        .await
        .map_err(|e| KvittoError::channel("media upload failed", e))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(KvittoError::Channel {
            message: format!("media upload returned {status}: {body}"),
            source: None,
        });
    }
    let upload: MediaUpload = response
        .json()
        .await
        .map_err(|e| KvittoError::channel("failed to parse media upload response", e))?;

    debug!(media_id = %upload.id, size, mime, "uploaded outbound media");
    Ok(upload.id)
}
