// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook signature verification.
//!
//! Meta signs each webhook delivery with HMAC-SHA256 over the raw body,
//! sent as `X-Hub-Signature-256: sha256=<hex>`. Verification must run on
//! the exact bytes received, before any JSON parsing.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Check a `sha256=<hex>` signature header against the raw body.
///
/// Any malformed header shape fails closed. The final comparison is
/// constant-time.
pub(crate) fn verify_signature(app_secret: &str, signature_header: &str, body: &[u8]) -> bool {
    let Some(signature) = signature_header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
