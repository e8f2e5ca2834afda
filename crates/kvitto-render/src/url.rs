// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Render URL construction.
//!
//! A receipt is never drawn locally: the content goes into the query string
//! of a hosted template page, and the screenshot service is pointed at that
//! page. The page URL must therefore be fully percent-encoded before it is
//! embedded as the trailing segment of the screenshot URL.

use kvitto_config::RenderConfig;
use kvitto_core::{KvittoError, RenderRequest};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Url;

/// The template page URL carrying the receipt content.
///
/// `base` is treated as a directory URL; the page is `template.{n}.html`
/// under it. Absent brand fields are omitted rather than sent empty so the
/// page can fall back to its own defaults.
pub(crate) fn page_url(base: &str, request: &RenderRequest) -> Result<Url, KvittoError> {
    let base = base.trim_end_matches('/');
    let page = format!("{base}/template.{}.html", request.template);

    let mut params: Vec<(&str, String)> = vec![("business", request.business_name.clone())];
    if let Some(color) = &request.brand_color {
        params.push(("color", color.clone()));
    }
    if let Some(logo) = &request.logo_url {
        params.push(("logo", logo.clone()));
    }
    if let Some(address) = &request.business_address {
        params.push(("address", address.clone()));
    }
    if let Some(phone) = &request.contact_phone {
        params.push(("phone", phone.clone()));
    }
    params.push(("customer", request.customer_name.clone()));
    params.push(("items", request.items.join(",")));
    params.push(("prices", request.prices.join(",")));
    params.push(("total", request.total.clone()));
    params.push(("date", request.issued_at.to_rfc3339()));
    params.push(("rid", request.receipt_id.clone()));

    Url::parse_with_params(&page, &params)
        .map_err(|e| KvittoError::render(format!("invalid template page URL {page:?}"), e))
}

/// The screenshot-service URL for one render: API key, viewport width, a
/// fixed no-crop setting, the output selector, then the encoded page URL.
pub(crate) fn screenshot_url(
    config: &RenderConfig,
    request: &RenderRequest,
) -> Result<String, KvittoError> {
    let page = page_url(&config.template_base_url, request)?;
    let encoded = utf8_percent_encode(page.as_str(), NON_ALPHANUMERIC);
    let base = config.screenshot_base_url.trim_end_matches('/');
    Ok(format!(
        "{base}/get/auth/{key}/width/{width}/crop/0/{format}/{encoded}",
        key = config.api_key,
        width = config.width,
        format = request.format,
    ))
}
