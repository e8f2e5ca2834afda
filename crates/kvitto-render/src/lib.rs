// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Receipt rendering through an external screenshot service.
//!
//! Kvitto never draws a receipt itself. Each brand template is a hosted HTML
//! page; the renderer fills it through query parameters and asks the
//! screenshot service to fetch it as PNG or PDF bytes. [`ScreenshotRenderer`]
//! implements [`ReceiptRenderer`] on top of that scheme.

mod url;

use std::time::Duration;

use async_trait::async_trait;
use kvitto_config::RenderConfig;
use kvitto_core::{
    AdapterKind, HealthStatus, KvittoError, ReceiptRenderer, RenderRequest, RenderedReceipt,
    ServiceAdapter,
};
use tracing::debug;

/// Fetch timeout for one render. PDF generation on the service side can
/// take a while for image-heavy templates.
const RENDER_TIMEOUT: Duration = Duration::from_secs(60);

/// [`ReceiptRenderer`] backed by a thum.io-style screenshot service.
pub struct ScreenshotRenderer {
    client: reqwest::Client,
    config: RenderConfig,
}

impl ScreenshotRenderer {
    pub fn new(config: RenderConfig) -> Result<Self, KvittoError> {
        let client = reqwest::Client::builder()
            .timeout(RENDER_TIMEOUT)
            .build()
            .map_err(|e| KvittoError::render("failed to build HTTP client", e))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl ServiceAdapter for ScreenshotRenderer {
    fn name(&self) -> &str {
        "screenshot"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Renderer
    }

    async fn health_check(&self) -> Result<HealthStatus, KvittoError> {
        // A render consumes a service credit, so the probe only touches the
        // service root.
        match self.client.get(&self.config.screenshot_base_url).send().await {
            Ok(response) if response.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(response) => Ok(HealthStatus::Degraded(format!(
                "screenshot service returned {}",
                response.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "screenshot service unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), KvittoError> {
        Ok(())
    }
}

#[async_trait]
impl ReceiptRenderer for ScreenshotRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedReceipt, KvittoError> {
        let url = url::screenshot_url(&self.config, request)?;
        debug!(
            receipt = %request.receipt_id,
            template = request.template,
            format = %request.format,
            "fetching render"
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| KvittoError::render("screenshot request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KvittoError::Render {
                message: format!("screenshot service returned {status}: {body}"),
                source: None,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| KvittoError::render("failed to read rendered bytes", e))?;
        if bytes.is_empty() {
            return Err(KvittoError::Render {
                message: "screenshot service returned an empty body".into(),
                source: None,
            });
        }

        debug!(receipt = %request.receipt_id, size = bytes.len(), "render fetched");
        Ok(RenderedReceipt {
            bytes: bytes.to_vec(),
            mime: request.format.mime().to_string(),
        })
    }
}
