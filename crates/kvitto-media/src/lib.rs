// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logo hosting through an imgbb-style media API.
//!
//! Uploaded logos must end up at a public URL because the receipt template
//! pages load them by reference. [`ImgbbMediaHost`] implements [`MediaHost`]
//! as a single multipart upload call: image bytes go up base64-encoded, the
//! hosted URL comes back.

use std::time::Duration;

use async_trait::async_trait;
use kvitto_config::MediaConfig;
use kvitto_core::{AdapterKind, HealthStatus, KvittoError, MediaHost, ServiceAdapter};
use serde::Deserialize;
use tracing::debug;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// [`MediaHost`] backed by the imgbb upload API.
pub struct ImgbbMediaHost {
    client: reqwest::Client,
    config: MediaConfig,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    data: Option<UploadData>,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    url: Option<String>,
    display_url: Option<String>,
}

impl ImgbbMediaHost {
    pub fn new(config: MediaConfig) -> Result<Self, KvittoError> {
        let client = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| KvittoError::media_host("failed to build HTTP client", e))?;
        Ok(Self { client, config })
    }

    fn upload_url(&self) -> String {
        format!("{}/upload", self.config.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl ServiceAdapter for ImgbbMediaHost {
    fn name(&self) -> &str {
        "imgbb"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::MediaHost
    }

    async fn health_check(&self) -> Result<HealthStatus, KvittoError> {
        // The API has no ping endpoint; any HTTP response means reachable.
        match self.client.get(&self.config.api_base).send().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "media host unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), KvittoError> {
        Ok(())
    }
}

#[async_trait]
impl MediaHost for ImgbbMediaHost {
    async fn upload_image(&self, bytes: &[u8], mime: &str) -> Result<String, KvittoError> {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        let form = reqwest::multipart::Form::new().text("image", encoded);

        debug!(size = bytes.len(), mime = %mime, "uploading logo");
        let response = self
            .client
            .post(self.upload_url())
            .query(&[("key", self.config.api_key.as_str())])
            .multipart(form)
            .send()
            .await
            .map_err(|e| KvittoError::media_host("upload request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KvittoError::MediaHost {
                message: format!("media host returned {status}: {body}"),
                source: None,
            });
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| KvittoError::media_host("failed to parse upload response", e))?;
        if !body.success {
            return Err(KvittoError::MediaHost {
                message: "media host reported an unsuccessful upload".into(),
                source: None,
            });
        }

        let url = body
            .data
            .and_then(|d| d.url.or(d.display_url))
            .ok_or_else(|| KvittoError::MediaHost {
                message: "upload response carried no hosted URL".into(),
                source: None,
            })?;
        debug!(url = %url, "logo hosted");
        Ok(url)
    }
}
