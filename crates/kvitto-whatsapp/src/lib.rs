// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp channel adapter for the Kvitto receipt bot.
//!
//! Implements [`ChannelAdapter`] against the Meta Cloud API: outbound text
//! and media via the `/messages` endpoint (media uploaded first), inbound
//! events via [`ChannelIngest`] fed raw webhook bodies by the HTTP gateway.
//! Webhook signatures are verified with the app secret when one is
//! configured.

mod media;
mod signature;
mod wire;

use std::time::Duration;

use async_trait::async_trait;
use kvitto_config::model::WhatsAppConfig;
use kvitto_core::traits::{ChannelAdapter, ChannelIngest, ServiceAdapter};
use kvitto_core::types::{
    AdapterKind, HealthStatus, InboundEvent, InboundMedia, InboundPayload, OutboundBody,
    OutboundMessage,
};
use kvitto_core::KvittoError;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// WhatsApp Cloud API adapter implementing [`ChannelAdapter`].
///
/// The Cloud API pushes inbound traffic over webhooks, so there is no
/// polling task: the gateway calls [`ChannelIngest::ingest`] with each raw
/// delivery and [`ChannelAdapter::receive`] drains the resulting queue.
pub struct WhatsAppChannel {
    client: reqwest::Client,
    config: WhatsAppConfig,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundEvent>>,
    inbound_tx: mpsc::Sender<InboundEvent>,
}

impl WhatsAppChannel {
    /// Creates a new WhatsApp channel adapter.
    ///
    /// Requires `whatsapp.access_token`, `whatsapp.phone_number_id`, and
    /// `whatsapp.verify_token` to be set.
    pub fn new(config: WhatsAppConfig) -> Result<Self, KvittoError> {
        if config.access_token.is_empty() {
            return Err(KvittoError::Config(
                "whatsapp.access_token is required for the WhatsApp adapter".into(),
            ));
        }
        if config.phone_number_id.is_empty() {
            return Err(KvittoError::Config(
                "whatsapp.phone_number_id is required for the WhatsApp adapter".into(),
            ));
        }
        if config.verify_token.is_empty() {
            return Err(KvittoError::Config(
                "whatsapp.verify_token is required for the WhatsApp adapter".into(),
            ));
        }

        let mut auth = reqwest::header::HeaderValue::from_str(&format!(
            "Bearer {}",
            config.access_token
        ))
        .map_err(|_| {
            KvittoError::Config("whatsapp.access_token contains invalid header characters".into())
        })?;
        auth.set_sensitive(true);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| KvittoError::channel("failed to build HTTP client", e))?;

        let (inbound_tx, inbound_rx) = mpsc::channel(100);

        Ok(Self {
            client,
            config,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/messages",
            self.config.api_base.trim_end_matches('/'),
            self.config.phone_number_id
        )
    }

    /// URL of the sender's phone-number object. A successful authenticated
    /// GET proves the token and the phone-number id both check out.
    fn credentials_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.phone_number_id
        )
    }

    async fn post_message(&self, payload: &wire::OutboundPayload<'_>) -> Result<(), KvittoError> {
        let response = self
            .client
            .post(self.messages_url())
            .json(payload)
            .send()
            .await
            .map_err(|e| KvittoError::channel("message send failed", e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KvittoError::Channel {
                message: format!("message send returned {status}: {body}"),
                source: None,
            });
        }
        Ok(())
    }

    /// Convert one wire message into an engine event, downloading image
    /// bytes as needed. Unsupported kinds and failed downloads yield `None`.
    async fn inbound_event(&self, message: wire::InboundMessage) -> Option<InboundEvent> {
        match message.kind.as_str() {
            "text" => {
                let text = message.text?;
                Some(InboundEvent {
                    sender: message.from,
                    payload: InboundPayload::Text(text.body),
                })
            }
            "image" => {
                let media_ref = message.image?;
                match media::download_media(&self.client, &self.config.api_base, &media_ref.id)
                    .await
                {
                    Ok(bytes) => Some(InboundEvent {
                        sender: message.from,
                        payload: InboundPayload::Image(InboundMedia {
                            bytes,
                            mime: media_ref
                                .mime_type
                                .unwrap_or_else(|| "image/jpeg".to_string()),
                        }),
                    }),
                    Err(e) => {
                        warn!(sender = %message.from, error = %e, "dropping image whose download failed");
                        None
                    }
                }
            }
            other => {
                debug!(sender = %message.from, kind = other, "ignoring unsupported message kind");
                None
            }
        }
    }
}

#[async_trait]
impl ServiceAdapter for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, KvittoError> {
        match self.client.get(self.credentials_url()).send().await {
            Ok(response) if response.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(response) => Ok(HealthStatus::Unhealthy(format!(
                "credential probe returned {}",
                response.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Cloud API unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), KvittoError> {
        debug!("WhatsApp channel shutting down");
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for WhatsAppChannel {
    async fn connect(&self) -> Result<(), KvittoError> {
        // Webhook-fed, so there is no connection to hold open. Probe the
        // credentials here so a bad token fails startup rather than the
        // first send.
        let response = self
            .client
            .get(self.credentials_url())
            .send()
            .await
            .map_err(|e| KvittoError::channel("Cloud API unreachable", e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KvittoError::Channel {
                message: format!("credential check returned {status}: {body}"),
                source: None,
            });
        }
        info!(
            phone_number_id = %self.config.phone_number_id,
            "WhatsApp Cloud API credentials verified"
        );
        Ok(())
    }

    async fn send(&self, message: OutboundMessage) -> Result<(), KvittoError> {
        match message.body {
            OutboundBody::Text { text } => {
                self.post_message(&wire::OutboundPayload::text(&message.recipient, &text))
                    .await?;
                debug!(recipient = %message.recipient, "sent text message");
            }
            OutboundBody::Media {
                bytes,
                mime,
                filename,
                caption,
            } => {
                let size = bytes.len();
                let upload_name = filename
                    .clone()
                    .unwrap_or_else(|| default_filename(&mime));
                let media_id = media::upload_media(
                    &self.client,
                    &self.config.api_base,
                    &self.config.phone_number_id,
                    bytes,
                    &mime,
                    &upload_name,
                )
                .await?;
                let payload = match &filename {
                    Some(name) => wire::OutboundPayload::document(
                        &message.recipient,
                        &media_id,
                        caption.as_deref(),
                        name,
                    ),
                    None => wire::OutboundPayload::image(
                        &message.recipient,
                        &media_id,
                        caption.as_deref(),
                    ),
                };
                self.post_message(&payload).await?;
                debug!(recipient = %message.recipient, size, mime, "sent media message");
            }
        }
        Ok(())
    }

    async fn receive(&self) -> Result<InboundEvent, KvittoError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or(KvittoError::Channel {
            message: "inbound channel closed".into(),
            source: None,
        })
    }
}

#[async_trait]
impl ChannelIngest for WhatsAppChannel {
    async fn ingest(&self, signature: Option<&str>, body: &[u8]) -> Result<usize, KvittoError> {
        if !self.config.app_secret.is_empty() {
            let verified = signature
                .is_some_and(|s| signature::verify_signature(&self.config.app_secret, s, body));
            if !verified {
                return Err(KvittoError::Channel {
                    message: "webhook signature rejected".into(),
                    source: None,
                });
            }
        }

        let envelope: wire::WebhookEnvelope = serde_json::from_slice(body)
            .map_err(|e| KvittoError::channel("undecodable webhook payload", e))?;

        let mut accepted = 0usize;
        let messages = envelope
            .entry
            .into_iter()
            .flat_map(|e| e.changes)
            .flat_map(|c| c.value.messages);
        for message in messages {
            let Some(event) = self.inbound_event(message).await else {
                continue;
            };
            if self.inbound_tx.send(event).await.is_err() {
                return Err(KvittoError::Channel {
                    message: "inbound channel closed".into(),
                    source: None,
                });
            }
            accepted += 1;
        }
        Ok(accepted)
    }

    fn verify_token(&self) -> &str {
        &self.config.verify_token
    }
}

/// Part name for uploads that arrive without one, e.g. `upload.png`.
fn default_filename(mime: &str) -> String {
    let ext = mime.rsplit('/').next().unwrap_or("bin");
    format!("upload.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmac::Mac;
    use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(api_base: String) -> WhatsAppConfig {
        WhatsAppConfig {
            api_base,
            access_token: "token-123".to_string(),
            phone_number_id: "42".to_string(),
            verify_token: "echo-me".to_string(),
            app_secret: String::new(),
        }
    }

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac =
            hmac::Hmac::<sha2::Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn text_envelope(from: &str, body: &str) -> Vec<u8> {
        serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "1",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "messages": [{
                            "from": from,
                            "id": "wamid.1",
                            "type": "text",
                            "text": {"body": body}
                        }]
                    }
                }]
            }]
        })
        .to_string()
        .into_bytes()
    }

    #[tokio::test]
    async fn send_text_posts_the_cloud_api_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/42/messages"))
            .and(header("authorization", "Bearer token-123"))
            .and(body_partial_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "to": "2348012345678",
                "type": "text",
                "text": {"body": "Hello!"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{"id": "wamid.out.1"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let channel = WhatsAppChannel::new(config(server.uri())).unwrap();
        channel
            .send(OutboundMessage::text("2348012345678", "Hello!"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn media_with_a_filename_goes_out_as_a_document() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/42/media"))
            .and(body_string_contains("messaging_product"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "media-7"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/42/messages"))
            .and(body_partial_json(serde_json::json!({
                "type": "document",
                "document": {
                    "id": "media-7",
                    "filename": "kvitto-receipt.pdf",
                    "caption": "Here is the receipt for Ada."
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{"id": "wamid.out.2"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let channel = WhatsAppChannel::new(config(server.uri())).unwrap();
        channel
            .send(OutboundMessage::media(
                "2348012345678",
                b"%PDF-1.7".to_vec(),
                "application/pdf",
                Some("kvitto-receipt.pdf".to_string()),
                Some("Here is the receipt for Ada.".to_string()),
            ))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn media_without_a_filename_goes_out_as_an_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/42/media"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "media-8"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/42/messages"))
            .and(body_partial_json(serde_json::json!({
                "type": "image",
                "image": {"id": "media-8"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{"id": "wamid.out.3"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let channel = WhatsAppChannel::new(config(server.uri())).unwrap();
        channel
            .send(OutboundMessage::media(
                "2348012345678",
                vec![0x89, 0x50, 0x4e, 0x47],
                "image/png",
                None,
                None,
            ))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn send_failure_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string(r#"{"error":"bad token"}"#),
            )
            .mount(&server)
            .await;

        let channel = WhatsAppChannel::new(config(server.uri())).unwrap();
        let err = channel
            .send(OutboundMessage::text("2348012345678", "Hello!"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"), "got: {err}");
        assert!(err.is_external());
    }

    #[tokio::test]
    async fn ingest_round_trips_a_text_message() {
        let server = MockServer::start().await;
        let channel = WhatsAppChannel::new(config(server.uri())).unwrap();

        let accepted = channel
            .ingest(None, &text_envelope("2348012345678", "new receipt"))
            .await
            .unwrap();
        assert_eq!(accepted, 1);

        let event = channel.receive().await.unwrap();
        assert_eq!(event.sender, "2348012345678");
        assert_eq!(
            event.payload,
            InboundPayload::Text("new receipt".to_string())
        );
    }

    #[tokio::test]
    async fn ingest_downloads_inbound_images() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media-55"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "url": format!("{}/file/logo", server.uri())
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/file/logo"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"logobytes".to_vec()))
            .mount(&server)
            .await;

        let channel = WhatsAppChannel::new(config(server.uri())).unwrap();
        let body = serde_json::json!({
            "entry": [{"changes": [{"value": {"messages": [{
                "from": "2348012345678",
                "id": "wamid.2",
                "type": "image",
                "image": {"id": "media-55", "mime_type": "image/png"}
            }]}}]}]
        })
        .to_string()
        .into_bytes();

        let accepted = channel.ingest(None, &body).await.unwrap();
        assert_eq!(accepted, 1);

        let event = channel.receive().await.unwrap();
        assert_eq!(
            event.payload,
            InboundPayload::Image(InboundMedia {
                bytes: b"logobytes".to_vec(),
                mime: "image/png".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn status_only_deliveries_accept_zero_events() {
        let server = MockServer::start().await;
        let channel = WhatsAppChannel::new(config(server.uri())).unwrap();

        let body = serde_json::json!({
            "entry": [{"changes": [{"value": {
                "statuses": [{"id": "wamid.3", "status": "delivered"}]
            }}]}]
        })
        .to_string()
        .into_bytes();
        assert_eq!(channel.ingest(None, &body).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn configured_secret_enforces_signatures() {
        let server = MockServer::start().await;
        let mut cfg = config(server.uri());
        cfg.app_secret = "s3cret".to_string();
        let channel = WhatsAppChannel::new(cfg).unwrap();
        let body = text_envelope("2348012345678", "hi");

        assert!(channel.ingest(None, &body).await.is_err());
        assert!(channel
            .ingest(Some("sha256=deadbeef"), &body)
            .await
            .is_err());

        let good = sign("s3cret", &body);
        assert_eq!(channel.ingest(Some(&good), &body).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn undecodable_webhook_body_is_an_error() {
        let server = MockServer::start().await;
        let channel = WhatsAppChannel::new(config(server.uri())).unwrap();
        assert!(channel.ingest(None, b"not json").await.is_err());
    }

    #[test]
    fn missing_credentials_fail_construction() {
        let mut cfg = config("https://graph.test".to_string());
        cfg.access_token = String::new();
        assert!(matches!(
            WhatsAppChannel::new(cfg),
            Err(KvittoError::Config(_))
        ));

        let mut cfg = config("https://graph.test".to_string());
        cfg.phone_number_id = String::new();
        assert!(WhatsAppChannel::new(cfg).is_err());

        let mut cfg = config("https://graph.test".to_string());
        cfg.verify_token = String::new();
        assert!(WhatsAppChannel::new(cfg).is_err());
    }

    #[test]
    fn verify_token_is_exposed_for_the_handshake() {
        let channel = WhatsAppChannel::new(config("https://graph.test".to_string())).unwrap();
        assert_eq!(channel.verify_token(), "echo-me");
    }
}
