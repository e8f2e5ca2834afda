// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment-provider integration.
//!
//! Two halves: [`VirtualAccountClient`] provisions a dedicated bank account
//! per user through the provider's REST API, and [`webhook`] turns the
//! provider's confirmation webhooks into normalized [`kvitto_core::PaymentEvent`]s
//! for the reconciler. Webhook authenticity is the HTTP gateway's concern;
//! nothing in this crate checks secrets on inbound payloads.

pub mod webhook;

use std::time::Duration;

use async_trait::async_trait;
use kvitto_config::PaymentsConfig;
use kvitto_core::{
    AdapterKind, HealthStatus, KvittoError, PaymentProvider, ServiceAdapter, VirtualAccount,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use webhook::{WebhookDisposition, interpret_webhook};

const PROVISION_TIMEOUT: Duration = Duration::from_secs(30);

/// [`PaymentProvider`] that reserves one virtual bank account per user.
///
/// The reference sent with the provisioning request is merchant-generated
/// (`KVT-{address}`) and becomes the primary lookup subject for
/// confirmation webhooks.
pub struct VirtualAccountClient {
    client: reqwest::Client,
    config: PaymentsConfig,
}

#[derive(Debug, Serialize)]
struct ProvisionRequest<'a> {
    businessid: &'a str,
    reference: &'a str,
    name: &'a str,
    phone: String,
}

#[derive(Debug, Deserialize)]
struct ProvisionResponse {
    account_number: String,
    bank_name: String,
    reference: Option<String>,
}

impl VirtualAccountClient {
    pub fn new(config: PaymentsConfig) -> Result<Self, KvittoError> {
        let client = reqwest::Client::builder()
            .timeout(PROVISION_TIMEOUT)
            .build()
            .map_err(|e| KvittoError::payments("failed to build HTTP client", e))?;
        Ok(Self { client, config })
    }

    fn provision_url(&self) -> String {
        format!(
            "{}/virtual-accounts",
            self.config.api_base.trim_end_matches('/')
        )
    }
}

/// The merchant-side payment reference for a user address.
pub fn reference_for(address: &str) -> String {
    format!("KVT-{address}")
}

#[async_trait]
impl ServiceAdapter for VirtualAccountClient {
    fn name(&self) -> &str {
        "virtual-account"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Payments
    }

    async fn health_check(&self) -> Result<HealthStatus, KvittoError> {
        // No ping endpoint; any HTTP response means the provider is up.
        match self.client.get(&self.config.api_base).send().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "payment provider unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), KvittoError> {
        Ok(())
    }
}

#[async_trait]
impl PaymentProvider for VirtualAccountClient {
    async fn provision_account(
        &self,
        address: &str,
        display_name: &str,
    ) -> Result<VirtualAccount, KvittoError> {
        let reference = reference_for(address);
        let request = ProvisionRequest {
            businessid: &self.config.business_id,
            reference: &reference,
            name: display_name,
            phone: format!("+{address}"),
        };

        debug!(user = %address, "requesting virtual account");
        let response = self
            .client
            .post(self.provision_url())
            .header("api-key", &self.config.api_key)
            .header("api-secret", &self.config.secret_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| KvittoError::payments("provisioning request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KvittoError::Payments {
                message: format!("payment provider returned {status}: {body}"),
                source: None,
            });
        }

        let body: ProvisionResponse = response
            .json()
            .await
            .map_err(|e| KvittoError::payments("failed to parse provisioning response", e))?;
        let account = VirtualAccount {
            account_number: body.account_number,
            bank_name: body.bank_name,
            // Providers echo the merchant reference; fall back to ours if
            // the response omits it.
            reference: body.reference.unwrap_or(reference),
        };
        info!(
            user = %address,
            bank = %account.bank_name,
            reference = %account.reference,
            "virtual account provisioned"
        );
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(api_base: String) -> VirtualAccountClient {
        VirtualAccountClient::new(PaymentsConfig {
            api_base,
            api_key: "pk-1".into(),
            secret_key: "sk-1".into(),
            business_id: "biz-9".into(),
            webhook_secret: "whsec".into(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn provision_sends_credentials_and_parses_the_account() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/virtual-accounts"))
            .and(header("api-key", "pk-1"))
            .and(header("api-secret", "sk-1"))
            .and(body_partial_json(serde_json::json!({
                "businessid": "biz-9",
                "reference": "KVT-2348012345678",
                "name": "Ada Cakes",
                "phone": "+2348012345678"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "account_number": "9012345678",
                "bank_name": "Wema Bank",
                "reference": "KVT-2348012345678"
            })))
            .mount(&server)
            .await;

        let account = client(server.uri())
            .provision_account("2348012345678", "Ada Cakes")
            .await
            .unwrap();
        assert_eq!(account.account_number, "9012345678");
        assert_eq!(account.bank_name, "Wema Bank");
        assert_eq!(account.reference, "KVT-2348012345678");
    }

    #[tokio::test]
    async fn missing_response_reference_falls_back_to_ours() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "account_number": "1112223334",
                "bank_name": "Moniepoint"
            })))
            .mount(&server)
            .await;

        let account = client(server.uri())
            .provision_account("2348099999999", "Bello & Sons")
            .await
            .unwrap();
        assert_eq!(account.reference, "KVT-2348099999999");
    }

    #[tokio::test]
    async fn provider_error_status_is_a_payments_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .mount(&server)
            .await;

        let err = client(server.uri())
            .provision_account("2348012345678", "Ada Cakes")
            .await
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("401"), "got: {text}");
        assert!(err.is_external());
    }

    #[tokio::test]
    async fn unparseable_response_is_a_payments_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(server.uri())
            .provision_account("2348012345678", "Ada Cakes")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("parse"), "got: {err}");
    }
}
