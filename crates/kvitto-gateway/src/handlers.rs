// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway routes.
//!
//! Webhook handlers translate provider deliveries into engine input and map
//! the outcome back to the status codes the providers expect: 200 for
//! anything interpretable (idempotent no-ops included), 4xx for payloads or
//! credentials the gateway rejects, 5xx only when processing itself failed.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use kvitto_core::types::{ReceiptRecord, SubscriptionPlan, UserRecord};
use kvitto_core::KvittoError;
use kvitto_payments::{interpret_webhook, WebhookDisposition};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::server::GatewayState;

/// Query parameters of the channel subscription handshake.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode", default)]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token", default)]
    pub token: Option<String>,
    #[serde(rename = "hub.challenge", default)]
    pub challenge: Option<String>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Health status string.
    pub status: String,
    /// Binary version.
    pub version: String,
    /// Seconds since the gateway came up.
    pub uptime_secs: u64,
}

/// Response body for GET /admin/data.
#[derive(Debug, Serialize)]
pub struct AdminDataResponse {
    pub total_users: usize,
    pub total_receipts: i64,
    /// Users whose paid access is active right now.
    pub active_subscribers: usize,
    pub users: Vec<AdminUser>,
}

/// Per-user row of the admin export.
#[derive(Debug, Serialize)]
pub struct AdminUser {
    pub address: String,
    pub business_name: Option<String>,
    pub plan: SubscriptionPlan,
    pub is_paid: bool,
    pub paid_until: Option<DateTime<Utc>>,
    pub receipts_used: i64,
    pub edits_used: i64,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for AdminUser {
    fn from(user: UserRecord) -> Self {
        Self {
            address: user.address,
            business_name: user.business_name,
            plan: user.plan,
            is_paid: user.is_paid,
            paid_until: user.paid_until,
            receipts_used: user.receipts_used,
            edits_used: user.edits_used,
            created_at: user.created_at,
        }
    }
}

/// Response body for GET /receipts/{id}/verify. The issuing user's
/// messaging address is deliberately absent; this endpoint is public.
#[derive(Debug, Serialize)]
pub struct ReceiptSummary {
    pub id: String,
    pub customer_name: String,
    pub items: Vec<String>,
    pub prices: Vec<String>,
    pub payment_method: String,
    pub total: String,
    pub created_at: DateTime<Utc>,
}

impl From<ReceiptRecord> for ReceiptSummary {
    fn from(receipt: ReceiptRecord) -> Self {
        Self {
            id: receipt.id,
            customer_name: receipt.customer_name,
            items: receipt.items,
            prices: receipt.prices,
            payment_method: receipt.payment_method,
            total: receipt.total,
            created_at: receipt.created_at,
        }
    }
}

/// GET /webhooks/channel
///
/// Subscription handshake: echo `hub.challenge` back when the mode is
/// `subscribe` and the verify token matches, 403 otherwise.
pub async fn verify_channel(
    State(state): State<GatewayState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let mode_ok = params.mode.as_deref() == Some("subscribe");
    let token_ok = params.token.as_deref() == Some(state.ingest.verify_token());
    match (mode_ok && token_ok, params.challenge) {
        (true, Some(challenge)) => {
            info!("channel webhook subscription verified");
            (StatusCode::OK, challenge).into_response()
        }
        _ => {
            warn!("channel webhook verification rejected");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

/// POST /webhooks/channel
///
/// Hand the raw delivery to the channel adapter, which verifies the
/// signature header and enqueues whatever events the payload carries. A
/// delivery carrying zero usable events is still a 200.
pub async fn channel_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok());

    match state.ingest.ingest(signature, &body).await {
        Ok(accepted) => {
            debug!(accepted, "channel webhook processed");
            StatusCode::OK.into_response()
        }
        Err(e) => {
            warn!(error = %e, "channel webhook rejected");
            (
                StatusCode::FORBIDDEN,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// POST /webhooks/payments
///
/// Interpret the provider payload and run confirmations through the
/// paywall reconciler. Duplicates and non-success notifications are 200
/// no-ops; only payloads the gateway cannot interpret are 4xx, and only a
/// reconciliation failure is a 5xx (so the provider redelivers).
pub async fn payments_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !state.webhook_secret.is_empty() {
        let presented = headers
            .get("x-webhook-secret")
            .and_then(|v| v.to_str().ok());
        if presented != Some(state.webhook_secret.as_str()) {
            warn!("payment webhook rejected: shared secret mismatch");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    let disposition = match interpret_webhook(&body) {
        Ok(disposition) => disposition,
        Err(e) => {
            warn!(error = %e, "malformed payment webhook");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response();
        }
    };

    match disposition {
        WebhookDisposition::Ignored { reason } => {
            debug!(reason, "payment webhook ignored");
            StatusCode::OK.into_response()
        }
        WebhookDisposition::Confirmation(event) => match state.reconciler.apply(&event).await {
            Ok(outcome) => {
                info!(?outcome, "payment confirmation processed");
                StatusCode::OK.into_response()
            }
            Err(e) => {
                error!(error = %e, "payment reconciliation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "reconciliation failed".to_string(),
                    }),
                )
                    .into_response()
            }
        },
    }
}

/// GET /admin/data
///
/// Usage export behind the shared admin secret. An unconfigured secret
/// disables the surface rather than opening it.
pub async fn admin_data(State(state): State<GatewayState>, headers: HeaderMap) -> Response {
    if !admin_authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let users = match state.repo.list_users().await {
        Ok(users) => users,
        Err(e) => return storage_failure(e),
    };
    let total_receipts = match state.repo.count_receipts().await {
        Ok(count) => count,
        Err(e) => return storage_failure(e),
    };

    let now = Utc::now();
    let response = AdminDataResponse {
        total_users: users.len(),
        total_receipts,
        active_subscribers: users
            .iter()
            .filter(|u| u.subscription_active(now))
            .count(),
        users: users.into_iter().map(AdminUser::from).collect(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// GET /receipts/{id}/verify
///
/// Public lookup for anyone holding a receipt: summary fields or 404.
pub async fn verify_receipt(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.repo.get_receipt(&id).await {
        Ok(Some(receipt)) => (StatusCode::OK, Json(ReceiptSummary::from(receipt))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("receipt {id} not found"),
            }),
        )
            .into_response(),
        Err(e) => storage_failure(e),
    }
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

fn admin_authorized(state: &GatewayState, headers: &HeaderMap) -> bool {
    if state.admin_secret.is_empty() {
        return false;
    }
    headers.get("x-admin-secret").and_then(|v| v.to_str().ok())
        == Some(state.admin_secret.as_str())
}

fn storage_failure(e: KvittoError) -> Response {
    error!(error = %e, "storage failure serving gateway request");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "storage failure".to_string(),
        }),
    )
        .into_response()
}
