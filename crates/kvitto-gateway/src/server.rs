// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state, and serves until shutdown
//! is requested.

use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use kvitto_core::{ChannelIngest, KvittoError, Repository};
use kvitto_engine::PaywallReconciler;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// The channel adapter's webhook surface; enqueues inbound events.
    pub ingest: Arc<dyn ChannelIngest>,
    /// Applies payment confirmations idempotently.
    pub reconciler: Arc<PaywallReconciler>,
    /// Record store backing the admin and verification reads.
    pub repo: Arc<dyn Repository>,
    /// Shared secret the payment provider sends with webhooks. Empty means
    /// not enforced.
    pub webhook_secret: String,
    /// Shared secret for the admin export. Empty disables the surface.
    pub admin_secret: String,
    /// Process start, for uptime reporting.
    pub start_time: Instant,
}

/// Gateway server configuration. Mirrors `GatewayConfig` from
/// `kvitto-config` to keep this crate off the config stack.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Build the gateway router:
/// - GET/POST /webhooks/channel (handshake, event deliveries)
/// - POST /webhooks/payments
/// - GET /admin/data (shared secret)
/// - GET /receipts/{id}/verify
/// - GET /health
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route(
            "/webhooks/channel",
            get(handlers::verify_channel).post(handlers::channel_webhook),
        )
        .route("/webhooks/payments", post(handlers::payments_webhook))
        .route("/admin/data", get(handlers::admin_data))
        .route("/receipts/{id}/verify", get(handlers::verify_receipt))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind the configured address and serve until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), KvittoError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| KvittoError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| KvittoError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use kvitto_config::model::StorageConfig;
    use kvitto_core::types::{ReceiptRecord, UserRecord, VirtualAccount};
    use kvitto_store::SqliteRepository;
    use kvitto_test_utils::MockChannel;
    use tower::ServiceExt;

    const ADDRESS: &str = "2348012345678";
    const REFERENCE: &str = "KVT-2348012345678";

    /// Webhook-surface stand-in: records deliveries, optionally rejects
    /// everything the way a signature failure would.
    struct StubIngest {
        verify_token: String,
        reject: bool,
        deliveries: Mutex<Vec<(Option<String>, Vec<u8>)>>,
    }

    #[async_trait]
    impl ChannelIngest for StubIngest {
        async fn ingest(&self, signature: Option<&str>, body: &[u8]) -> Result<usize, KvittoError> {
            if self.reject {
                return Err(KvittoError::Channel {
                    message: "webhook signature rejected".into(),
                    source: None,
                });
            }
            self.deliveries
                .lock()
                .unwrap()
                .push((signature.map(str::to_string), body.to_vec()));
            Ok(1)
        }

        fn verify_token(&self) -> &str {
            &self.verify_token
        }
    }

    struct Rig {
        repo: Arc<SqliteRepository>,
        channel: Arc<MockChannel>,
        ingest: Arc<StubIngest>,
        _dir: tempfile::TempDir,
    }

    async fn rig_with(webhook_secret: &str, admin_secret: &str, reject_ingest: bool) -> (Router, Rig) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(SqliteRepository::new(StorageConfig {
            database_path: dir.path().join("kvitto.db").to_string_lossy().into_owned(),
            wal_mode: false,
        }));
        repo.initialize().await.unwrap();

        let channel = Arc::new(MockChannel::new());
        let reconciler = Arc::new(PaywallReconciler::new(repo.clone(), channel.clone()));
        let ingest = Arc::new(StubIngest {
            verify_token: "echo-me".to_string(),
            reject: reject_ingest,
            deliveries: Mutex::new(Vec::new()),
        });

        let state = GatewayState {
            ingest: ingest.clone(),
            reconciler,
            repo: repo.clone(),
            webhook_secret: webhook_secret.to_string(),
            admin_secret: admin_secret.to_string(),
            start_time: Instant::now(),
        };
        (
            router(state),
            Rig {
                repo,
                channel,
                ingest,
                _dir: dir,
            },
        )
    }

    async fn rig() -> (Router, Rig) {
        rig_with("", "admin-secret", false).await
    }

    async fn seed_user_with_reference(repo: &SqliteRepository) {
        repo.insert_user(&UserRecord::new(ADDRESS)).await.unwrap();
        repo.set_virtual_account(
            ADDRESS,
            &VirtualAccount {
                account_number: "9012345678".to_string(),
                bank_name: "Wema Bank".to_string(),
                reference: REFERENCE.to_string(),
            },
        )
        .await
        .unwrap();
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn confirmation_payload(reference: &str) -> String {
        serde_json::json!({
            "transactionStatus": "success",
            "transaction": {"reference": reference, "amount": 2000},
            "customer": {"phone": "+234 801 234 5678"}
        })
        .to_string()
    }

    async fn read_body(response: axum::response::Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec()
    }

    #[tokio::test]
    async fn health_is_public() {
        let (app, _rig) = rig().await;
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value =
            serde_json::from_slice(&read_body(response).await).unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn handshake_echoes_the_challenge() {
        let (app, _rig) = rig().await;
        let response = app
            .oneshot(get(
                "/webhooks/channel?hub.mode=subscribe&hub.verify_token=echo-me&hub.challenge=1158201444",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_body(response).await, b"1158201444");
    }

    #[tokio::test]
    async fn handshake_rejects_a_wrong_token() {
        let (app, _rig) = rig().await;
        let response = app
            .oneshot(get(
                "/webhooks/channel?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=42",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn channel_deliveries_reach_the_adapter() {
        let (app, rig) = rig().await;
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/webhooks/channel")
                    .header("x-hub-signature-256", "sha256=abc")
                    .body(Body::from(r#"{"entry":[]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let deliveries = rig.ingest.deliveries.lock().unwrap();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].0.as_deref(), Some("sha256=abc"));
        assert_eq!(deliveries[0].1, br#"{"entry":[]}"#);
    }

    #[tokio::test]
    async fn rejected_ingest_is_forbidden() {
        let (app, _rig) = rig_with("", "admin-secret", true).await;
        let response = app
            .oneshot(post_json("/webhooks/channel", r#"{"entry":[]}"#.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn confirmation_marks_the_user_paid() {
        let (app, rig) = rig().await;
        seed_user_with_reference(&rig.repo).await;

        let response = app
            .oneshot(post_json(
                "/webhooks/payments",
                confirmation_payload(REFERENCE),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let user = rig.repo.find_user(ADDRESS).await.unwrap().unwrap();
        assert!(user.is_paid);
        assert_eq!(rig.channel.sent_count().await, 1);
    }

    #[tokio::test]
    async fn duplicate_confirmation_is_still_200_and_silent() {
        let (app, rig) = rig().await;
        seed_user_with_reference(&rig.repo).await;

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(post_json(
                    "/webhooks/payments",
                    confirmation_payload(REFERENCE),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(rig.channel.sent_count().await, 1);
    }

    #[tokio::test]
    async fn malformed_payment_payload_is_400() {
        let (app, _rig) = rig().await;
        let response = app
            .oneshot(post_json("/webhooks/payments", "not json".to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn failed_status_is_a_200_noop() {
        let (app, rig) = rig().await;
        seed_user_with_reference(&rig.repo).await;

        let payload = serde_json::json!({
            "transactionStatus": "failed",
            "transaction": {"reference": REFERENCE}
        })
        .to_string();
        let response = app
            .oneshot(post_json("/webhooks/payments", payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let user = rig.repo.find_user(ADDRESS).await.unwrap().unwrap();
        assert!(!user.is_paid);
        assert_eq!(rig.channel.sent_count().await, 0);
    }

    #[tokio::test]
    async fn webhook_secret_gates_payments_when_configured() {
        let (app, rig) = rig_with("hook-secret", "admin-secret", false).await;
        seed_user_with_reference(&rig.repo).await;

        let bare = app
            .clone()
            .oneshot(post_json(
                "/webhooks/payments",
                confirmation_payload(REFERENCE),
            ))
            .await
            .unwrap();
        assert_eq!(bare.status(), StatusCode::UNAUTHORIZED);

        let authed = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/webhooks/payments")
                    .header("content-type", "application/json")
                    .header("x-webhook-secret", "hook-secret")
                    .body(Body::from(confirmation_payload(REFERENCE)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(authed.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn admin_data_requires_the_secret() {
        let (app, rig) = rig().await;
        seed_user_with_reference(&rig.repo).await;

        let bare = app.clone().oneshot(get("/admin/data")).await.unwrap();
        assert_eq!(bare.status(), StatusCode::UNAUTHORIZED);

        let wrong = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/admin/data")
                    .header("x-admin-secret", "guess")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

        let authed = app
            .oneshot(
                Request::builder()
                    .uri("/admin/data")
                    .header("x-admin-secret", "admin-secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(authed.status(), StatusCode::OK);
        let body: serde_json::Value =
            serde_json::from_slice(&read_body(authed).await).unwrap();
        assert_eq!(body["total_users"], 1);
        assert_eq!(body["users"][0]["address"], ADDRESS);
    }

    #[tokio::test]
    async fn admin_surface_is_disabled_without_a_secret() {
        let (app, _rig) = rig_with("", "", false).await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/admin/data")
                    .header("x-admin-secret", "")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn receipt_verification_round_trips() {
        let (app, rig) = rig().await;
        let receipt = ReceiptRecord::new(
            ADDRESS,
            "Ada",
            vec!["Cake".to_string(), "Juice".to_string()],
            vec!["1500".to_string(), "500".to_string()],
            "transfer",
            "2000",
        );
        rig.repo.insert_receipt(&receipt).await.unwrap();

        let found = app
            .clone()
            .oneshot(get(&format!("/receipts/{}/verify", receipt.id)))
            .await
            .unwrap();
        assert_eq!(found.status(), StatusCode::OK);
        let body: serde_json::Value =
            serde_json::from_slice(&read_body(found).await).unwrap();
        assert_eq!(body["customer_name"], "Ada");
        assert_eq!(body["total"], "2000");

        let missing = app
            .oneshot(get("/receipts/no-such-id/verify"))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
