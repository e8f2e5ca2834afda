// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canned service collaborators: renderer, media host, payment provider.
//!
//! Each mock records what it was asked for and supports a failure mode; the
//! renderer additionally supports an artificial delay so tests can catch a
//! render mid-flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use kvitto_core::{
    KvittoError, MediaHost, PaymentProvider, ReceiptRenderer, RenderRequest, RenderedReceipt,
    VirtualAccount,
};

// ---- Renderer ----

/// A renderer that returns a tiny fake document after an optional delay.
pub struct MockRenderer {
    delay: Option<Duration>,
    fail: AtomicBool,
    requests: Arc<Mutex<Vec<RenderRequest>>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self {
            delay: None,
            fail: AtomicBool::new(false),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sleep this long before completing each render.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    /// Every render fails.
    pub fn failing() -> Self {
        let renderer = Self::new();
        renderer.fail.store(true, Ordering::SeqCst);
        renderer
    }

    /// Every render request this mock has seen, in order.
    pub async fn requests(&self) -> Vec<RenderRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn render_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

impl Default for MockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReceiptRenderer for MockRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedReceipt, KvittoError> {
        self.requests.lock().await.push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(KvittoError::Render {
                message: "mock render failure".to_string(),
                source: None,
            });
        }
        Ok(RenderedReceipt {
            bytes: format!("rendered:{}", request.receipt_id).into_bytes(),
            mime: request.format.mime().to_string(),
        })
    }
}

// ---- Media host ----

/// A media host that returns a deterministic hosted URL per upload.
pub struct MockMediaHost {
    fail: AtomicBool,
    uploads: Arc<Mutex<Vec<(usize, String)>>>,
}

impl MockMediaHost {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            uploads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        let media = Self::new();
        media.fail.store(true, Ordering::SeqCst);
        media
    }

    /// `(byte_count, mime)` of each accepted upload.
    pub async fn uploads(&self) -> Vec<(usize, String)> {
        self.uploads.lock().await.clone()
    }
}

impl Default for MockMediaHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaHost for MockMediaHost {
    async fn upload_image(&self, bytes: &[u8], mime: &str) -> Result<String, KvittoError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(KvittoError::MediaHost {
                message: "mock upload failure".to_string(),
                source: None,
            });
        }
        let mut uploads = self.uploads.lock().await;
        uploads.push((bytes.len(), mime.to_string()));
        Ok(format!("https://media.test/logo-{}.png", uploads.len()))
    }
}

// ---- Payment provider ----

/// A payment provider that issues one deterministic virtual account per
/// address: reference `KVT-{address}`, a fixed bank, a fixed number.
pub struct MockPaymentProvider {
    fail: AtomicBool,
    provisioned: Arc<Mutex<Vec<String>>>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            provisioned: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        let payments = Self::new();
        payments.fail.store(true, Ordering::SeqCst);
        payments
    }

    /// Addresses provisioned so far, in order.
    pub async fn provisioned(&self) -> Vec<String> {
        self.provisioned.lock().await.clone()
    }

    /// The reference this mock assigns to the given address.
    pub fn reference_for(address: &str) -> String {
        format!("KVT-{address}")
    }
}

impl Default for MockPaymentProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn provision_account(
        &self,
        address: &str,
        _display_name: &str,
    ) -> Result<VirtualAccount, KvittoError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(KvittoError::Payments {
                message: "mock provisioning failure".to_string(),
                source: None,
            });
        }
        self.provisioned.lock().await.push(address.to_string());
        Ok(VirtualAccount {
            account_number: "9012345678".to_string(),
            bank_name: "Wema Bank".to_string(),
            reference: Self::reference_for(address),
        })
    }
}
