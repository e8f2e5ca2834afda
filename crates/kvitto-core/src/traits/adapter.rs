// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait shared by all collaborator adapters.

use crate::error::KvittoError;
use crate::types::{AdapterKind, HealthStatus};
use async_trait::async_trait;

/// Common surface of every adapter: identification, liveness, teardown.
///
/// [`super::ChannelAdapter`] extends this directly; repository and service
/// client implementations provide it alongside their narrow trait so the
/// binary can health-probe and shut down every collaborator uniformly.
#[async_trait]
pub trait ServiceAdapter: Send + Sync + 'static {
    /// Stable adapter name for logs and health reports, e.g. `"whatsapp"`.
    fn name(&self) -> &str;

    /// Adapter implementation version.
    fn version(&self) -> semver::Version;

    /// Which collaborator family this adapter belongs to.
    fn kind(&self) -> AdapterKind;

    /// Probe the adapter's backing service.
    async fn health_check(&self) -> Result<HealthStatus, KvittoError>;

    /// Release resources. Called once during graceful shutdown.
    async fn shutdown(&self) -> Result<(), KvittoError>;
}
