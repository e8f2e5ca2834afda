// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./kvitto.toml` > `~/.config/kvitto/kvitto.toml`
//! > `/etc/kvitto/kvitto.toml` with environment variable overrides via the
//! `KVITTO_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::KvittoConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/kvitto/kvitto.toml` (system-wide)
/// 3. `~/.config/kvitto/kvitto.toml` (user XDG config)
/// 4. `./kvitto.toml` (local directory)
/// 5. `KVITTO_*` environment variables
pub fn load_config() -> Result<KvittoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KvittoConfig::default()))
        .merge(Toml::file("/etc/kvitto/kvitto.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("kvitto/kvitto.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("kvitto.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and for callers that already hold the TOML text.
pub fn load_config_from_str(toml_content: &str) -> Result<KvittoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KvittoConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<KvittoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KvittoConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `KVITTO_WHATSAPP_ACCESS_TOKEN` must map
/// to `whatsapp.access_token`, not `whatsapp.access.token`.
fn env_provider() -> Env {
    Env::prefixed("KVITTO_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped,
        // e.g. KVITTO_WHATSAPP_ACCESS_TOKEN -> "whatsapp_access_token".
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("bot_", "bot.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("whatsapp_", "whatsapp.", 1)
            .replacen("render_", "render.", 1)
            .replacen("media_", "media.", 1)
            .replacen("payments_", "payments.", 1)
            .replacen("gateway_", "gateway.", 1);
        mapped.into()
    })
}
