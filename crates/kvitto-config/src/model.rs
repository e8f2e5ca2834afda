// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Kvitto receipt bot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, producing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Kvitto configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values; the `serve` command refuses to start while required credentials
/// are missing (see the validation module).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KvittoConfig {
    /// Bot identity and behavior settings.
    #[serde(default)]
    pub bot: BotConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// WhatsApp Cloud API transport settings.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Receipt renderer settings.
    #[serde(default)]
    pub render: RenderConfig,

    /// Logo media-host settings.
    #[serde(default)]
    pub media: MediaConfig,

    /// Payment provider settings.
    #[serde(default)]
    pub payments: PaymentsConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Bot identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Messaging addresses with administrator powers: exempt from usage
    /// limits and paywall gating.
    #[serde(default)]
    pub admin_addresses: Vec<String>,

    /// Base humanizing delay before each outbound send, in milliseconds.
    #[serde(default = "default_reply_delay_ms")]
    pub reply_delay_ms: u64,

    /// Random extra delay added on top of the base, in milliseconds.
    #[serde(default = "default_reply_jitter_ms")]
    pub reply_jitter_ms: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            admin_addresses: Vec::new(),
            reply_delay_ms: default_reply_delay_ms(),
            reply_jitter_ms: default_reply_jitter_ms(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_reply_delay_ms() -> u64 {
    800
}

fn default_reply_jitter_ms() -> u64 {
    400
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable write-ahead logging.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "kvitto.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// WhatsApp Cloud API transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Graph API base URL.
    #[serde(default = "default_whatsapp_api_base")]
    pub api_base: String,

    /// Bearer token for the Cloud API. Required to serve.
    #[serde(default)]
    pub access_token: String,

    /// Sender phone-number id. Required to serve.
    #[serde(default)]
    pub phone_number_id: String,

    /// Token echoed back during the webhook subscription handshake.
    /// Required to serve.
    #[serde(default)]
    pub verify_token: String,

    /// App secret for webhook signature verification. When empty,
    /// signatures are not checked.
    #[serde(default)]
    pub app_secret: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_base: default_whatsapp_api_base(),
            access_token: String::new(),
            phone_number_id: String::new(),
            verify_token: String::new(),
            app_secret: String::new(),
        }
    }
}

fn default_whatsapp_api_base() -> String {
    "https://graph.facebook.com/v19.0".to_string()
}

/// Receipt renderer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    /// Base URL hosting the receipt template pages (`template.{n}.html`).
    /// Required to serve.
    #[serde(default)]
    pub template_base_url: String,

    /// Screenshot service base URL.
    #[serde(default = "default_screenshot_base_url")]
    pub screenshot_base_url: String,

    /// Screenshot service API key. Required to serve.
    #[serde(default)]
    pub api_key: String,

    /// Rendered page width in pixels.
    #[serde(default = "default_render_width")]
    pub width: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            template_base_url: String::new(),
            screenshot_base_url: default_screenshot_base_url(),
            api_key: String::new(),
            width: default_render_width(),
        }
    }
}

fn default_screenshot_base_url() -> String {
    "https://image.thum.io".to_string()
}

fn default_render_width() -> u32 {
    800
}

/// Logo media-host configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MediaConfig {
    /// Media host API base URL.
    #[serde(default = "default_media_api_base")]
    pub api_base: String,

    /// Media host API key. Required to serve.
    #[serde(default)]
    pub api_key: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            api_base: default_media_api_base(),
            api_key: String::new(),
        }
    }
}

fn default_media_api_base() -> String {
    "https://api.imgbb.com/1".to_string()
}

/// Payment provider configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentsConfig {
    /// Provider API base URL. Required to serve.
    #[serde(default)]
    pub api_base: String,

    /// Provider API key. Required to serve.
    #[serde(default)]
    pub api_key: String,

    /// Provider secret key. Required to serve.
    #[serde(default)]
    pub secret_key: String,

    /// Merchant/business identifier at the provider. Required to serve.
    #[serde(default)]
    pub business_id: String,

    /// Shared secret the provider sends in its webhook header. When empty,
    /// webhook authenticity is not checked.
    #[serde(default)]
    pub webhook_secret: String,
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Bind host.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Shared secret for the admin-data endpoint. Required to serve.
    #[serde(default)]
    pub admin_secret: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            admin_secret: String::new(),
        }
    }
}

fn default_gateway_host() -> String {
    "0.0.0.0".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = KvittoConfig::default();
        assert_eq!(config.bot.log_level, "info");
        assert_eq!(config.bot.reply_delay_ms, 800);
        assert_eq!(config.storage.database_path, "kvitto.db");
        assert!(config.storage.wal_mode);
        assert_eq!(config.gateway.port, 3000);
        assert_eq!(config.render.width, 800);
        assert!(config.whatsapp.access_token.is_empty());
    }

    #[test]
    fn empty_toml_deserializes_to_defaults() {
        let config: KvittoConfig = toml::from_str("").expect("empty config should parse");
        assert_eq!(config.gateway.host, "0.0.0.0");
        assert!(config.bot.admin_addresses.is_empty());
    }

    #[test]
    fn unknown_section_key_is_rejected() {
        let result: Result<KvittoConfig, _> = toml::from_str("[bot]\nnaem = \"x\"\n");
        assert!(result.is_err());
    }
}
