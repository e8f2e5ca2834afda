// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks the semantic constraints serde cannot express: bind addresses,
//! URL shapes, and the credentials the serve command cannot run without.
//! Missing credentials are collected here so startup can refuse to serve
//! with every problem reported at once.

use crate::diagnostic::ConfigError;
use crate::model::KvittoConfig;

/// Validate structural constraints that hold for every command.
///
/// Returns all collected errors rather than failing fast.
pub fn validate_config(config: &KvittoConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    } else {
        let is_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_ip && !is_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.bot.reply_delay_ms > 10_000 {
        errors.push(ConfigError::Validation {
            message: format!(
                "bot.reply_delay_ms must be at most 10000, got {}",
                config.bot.reply_delay_ms
            ),
        });
    }

    for base in [
        ("whatsapp.api_base", &config.whatsapp.api_base),
        ("render.screenshot_base_url", &config.render.screenshot_base_url),
        ("media.api_base", &config.media.api_base),
    ] {
        let (key, value) = base;
        if !value.trim().is_empty() && !value.starts_with("http") {
            errors.push(ConfigError::Validation {
                message: format!("{key} must be an http(s) URL, got `{value}`"),
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Validate the credentials the serve command requires. Every missing value
/// is reported; the process must not begin serving while any remain.
pub fn validate_serve_credentials(config: &KvittoConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let required = [
        ("whatsapp.access_token", &config.whatsapp.access_token),
        ("whatsapp.phone_number_id", &config.whatsapp.phone_number_id),
        ("whatsapp.verify_token", &config.whatsapp.verify_token),
        ("render.template_base_url", &config.render.template_base_url),
        ("render.api_key", &config.render.api_key),
        ("media.api_key", &config.media.api_key),
        ("payments.api_base", &config.payments.api_base),
        ("payments.api_key", &config.payments.api_key),
        ("payments.secret_key", &config.payments.secret_key),
        ("payments.business_id", &config.payments.business_id),
        ("gateway.admin_secret", &config.gateway.admin_secret),
    ];

    for (key, value) in required {
        if value.trim().is_empty() {
            errors.push(ConfigError::MissingKey {
                key: key.to_string(),
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serve_ready() -> KvittoConfig {
        let mut config = KvittoConfig::default();
        config.whatsapp.access_token = "tok".into();
        config.whatsapp.phone_number_id = "123".into();
        config.whatsapp.verify_token = "vt".into();
        config.render.template_base_url = "https://receipts.example.com/".into();
        config.render.api_key = "rk".into();
        config.media.api_key = "mk".into();
        config.payments.api_base = "https://pay.example.com".into();
        config.payments.api_key = "pk".into();
        config.payments.secret_key = "sk".into();
        config.payments.business_id = "biz".into();
        config.gateway.admin_secret = "shh".into();
        config
    }

    #[test]
    fn default_config_passes_structural_validation() {
        assert!(validate_config(&KvittoConfig::default()).is_ok());
    }

    #[test]
    fn default_config_fails_serve_credentials() {
        let errors = validate_serve_credentials(&KvittoConfig::default())
            .expect_err("defaults should be missing credentials");
        assert_eq!(errors.len(), 11);
    }

    #[test]
    fn fully_configured_passes_serve_credentials() {
        assert!(validate_serve_credentials(&serve_ready()).is_ok());
    }

    #[test]
    fn bad_host_is_reported() {
        let mut config = KvittoConfig::default();
        config.gateway.host = "not a host!".into();
        let errors = validate_config(&config).expect_err("bad host should fail");
        assert!(errors.iter().any(|e| e.to_string().contains("gateway.host")));
    }

    #[test]
    fn oversized_reply_delay_is_reported() {
        let mut config = KvittoConfig::default();
        config.bot.reply_delay_ms = 60_000;
        let errors = validate_config(&config).expect_err("delay should fail");
        assert!(
            errors
                .iter()
                .any(|e| e.to_string().contains("reply_delay_ms"))
        );
    }

    #[test]
    fn collects_all_errors_not_just_first() {
        let mut config = KvittoConfig::default();
        config.gateway.host = String::new();
        config.storage.database_path = String::new();
        let errors = validate_config(&config).expect_err("two failures expected");
        assert_eq!(errors.len(), 2);
    }
}
