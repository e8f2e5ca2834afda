// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Kvitto receipt bot.
//!
//! This crate provides the foundational trait definitions, error types, usage
//! limits, money arithmetic, and domain types used throughout the Kvitto
//! workspace. All external collaborators (messaging channel, repository,
//! renderer, media host, payment provider) are reached through traits defined
//! here.

pub mod error;
pub mod limits;
pub mod money;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::KvittoError;
pub use limits::{FREE_EDIT_LIMIT, FREE_TRIAL_LIMIT, YEARLY_FEE};
pub use types::{
    AdapterKind, BrandProfile, HealthStatus, InboundEvent, InboundMedia, InboundPayload,
    OutboundBody, OutboundMessage, OutputFormat, PaymentEvent, ReceiptFields, ReceiptRecord,
    RenderRequest, RenderedReceipt, SubscriptionPlan, UserRecord, VirtualAccount,
};

// Re-export all collaborator traits at crate root.
pub use traits::{
    ChannelAdapter, ChannelIngest, MediaHost, PaymentProvider, ReceiptRenderer, Repository,
    ServiceAdapter,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kvitto_error_has_all_variants() {
        let _config = KvittoError::Config("test".into());
        let _storage = KvittoError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _channel = KvittoError::Channel {
            message: "test".into(),
            source: None,
        };
        let _render = KvittoError::Render {
            message: "test".into(),
            source: None,
        };
        let _media = KvittoError::MediaHost {
            message: "test".into(),
            source: None,
        };
        let _payments = KvittoError::Payments {
            message: "test".into(),
            source: None,
        };
        let _not_found = KvittoError::ReceiptNotFound { id: "r-1".into() };
        let _internal = KvittoError::Internal("test".into());
    }

    #[test]
    fn external_service_errors_are_flagged() {
        assert!(
            KvittoError::Render {
                message: "down".into(),
                source: None
            }
            .is_external()
        );
        assert!(
            KvittoError::MediaHost {
                message: "down".into(),
                source: None
            }
            .is_external()
        );
        assert!(!KvittoError::Config("bad".into()).is_external());
        assert!(!KvittoError::ReceiptNotFound { id: "x".into() }.is_external());
    }

    #[test]
    fn adapter_kind_display_round_trip() {
        use std::str::FromStr;

        let kinds = [
            AdapterKind::Channel,
            AdapterKind::Repository,
            AdapterKind::Renderer,
            AdapterKind::MediaHost,
            AdapterKind::Payments,
        ];
        for kind in &kinds {
            let s = kind.to_string();
            let parsed = AdapterKind::from_str(&s).expect("should parse back");
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn all_trait_modules_are_exported() {
        // Compile-time check that every collaborator trait is reachable
        // through the public API.
        fn _assert_service_adapter<T: ServiceAdapter>() {}
        fn _assert_channel_adapter<T: ChannelAdapter>() {}
        fn _assert_repository<T: Repository>() {}
        fn _assert_renderer<T: ReceiptRenderer>() {}
        fn _assert_media_host<T: MediaHost>() {}
        fn _assert_payment_provider<T: PaymentProvider>() {}
        fn _assert_channel_ingest<T: ChannelIngest>() {}
    }
}
