// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access evaluation and payment reconciliation.
//!
//! `evaluate_access` / `evaluate_edit_access` are the pure gates the
//! conversation engine consults before starting a flow. The
//! [`PaywallReconciler`] sits on the other side: it turns payment-provider
//! confirmations into narrow user-record mutations, absorbing duplicate
//! deliveries without re-extending or re-notifying.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use kvitto_core::limits::SUBSCRIPTION_DAYS;
use kvitto_core::{
    ChannelAdapter, KvittoError, OutboundMessage, PaymentEvent, Repository, UserRecord,
    FREE_EDIT_LIMIT, FREE_TRIAL_LIMIT,
};
use tracing::{debug, info, warn};

use crate::prompt;

/// Why a flow entry was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    TrialExhausted,
    EditLimitReached,
}

/// Result of an access gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Blocked { reason: BlockReason },
}

/// Whether the user may start creating a receipt right now.
///
/// Administrators and active subscribers always pass; everyone else passes
/// while the free-receipt counter is below the trial limit.
pub fn evaluate_access(user: &UserRecord, is_admin: bool, now: DateTime<Utc>) -> AccessDecision {
    if is_admin || user.subscription_active(now) || user.receipts_used < FREE_TRIAL_LIMIT {
        AccessDecision::Granted
    } else {
        AccessDecision::Blocked {
            reason: BlockReason::TrialExhausted,
        }
    }
}

/// Whether the user may start editing a receipt right now. Same exemptions
/// as [`evaluate_access`], gated on the free-edit counter.
pub fn evaluate_edit_access(
    user: &UserRecord,
    is_admin: bool,
    now: DateTime<Utc>,
) -> AccessDecision {
    if is_admin || user.subscription_active(now) || user.edits_used < FREE_EDIT_LIMIT {
        AccessDecision::Granted
    } else {
        AccessDecision::Blocked {
            reason: BlockReason::EditLimitReached,
        }
    }
}

/// What a payment confirmation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Access was granted or extended, and the user was notified.
    Applied,
    /// The user was already active; nothing was written, nobody notified.
    AlreadyApplied,
    /// No user matched the payload's reference or phone. Logged and dropped.
    NoMatch,
}

/// Applies payment-provider confirmations to user records.
pub struct PaywallReconciler {
    repo: Arc<dyn Repository>,
    channel: Arc<dyn ChannelAdapter>,
}

impl PaywallReconciler {
    pub fn new(repo: Arc<dyn Repository>, channel: Arc<dyn ChannelAdapter>) -> Self {
        Self { repo, channel }
    }

    /// Apply one confirmation event.
    ///
    /// Lookup goes by payment reference first, then by the payer phone
    /// number. An already-active subscription makes the event a duplicate:
    /// no write, no notification. Genuine confirmations extend access by
    /// one year from now and notify the user once.
    pub async fn apply(&self, event: &PaymentEvent) -> Result<ReconcileOutcome, KvittoError> {
        let Some(user) = self.lookup(event).await? else {
            warn!(
                reference = event.reference.as_deref().unwrap_or("-"),
                phone = event.phone.as_deref().unwrap_or("-"),
                "payment event matched no user; dropped"
            );
            return Ok(ReconcileOutcome::NoMatch);
        };

        let now = Utc::now();
        if user.subscription_active(now) {
            debug!(user = %user.address, "duplicate payment confirmation absorbed");
            return Ok(ReconcileOutcome::AlreadyApplied);
        }

        let paid_until = now + Duration::days(SUBSCRIPTION_DAYS);
        self.repo.mark_paid(&user.address, Some(paid_until)).await?;
        info!(
            user = %user.address,
            paid_until = %paid_until,
            amount = ?event.amount,
            "payment applied"
        );

        let notice = OutboundMessage::text(&user.address, prompt::payment_confirmed());
        if let Err(e) = self.channel.send(notice).await {
            warn!(user = %user.address, error = %e, "payment confirmation notice failed");
        }

        Ok(ReconcileOutcome::Applied)
    }

    async fn lookup(&self, event: &PaymentEvent) -> Result<Option<UserRecord>, KvittoError> {
        if let Some(reference) = &event.reference
            && let Some(user) = self.repo.find_user_by_payment_reference(reference).await?
        {
            return Ok(Some(user));
        }
        if let Some(phone) = &event.phone {
            let address = normalize_phone(phone);
            if let Some(user) = self.repo.find_user(&address).await? {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }
}

/// Reduce a payer phone to bare digits so `+234 801...` matches the
/// messaging-address form.
fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use kvitto_core::{SubscriptionPlan, VirtualAccount};
    use kvitto_store::SqliteRepository;
    use kvitto_test_utils::MockChannel;
    use rust_decimal::Decimal;

    const ADDRESS: &str = "2348012345678";
    const REFERENCE: &str = "KVT-2348012345678";

    fn fresh_user(address: &str) -> UserRecord {
        UserRecord::new(address)
    }

    #[test]
    fn trial_users_pass_until_the_limit() {
        let now = Utc::now();
        let mut user = fresh_user("u");
        for used in 0..FREE_TRIAL_LIMIT {
            user.receipts_used = used;
            assert_eq!(evaluate_access(&user, false, now), AccessDecision::Granted);
        }
        user.receipts_used = FREE_TRIAL_LIMIT;
        assert_eq!(
            evaluate_access(&user, false, now),
            AccessDecision::Blocked {
                reason: BlockReason::TrialExhausted
            }
        );
    }

    #[test]
    fn admins_and_active_subscribers_bypass_the_gate() {
        let now = Utc::now();
        let mut user = fresh_user("u");
        user.receipts_used = 99;

        assert_eq!(evaluate_access(&user, true, now), AccessDecision::Granted);

        user.is_paid = true;
        user.paid_until = Some(now + Duration::days(10));
        assert_eq!(evaluate_access(&user, false, now), AccessDecision::Granted);

        // A lapsed subscription does not bypass.
        user.paid_until = Some(now - Duration::days(1));
        assert_eq!(
            evaluate_access(&user, false, now),
            AccessDecision::Blocked {
                reason: BlockReason::TrialExhausted
            }
        );

        // Legacy lifetime access never lapses.
        user.plan = SubscriptionPlan::Lifetime;
        user.paid_until = None;
        assert_eq!(evaluate_access(&user, false, now), AccessDecision::Granted);
    }

    #[test]
    fn edit_gate_uses_the_edit_counter() {
        let now = Utc::now();
        let mut user = fresh_user("u");
        user.edits_used = FREE_EDIT_LIMIT - 1;
        assert_eq!(
            evaluate_edit_access(&user, false, now),
            AccessDecision::Granted
        );
        user.edits_used = FREE_EDIT_LIMIT;
        assert_eq!(
            evaluate_edit_access(&user, false, now),
            AccessDecision::Blocked {
                reason: BlockReason::EditLimitReached
            }
        );
        assert_eq!(evaluate_edit_access(&user, true, now), AccessDecision::Granted);
    }

    #[test]
    fn phone_normalization_strips_decoration() {
        assert_eq!(normalize_phone("+234 801 234 5678"), "2348012345678");
        assert_eq!(normalize_phone("2348012345678"), "2348012345678");
        assert_eq!(normalize_phone("+44 (0) 20-7946"), "440207946");
    }

    // Reconciler tests over a real repository.

    async fn rig() -> (
        PaywallReconciler,
        Arc<SqliteRepository>,
        Arc<MockChannel>,
        tempfile::TempDir,
    ) {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = Arc::new(SqliteRepository::new(kvitto_config::StorageConfig {
            database_path: dir.path().join("kvitto.db").to_string_lossy().into_owned(),
            wal_mode: false,
        }));
        repo.initialize().await.expect("initialize repository");
        let channel = Arc::new(MockChannel::new());
        let reconciler = PaywallReconciler::new(repo.clone(), channel.clone());
        (reconciler, repo, channel, dir)
    }

    async fn seed_with_account(repo: &SqliteRepository, user: &UserRecord) {
        repo.insert_user(user).await.expect("seed user");
        repo.set_virtual_account(
            &user.address,
            &VirtualAccount {
                account_number: "9012345678".into(),
                bank_name: "Wema Bank".into(),
                reference: REFERENCE.into(),
            },
        )
        .await
        .expect("seed account");
    }

    fn confirmation(reference: &str) -> PaymentEvent {
        PaymentEvent {
            reference: Some(reference.into()),
            phone: None,
            amount: Some(Decimal::from(2000)),
        }
    }

    #[tokio::test]
    async fn confirmation_extends_access_and_notifies() {
        let (reconciler, repo, channel, _dir) = rig().await;
        let mut user = fresh_user(ADDRESS);
        user.receipts_used = FREE_TRIAL_LIMIT;
        seed_with_account(&repo, &user).await;

        let outcome = reconciler
            .apply(&confirmation(REFERENCE))
            .await
            .expect("apply");
        assert_eq!(outcome, ReconcileOutcome::Applied);

        let user = repo.find_user(ADDRESS).await.expect("find").expect("user");
        assert!(user.is_paid);
        let paid_until = user.paid_until.expect("expiry set");
        assert!(paid_until > Utc::now() + Duration::days(SUBSCRIPTION_DAYS - 1));
        assert_eq!(channel.sent_count().await, 1);
    }

    #[tokio::test]
    async fn replay_against_an_active_subscription_is_a_noop() {
        let (reconciler, repo, channel, _dir) = rig().await;
        let mut user = fresh_user(ADDRESS);
        user.is_paid = true;
        user.paid_until = Some(Utc::now() + Duration::days(200));
        seed_with_account(&repo, &user).await;
        let before = repo.find_user(ADDRESS).await.expect("find").expect("user");

        let outcome = reconciler
            .apply(&confirmation(REFERENCE))
            .await
            .expect("apply");
        assert_eq!(outcome, ReconcileOutcome::AlreadyApplied);

        let after = repo.find_user(ADDRESS).await.expect("find").expect("user");
        assert_eq!(after.paid_until, before.paid_until);
        assert_eq!(channel.sent_count().await, 0);
    }

    #[tokio::test]
    async fn phone_fallback_matches_when_the_reference_is_unknown() {
        let (reconciler, repo, channel, _dir) = rig().await;
        repo.insert_user(&fresh_user(ADDRESS)).await.expect("seed");

        let event = PaymentEvent {
            reference: Some("KVT-unknown".into()),
            phone: Some("+234 801 234 5678".into()),
            amount: None,
        };
        let outcome = reconciler.apply(&event).await.expect("apply");
        assert_eq!(outcome, ReconcileOutcome::Applied);
        assert_eq!(channel.sent_count().await, 1);
    }

    #[tokio::test]
    async fn unmatched_confirmation_is_dropped() {
        let (reconciler, _repo, channel, _dir) = rig().await;
        let outcome = reconciler
            .apply(&confirmation("KVT-nobody"))
            .await
            .expect("apply");
        assert_eq!(outcome, ReconcileOutcome::NoMatch);
        assert_eq!(channel.sent_count().await, 0);
    }
}
