// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide usage limits and pricing.
//!
//! These are product constants, not per-user configuration. Changing one is
//! a deployment-wide decision.

/// Number of receipts a user may create before the paywall gates creation.
pub const FREE_TRIAL_LIMIT: i64 = 3;

/// Number of edits a user may perform before the paywall gates editing.
pub const FREE_EDIT_LIMIT: i64 = 2;

/// Annual subscription fee in naira.
pub const YEARLY_FEE: i64 = 2000;

/// Days of access granted per confirmed subscription payment.
pub const SUBSCRIPTION_DAYS: i64 = 365;
