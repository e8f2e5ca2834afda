// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User record queries. Every mutation is a narrow per-field-group UPDATE;
//! whole-record writes happen only at insert.

use chrono::{DateTime, Utc};
use kvitto_core::{BrandProfile, KvittoError, OutputFormat, UserRecord, VirtualAccount};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

const USER_COLUMNS: &str = "address, business_name, brand_color, logo_url, business_address, \
     contact_phone, template, output_format, payment_reference, account_number, bank_name, \
     plan, is_paid, paid_until, receipts_used, edits_used, created_at, updated_at";

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        address: row.get(0)?,
        business_name: row.get(1)?,
        brand_color: row.get(2)?,
        logo_url: row.get(3)?,
        business_address: row.get(4)?,
        contact_phone: row.get(5)?,
        template: row.get(6)?,
        output_format: super::parse_format(7, row.get(7)?)?,
        payment_reference: row.get(8)?,
        account_number: row.get(9)?,
        bank_name: row.get(10)?,
        plan: super::parse_plan(11, row.get(11)?)?,
        is_paid: row.get(12)?,
        paid_until: super::parse_opt_ts(13, row.get(13)?)?,
        receipts_used: row.get(14)?,
        edits_used: row.get(15)?,
        created_at: super::parse_ts(16, row.get(16)?)?,
        updated_at: super::parse_ts(17, row.get(17)?)?,
    })
}

/// Insert a fresh user record.
pub async fn insert_user(db: &Database, user: &UserRecord) -> Result<(), KvittoError> {
    let user = user.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (address, business_name, brand_color, logo_url, \
                 business_address, contact_phone, template, output_format, payment_reference, \
                 account_number, bank_name, plan, is_paid, paid_until, receipts_used, \
                 edits_used, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
                params![
                    user.address,
                    user.business_name,
                    user.brand_color,
                    user.logo_url,
                    user.business_address,
                    user.contact_phone,
                    user.template,
                    user.output_format.to_string(),
                    user.payment_reference,
                    user.account_number,
                    user.bank_name,
                    user.plan.to_string(),
                    user.is_paid,
                    user.paid_until.map(|t| t.to_rfc3339()),
                    user.receipts_used,
                    user.edits_used,
                    user.created_at.to_rfc3339(),
                    user.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Find a user by messaging address.
pub async fn find_user(db: &Database, address: &str) -> Result<Option<UserRecord>, KvittoError> {
    let address = address.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE address = ?1"
            ))?;
            match stmt.query_row(params![address], map_user) {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Find a user by the payment reference assigned at provisioning.
pub async fn find_by_payment_reference(
    db: &Database,
    reference: &str,
) -> Result<Option<UserRecord>, KvittoError> {
    let reference = reference.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE payment_reference = ?1"
            ))?;
            match stmt.query_row(params![reference], map_user) {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Write the brand-profile field group collected by the setup flow.
pub async fn update_brand_profile(
    db: &Database,
    address: &str,
    profile: &BrandProfile,
) -> Result<(), KvittoError> {
    let address = address.to_string();
    let profile = profile.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET business_name = ?2, brand_color = ?3, business_address = ?4, \
                 contact_phone = ?5, template = ?6, output_format = ?7, \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now')
                 WHERE address = ?1",
                params![
                    address,
                    profile.business_name,
                    profile.brand_color,
                    profile.business_address,
                    profile.contact_phone,
                    profile.template,
                    profile.output_format.to_string(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record the hosted logo URL.
pub async fn set_logo_url(db: &Database, address: &str, url: &str) -> Result<(), KvittoError> {
    let address = address.to_string();
    let url = url.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET logo_url = ?2, \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now') WHERE address = ?1",
                params![address, url],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Change only the preferred output format.
pub async fn set_output_format(
    db: &Database,
    address: &str,
    format: OutputFormat,
) -> Result<(), KvittoError> {
    let address = address.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET output_format = ?2, \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now') WHERE address = ?1",
                params![address, format.to_string()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a provisioned virtual account.
pub async fn set_virtual_account(
    db: &Database,
    address: &str,
    account: &VirtualAccount,
) -> Result<(), KvittoError> {
    let address = address.to_string();
    let account = account.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET payment_reference = ?2, account_number = ?3, bank_name = ?4, \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now') WHERE address = ?1",
                params![
                    address,
                    account.reference,
                    account.account_number,
                    account.bank_name,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Mark the user paid, with the expiry for annual records.
pub async fn mark_paid(
    db: &Database,
    address: &str,
    paid_until: Option<DateTime<Utc>>,
) -> Result<(), KvittoError> {
    let address = address.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET is_paid = 1, paid_until = ?2, \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now') WHERE address = ?1",
                params![address, paid_until.map(|t| t.to_rfc3339())],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Add one to the free-receipt counter, returning the new value. Runs inside
/// one connection call, so the read cannot interleave with another write.
pub async fn increment_receipts_used(db: &Database, address: &str) -> Result<i64, KvittoError> {
    let address = address.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET receipts_used = receipts_used + 1, \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now') WHERE address = ?1",
                params![address],
            )?;
            let count = conn.query_row(
                "SELECT receipts_used FROM users WHERE address = ?1",
                params![address],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(map_tr_err)
}

/// Add one to the free-edit counter, returning the new value.
pub async fn increment_edits_used(db: &Database, address: &str) -> Result<i64, KvittoError> {
    let address = address.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET edits_used = edits_used + 1, \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now') WHERE address = ?1",
                params![address],
            )?;
            let count = conn.query_row(
                "SELECT edits_used FROM users WHERE address = ?1",
                params![address],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(map_tr_err)
}

/// All users, newest first.
pub async fn list_users(db: &Database) -> Result<Vec<UserRecord>, KvittoError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
            ))?;
            let rows = stmt.query_map([], map_user)?;
            let mut users = Vec::new();
            for user in rows {
                users.push(user?);
            }
            Ok(users)
        })
        .await
        .map_err(map_tr_err)
}
