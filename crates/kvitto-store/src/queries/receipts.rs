// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Receipt queries. Item and price lists are stored as JSON text columns;
//! serialization happens before the connection call so a failure surfaces as
//! an internal error rather than poisoning the writer.

use kvitto_core::{KvittoError, ReceiptFields, ReceiptRecord};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

const RECEIPT_COLUMNS: &str =
    "id, owner, customer_name, items, prices, payment_method, total, created_at";

fn map_receipt(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReceiptRecord> {
    Ok(ReceiptRecord {
        id: row.get(0)?,
        owner: row.get(1)?,
        customer_name: row.get(2)?,
        items: super::parse_string_list(3, row.get(3)?)?,
        prices: super::parse_string_list(4, row.get(4)?)?,
        payment_method: row.get(5)?,
        total: row.get(6)?,
        created_at: super::parse_ts(7, row.get(7)?)?,
    })
}

fn encode_list(list: &[String]) -> Result<String, KvittoError> {
    serde_json::to_string(list)
        .map_err(|e| KvittoError::Internal(format!("failed to encode receipt list: {e}")))
}

/// Persist a new receipt.
pub async fn insert_receipt(db: &Database, receipt: &ReceiptRecord) -> Result<(), KvittoError> {
    let items = encode_list(&receipt.items)?;
    let prices = encode_list(&receipt.prices)?;
    let receipt = receipt.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO receipts (id, owner, customer_name, items, prices, \
                 payment_method, total, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    receipt.id,
                    receipt.owner,
                    receipt.customer_name,
                    items,
                    prices,
                    receipt.payment_method,
                    receipt.total,
                    receipt.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a receipt by id.
pub async fn get_receipt(db: &Database, id: &str) -> Result<Option<ReceiptRecord>, KvittoError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECEIPT_COLUMNS} FROM receipts WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], map_receipt) {
                Ok(receipt) => Ok(Some(receipt)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// The owner's most recently created receipt, if any.
pub async fn latest_for_owner(
    db: &Database,
    owner: &str,
) -> Result<Option<ReceiptRecord>, KvittoError> {
    let owner = owner.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECEIPT_COLUMNS} FROM receipts WHERE owner = ?1 \
                 ORDER BY created_at DESC LIMIT 1"
            ))?;
            match stmt.query_row(params![owner], map_receipt) {
                Ok(receipt) => Ok(Some(receipt)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrite the mutable field group of an existing receipt. Id, owner, and
/// creation time are untouched.
pub async fn update_fields(
    db: &Database,
    id: &str,
    fields: &ReceiptFields,
) -> Result<(), KvittoError> {
    let items = encode_list(&fields.items)?;
    let prices = encode_list(&fields.prices)?;
    let id = id.to_string();
    let receipt_id = id.clone();
    let fields = fields.clone();
    let affected = db
        .connection()
        .call(move |conn| {
            let affected = conn.execute(
                "UPDATE receipts SET customer_name = ?2, items = ?3, prices = ?4, \
                 payment_method = ?5, total = ?6 WHERE id = ?1",
                params![
                    id,
                    fields.customer_name,
                    items,
                    prices,
                    fields.payment_method,
                    fields.total,
                ],
            )?;
            Ok(affected)
        })
        .await
        .map_err(map_tr_err)?;
    if affected == 0 {
        return Err(KvittoError::ReceiptNotFound { id: receipt_id });
    }
    Ok(())
}

/// Total number of stored receipts.
pub async fn count_all(db: &Database) -> Result<i64, KvittoError> {
    db.connection()
        .call(move |conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM receipts", [], |row| row.get(0))?;
            Ok(count)
        })
        .await
        .map_err(map_tr_err)
}
