// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Receipt construction and revision.
//!
//! Totals are never trusted from earlier state: every write path re-sums
//! the price list with exact decimal arithmetic just before persistence.

use kvitto_core::money;
use kvitto_core::{KvittoError, ReceiptRecord, RenderRequest, UserRecord};

/// A fully validated receipt draft, ready to become a record. The total is
/// deliberately absent; it is computed here, not carried from the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReceiptData {
    pub customer_name: String,
    pub items: Vec<String>,
    pub prices: Vec<String>,
    pub payment_method: String,
}

/// One field-group revision to an existing receipt. Items and prices only
/// change together so the lists can never drift out of step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditChange {
    CustomerName(String),
    ItemsAndPrices {
        items: Vec<String>,
        prices: Vec<String>,
    },
    PaymentMethod(String),
}

/// Build a new receipt record and its render request from validated input.
pub fn create_receipt(
    user: &UserRecord,
    data: NewReceiptData,
) -> Result<(ReceiptRecord, RenderRequest), KvittoError> {
    let total = sum_total(&data.prices)?;
    let record = ReceiptRecord::new(
        &user.address,
        data.customer_name,
        data.items,
        data.prices,
        data.payment_method,
        total,
    );
    let request = RenderRequest::assemble(user, &record);
    Ok((record, request))
}

/// Apply one revision to an existing receipt, preserving its identity and
/// creation time, and recompute the total from the resulting price list.
pub fn edit_receipt(
    user: &UserRecord,
    existing: &ReceiptRecord,
    change: EditChange,
) -> Result<(ReceiptRecord, RenderRequest), KvittoError> {
    let mut updated = existing.clone();
    match change {
        EditChange::CustomerName(name) => updated.customer_name = name,
        EditChange::ItemsAndPrices { items, prices } => {
            updated.items = items;
            updated.prices = prices;
        }
        EditChange::PaymentMethod(method) => updated.payment_method = method,
    }
    updated.total = sum_total(&updated.prices)?;
    let request = RenderRequest::assemble(user, &updated);
    Ok((updated, request))
}

/// Assemble a render request for an unchanged receipt.
pub fn resend(user: &UserRecord, receipt: &ReceiptRecord) -> RenderRequest {
    RenderRequest::assemble(user, receipt)
}

fn sum_total(prices: &[String]) -> Result<String, KvittoError> {
    let total = money::sum_prices(prices.iter().map(String::as_str)).map_err(|e| {
        KvittoError::Internal(format!("stored price list failed revalidation: {e}"))
    })?;
    Ok(total.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> UserRecord {
        let mut user = UserRecord::new("2348012345678");
        user.business_name = Some("Ada Cakes".into());
        user
    }

    fn data() -> NewReceiptData {
        NewReceiptData {
            customer_name: "Chidi".into(),
            items: vec!["Cake".into(), "Drink".into()],
            prices: vec!["1500".into(), "500".into()],
            payment_method: "Transfer".into(),
        }
    }

    #[test]
    fn create_sums_prices_exactly() {
        let (record, request) = create_receipt(&owner(), data()).unwrap();
        assert_eq!(record.total, "2000");
        assert_eq!(record.owner, "2348012345678");
        assert_eq!(request.total, "2000");
        assert_eq!(request.business_name, "Ada Cakes");
        assert_eq!(request.receipt_id, record.id);
    }

    #[test]
    fn fractional_prices_do_not_drift() {
        let mut d = data();
        d.prices = vec!["0.1".into(), "0.2".into()];
        let (record, _) = create_receipt(&owner(), d).unwrap();
        assert_eq!(record.total, "0.3");
    }

    #[test]
    fn edit_preserves_identity_and_recomputes_total() {
        let user = owner();
        let (original, _) = create_receipt(&user, data()).unwrap();
        let change = EditChange::ItemsAndPrices {
            items: vec!["Cake".into(), "Juice".into()],
            prices: vec!["1500".into(), "700".into()],
        };
        let (updated, request) = edit_receipt(&user, &original, change).unwrap();
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.owner, original.owner);
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(updated.items, vec!["Cake".to_string(), "Juice".to_string()]);
        assert_eq!(updated.total, "2200");
        assert_eq!(request.receipt_id, original.id);
    }

    #[test]
    fn name_edit_keeps_prices_but_still_recomputes() {
        let user = owner();
        let (original, _) = create_receipt(&user, data()).unwrap();
        let (updated, _) =
            edit_receipt(&user, &original, EditChange::CustomerName("Ngozi".into())).unwrap();
        assert_eq!(updated.customer_name, "Ngozi");
        assert_eq!(updated.prices, original.prices);
        assert_eq!(updated.total, "2000");
    }

    #[test]
    fn resend_reuses_the_stored_receipt_untouched() {
        let user = owner();
        let (record, _) = create_receipt(&user, data()).unwrap();
        let request = resend(&user, &record);
        assert_eq!(request.receipt_id, record.id);
        assert_eq!(request.total, "2000");
    }
}
