// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Confirmation-webhook normalization.
//!
//! Provider webhook bodies vary in nesting and naming, so interpretation is
//! done over loose JSON rather than a rigid schema: the reference may sit
//! under `transaction` or at the top level, the payer phone under `customer`
//! or at the top level, and the status field is optional. The output is
//! either a normalized [`PaymentEvent`], an explicit "not a confirmation"
//! verdict, or a malformed-payload error for the HTTP boundary to turn into
//! a client error.

use std::str::FromStr;

use kvitto_core::{KvittoError, PaymentEvent};
use rust_decimal::Decimal;
use serde_json::Value;

/// What a webhook body turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookDisposition {
    /// A success confirmation with at least one lookup subject.
    Confirmation(PaymentEvent),
    /// Structurally valid but not actionable, e.g. a failed-transaction
    /// notification. The boundary acknowledges these with 200 so the
    /// provider does not retry.
    Ignored { reason: &'static str },
}

/// Interpret one raw webhook body.
///
/// Undecodable bodies and confirmations without any lookup subject are
/// malformed ([`KvittoError::Payments`]); everything else is interpretable.
pub fn interpret_webhook(body: &[u8]) -> Result<WebhookDisposition, KvittoError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| KvittoError::Payments {
        message: format!("malformed webhook payload: {e}"),
        source: Some(Box::new(e)),
    })?;
    if !value.is_object() {
        return Err(KvittoError::Payments {
            message: "malformed webhook payload: expected a JSON object".into(),
            source: None,
        });
    }

    if let Some(status) = status_field(&value)
        && !is_success_status(status)
    {
        return Ok(WebhookDisposition::Ignored {
            reason: "not a success confirmation",
        });
    }

    let event = PaymentEvent {
        reference: string_at(&value, &["transaction", "reference"])
            .or_else(|| string_at(&value, &["reference"])),
        phone: string_at(&value, &["customer", "phone"]).or_else(|| string_at(&value, &["phone"])),
        amount: amount_at(&value, &["transaction", "amount"])
            .or_else(|| amount_at(&value, &["order", "amount"]))
            .or_else(|| amount_at(&value, &["amount"])),
    };
    if !event.has_subject() {
        return Err(KvittoError::Payments {
            message: "webhook payload carries neither a reference nor a phone".into(),
            source: None,
        });
    }

    Ok(WebhookDisposition::Confirmation(event))
}

fn status_field(value: &Value) -> Option<&str> {
    value
        .get("transactionStatus")
        .or_else(|| value.get("status"))
        .and_then(Value::as_str)
}

fn is_success_status(status: &str) -> bool {
    matches!(
        status.to_ascii_lowercase().as_str(),
        "success" | "successful" | "completed"
    )
}

fn string_at(value: &Value, path: &[&str]) -> Option<String> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    let text = current.as_str()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Amounts arrive as JSON numbers or as decimal strings; both map onto
/// [`Decimal`]. Unparseable amounts degrade to `None`; the amount is
/// logging detail, never reconciliation input.
fn amount_at(value: &Value, path: &[&str]) -> Option<Decimal> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    match current {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmation(body: &Value) -> PaymentEvent {
        match interpret_webhook(body.to_string().as_bytes()).unwrap() {
            WebhookDisposition::Confirmation(event) => event,
            other => panic!("expected a confirmation, got {other:?}"),
        }
    }

    #[test]
    fn nested_success_payload_normalizes() {
        let event = confirmation(&serde_json::json!({
            "transactionStatus": "SUCCESS",
            "transaction": {"reference": "KVT-2348012345678", "amount": 2000},
            "customer": {"phone": "+2348012345678"}
        }));
        assert_eq!(event.reference.as_deref(), Some("KVT-2348012345678"));
        assert_eq!(event.phone.as_deref(), Some("+2348012345678"));
        assert_eq!(event.amount, Some(Decimal::new(2000, 0)));
    }

    #[test]
    fn top_level_fields_are_accepted() {
        let event = confirmation(&serde_json::json!({
            "status": "successful",
            "reference": "KVT-1",
            "amount": "2000.50"
        }));
        assert_eq!(event.reference.as_deref(), Some("KVT-1"));
        assert!(event.phone.is_none());
        assert_eq!(event.amount.map(|a| a.to_string()), Some("2000.50".into()));
    }

    #[test]
    fn missing_status_still_counts_as_a_confirmation() {
        let event = confirmation(&serde_json::json!({
            "transaction": {"reference": "KVT-2"}
        }));
        assert_eq!(event.reference.as_deref(), Some("KVT-2"));
    }

    #[test]
    fn failed_status_is_ignored_not_an_error() {
        let body = serde_json::json!({
            "transactionStatus": "FAILED",
            "transaction": {"reference": "KVT-3"}
        });
        let disposition = interpret_webhook(body.to_string().as_bytes()).unwrap();
        assert!(matches!(disposition, WebhookDisposition::Ignored { .. }));
    }

    #[test]
    fn subjectless_payload_is_malformed() {
        let body = serde_json::json!({"status": "success", "amount": 2000});
        let err = interpret_webhook(body.to_string().as_bytes()).unwrap_err();
        assert!(
            err.to_string().contains("neither a reference nor a phone"),
            "got: {err}"
        );
    }

    #[test]
    fn undecodable_body_is_malformed() {
        let err = interpret_webhook(b"not json").unwrap_err();
        assert!(err.to_string().contains("malformed"), "got: {err}");
        let err = interpret_webhook(b"[1,2,3]").unwrap_err();
        assert!(err.to_string().contains("JSON object"), "got: {err}");
    }

    #[test]
    fn unparseable_amount_degrades_to_none() {
        let event = confirmation(&serde_json::json!({
            "reference": "KVT-4",
            "amount": "two thousand"
        }));
        assert!(event.amount.is_none());
    }

    #[test]
    fn blank_subject_strings_do_not_count() {
        let body = serde_json::json!({"reference": "  ", "phone": ""});
        assert!(interpret_webhook(body.to_string().as_bytes()).is_err());
    }
}
