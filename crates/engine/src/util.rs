//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// Reject non-positive monetary amounts before they reach the ledger.
pub(crate) fn ensure_positive_amount(amount_minor: i64, label: &str) -> ResultEngine<()> {
    if amount_minor <= 0 {
        return Err(EngineError::InvalidAmount(format!(
            "{label} must be > 0"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_and_negative_amounts() {
        assert!(ensure_positive_amount(0, "amount_minor").is_err());
        assert!(ensure_positive_amount(-5, "amount_minor").is_err());
        assert!(ensure_positive_amount(1, "amount_minor").is_ok());
    }

    #[test]
    fn parse_uuid_labels_errors() {
        let err = parse_uuid("not-a-uuid", "wallet").unwrap_err();
        assert_eq!(err, EngineError::InvalidId("invalid wallet id".to_string()));
    }
}
