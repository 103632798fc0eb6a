use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::PaymentMethod;

/// One collection attempt against a subscriber's mobile-money wallet.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub transaction_ref: String,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub phone_number: String,
}

/// Result of a collection attempt. `Pending` is the hook for operators
/// that confirm asynchronously through a callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    Success,
    Failure { reason: String },
    Pending,
}

/// External mobile-money operator the settlement engine charges through.
#[async_trait]
pub trait MobileMoneyProvider: Send + Sync {
    async fn collect(&self, charge: &ChargeRequest) -> SettlementOutcome;
}

/// Builds a reference unique across the lifetime of the system:
/// millisecond timestamp plus 24 random bits, backed by a uniqueness
/// constraint in the store.
pub fn new_transaction_ref(now: DateTime<Utc>) -> String {
    let entropy = Uuid::new_v4().simple().to_string();
    format!(
        "MOB-{}-{}",
        now.timestamp_millis(),
        entropy[..6].to_ascii_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_ref_shape() {
        let now = Utc::now();
        let reference = new_transaction_ref(now);
        let parts: Vec<&str> = reference.splitn(3, '-').collect();
        assert_eq!(parts[0], "MOB");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 6);
        assert!(
            parts[2]
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn transaction_refs_differ() {
        let now = Utc::now();
        assert_ne!(new_transaction_ref(now), new_transaction_ref(now));
    }
}
