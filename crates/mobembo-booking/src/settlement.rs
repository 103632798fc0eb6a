use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use mobembo_core::{
    BookingError, ChargeRequest, MobileMoneyProvider, Payment, PaymentMethod, PaymentStatus,
    SettlementOutcome, TransactionCoordinator, new_transaction_ref,
};

/// A validated settlement command. `user_id` must be the booking owner.
#[derive(Debug, Clone)]
pub struct SettlementRequest {
    pub user_id: Uuid,
    pub booking_id: Uuid,
    pub method: PaymentMethod,
    pub phone_number: String,
}

/// Drives exactly one payment per booking from initiation to a terminal
/// state and promotes the booking on success.
#[derive(Clone)]
pub struct SettlementEngine {
    coordinator: Arc<dyn TransactionCoordinator>,
    provider: Arc<dyn MobileMoneyProvider>,
}

impl SettlementEngine {
    pub fn new(
        coordinator: Arc<dyn TransactionCoordinator>,
        provider: Arc<dyn MobileMoneyProvider>,
    ) -> Self {
        Self {
            coordinator,
            provider,
        }
    }

    /// Two commits bracket the operator call. The first makes the
    /// existing-payment guard and the PENDING insert atomic together —
    /// concurrent duplicates race on the store's uniqueness and the
    /// loser gets [`BookingError::PaymentAlreadyExists`]. The second
    /// pairs SUCCESS with the booking's CONFIRMED flip, so neither is
    /// ever observable without the other. No transaction stays open
    /// while the operator is on the wire.
    pub async fn settle(&self, request: SettlementRequest) -> Result<Payment, BookingError> {
        if request.user_id.is_nil() {
            return Err(BookingError::Unauthenticated);
        }

        let mut unit = self.coordinator.begin().await?;
        let Some(booking) = unit.find_booking(request.booking_id).await? else {
            return Err(BookingError::BookingNotFound);
        };

        if booking.user_id != request.user_id {
            return Err(BookingError::Forbidden);
        }

        if unit.find_payment_for_booking(booking.id).await?.is_some() {
            return Err(BookingError::PaymentAlreadyExists);
        }

        let now = Utc::now();
        let mut payment = Payment {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            amount: booking.total_price,
            method: request.method,
            phone_number: request.phone_number,
            transaction_ref: new_transaction_ref(now),
            status: PaymentStatus::Pending,
            paid_at: None,
            created_at: now,
        };
        unit.insert_payment(&payment).await?;
        unit.commit().await?;

        let charge = ChargeRequest {
            transaction_ref: payment.transaction_ref.clone(),
            amount: payment.amount,
            method: payment.method,
            phone_number: payment.phone_number.clone(),
        };

        match self.provider.collect(&charge).await {
            SettlementOutcome::Success => {
                let paid_at = Utc::now();
                let mut unit = self.coordinator.begin().await?;
                unit.mark_payment_success(payment.id, paid_at).await?;
                unit.confirm_booking(booking.id).await?;
                unit.commit().await?;

                payment.status = PaymentStatus::Success;
                payment.paid_at = Some(paid_at);
                info!(
                    "payment {} settled booking {} ({})",
                    payment.id, booking.id, payment.transaction_ref
                );
                Ok(payment)
            }
            SettlementOutcome::Failure { reason } => {
                let mut unit = self.coordinator.begin().await?;
                unit.mark_payment_failed(payment.id).await?;
                unit.commit().await?;

                warn!(
                    "payment {} for booking {} declined: {reason}",
                    payment.id, booking.id
                );
                Err(BookingError::PaymentDeclined { reason })
            }
            SettlementOutcome::Pending => {
                // awaiting the operator's callback; booking stays PENDING
                Ok(payment)
            }
        }
    }
}
