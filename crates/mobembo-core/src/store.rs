use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::errors::BookingError;
use crate::models::{Booking, Payment, Schedule};

/// A schedule row claimed for exclusive access until the owning unit
/// commits, together with the route price read in the same transaction.
#[derive(Debug, Clone)]
pub struct LockedSchedule {
    pub schedule: Schedule,
    pub route_price: Decimal,
}

/// Hands out units of work. Concurrent units touching the same schedule
/// serialize on `lock_schedule`, so a read-then-decrement is never
/// interleaved with another on the same row.
#[async_trait]
pub trait TransactionCoordinator: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, BookingError>;
}

/// One all-or-nothing group of reads and writes. Writes become durable
/// only on `commit`; dropping an uncommitted unit discards all of them.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Loads a schedule and its route price under an exclusive claim
    /// held until this unit commits or is dropped.
    async fn lock_schedule(
        &mut self,
        schedule_id: Uuid,
    ) -> Result<Option<LockedSchedule>, BookingError>;

    async fn decrement_seats(&mut self, schedule_id: Uuid, count: i32)
    -> Result<(), BookingError>;

    async fn insert_booking(&mut self, booking: &Booking) -> Result<(), BookingError>;

    async fn find_booking(&mut self, booking_id: Uuid) -> Result<Option<Booking>, BookingError>;

    async fn find_payment_for_booking(
        &mut self,
        booking_id: Uuid,
    ) -> Result<Option<Payment>, BookingError>;

    /// Fails with [`BookingError::PaymentAlreadyExists`] when the
    /// one-payment-per-booking uniqueness is violated, including when a
    /// concurrent unit won the race.
    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), BookingError>;

    /// Transitions a PENDING payment to SUCCESS. A payment already in a
    /// terminal state is a storage fault, never overwritten.
    async fn mark_payment_success(
        &mut self,
        payment_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<(), BookingError>;

    /// Transitions a PENDING payment to FAILED.
    async fn mark_payment_failed(&mut self, payment_id: Uuid) -> Result<(), BookingError>;

    async fn confirm_booking(&mut self, booking_id: Uuid) -> Result<(), BookingError>;

    async fn commit(self: Box<Self>) -> Result<(), BookingError>;
}
