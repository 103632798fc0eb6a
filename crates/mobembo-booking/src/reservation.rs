use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use mobembo_core::{Booking, BookingError, BookingStatus, TransactionCoordinator};

use crate::ledger;

/// A validated reservation command. Input shape (well-typed ids, parsed
/// integers) is the boundary's job; business rules are checked here.
#[derive(Debug, Clone)]
pub struct ReservationRequest {
    pub user_id: Uuid,
    pub schedule_id: Uuid,
    pub seats_booked: i32,
}

/// Turns a reservation request into a PENDING booking, consuming seats
/// and freezing the price in one atomic unit.
#[derive(Clone)]
pub struct ReservationEngine {
    coordinator: Arc<dyn TransactionCoordinator>,
}

impl ReservationEngine {
    pub fn new(coordinator: Arc<dyn TransactionCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Seat decrement, price computation and booking insert commit
    /// together; any failure on the way leaves no booking and no
    /// consumed seats. A seat shortage is reported immediately, never
    /// retried.
    pub async fn create_booking(
        &self,
        request: ReservationRequest,
    ) -> Result<Booking, BookingError> {
        if request.user_id.is_nil() {
            return Err(BookingError::Unauthenticated);
        }

        let mut unit = self.coordinator.begin().await?;
        let unit_price =
            ledger::reserve_seats(unit.as_mut(), request.schedule_id, request.seats_booked).await?;

        let booking = Booking {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            schedule_id: request.schedule_id,
            seats_booked: request.seats_booked,
            total_price: unit_price * Decimal::from(request.seats_booked),
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        };

        unit.insert_booking(&booking).await?;
        unit.commit().await?;

        info!(
            "booking {} created: {} seat(s) on schedule {} for {}",
            booking.id, booking.seats_booked, booking.schedule_id, booking.total_price
        );

        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use mobembo_core::{Payment, Route, Schedule, ScheduleStatus, UnitOfWork};
    use mobembo_store::MemoryCoordinator;

    struct Fixture {
        coordinator: Arc<MemoryCoordinator>,
        route_id: Uuid,
        schedule_id: Uuid,
        engine: ReservationEngine,
    }

    async fn fixture(seats: i32, price: Decimal) -> Fixture {
        let coordinator = Arc::new(MemoryCoordinator::new());
        let now = Utc::now();
        let route_id = Uuid::new_v4();
        let schedule_id = Uuid::new_v4();

        coordinator
            .insert_route(Route {
                id: route_id,
                departure: "Kinshasa".to_string(),
                destination: "Lubumbashi".to_string(),
                price,
                duration_minutes: Some(180),
                company_id: Uuid::new_v4(),
                created_at: now,
            })
            .await;
        coordinator
            .insert_schedule(Schedule {
                id: schedule_id,
                route_id,
                bus_id: Uuid::new_v4(),
                departure_time: now,
                arrival_time: None,
                available_seats: seats,
                status: ScheduleStatus::Active,
                created_at: now,
            })
            .await;

        let engine = ReservationEngine::new(coordinator.clone());
        Fixture {
            coordinator,
            route_id,
            schedule_id,
            engine,
        }
    }

    #[tokio::test]
    async fn booking_is_pending_with_frozen_price() {
        let fx = fixture(50, Decimal::new(75_000, 0)).await;

        let booking = fx
            .engine
            .create_booking(ReservationRequest {
                user_id: Uuid::new_v4(),
                schedule_id: fx.schedule_id,
                seats_booked: 2,
            })
            .await
            .unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.total_price, Decimal::new(150_000, 0));
        let schedule = fx.coordinator.schedule(fx.schedule_id).await.unwrap();
        assert_eq!(schedule.available_seats, 48);
    }

    #[tokio::test]
    async fn price_change_after_booking_does_not_reprice_it() {
        let fx = fixture(50, Decimal::new(75_000, 0)).await;
        let user_id = Uuid::new_v4();

        let first = fx
            .engine
            .create_booking(ReservationRequest {
                user_id,
                schedule_id: fx.schedule_id,
                seats_booked: 1,
            })
            .await
            .unwrap();

        fx.coordinator
            .set_route_price(fx.route_id, Decimal::new(90_000, 0))
            .await;

        let stored = fx.coordinator.booking(first.id).await.unwrap();
        assert_eq!(stored.total_price, Decimal::new(75_000, 0));

        // a later booking picks up the new basis
        let second = fx
            .engine
            .create_booking(ReservationRequest {
                user_id,
                schedule_id: fx.schedule_id,
                seats_booked: 1,
            })
            .await
            .unwrap();
        assert_eq!(second.total_price, Decimal::new(90_000, 0));
    }

    #[tokio::test]
    async fn nil_user_is_rejected() {
        let fx = fixture(10, Decimal::new(10_000, 0)).await;
        let err = fx
            .engine
            .create_booking(ReservationRequest {
                user_id: Uuid::nil(),
                schedule_id: fx.schedule_id,
                seats_booked: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Unauthenticated));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_reservations_never_oversell() {
        let fx = fixture(5, Decimal::new(20_000, 0)).await;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let engine = fx.engine.clone();
            let schedule_id = fx.schedule_id;
            handles.push(tokio::spawn(async move {
                engine
                    .create_booking(ReservationRequest {
                        user_id: Uuid::new_v4(),
                        schedule_id,
                        seats_booked: 1,
                    })
                    .await
            }));
        }

        let mut succeeded = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(BookingError::InsufficientSeats { .. }) => rejected += 1,
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }

        assert_eq!(succeeded, 5);
        assert_eq!(rejected, 15);

        let schedule = fx.coordinator.schedule(fx.schedule_id).await.unwrap();
        assert_eq!(schedule.available_seats, 0);
        let booked: i32 = fx
            .coordinator
            .bookings_for_schedule(fx.schedule_id)
            .await
            .iter()
            .map(|booking| booking.seats_booked)
            .sum();
        assert_eq!(booked, 5);
    }

    /// Coordinator whose units fail on `insert_booking`, to prove the
    /// seat decrement never outlives a failed unit.
    struct FailingBookingInsert {
        inner: Arc<MemoryCoordinator>,
    }

    struct FailingUnit {
        inner: Box<dyn UnitOfWork>,
    }

    #[async_trait]
    impl TransactionCoordinator for FailingBookingInsert {
        async fn begin(&self) -> Result<Box<dyn UnitOfWork>, BookingError> {
            Ok(Box::new(FailingUnit {
                inner: self.inner.begin().await?,
            }))
        }
    }

    #[async_trait]
    impl UnitOfWork for FailingUnit {
        async fn lock_schedule(
            &mut self,
            schedule_id: Uuid,
        ) -> Result<Option<mobembo_core::LockedSchedule>, BookingError> {
            self.inner.lock_schedule(schedule_id).await
        }

        async fn decrement_seats(
            &mut self,
            schedule_id: Uuid,
            count: i32,
        ) -> Result<(), BookingError> {
            self.inner.decrement_seats(schedule_id, count).await
        }

        async fn insert_booking(&mut self, _booking: &Booking) -> Result<(), BookingError> {
            Err(BookingError::store(anyhow::anyhow!("injected write fault")))
        }

        async fn find_booking(
            &mut self,
            booking_id: Uuid,
        ) -> Result<Option<Booking>, BookingError> {
            self.inner.find_booking(booking_id).await
        }

        async fn find_payment_for_booking(
            &mut self,
            booking_id: Uuid,
        ) -> Result<Option<Payment>, BookingError> {
            self.inner.find_payment_for_booking(booking_id).await
        }

        async fn insert_payment(&mut self, payment: &Payment) -> Result<(), BookingError> {
            self.inner.insert_payment(payment).await
        }

        async fn mark_payment_success(
            &mut self,
            payment_id: Uuid,
            paid_at: DateTime<Utc>,
        ) -> Result<(), BookingError> {
            self.inner.mark_payment_success(payment_id, paid_at).await
        }

        async fn mark_payment_failed(&mut self, payment_id: Uuid) -> Result<(), BookingError> {
            self.inner.mark_payment_failed(payment_id).await
        }

        async fn confirm_booking(&mut self, booking_id: Uuid) -> Result<(), BookingError> {
            self.inner.confirm_booking(booking_id).await
        }

        async fn commit(self: Box<Self>) -> Result<(), BookingError> {
            self.inner.commit().await
        }
    }

    #[tokio::test]
    async fn failed_insert_rolls_back_the_decrement() {
        let fx = fixture(10, Decimal::new(30_000, 0)).await;
        let engine = ReservationEngine::new(Arc::new(FailingBookingInsert {
            inner: fx.coordinator.clone(),
        }));

        let err = engine
            .create_booking(ReservationRequest {
                user_id: Uuid::new_v4(),
                schedule_id: fx.schedule_id,
                seats_booked: 3,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Store(_)));

        let schedule = fx.coordinator.schedule(fx.schedule_id).await.unwrap();
        assert_eq!(schedule.available_seats, 10);
        assert!(
            fx.coordinator
                .bookings_for_schedule(fx.schedule_id)
                .await
                .is_empty()
        );
    }
}
