use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use mobembo_core::{
    Booking, BookingError, BookingStatus, LockedSchedule, Payment, PaymentStatus, Route, Schedule,
    TransactionCoordinator, UnitOfWork,
};

#[derive(Debug, Default, Clone)]
struct MemoryState {
    routes: HashMap<Uuid, Route>,
    schedules: HashMap<Uuid, Schedule>,
    bookings: HashMap<Uuid, Booking>,
    payments: HashMap<Uuid, Payment>,
}

/// Coordinator over process-local state. Every unit holds the one lock
/// for its whole lifetime and mutates a working copy, so units are fully
/// serialized and an uncommitted unit leaves nothing behind. Intended
/// for tests and local development; Postgres is the deployment store.
#[derive(Default, Clone)]
pub struct MemoryCoordinator {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_route(&self, route: Route) {
        self.state.lock().await.routes.insert(route.id, route);
    }

    pub async fn insert_schedule(&self, schedule: Schedule) {
        self.state
            .lock()
            .await
            .schedules
            .insert(schedule.id, schedule);
    }

    pub async fn set_route_price(&self, route_id: Uuid, price: Decimal) {
        if let Some(route) = self.state.lock().await.routes.get_mut(&route_id) {
            route.price = price;
        }
    }

    pub async fn schedule(&self, schedule_id: Uuid) -> Option<Schedule> {
        self.state.lock().await.schedules.get(&schedule_id).cloned()
    }

    pub async fn booking(&self, booking_id: Uuid) -> Option<Booking> {
        self.state.lock().await.bookings.get(&booking_id).cloned()
    }

    pub async fn bookings_for_schedule(&self, schedule_id: Uuid) -> Vec<Booking> {
        self.state
            .lock()
            .await
            .bookings
            .values()
            .filter(|booking| booking.schedule_id == schedule_id)
            .cloned()
            .collect()
    }

    pub async fn payment_for_booking(&self, booking_id: Uuid) -> Option<Payment> {
        self.state
            .lock()
            .await
            .payments
            .values()
            .find(|payment| payment.booking_id == booking_id)
            .cloned()
    }
}

#[async_trait]
impl TransactionCoordinator for MemoryCoordinator {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, BookingError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnit { guard, working }))
    }
}

struct MemoryUnit {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl UnitOfWork for MemoryUnit {
    async fn lock_schedule(
        &mut self,
        schedule_id: Uuid,
    ) -> Result<Option<LockedSchedule>, BookingError> {
        let Some(schedule) = self.working.schedules.get(&schedule_id).cloned() else {
            return Ok(None);
        };

        let route = self.working.routes.get(&schedule.route_id).ok_or_else(|| {
            BookingError::store(anyhow::anyhow!(
                "schedule {schedule_id} references missing route"
            ))
        })?;

        Ok(Some(LockedSchedule {
            route_price: route.price,
            schedule,
        }))
    }

    async fn decrement_seats(
        &mut self,
        schedule_id: Uuid,
        count: i32,
    ) -> Result<(), BookingError> {
        let schedule = self
            .working
            .schedules
            .get_mut(&schedule_id)
            .ok_or_else(|| {
                BookingError::store(anyhow::anyhow!("schedule {schedule_id} vanished"))
            })?;

        if schedule.available_seats < count {
            return Err(BookingError::store(anyhow::anyhow!(
                "seat counter for {schedule_id} would go negative"
            )));
        }

        schedule.available_seats -= count;
        Ok(())
    }

    async fn insert_booking(&mut self, booking: &Booking) -> Result<(), BookingError> {
        self.working.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn find_booking(&mut self, booking_id: Uuid) -> Result<Option<Booking>, BookingError> {
        Ok(self.working.bookings.get(&booking_id).cloned())
    }

    async fn find_payment_for_booking(
        &mut self,
        booking_id: Uuid,
    ) -> Result<Option<Payment>, BookingError> {
        Ok(self
            .working
            .payments
            .values()
            .find(|payment| payment.booking_id == booking_id)
            .cloned())
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), BookingError> {
        if self
            .working
            .payments
            .values()
            .any(|existing| existing.booking_id == payment.booking_id)
        {
            return Err(BookingError::PaymentAlreadyExists);
        }

        if self
            .working
            .payments
            .values()
            .any(|existing| existing.transaction_ref == payment.transaction_ref)
        {
            return Err(BookingError::store(anyhow::anyhow!(
                "transaction ref {} already used",
                payment.transaction_ref
            )));
        }

        self.working.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn mark_payment_success(
        &mut self,
        payment_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        let payment = self.working.payments.get_mut(&payment_id).ok_or_else(|| {
            BookingError::store(anyhow::anyhow!("payment {payment_id} vanished"))
        })?;

        if payment.status != PaymentStatus::Pending {
            return Err(BookingError::store(anyhow::anyhow!(
                "payment {payment_id} is not awaiting settlement"
            )));
        }

        payment.status = PaymentStatus::Success;
        payment.paid_at = Some(paid_at);
        Ok(())
    }

    async fn mark_payment_failed(&mut self, payment_id: Uuid) -> Result<(), BookingError> {
        let payment = self.working.payments.get_mut(&payment_id).ok_or_else(|| {
            BookingError::store(anyhow::anyhow!("payment {payment_id} vanished"))
        })?;

        if payment.status != PaymentStatus::Pending {
            return Err(BookingError::store(anyhow::anyhow!(
                "payment {payment_id} is not awaiting settlement"
            )));
        }

        payment.status = PaymentStatus::Failed;
        Ok(())
    }

    async fn confirm_booking(&mut self, booking_id: Uuid) -> Result<(), BookingError> {
        let booking = self.working.bookings.get_mut(&booking_id).ok_or_else(|| {
            BookingError::store(anyhow::anyhow!("booking {booking_id} vanished"))
        })?;

        if booking.status != BookingStatus::Pending {
            return Err(BookingError::store(anyhow::anyhow!(
                "booking {booking_id} is not awaiting confirmation"
            )));
        }

        booking.status = BookingStatus::Confirmed;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), BookingError> {
        let MemoryUnit { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mobembo_core::ScheduleStatus;

    fn seeded() -> (MemoryCoordinator, Uuid, Uuid) {
        let route_id = Uuid::new_v4();
        let schedule_id = Uuid::new_v4();
        let coordinator = MemoryCoordinator::new();
        (coordinator, route_id, schedule_id)
    }

    async fn seed(coordinator: &MemoryCoordinator, route_id: Uuid, schedule_id: Uuid, seats: i32) {
        let now = Utc::now();
        coordinator
            .insert_route(Route {
                id: route_id,
                departure: "Kinshasa".to_string(),
                destination: "Matadi".to_string(),
                price: Decimal::new(25_000, 0),
                duration_minutes: Some(240),
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
    }

    #[tokio::test]
    async fn dropped_unit_discards_writes() {
        let (coordinator, route_id, schedule_id) = seeded();
        seed(&coordinator, route_id, schedule_id, 10).await;

        {
            let mut unit = coordinator.begin().await.unwrap();
            unit.lock_schedule(schedule_id).await.unwrap().unwrap();
            unit.decrement_seats(schedule_id, 4).await.unwrap();
            // dropped without commit
        }

        let schedule = coordinator.schedule(schedule_id).await.unwrap();
        assert_eq!(schedule.available_seats, 10);
    }

    #[tokio::test]
    async fn committed_unit_applies_writes() {
        let (coordinator, route_id, schedule_id) = seeded();
        seed(&coordinator, route_id, schedule_id, 10).await;

        let mut unit = coordinator.begin().await.unwrap();
        unit.decrement_seats(schedule_id, 4).await.unwrap();
        unit.commit().await.unwrap();

        let schedule = coordinator.schedule(schedule_id).await.unwrap();
        assert_eq!(schedule.available_seats, 6);
    }
}
