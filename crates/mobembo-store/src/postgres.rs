use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use mobembo_core::{
    Booking, BookingError, BookingStatus, LockedSchedule, Payment, PaymentMethod, PaymentStatus,
    Schedule, ScheduleStatus, TransactionCoordinator, UnitOfWork,
};

/// Applies the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Coordinator backed by Postgres transactions. The schedule row lock
/// taken by `lock_schedule` is what serializes concurrent reservations
/// on the same departure.
#[derive(Clone)]
pub struct PgCoordinator {
    pool: PgPool,
}

impl PgCoordinator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionCoordinator for PgCoordinator {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, BookingError> {
        let tx = self.pool.begin().await.map_err(BookingError::store)?;
        Ok(Box::new(PgUnit { tx }))
    }
}

struct PgUnit {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnit {
    async fn lock_schedule(
        &mut self,
        schedule_id: Uuid,
    ) -> Result<Option<LockedSchedule>, BookingError> {
        let row = sqlx::query(
            r#"
            SELECT
                s.id,
                s.route_id,
                s.bus_id,
                s.departure_time,
                s.arrival_time,
                s.available_seats,
                s.status,
                s.created_at,
                r.price
            FROM schedules s
            INNER JOIN routes r ON r.id = s.route_id
            WHERE s.id = $1
            FOR UPDATE OF s
            "#,
        )
        .bind(schedule_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(BookingError::store)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status_raw: String = row.try_get("status").map_err(BookingError::store)?;
        let schedule = Schedule {
            id: row.try_get("id").map_err(BookingError::store)?,
            route_id: row.try_get("route_id").map_err(BookingError::store)?,
            bus_id: row.try_get("bus_id").map_err(BookingError::store)?,
            departure_time: row.try_get("departure_time").map_err(BookingError::store)?,
            arrival_time: row.try_get("arrival_time").map_err(BookingError::store)?,
            available_seats: row.try_get("available_seats").map_err(BookingError::store)?,
            status: ScheduleStatus::parse_str(&status_raw).map_err(BookingError::store)?,
            created_at: row.try_get("created_at").map_err(BookingError::store)?,
        };
        let route_price: Decimal = row.try_get("price").map_err(BookingError::store)?;

        Ok(Some(LockedSchedule {
            schedule,
            route_price,
        }))
    }

    async fn decrement_seats(
        &mut self,
        schedule_id: Uuid,
        count: i32,
    ) -> Result<(), BookingError> {
        let result = sqlx::query(
            "UPDATE schedules SET available_seats = available_seats - $2 WHERE id = $1",
        )
        .bind(schedule_id)
        .bind(count)
        .execute(&mut *self.tx)
        .await
        .map_err(BookingError::store)?;

        if result.rows_affected() != 1 {
            return Err(BookingError::store(anyhow::anyhow!(
                "schedule {schedule_id} vanished during decrement"
            )));
        }

        Ok(())
    }

    async fn insert_booking(&mut self, booking: &Booking) -> Result<(), BookingError> {
        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, user_id, schedule_id, seats_booked, total_price, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.schedule_id)
        .bind(booking.seats_booked)
        .bind(booking.total_price)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(BookingError::store)?;

        Ok(())
    }

    async fn find_booking(&mut self, booking_id: Uuid) -> Result<Option<Booking>, BookingError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, schedule_id, seats_booked, total_price, status, created_at
            FROM bookings
            WHERE id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(BookingError::store)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status_raw: String = row.try_get("status").map_err(BookingError::store)?;
        Ok(Some(Booking {
            id: row.try_get("id").map_err(BookingError::store)?,
            user_id: row.try_get("user_id").map_err(BookingError::store)?,
            schedule_id: row.try_get("schedule_id").map_err(BookingError::store)?,
            seats_booked: row.try_get("seats_booked").map_err(BookingError::store)?,
            total_price: row.try_get("total_price").map_err(BookingError::store)?,
            status: BookingStatus::parse_str(&status_raw).map_err(BookingError::store)?,
            created_at: row.try_get("created_at").map_err(BookingError::store)?,
        }))
    }

    async fn find_payment_for_booking(
        &mut self,
        booking_id: Uuid,
    ) -> Result<Option<Payment>, BookingError> {
        let row = sqlx::query(
            r#"
            SELECT
                id, booking_id, amount, method, phone_number,
                transaction_ref, status, paid_at, created_at
            FROM payments
            WHERE booking_id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(BookingError::store)?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(payment_from_row(&row)?))
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), BookingError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, booking_id, amount, method, phone_number,
                transaction_ref, status, paid_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(payment.id)
        .bind(payment.booking_id)
        .bind(payment.amount)
        .bind(payment.method.as_str())
        .bind(&payment.phone_number)
        .bind(&payment.transaction_ref)
        .bind(payment.status.as_str())
        .bind(payment.paid_at)
        .bind(payment.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|err| match err.as_database_error() {
            Some(db) if db.is_unique_violation() && db.constraint() == Some("payments_booking_id_key") => {
                BookingError::PaymentAlreadyExists
            }
            _ => BookingError::store(err),
        })?;

        Ok(())
    }

    async fn mark_payment_success(
        &mut self,
        payment_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        let result = sqlx::query(
            "UPDATE payments SET status = 'SUCCESS', paid_at = $2 WHERE id = $1 AND status = 'PENDING'",
        )
        .bind(payment_id)
        .bind(paid_at)
        .execute(&mut *self.tx)
        .await
        .map_err(BookingError::store)?;

        if result.rows_affected() != 1 {
            return Err(BookingError::store(anyhow::anyhow!(
                "payment {payment_id} is not awaiting settlement"
            )));
        }

        Ok(())
    }

    async fn mark_payment_failed(&mut self, payment_id: Uuid) -> Result<(), BookingError> {
        let result =
            sqlx::query("UPDATE payments SET status = 'FAILED' WHERE id = $1 AND status = 'PENDING'")
                .bind(payment_id)
                .execute(&mut *self.tx)
                .await
                .map_err(BookingError::store)?;

        if result.rows_affected() != 1 {
            return Err(BookingError::store(anyhow::anyhow!(
                "payment {payment_id} is not awaiting settlement"
            )));
        }

        Ok(())
    }

    async fn confirm_booking(&mut self, booking_id: Uuid) -> Result<(), BookingError> {
        let result = sqlx::query(
            "UPDATE bookings SET status = 'CONFIRMED' WHERE id = $1 AND status = 'PENDING'",
        )
        .bind(booking_id)
        .execute(&mut *self.tx)
        .await
        .map_err(BookingError::store)?;

        if result.rows_affected() != 1 {
            return Err(BookingError::store(anyhow::anyhow!(
                "booking {booking_id} is not awaiting confirmation"
            )));
        }

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), BookingError> {
        self.tx.commit().await.map_err(BookingError::store)
    }
}

fn payment_from_row(row: &sqlx::postgres::PgRow) -> Result<Payment, BookingError> {
    let method_raw: String = row.try_get("method").map_err(BookingError::store)?;
    let status_raw: String = row.try_get("status").map_err(BookingError::store)?;

    Ok(Payment {
        id: row.try_get("id").map_err(BookingError::store)?,
        booking_id: row.try_get("booking_id").map_err(BookingError::store)?,
        amount: row.try_get("amount").map_err(BookingError::store)?,
        method: PaymentMethod::parse_str(&method_raw).map_err(BookingError::store)?,
        phone_number: row.try_get("phone_number").map_err(BookingError::store)?,
        transaction_ref: row.try_get("transaction_ref").map_err(BookingError::store)?,
        status: PaymentStatus::parse_str(&status_raw).map_err(BookingError::store)?,
        paid_at: row.try_get("paid_at").map_err(BookingError::store)?,
        created_at: row.try_get("created_at").map_err(BookingError::store)?,
    })
}
