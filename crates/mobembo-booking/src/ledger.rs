use rust_decimal::Decimal;
use uuid::Uuid;

use mobembo_core::{BookingError, ScheduleStatus, UnitOfWork};

/// Consumes `count` seats on a schedule inside the caller's unit of
/// work and returns the route price read in the same transaction, so
/// the cost a booking freezes can never diverge from the inventory it
/// consumed.
///
/// The schedule row stays exclusively claimed until the unit commits;
/// a concurrent reservation on the same schedule waits and then sees
/// the decremented count.
pub async fn reserve_seats(
    unit: &mut dyn UnitOfWork,
    schedule_id: Uuid,
    count: i32,
) -> Result<Decimal, BookingError> {
    if count < 1 {
        return Err(BookingError::InvalidSeatCount);
    }

    let Some(locked) = unit.lock_schedule(schedule_id).await? else {
        return Err(BookingError::ScheduleNotFound);
    };

    if locked.schedule.status != ScheduleStatus::Active {
        return Err(BookingError::ScheduleUnavailable);
    }

    if locked.schedule.available_seats < count {
        return Err(BookingError::InsufficientSeats {
            remaining: locked.schedule.available_seats,
        });
    }

    unit.decrement_seats(schedule_id, count).await?;

    Ok(locked.route_price)
}
