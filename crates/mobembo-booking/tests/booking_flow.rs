//! End-to-end run of the reservation and settlement flow on a nearly
//! full departure.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use mobembo_booking::{
    ReservationEngine, ReservationRequest, SettlementEngine, SettlementRequest, SimulatedProvider,
};
use mobembo_core::{
    BookingError, BookingStatus, PaymentMethod, PaymentStatus, Route, Schedule, ScheduleStatus,
};
use mobembo_store::MemoryCoordinator;

#[tokio::test]
async fn last_two_seats_booked_paid_and_locked() {
    let coordinator = Arc::new(MemoryCoordinator::new());
    let now = Utc::now();
    let route_id = Uuid::new_v4();
    let schedule_id = Uuid::new_v4();

    coordinator
        .insert_route(Route {
            id: route_id,
            departure: "Kinshasa".to_string(),
            destination: "Kikwit".to_string(),
            price: Decimal::new(45_000, 0),
            duration_minutes: Some(300),
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
            available_seats: 2,
            status: ScheduleStatus::Active,
            created_at: now,
        })
        .await;

    let reservations = ReservationEngine::new(coordinator.clone());
    let settlements = SettlementEngine::new(coordinator.clone(), Arc::new(SimulatedProvider));

    // rider A takes the last two seats
    let rider_a = Uuid::new_v4();
    let booking = reservations
        .create_booking(ReservationRequest {
            user_id: rider_a,
            schedule_id,
            seats_booked: 2,
        })
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.total_price, Decimal::new(90_000, 0));
    assert_eq!(
        coordinator
            .schedule(schedule_id)
            .await
            .unwrap()
            .available_seats,
        0
    );

    // rider B finds the bus full
    let err = reservations
        .create_booking(ReservationRequest {
            user_id: Uuid::new_v4(),
            schedule_id,
            seats_booked: 1,
        })
        .await
        .unwrap_err();
    match err {
        BookingError::InsufficientSeats { remaining } => assert_eq!(remaining, 0),
        other => panic!("expected InsufficientSeats, got {other:?}"),
    }

    // rider A pays over M-Pesa
    let payment = settlements
        .settle(SettlementRequest {
            user_id: rider_a,
            booking_id: booking.id,
            method: PaymentMethod::Mpesa,
            phone_number: "+243998765432".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Success);
    assert_eq!(payment.amount, Decimal::new(90_000, 0));
    assert!(payment.transaction_ref.starts_with("MOB-"));

    let confirmed = coordinator.booking(booking.id).await.unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);

    // paying twice is refused
    let err = settlements
        .settle(SettlementRequest {
            user_id: rider_a,
            booking_id: booking.id,
            method: PaymentMethod::Mpesa,
            phone_number: "+243998765432".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::PaymentAlreadyExists));
}
