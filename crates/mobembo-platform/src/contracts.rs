use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Money fields cross the wire as plain JSON numbers.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCompanyRequest {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyResponse {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: Option<String>,
    pub description: Option<String>,
    pub bus_count: i64,
    pub route_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBusRequest {
    pub plate_number: String,
    pub model: Option<String>,
    pub total_seats: i32,
    pub company_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusResponse {
    pub id: Uuid,
    pub plate_number: String,
    pub model: Option<String>,
    pub total_seats: i32,
    pub company_id: Uuid,
    pub company_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRouteRequest {
    pub departure: String,
    pub destination: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub duration_minutes: Option<i32>,
    pub company_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    pub id: Uuid,
    pub departure: String,
    pub destination: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub duration_minutes: Option<i32>,
    pub company_id: Uuid,
    pub company_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleRequest {
    pub route_id: Uuid,
    pub bus_id: Uuid,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRouteView {
    pub id: Uuid,
    pub departure: String,
    pub destination: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub company_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleBusView {
    pub plate_number: String,
    pub model: Option<String>,
    pub total_seats: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResponse {
    pub id: Uuid,
    pub route: ScheduleRouteView,
    pub bus: ScheduleBusView,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub available_seats: i32,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub schedule_id: Uuid,
    pub seats_booked: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub seats_booked: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingScheduleView {
    pub id: Uuid,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub departure: String,
    pub destination: String,
    pub company_name: String,
    pub bus_plate_number: String,
    pub bus_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingPaymentView {
    pub id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub method: String,
    pub transaction_ref: String,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDetailResponse {
    pub id: Uuid,
    pub seats_booked: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub schedule: BookingScheduleView,
    pub payment: Option<BookingPaymentView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub booking_id: Uuid,
    pub method: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub booking_id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub method: String,
    pub phone_number: String,
    pub transaction_ref: String,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCreatedEvent {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub schedule_id: Uuid,
    pub seats_booked: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSucceededEvent {
    pub payment_id: Uuid,
    pub booking_id: Uuid,
    pub transaction_ref: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub paid_at: DateTime<Utc>,
}
