pub mod config;
pub mod contracts;
pub mod db;
pub mod redis_bus;

pub use config::ServiceConfig;
pub use contracts::{
    BookingCreatedEvent, BookingDetailResponse, BookingPaymentView, BookingResponse,
    BookingScheduleView, BusResponse, CompanyResponse, CreateBookingRequest, CreateBusRequest,
    CreateCompanyRequest, CreatePaymentRequest, CreateRouteRequest, CreateScheduleRequest,
    PaymentResponse, PaymentSucceededEvent, RouteResponse, ScheduleBusView, ScheduleResponse,
    ScheduleRouteView,
};
pub use db::connect_database;
pub use redis_bus::{CHANNEL_BOOKINGS_CREATED, CHANNEL_PAYMENTS_SUCCEEDED, RedisBus};
