pub mod errors;
pub mod models;
pub mod provider;
pub mod store;

pub use errors::BookingError;
pub use models::{
    Booking, BookingStatus, Bus, Payment, PaymentMethod, PaymentStatus, Route, Schedule,
    ScheduleStatus, TransportCompany,
};
pub use provider::{ChargeRequest, MobileMoneyProvider, SettlementOutcome, new_transaction_ref};
pub use store::{LockedSchedule, TransactionCoordinator, UnitOfWork};
