pub mod ledger;
pub mod provider_sim;
pub mod reservation;
pub mod settlement;

pub use provider_sim::SimulatedProvider;
pub use reservation::{ReservationEngine, ReservationRequest};
pub use settlement::{SettlementEngine, SettlementRequest};
