pub mod memory;
pub mod postgres;

pub use memory::MemoryCoordinator;
pub use postgres::{PgCoordinator, run_migrations};
