use async_trait::async_trait;
use tracing::info;

use mobembo_core::{ChargeRequest, MobileMoneyProvider, SettlementOutcome};

/// Stand-in for the real mobile-money operators: resolves synchronously
/// and always collects. Production would swap in a per-operator client
/// confirming through its callback.
#[derive(Debug, Default, Clone)]
pub struct SimulatedProvider;

#[async_trait]
impl MobileMoneyProvider for SimulatedProvider {
    async fn collect(&self, charge: &ChargeRequest) -> SettlementOutcome {
        info!(
            "simulated {} collection of {} from {} ({})",
            charge.method.as_str(),
            charge.amount,
            charge.phone_number,
            charge.transaction_ref
        );
        SettlementOutcome::Success
    }
}
