use anyhow::Result;
use redis::{AsyncCommands, Client};
use serde::Serialize;

pub const CHANNEL_BOOKINGS_CREATED: &str = "bookings.created";
pub const CHANNEL_PAYMENTS_SUCCEEDED: &str = "payments.succeeded";

/// Post-commit notification fan-out. Consumers (receipts, SMS) are
/// outside this repository; publishing is fire-and-forget from the
/// caller's point of view.
#[derive(Clone)]
pub struct RedisBus {
    client: Client,
}

impl RedisBus {
    pub fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        Ok(Self { client })
    }

    pub async fn publish_json<T: Serialize>(&self, channel: &str, payload: &T) -> Result<()> {
        let mut connection = self.client.get_multiplexed_async_connection().await?;
        let serialized = serde_json::to_string(payload)?;
        let _: i64 = connection.publish(channel, serialized).await?;
        Ok(())
    }
}
