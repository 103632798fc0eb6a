use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScheduleStatus {
    Active,
    Cancelled,
    Completed,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Active => "ACTIVE",
            ScheduleStatus::Cancelled => "CANCELLED",
            ScheduleStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse_str(value: &str) -> anyhow::Result<Self> {
        match value {
            "ACTIVE" => Ok(ScheduleStatus::Active),
            "CANCELLED" => Ok(ScheduleStatus::Cancelled),
            "COMPLETED" => Ok(ScheduleStatus::Completed),
            other => anyhow::bail!("unknown schedule status {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BookingStatus {
    Pending,
    Confirmed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
        }
    }

    pub fn parse_str(value: &str) -> anyhow::Result<Self> {
        match value {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            other => anyhow::bail!("unknown booking status {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
        }
    }

    pub fn parse_str(value: &str) -> anyhow::Result<Self> {
        match value {
            "PENDING" => Ok(PaymentStatus::Pending),
            "SUCCESS" => Ok(PaymentStatus::Success),
            "FAILED" => Ok(PaymentStatus::Failed),
            other => anyhow::bail!("unknown payment status {other}"),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Success | PaymentStatus::Failed)
    }
}

/// Mobile-money operators accepted at checkout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentMethod {
    Mpesa,
    AirtelMoney,
    OrangeMoney,
    AfriMoney,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Mpesa => "MPESA",
            PaymentMethod::AirtelMoney => "AIRTEL_MONEY",
            PaymentMethod::OrangeMoney => "ORANGE_MONEY",
            PaymentMethod::AfriMoney => "AFRI_MONEY",
        }
    }

    pub fn parse_str(value: &str) -> anyhow::Result<Self> {
        match value {
            "MPESA" => Ok(PaymentMethod::Mpesa),
            "AIRTEL_MONEY" => Ok(PaymentMethod::AirtelMoney),
            "ORANGE_MONEY" => Ok(PaymentMethod::OrangeMoney),
            "AFRI_MONEY" => Ok(PaymentMethod::AfriMoney),
            other => anyhow::bail!(
                "method must be one of MPESA, AIRTEL_MONEY, ORANGE_MONEY, AFRI_MONEY, found {other}"
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportCompany {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bus {
    pub id: Uuid,
    pub plate_number: String,
    pub model: Option<String>,
    pub total_seats: i32,
    pub company_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: Uuid,
    pub departure: String,
    pub destination: String,
    pub price: Decimal,
    pub duration_minutes: Option<i32>,
    pub company_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// One concrete, dated departure of a bus on a route. `available_seats`
/// is the live seat counter; only the booking path writes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub route_id: Uuid,
    pub bus_id: Uuid,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub available_seats: i32,
    pub status: ScheduleStatus,
    pub created_at: DateTime<Utc>,
}

/// A claim on N seats of a schedule. `total_price` is computed once at
/// creation and never recomputed, even if the route price changes later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub schedule_id: Uuid,
    pub seats_booked: i32,
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

/// At most one per booking. Once SUCCESS or FAILED it never changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub phone_number: String,
    pub transaction_ref: String,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_method_string_mapping() {
        for method in [
            PaymentMethod::Mpesa,
            PaymentMethod::AirtelMoney,
            PaymentMethod::OrangeMoney,
            PaymentMethod::AfriMoney,
        ] {
            assert_eq!(PaymentMethod::parse_str(method.as_str()).unwrap(), method);
        }
        assert!(PaymentMethod::parse_str("VISA").is_err());
    }

    #[test]
    fn terminal_payment_statuses() {
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(PaymentStatus::Success.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
    }
}
