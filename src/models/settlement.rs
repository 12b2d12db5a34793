//! Owner payout models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Payout state of a settlement row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Pending,
    Paid,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One payout record per (owner, venue, period)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashSettlement {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub venue_id: Uuid,
    pub total_amount: Decimal,
    pub status: PayoutStatus,
    /// Last day of the settled month
    pub period: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSettlement {
    pub owner_id: Uuid,
    pub venue_id: Uuid,
    pub total_amount: Decimal,
    pub period: NaiveDate,
}

/// Record of an admin transferring an owner's payout for a period
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PayoutTransfer {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub period: NaiveDate,
    pub admin_name: String,
    pub paid_on: NaiveDate,
    pub slip_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayoutTransfer {
    pub owner_id: Uuid,
    pub period: NaiveDate,
    pub admin_name: String,
    pub paid_on: NaiveDate,
    pub slip_url: String,
}
