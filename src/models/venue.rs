use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A venue listed by an owner
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Venue {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    /// Account name customers transfer to, checked against verified slips
    pub payee_name: Option<String>,
}

/// A bookable court within a venue
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Court {
    pub id: Uuid,
    pub venue_id: Uuid,
    pub category: String,
    pub price_per_slot: Decimal,
    pub court_number: i32,
}

/// One configured opening interval of a court
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CourtHours {
    pub time_start: NaiveTime,
    pub time_end: NaiveTime,
}

impl CourtHours {
    pub fn new(time_start: NaiveTime, time_end: NaiveTime) -> Self {
        Self {
            time_start,
            time_end,
        }
    }
}

/// A court together with its venue and current opening hours
#[derive(Debug, Clone)]
pub struct CourtSchedule {
    pub venue: Venue,
    pub court: Court,
    pub hours: Vec<CourtHours>,
}
