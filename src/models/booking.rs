use crate::error::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Booking status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    CancellationRequested,
    Cancelled,
}

/// Actions that move a booking through its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingAction {
    /// Reservation passed the slot check and payment verification
    Admit,
    /// Customer asked to cancel
    RequestCancellation,
    /// Admin refunded the customer
    ApproveRefund,
}

impl BookingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingAction::Admit => "admit booking",
            BookingAction::RequestCancellation => "request cancellation",
            BookingAction::ApproveRefund => "approve refund",
        }
    }
}

impl BookingStatus {
    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancellation_requested" => Ok(BookingStatus::CancellationRequested),
            "cancelled" => Ok(BookingStatus::Cancelled),
            _ => Err(format!("Invalid booking status: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::CancellationRequested => "cancellation_requested",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled)
    }

    /// The only transitions a booking may take. Everything else is rejected.
    pub fn apply(self, action: BookingAction) -> AppResult<BookingStatus> {
        match (self, action) {
            (BookingStatus::Pending, BookingAction::Admit) => Ok(BookingStatus::Confirmed),
            (BookingStatus::Confirmed, BookingAction::RequestCancellation) => {
                Ok(BookingStatus::CancellationRequested)
            }
            (BookingStatus::CancellationRequested, BookingAction::ApproveRefund) => {
                Ok(BookingStatus::Cancelled)
            }
            (from, action) => Err(AppError::InvalidTransition {
                from: from.as_str().to_string(),
                action: action.as_str().to_string(),
            }),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reservation of one or more slots on one court for one day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub venue_id: Uuid,
    pub court_id: Uuid,
    pub court_number: i32,
    pub play_date: NaiveDate,
    pub slot_labels: Vec<String>,
    pub total_price: Decimal,
    pub payment_evidence_url: Option<String>,
    pub status: BookingStatus,
    /// Whether the booking currently holds its slots
    pub admitted: bool,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to persist an admitted booking
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub customer_id: Uuid,
    pub venue_id: Uuid,
    pub court_id: Uuid,
    pub court_number: i32,
    pub play_date: NaiveDate,
    pub slot_labels: Vec<String>,
    pub total_price: Decimal,
    pub payment_evidence_url: Option<String>,
    pub status: BookingStatus,
}

/// Refund details recorded when a cancellation is approved
#[derive(Debug, Clone)]
pub struct NewRefund {
    pub account_name: String,
    pub bank_name: String,
    pub account_number: String,
    pub reason: String,
    pub evidence_url: String,
}

/// Refund history row linked to a cancelled booking
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RefundRecord {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub account_name: String,
    pub bank_name: String,
    pub account_number: String,
    pub reason: String,
    pub evidence_url: String,
    pub created_at: DateTime<Utc>,
}
