//! Request and response bodies of the JSON API.

use crate::error::{AppError, AppResult};
use crate::labels::{Locale, Localized};
use crate::models::{Booking, EvidenceUpload, RefundRecord};
use crate::services::{OwnerPayoutSummary, PeriodPayout};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An uploaded image carried inline as base64
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidencePayload {
    pub file_name: String,
    pub content_type: String,
    pub data_base64: String,
}

impl EvidencePayload {
    pub fn decode(self, field: &str) -> AppResult<EvidenceUpload> {
        let bytes = STANDARD
            .decode(self.data_base64.trim())
            .map_err(|_| AppError::Validation(format!("{} is not valid base64", field)))?;
        Ok(EvidenceUpload::new(self.file_name, self.content_type, bytes))
    }
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveBody {
    pub date: NaiveDate,
    pub slot_labels: Vec<String>,
    pub customer_id: Uuid,
    pub payment_evidence: EvidencePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundBody {
    pub account_name: String,
    pub bank_name: String,
    pub account_number: String,
    pub reason: String,
    pub evidence: EvidencePayload,
}

/// Settle a given month, or the previous one when omitted
#[derive(Debug, Default, Deserialize)]
pub struct SettlementRunQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutCompleteBody {
    pub period: NaiveDate,
    pub admin_name: String,
    pub paid_on: NaiveDate,
    pub slip: EvidencePayload,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub venue_id: Uuid,
    pub court_id: Uuid,
    pub court_number: i32,
    pub play_date: NaiveDate,
    pub slot_labels: Vec<String>,
    pub total_price: Decimal,
    pub payment_evidence_url: Option<String>,
    pub status: String,
    pub status_label: &'static str,
    pub admitted: bool,
    pub created_at: DateTime<Utc>,
}

impl BookingResponse {
    pub fn new(booking: Booking, locale: Locale) -> Self {
        Self {
            status_label: booking.status.label(locale),
            status: booking.status.as_str().to_string(),
            id: booking.id,
            customer_id: booking.customer_id,
            venue_id: booking.venue_id,
            court_id: booking.court_id,
            court_number: booking.court_number,
            play_date: booking.play_date,
            slot_labels: booking.slot_labels,
            total_price: booking.total_price,
            payment_evidence_url: booking.payment_evidence_url,
            admitted: booking.admitted,
            created_at: booking.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    pub booking: BookingResponse,
    pub refund_id: Uuid,
    pub evidence_url: String,
}

impl RefundResponse {
    pub fn new(booking: Booking, refund: RefundRecord, locale: Locale) -> Self {
        Self {
            booking: BookingResponse::new(booking, locale),
            refund_id: refund.id,
            evidence_url: refund.evidence_url,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodPayoutResponse {
    #[serde(flatten)]
    pub payout: PeriodPayout,
    pub status_label: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutSummaryResponse {
    pub owner_id: Uuid,
    pub total_before_fee: Decimal,
    pub total_after_fee: Decimal,
    pub per_period: Vec<PeriodPayoutResponse>,
}

impl PayoutSummaryResponse {
    pub fn new(summary: OwnerPayoutSummary, locale: Locale) -> Self {
        Self {
            owner_id: summary.owner_id,
            total_before_fee: summary.total_before_fee,
            total_after_fee: summary.total_after_fee,
            per_period: summary
                .per_period
                .into_iter()
                .map(|payout| PeriodPayoutResponse {
                    status_label: payout.status.label(locale),
                    payout,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}
