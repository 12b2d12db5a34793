//! Human-facing labels for status enums.
//!
//! Business logic only ever sees the enums; this is the one place that
//! knows what customers and admins read.

use crate::models::{BookingStatus, PayoutStatus};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Th,
    En,
}

impl Locale {
    /// Parse a language tag such as `th`, `en-US`; anything unknown falls back to Thai
    pub fn from_tag(tag: &str) -> Self {
        match tag.split(['-', '_']).next().map(str::to_ascii_lowercase).as_deref() {
            Some("en") => Locale::En,
            _ => Locale::Th,
        }
    }
}

pub trait Localized {
    fn label(&self, locale: Locale) -> &'static str;
}

impl Localized for BookingStatus {
    fn label(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (BookingStatus::Pending, Locale::Th) => "รอตรวจสอบการชำระเงิน",
            (BookingStatus::Pending, Locale::En) => "Awaiting payment",
            (BookingStatus::Confirmed, Locale::Th) => "ยืนยัน",
            (BookingStatus::Confirmed, Locale::En) => "Confirmed",
            (BookingStatus::CancellationRequested, Locale::Th) => "รอดำเนินการยกเลิก",
            (BookingStatus::CancellationRequested, Locale::En) => "Cancellation requested",
            (BookingStatus::Cancelled, Locale::Th) => "ยกเลิกแล้ว",
            (BookingStatus::Cancelled, Locale::En) => "Cancelled",
        }
    }
}

impl Localized for PayoutStatus {
    fn label(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (PayoutStatus::Pending, Locale::Th) => "รอโอน",
            (PayoutStatus::Pending, Locale::En) => "Awaiting transfer",
            (PayoutStatus::Paid, Locale::Th) => "โอนแล้ว",
            (PayoutStatus::Paid, Locale::En) => "Transferred",
        }
    }
}
