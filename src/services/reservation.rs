use crate::availability::{slots_for_hours, Slot};
use crate::clients::{BlobStorage, SlipVerification, SlipVerifier, PAYMENT_SLIP_BUCKET};
use crate::error::{AppError, AppResult};
use crate::models::{Booking, BookingAction, BookingStatus, CourtSchedule, EvidenceUpload, NewBooking};
use crate::repositories::{BookingStore, CourtStore};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// One slot of a court's day as shown to customers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableSlot {
    pub slot_label: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub occupied: bool,
}

#[derive(Debug, Clone)]
pub struct ReservationRequest {
    pub court_id: Uuid,
    pub play_date: NaiveDate,
    pub slot_labels: Vec<String>,
    pub customer_id: Uuid,
    pub payment_evidence: EvidenceUpload,
}

/// Admits bookings only when none of their slots is held by another admitted booking
pub struct ReservationGuard {
    courts: Arc<dyn CourtStore>,
    bookings: Arc<dyn BookingStore>,
    verifier: Arc<dyn SlipVerifier>,
    storage: Arc<dyn BlobStorage>,
    /// Offset whose calendar decides what "today" is
    offset: FixedOffset,
}

impl ReservationGuard {
    pub fn new(
        courts: Arc<dyn CourtStore>,
        bookings: Arc<dyn BookingStore>,
        verifier: Arc<dyn SlipVerifier>,
        storage: Arc<dyn BlobStorage>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            courts,
            bookings,
            verifier,
            storage,
            offset,
        }
    }

    async fn load_schedule(&self, court_id: Uuid) -> AppResult<CourtSchedule> {
        self.courts
            .find_schedule(court_id)
            .await
            .map_err(AppError::store(format!("load court {}", court_id)))?
            .ok_or_else(|| AppError::NotFound(format!("Court {} not found", court_id)))
    }

    /// Slots of a court for a day with their occupancy, in start order
    pub async fn list_availability(&self, court_id: Uuid, play_date: NaiveDate) -> AppResult<Vec<AvailableSlot>> {
        let schedule = self.load_schedule(court_id).await?;
        let occupied = self
            .bookings
            .occupied_slots(court_id, play_date)
            .await
            .map_err(AppError::store(format!("read occupancy of court {}", court_id)))?;

        Ok(slots_for_hours(&schedule.hours)
            .into_iter()
            .map(|slot| {
                let slot_label = slot.label();
                AvailableSlot {
                    occupied: occupied.contains(&slot_label),
                    slot_label,
                    start: slot.start,
                    end: slot.end,
                }
            })
            .collect())
    }

    /// Verify payment and admit a booking for the requested slots.
    ///
    /// Nothing is written unless every check passes; the final overlap check
    /// and insert run atomically in the store.
    pub async fn try_reserve(&self, request: ReservationRequest) -> AppResult<Booking> {
        self.try_reserve_at(request, Utc::now()).await
    }

    /// Days before `now` in the settlement offset are closed: their month may
    /// already be settled.
    pub async fn try_reserve_at(&self, request: ReservationRequest, now: DateTime<Utc>) -> AppResult<Booking> {
        validate_request(&request)?;

        let today = now.with_timezone(&self.offset).date_naive();
        if request.play_date < today {
            return Err(AppError::Validation(format!(
                "Play date {} is in the past",
                request.play_date
            )));
        }

        let schedule = self.load_schedule(request.court_id).await?;
        let slot_labels = order_by_schedule(&request.slot_labels, &slots_for_hours(&schedule.hours))?;

        // Cheap rejection before the verification round-trip
        let occupied = self
            .bookings
            .occupied_slots(request.court_id, request.play_date)
            .await
            .map_err(AppError::store(format!("read occupancy of court {}", request.court_id)))?;
        let conflicting: Vec<String> = slot_labels
            .iter()
            .filter(|label| occupied.contains(*label))
            .cloned()
            .collect();
        if !conflicting.is_empty() {
            info!(
                "Reservation on court {} for {} rejected, slots taken: {:?}",
                request.court_id, request.play_date, conflicting
            );
            return Err(AppError::SlotConflict { conflicting });
        }

        let total_price = schedule.court.price_per_slot * Decimal::from(slot_labels.len());

        let verification = self
            .verifier
            .verify(total_price, &request.payment_evidence)
            .await?;
        check_verification(&verification, total_price, schedule.venue.payee_name.as_deref())?;

        // Stored before the atomic insert. A booking that then loses the race
        // leaves an unreferenced object; names are content hashes, so a retry
        // with the same slip overwrites it instead of adding another.
        let evidence_url = self
            .storage
            .put(PAYMENT_SLIP_BUCKET, &request.payment_evidence)
            .await?;

        let status = BookingStatus::Pending.apply(BookingAction::Admit)?;
        let booking = self
            .bookings
            .insert_admitted(NewBooking {
                customer_id: request.customer_id,
                venue_id: schedule.venue.id,
                court_id: schedule.court.id,
                court_number: schedule.court.court_number,
                play_date: request.play_date,
                slot_labels,
                total_price,
                payment_evidence_url: Some(evidence_url),
                status,
            })
            .await
            .map_err(AppError::store(format!("insert booking on court {}", request.court_id)));

        match &booking {
            Ok(b) => info!(
                "Booking {} admitted: court={}, date={}, slots={:?}, total={}",
                b.id, b.court_id, b.play_date, b.slot_labels, b.total_price
            ),
            Err(AppError::SlotConflict { conflicting }) => warn!(
                "Reservation on court {} for {} lost race for {:?}",
                request.court_id, request.play_date, conflicting
            ),
            Err(_) => {}
        }

        booking
    }
}

fn validate_request(request: &ReservationRequest) -> AppResult<()> {
    if request.slot_labels.is_empty() {
        return Err(AppError::Validation("At least one slot is required".into()));
    }

    let mut seen = HashSet::new();
    if let Some(dup) = request.slot_labels.iter().find(|l| !seen.insert(l.as_str())) {
        return Err(AppError::Validation(format!("Slot {} requested twice", dup)));
    }

    request.payment_evidence.validate("Payment slip")
}

/// Keep only slots the court offers and order them by start time
fn order_by_schedule(requested: &[String], offered: &[Slot]) -> AppResult<Vec<String>> {
    let position: HashMap<String, usize> = offered
        .iter()
        .enumerate()
        .map(|(i, slot)| (slot.label(), i))
        .collect();

    let unknown: Vec<&str> = requested
        .iter()
        .filter(|l| !position.contains_key(l.as_str()))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(AppError::Validation(format!(
            "Slots not offered by this court: {}",
            unknown.join(", ")
        )));
    }

    let mut ordered = requested.to_vec();
    ordered.sort_by_key(|l| position.get(l.as_str()).copied());
    Ok(ordered)
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// The slip must pass, show exactly the expected amount, and name the venue's
/// payee when both sides have one
fn check_verification(
    verification: &SlipVerification,
    expected_amount: Decimal,
    payee_name: Option<&str>,
) -> AppResult<()> {
    if !verification.success {
        return Err(AppError::PaymentVerificationFailed {
            details: verification
                .message
                .clone()
                .unwrap_or_else(|| "Slip could not be verified".into()),
        });
    }

    match verification.amount {
        Some(amount) if amount == expected_amount => {}
        Some(amount) => {
            return Err(AppError::PaymentVerificationFailed {
                details: format!("Slip amount {} does not match expected {}", amount, expected_amount),
            })
        }
        None => {
            return Err(AppError::PaymentVerificationFailed {
                details: "Slip amount could not be read".into(),
            })
        }
    }

    if let (Some(expected), Some(found)) = (payee_name, verification.payee_name.as_deref()) {
        if normalize_name(expected) != normalize_name(found) {
            return Err(AppError::PaymentVerificationFailed {
                details: format!("Slip payee {} does not match venue payee", found),
            });
        }
    }

    Ok(())
}
