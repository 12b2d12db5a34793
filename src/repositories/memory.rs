//! In-process store used by tests and local runs without Postgres.
//!
//! Every operation runs under a single mutex, which gives the same
//! per-(court, day) atomicity the Postgres repositories get from advisory locks.

use super::{BookingStore, CourtStore, HealthCheck, RepoResult, SettlementStore};
use crate::availability::find_conflicts;
use crate::error::RepositoryError;
use crate::models::{
    Booking, BookingStatus, CashSettlement, Court, CourtHours, CourtSchedule, NewBooking,
    NewPayoutTransfer, NewRefund, NewSettlement, PayoutStatus, PayoutTransfer, RefundRecord, Venue,
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    venues: HashMap<Uuid, Venue>,
    courts: HashMap<Uuid, Court>,
    hours: HashMap<Uuid, Vec<CourtHours>>,
    bookings: Vec<Booking>,
    refunds: Vec<RefundRecord>,
    settlements: Vec<CashSettlement>,
    transfers: Vec<PayoutTransfer>,
    fail_settlement_inserts: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_venue(&self, venue: Venue) {
        self.inner.lock().await.venues.insert(venue.id, venue);
    }

    pub async fn add_court(&self, court: Court, hours: Vec<CourtHours>) {
        let mut inner = self.inner.lock().await;
        inner.hours.insert(court.id, hours);
        inner.courts.insert(court.id, court);
    }

    /// Replace a court's opening hours
    pub async fn set_hours(&self, court_id: Uuid, hours: Vec<CourtHours>) {
        self.inner.lock().await.hours.insert(court_id, hours);
    }

    /// Make the next settlement inserts fail without writing anything
    pub async fn fail_settlement_inserts(&self, fail: bool) {
        self.inner.lock().await.fail_settlement_inserts = fail;
    }

    pub async fn bookings(&self) -> Vec<Booking> {
        self.inner.lock().await.bookings.clone()
    }

    pub async fn refunds(&self) -> Vec<RefundRecord> {
        self.inner.lock().await.refunds.clone()
    }

    pub async fn settlements(&self) -> Vec<CashSettlement> {
        self.inner.lock().await.settlements.clone()
    }
}

impl Inner {
    fn occupied(&self, court_id: Uuid, play_date: NaiveDate) -> HashSet<String> {
        self.bookings
            .iter()
            .filter(|b| b.admitted && b.court_id == court_id && b.play_date == play_date)
            .flat_map(|b| b.slot_labels.iter().cloned())
            .collect()
    }

    fn booking_mut(&mut self, id: Uuid, expected: BookingStatus) -> RepoResult<&mut Booking> {
        let booking = self
            .bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Booking {} not found", id)))?;
        if booking.status != expected {
            return Err(RepositoryError::StaleState(booking.status.as_str().to_string()));
        }
        Ok(booking)
    }
}

#[async_trait]
impl CourtStore for MemoryStore {
    async fn find_schedule(&self, court_id: Uuid) -> RepoResult<Option<CourtSchedule>> {
        let inner = self.inner.lock().await;
        let Some(court) = inner.courts.get(&court_id) else {
            return Ok(None);
        };
        let venue = inner.venues.get(&court.venue_id).cloned().ok_or_else(|| {
            RepositoryError::ConstraintViolation(format!("Court {} has no venue", court_id))
        })?;
        let mut hours = inner.hours.get(&court_id).cloned().unwrap_or_default();
        hours.sort_by_key(|h| h.time_start);

        Ok(Some(CourtSchedule {
            venue,
            court: court.clone(),
            hours,
        }))
    }

    async fn venue_owners(&self) -> RepoResult<HashMap<Uuid, Uuid>> {
        let inner = self.inner.lock().await;
        Ok(inner.venues.values().map(|v| (v.id, v.owner_id)).collect())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn occupied_slots(&self, court_id: Uuid, play_date: NaiveDate) -> RepoResult<HashSet<String>> {
        Ok(self.inner.lock().await.occupied(court_id, play_date))
    }

    async fn insert_admitted(&self, booking: NewBooking) -> RepoResult<Booking> {
        let mut inner = self.inner.lock().await;

        let occupied = inner.occupied(booking.court_id, booking.play_date);
        let conflicts = find_conflicts(&booking.slot_labels, occupied.iter().map(String::as_str));
        if !conflicts.is_empty() {
            return Err(RepositoryError::SlotTaken(conflicts));
        }

        let created = Booking {
            id: Uuid::new_v4(),
            customer_id: booking.customer_id,
            venue_id: booking.venue_id,
            court_id: booking.court_id,
            court_number: booking.court_number,
            play_date: booking.play_date,
            slot_labels: booking.slot_labels,
            total_price: booking.total_price,
            payment_evidence_url: booking.payment_evidence_url,
            status: booking.status,
            admitted: true,
            created_at: Utc::now(),
        };
        inner.bookings.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Booking>> {
        let inner = self.inner.lock().await;
        Ok(inner.bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn find_by_customer(&self, customer_id: Uuid) -> RepoResult<Vec<Booking>> {
        let inner = self.inner.lock().await;
        let mut found: Vec<Booking> = inner
            .bookings
            .iter()
            .rev()
            .filter(|b| b.customer_id == customer_id)
            .cloned()
            .collect();
        // stable, so equal timestamps keep newest-inserted first
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> RepoResult<Booking> {
        let mut inner = self.inner.lock().await;
        let booking = inner.booking_mut(id, expected)?;
        booking.status = next;
        Ok(booking.clone())
    }

    async fn cancel_with_refund(
        &self,
        id: Uuid,
        expected: BookingStatus,
        refund: NewRefund,
    ) -> RepoResult<(Booking, RefundRecord)> {
        let mut inner = self.inner.lock().await;
        if inner.refunds.iter().any(|r| r.booking_id == id) {
            return Err(RepositoryError::Duplicate(format!("Refund for booking {}", id)));
        }

        let booking = inner.booking_mut(id, expected)?;
        booking.status = BookingStatus::Cancelled;
        booking.admitted = false;
        let booking = booking.clone();

        let record = RefundRecord {
            id: Uuid::new_v4(),
            booking_id: id,
            account_name: refund.account_name,
            bank_name: refund.bank_name,
            account_number: refund.account_number,
            reason: refund.reason,
            evidence_url: refund.evidence_url,
            created_at: Utc::now(),
        };
        inner.refunds.push(record.clone());

        Ok((booking, record))
    }

    async fn confirmed_between(&self, from: NaiveDate, to: NaiveDate) -> RepoResult<Vec<Booking>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Confirmed && b.play_date >= from && b.play_date <= to)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SettlementStore for MemoryStore {
    async fn insert_settlements(&self, rows: Vec<NewSettlement>) -> RepoResult<Vec<CashSettlement>> {
        let mut inner = self.inner.lock().await;
        if inner.fail_settlement_inserts {
            return Err(RepositoryError::Unavailable("settlement insert rejected".to_string()));
        }

        let mut inserted = Vec::new();
        for row in rows {
            let exists = inner.settlements.iter().any(|s| {
                s.owner_id == row.owner_id && s.venue_id == row.venue_id && s.period == row.period
            });
            if exists {
                continue;
            }
            let created = CashSettlement {
                id: Uuid::new_v4(),
                owner_id: row.owner_id,
                venue_id: row.venue_id,
                total_amount: row.total_amount,
                status: PayoutStatus::Pending,
                period: row.period,
                created_at: Utc::now(),
            };
            inner.settlements.push(created.clone());
            inserted.push(created);
        }
        Ok(inserted)
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> RepoResult<Vec<CashSettlement>> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<CashSettlement> = inner
            .settlements
            .iter()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.period.cmp(&a.period).then(a.venue_id.cmp(&b.venue_id)));
        Ok(rows)
    }

    async fn transfers_by_owner(&self, owner_id: Uuid) -> RepoResult<Vec<PayoutTransfer>> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<PayoutTransfer> = inner
            .transfers
            .iter()
            .rev()
            .filter(|t| t.owner_id == owner_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.period, b.created_at).cmp(&(a.period, a.created_at)));
        Ok(rows)
    }

    async fn complete_payout(&self, transfer: NewPayoutTransfer) -> RepoResult<(PayoutTransfer, u64)> {
        let mut inner = self.inner.lock().await;

        let mut updated = 0;
        for row in inner.settlements.iter_mut().filter(|s| {
            s.owner_id == transfer.owner_id
                && s.period == transfer.period
                && s.status == PayoutStatus::Pending
        }) {
            row.status = PayoutStatus::Paid;
            updated += 1;
        }

        if updated == 0 {
            return Err(RepositoryError::StaleState(format!(
                "no pending payout for owner {} in {}",
                transfer.owner_id, transfer.period
            )));
        }

        let record = PayoutTransfer {
            id: Uuid::new_v4(),
            owner_id: transfer.owner_id,
            period: transfer.period,
            admin_name: transfer.admin_name,
            paid_on: transfer.paid_on,
            slip_url: transfer.slip_url,
            created_at: Utc::now(),
        };
        inner.transfers.push(record.clone());

        Ok((record, updated))
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn ping(&self) -> RepoResult<()> {
        Ok(())
    }
}
