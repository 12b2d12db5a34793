//! Store access.
//!
//! Services depend on these traits only. `Pg*` repositories back them with
//! Postgres; [`MemoryStore`] backs all of them in-process.

pub mod booking_repository;
pub mod court_repository;
pub mod memory;
pub mod settlement_repository;

use crate::error::RepositoryError;
use crate::models::{
    Booking, BookingStatus, CashSettlement, CourtSchedule, NewBooking, NewPayoutTransfer,
    NewRefund, NewSettlement, PayoutTransfer, RefundRecord,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

// Re-export all repositories for convenient access
pub use booking_repository::BookingRepository;
pub use court_repository::CourtRepository;
pub use memory::MemoryStore;
pub use settlement_repository::SettlementRepository;

pub type RepoResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait CourtStore: Send + Sync {
    /// Court with its venue and current opening hours
    async fn find_schedule(&self, court_id: Uuid) -> RepoResult<Option<CourtSchedule>>;

    /// venue id -> owner id for every venue
    async fn venue_owners(&self) -> RepoResult<HashMap<Uuid, Uuid>>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Labels held by admitted bookings on a court and day
    async fn occupied_slots(&self, court_id: Uuid, play_date: NaiveDate) -> RepoResult<HashSet<String>>;

    /// Check the requested slots against admitted bookings and insert, atomically
    /// per (court, day). Fails with [`RepositoryError::SlotTaken`] and writes nothing
    /// when any slot is held.
    async fn insert_admitted(&self, booking: NewBooking) -> RepoResult<Booking>;

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Booking>>;

    /// A customer's bookings, newest first
    async fn find_by_customer(&self, customer_id: Uuid) -> RepoResult<Vec<Booking>>;

    /// Compare-and-set on status. [`RepositoryError::StaleState`] carries the
    /// current status when it no longer equals `expected`.
    async fn update_status(
        &self,
        id: Uuid,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> RepoResult<Booking>;

    /// Move to `Cancelled`, release the slots and store the refund in one step
    async fn cancel_with_refund(
        &self,
        id: Uuid,
        expected: BookingStatus,
        refund: NewRefund,
    ) -> RepoResult<(Booking, RefundRecord)>;

    /// Confirmed bookings whose play date lies in `[from, to]`
    async fn confirmed_between(&self, from: NaiveDate, to: NaiveDate) -> RepoResult<Vec<Booking>>;
}

#[async_trait]
pub trait SettlementStore: Send + Sync {
    /// Insert all rows or none. Rows whose (owner, venue, period) already
    /// exists are skipped; only newly inserted rows are returned.
    async fn insert_settlements(&self, rows: Vec<NewSettlement>) -> RepoResult<Vec<CashSettlement>>;

    async fn find_by_owner(&self, owner_id: Uuid) -> RepoResult<Vec<CashSettlement>>;

    async fn transfers_by_owner(&self, owner_id: Uuid) -> RepoResult<Vec<PayoutTransfer>>;

    /// Record the transfer and mark the owner's pending rows for the period paid.
    /// [`RepositoryError::StaleState`] when nothing is pending.
    async fn complete_payout(&self, transfer: NewPayoutTransfer) -> RepoResult<(PayoutTransfer, u64)>;
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> RepoResult<()>;
}
