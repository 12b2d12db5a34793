//! Monthly owner settlement and payouts.
//!
//! The sweep groups the previous month's confirmed bookings by venue and
//! records one pending payout row per (owner, venue, period). The period is
//! the last day of the settled month and a booking belongs to the month of
//! its play date. Re-running a month only inserts rows that do not exist yet.

use crate::clients::{BlobStorage, PAYOUT_SLIP_BUCKET};
use crate::config::SettlementConfig;
use crate::error::{AppError, AppResult, RepositoryError};
use crate::models::{Booking, CashSettlement, EvidenceUpload, NewPayoutTransfer, NewSettlement, PayoutStatus, PayoutTransfer};
use crate::repositories::{BookingStore, CourtStore, SettlementStore};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Outcome of settling one month
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReport {
    pub period: NaiveDate,
    pub settlements_created: usize,
    pub skipped_existing: usize,
    /// Venues with confirmed revenue but no known owner
    pub unowned_venues: Vec<Uuid>,
    /// Sum of the newly created rows
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodPayout {
    pub period: NaiveDate,
    pub status: PayoutStatus,
    pub total_before_fee: Decimal,
    pub total_after_fee: Decimal,
    pub venue_count: usize,
    pub slip_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerPayoutSummary {
    pub owner_id: Uuid,
    pub total_before_fee: Decimal,
    pub total_after_fee: Decimal,
    /// Newest period first
    pub per_period: Vec<PeriodPayout>,
}

#[derive(Debug, Clone)]
pub struct PayoutRequest {
    pub owner_id: Uuid,
    pub period: NaiveDate,
    pub admin_name: String,
    pub paid_on: NaiveDate,
    pub slip: EvidenceUpload,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutCompletion {
    pub transfer: PayoutTransfer,
    pub settlements_paid: u64,
}

/// Year and month before the one containing `today`
pub fn previous_month(today: NaiveDate) -> (i32, u32) {
    if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    }
}

/// First and last day of a calendar month
pub fn month_bounds(year: i32, month: u32) -> AppResult<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::Validation(format!("Invalid month {}-{:02}", year, month)))?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let last = next_first
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| AppError::Validation(format!("Invalid month {}-{:02}", year, month)))?;
    Ok((first, last))
}

/// Sum of booking prices per venue
pub fn aggregate_by_venue(bookings: &[Booking]) -> BTreeMap<Uuid, Decimal> {
    let mut totals = BTreeMap::new();
    for booking in bookings {
        *totals.entry(booking.venue_id).or_insert(Decimal::ZERO) += booking.total_price;
    }
    totals
}

/// Amount left after the platform keeps `fee_percent`, rounded to satang
pub fn apply_fee(amount: Decimal, fee_percent: Decimal) -> Decimal {
    let kept = Decimal::ONE_HUNDRED - fee_percent;
    (amount * kept / Decimal::ONE_HUNDRED).round_dp(2)
}

pub struct SettlementService {
    courts: Arc<dyn CourtStore>,
    bookings: Arc<dyn BookingStore>,
    settlements: Arc<dyn SettlementStore>,
    storage: Arc<dyn BlobStorage>,
    config: SettlementConfig,
}

impl SettlementService {
    pub fn new(
        courts: Arc<dyn CourtStore>,
        bookings: Arc<dyn BookingStore>,
        settlements: Arc<dyn SettlementStore>,
        storage: Arc<dyn BlobStorage>,
        config: SettlementConfig,
    ) -> Self {
        Self {
            courts,
            bookings,
            settlements,
            storage,
            config,
        }
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    /// Settle the month before the current one in the settlement offset
    pub async fn run_monthly_settlement(&self) -> AppResult<SettlementReport> {
        self.run_monthly_settlement_at(Utc::now()).await
    }

    pub async fn run_monthly_settlement_at(&self, now: DateTime<Utc>) -> AppResult<SettlementReport> {
        let today = now.with_timezone(&self.config.offset()).date_naive();
        let (year, month) = previous_month(today);
        self.settle_month_at(year, month, now).await
    }

    /// Create pending payout rows for every venue with confirmed bookings in the month.
    ///
    /// All rows commit together or not at all.
    pub async fn settle_month(&self, year: i32, month: u32) -> AppResult<SettlementReport> {
        self.settle_month_at(year, month, Utc::now()).await
    }

    /// Only months that ended before `now` can be settled, so no booking can
    /// land in a period after its sweep.
    pub async fn settle_month_at(&self, year: i32, month: u32, now: DateTime<Utc>) -> AppResult<SettlementReport> {
        let (first, period) = month_bounds(year, month)?;
        let today = now.with_timezone(&self.config.offset()).date_naive();
        if period >= today {
            return Err(AppError::Validation(format!(
                "Month {}-{:02} has not ended yet",
                year, month
            )));
        }

        info!("Settlement sweep for {} started", period);

        let bookings = self
            .bookings
            .confirmed_between(first, period)
            .await
            .map_err(AppError::store(format!("read confirmed bookings for {}", period)))?;
        let totals = aggregate_by_venue(&bookings);

        let owners = self
            .courts
            .venue_owners()
            .await
            .map_err(AppError::store("read venue owners"))?;

        let mut rows = Vec::with_capacity(totals.len());
        let mut unowned_venues = Vec::new();
        for (venue_id, total_amount) in totals {
            match owners.get(&venue_id) {
                Some(owner_id) => rows.push(NewSettlement {
                    owner_id: *owner_id,
                    venue_id,
                    total_amount,
                    period,
                }),
                None => {
                    warn!("Venue {} has {} confirmed revenue but no owner, skipped", venue_id, total_amount);
                    unowned_venues.push(venue_id);
                }
            }
        }

        if rows.is_empty() {
            info!("Settlement sweep for {} found nothing to settle", period);
            return Ok(SettlementReport {
                period,
                settlements_created: 0,
                skipped_existing: 0,
                unowned_venues,
                total_amount: Decimal::ZERO,
            });
        }

        let candidates = rows.len();
        let failed_venues: Vec<Uuid> = rows.iter().map(|r| r.venue_id).collect();
        let created = self
            .settlements
            .insert_settlements(rows)
            .await
            .map_err(|e| {
                error!("Settlement sweep for {} rolled back: {}", period, e);
                AppError::SettlementPartialFailure {
                    period,
                    failed_venues,
                    reason: e.to_string(),
                }
            })?;

        let report = SettlementReport {
            period,
            settlements_created: created.len(),
            skipped_existing: candidates - created.len(),
            unowned_venues,
            total_amount: created.iter().map(|s| s.total_amount).sum(),
        };
        info!(
            "Settlement sweep for {} finished: {} created, {} already settled, total {}",
            period, report.settlements_created, report.skipped_existing, report.total_amount
        );
        Ok(report)
    }

    /// Owner's payouts grouped per period, before and after the platform fee
    pub async fn owner_payout_summary(&self, owner_id: Uuid) -> AppResult<OwnerPayoutSummary> {
        let rows = self
            .settlements
            .find_by_owner(owner_id)
            .await
            .map_err(AppError::store(format!("read payouts of owner {}", owner_id)))?;
        let transfers = self
            .settlements
            .transfers_by_owner(owner_id)
            .await
            .map_err(AppError::store(format!("read transfers of owner {}", owner_id)))?;

        let mut by_period: BTreeMap<NaiveDate, Vec<&CashSettlement>> = BTreeMap::new();
        for row in &rows {
            by_period.entry(row.period).or_default().push(row);
        }

        let fee = self.config.platform_fee_percent;
        let per_period: Vec<PeriodPayout> = by_period
            .into_iter()
            .rev()
            .map(|(period, rows)| {
                let total_before_fee: Decimal = rows.iter().map(|r| r.total_amount).sum();
                let status = if rows.iter().all(|r| r.status == PayoutStatus::Paid) {
                    PayoutStatus::Paid
                } else {
                    PayoutStatus::Pending
                };
                PeriodPayout {
                    period,
                    status,
                    total_before_fee,
                    total_after_fee: apply_fee(total_before_fee, fee),
                    venue_count: rows.len(),
                    // Transfers come newest first
                    slip_url: transfers
                        .iter()
                        .find(|t| t.period == period)
                        .map(|t| t.slip_url.clone()),
                }
            })
            .collect();

        let total_before_fee: Decimal = per_period.iter().map(|p| p.total_before_fee).sum();
        Ok(OwnerPayoutSummary {
            owner_id,
            total_before_fee,
            total_after_fee: apply_fee(total_before_fee, fee),
            per_period,
        })
    }

    /// Admin records the bank transfer for an owner's period and marks it paid
    pub async fn complete_payout(&self, request: PayoutRequest) -> AppResult<PayoutCompletion> {
        if request.admin_name.trim().is_empty() {
            return Err(AppError::Validation("Admin name is required".into()));
        }
        request.slip.validate("Transfer slip")?;

        let pending = self
            .settlements
            .find_by_owner(request.owner_id)
            .await
            .map_err(AppError::store(format!("read payouts of owner {}", request.owner_id)))?
            .into_iter()
            .any(|s| s.period == request.period && s.status == PayoutStatus::Pending);
        if !pending {
            return Err(no_pending_payout());
        }

        let slip_url = self.storage.put(PAYOUT_SLIP_BUCKET, &request.slip).await?;

        let (transfer, settlements_paid) = self
            .settlements
            .complete_payout(NewPayoutTransfer {
                owner_id: request.owner_id,
                period: request.period,
                admin_name: request.admin_name.trim().to_string(),
                paid_on: request.paid_on,
                slip_url,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::StaleState(_) => no_pending_payout(),
                other => AppError::store(format!("complete payout of owner {}", request.owner_id))(other),
            })?;

        info!(
            "Payout for owner {} period {} completed by {}: {} row(s) paid",
            request.owner_id, request.period, transfer.admin_name, settlements_paid
        );
        Ok(PayoutCompletion {
            transfer,
            settlements_paid,
        })
    }
}

fn no_pending_payout() -> AppError {
    AppError::InvalidTransition {
        from: PayoutStatus::Paid.to_string(),
        action: "complete payout".into(),
    }
}
