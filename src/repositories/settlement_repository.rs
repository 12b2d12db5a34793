use super::{RepoResult, SettlementStore};
use crate::error::RepositoryError;
use crate::models::{CashSettlement, NewPayoutTransfer, NewSettlement, PayoutStatus, PayoutTransfer};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct SettlementRow {
    id: Uuid,
    owner_id: Uuid,
    venue_id: Uuid,
    total_amount: Decimal,
    status: String,
    period: NaiveDate,
    created_at: DateTime<Utc>,
}

impl TryFrom<SettlementRow> for CashSettlement {
    type Error = RepositoryError;

    fn try_from(row: SettlementRow) -> Result<Self, Self::Error> {
        let status = PayoutStatus::from_str(&row.status).ok_or_else(|| {
            RepositoryError::ConstraintViolation(format!("Unknown payout status: {}", row.status))
        })?;
        Ok(CashSettlement {
            id: row.id,
            owner_id: row.owner_id,
            venue_id: row.venue_id,
            total_amount: row.total_amount,
            status,
            period: row.period,
            created_at: row.created_at,
        })
    }
}

/// Repository for owner payouts
pub struct SettlementRepository {
    pool: PgPool,
}

impl SettlementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettlementStore for SettlementRepository {
    async fn insert_settlements(&self, rows: Vec<NewSettlement>) -> RepoResult<Vec<CashSettlement>> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(rows.len());

        for row in rows {
            // Existing (owner, venue, period) rows come back empty and are skipped
            let created = sqlx::query_as::<_, SettlementRow>(
                r#"
                INSERT INTO cash_settlements (owner_id, venue_id, total_amount, status, period)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (owner_id, venue_id, period) DO NOTHING
                RETURNING id, owner_id, venue_id, total_amount, status, period, created_at
                "#,
            )
            .bind(row.owner_id)
            .bind(row.venue_id)
            .bind(row.total_amount)
            .bind(PayoutStatus::Pending.as_str())
            .bind(row.period)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(created) = created {
                inserted.push(CashSettlement::try_from(created)?);
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> RepoResult<Vec<CashSettlement>> {
        sqlx::query_as::<_, SettlementRow>(
            r#"
            SELECT id, owner_id, venue_id, total_amount, status, period, created_at
            FROM cash_settlements
            WHERE owner_id = $1
            ORDER BY period DESC, venue_id
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(CashSettlement::try_from)
        .collect()
    }

    async fn transfers_by_owner(&self, owner_id: Uuid) -> RepoResult<Vec<PayoutTransfer>> {
        let transfers = sqlx::query_as::<_, PayoutTransfer>(
            r#"
            SELECT id, owner_id, period, admin_name, paid_on, slip_url, created_at
            FROM payout_transfers
            WHERE owner_id = $1
            ORDER BY period DESC, created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transfers)
    }

    async fn complete_payout(&self, transfer: NewPayoutTransfer) -> RepoResult<(PayoutTransfer, u64)> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE cash_settlements
            SET status = $3
            WHERE owner_id = $1 AND period = $2 AND status = $4
            "#,
        )
        .bind(transfer.owner_id)
        .bind(transfer.period)
        .bind(PayoutStatus::Paid.as_str())
        .bind(PayoutStatus::Pending.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(RepositoryError::StaleState(format!(
                "no pending payout for owner {} in {}",
                transfer.owner_id, transfer.period
            )));
        }

        let record = sqlx::query_as::<_, PayoutTransfer>(
            r#"
            INSERT INTO payout_transfers (owner_id, period, admin_name, paid_on, slip_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, owner_id, period, admin_name, paid_on, slip_url, created_at
            "#,
        )
        .bind(transfer.owner_id)
        .bind(transfer.period)
        .bind(&transfer.admin_name)
        .bind(transfer.paid_on)
        .bind(&transfer.slip_url)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((record, updated))
    }
}
