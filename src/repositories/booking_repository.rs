use super::{BookingStore, RepoResult};
use crate::availability::find_conflicts;
use crate::error::RepositoryError;
use crate::models::{Booking, BookingStatus, NewBooking, NewRefund, RefundRecord};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::HashSet;
use uuid::Uuid;

const BOOKING_COLUMNS: &str = r#"
    id, customer_id, venue_id, court_id, court_number, play_date,
    slot_labels, total_price, payment_evidence_url, status, admitted, created_at
"#;

#[derive(Debug, FromRow)]
struct BookingRow {
    id: Uuid,
    customer_id: Uuid,
    venue_id: Uuid,
    court_id: Uuid,
    court_number: i32,
    play_date: NaiveDate,
    slot_labels: Vec<String>,
    total_price: Decimal,
    payment_evidence_url: Option<String>,
    status: String,
    admitted: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = RepositoryError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = BookingStatus::from_str(&row.status).map_err(RepositoryError::ConstraintViolation)?;
        Ok(Booking {
            id: row.id,
            customer_id: row.customer_id,
            venue_id: row.venue_id,
            court_id: row.court_id,
            court_number: row.court_number,
            play_date: row.play_date,
            slot_labels: row.slot_labels,
            total_price: row.total_price,
            payment_evidence_url: row.payment_evidence_url,
            status,
            admitted: row.admitted,
            created_at: row.created_at,
        })
    }
}

/// Repository for booking data access
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    /// Create a new BookingRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Serialize reservations on one court and day for the rest of the transaction
    async fn lock_court_day(
        tx: &mut Transaction<'_, Postgres>,
        court_id: Uuid,
        play_date: NaiveDate,
    ) -> RepoResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("{}:{}", court_id, play_date))
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn status_of(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> RepoResult<String> {
        sqlx::query_scalar::<_, String>("SELECT status FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("Booking {} not found", id)))
    }
}

#[async_trait]
impl BookingStore for BookingRepository {
    async fn occupied_slots(&self, court_id: Uuid, play_date: NaiveDate) -> RepoResult<HashSet<String>> {
        let labels = sqlx::query_scalar::<_, String>(
            r#"
            SELECT slot_label
            FROM booking_slots
            WHERE court_id = $1 AND play_date = $2 AND admitted
            "#,
        )
        .bind(court_id)
        .bind(play_date)
        .fetch_all(&self.pool)
        .await?;

        Ok(labels.into_iter().collect())
    }

    async fn insert_admitted(&self, booking: NewBooking) -> RepoResult<Booking> {
        let mut tx = self.pool.begin().await?;

        Self::lock_court_day(&mut tx, booking.court_id, booking.play_date).await?;

        let occupied = sqlx::query_scalar::<_, String>(
            r#"
            SELECT slot_label
            FROM booking_slots
            WHERE court_id = $1 AND play_date = $2 AND admitted
            "#,
        )
        .bind(booking.court_id)
        .bind(booking.play_date)
        .fetch_all(&mut *tx)
        .await?;

        let conflicts = find_conflicts(&booking.slot_labels, occupied.iter().map(String::as_str));
        if !conflicts.is_empty() {
            return Err(RepositoryError::SlotTaken(conflicts));
        }

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            INSERT INTO bookings
                (id, customer_id, venue_id, court_id, court_number, play_date,
                 slot_labels, total_price, payment_evidence_url, status, admitted)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, TRUE)
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(booking.customer_id)
        .bind(booking.venue_id)
        .bind(booking.court_id)
        .bind(booking.court_number)
        .bind(booking.play_date)
        .bind(&booking.slot_labels)
        .bind(booking.total_price)
        .bind(&booking.payment_evidence_url)
        .bind(booking.status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        // The partial unique index backs up the advisory lock
        let inserted = sqlx::query(
            r#"
            INSERT INTO booking_slots (booking_id, court_id, play_date, slot_label, admitted)
            SELECT $1, $2, $3, label, TRUE
            FROM UNNEST($4::text[]) AS label
            "#,
        )
        .bind(row.id)
        .bind(booking.court_id)
        .bind(booking.play_date)
        .bind(&booking.slot_labels)
        .execute(&mut *tx)
        .await
        .map_err(RepositoryError::from);

        match inserted {
            Ok(_) => {}
            Err(RepositoryError::Duplicate(_)) => {
                return Err(RepositoryError::SlotTaken(booking.slot_labels.clone()))
            }
            Err(e) => return Err(e),
        }

        tx.commit().await?;

        Booking::try_from(row)
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Booking>> {
        sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Booking::try_from)
        .transpose()
    }

    async fn find_by_customer(&self, customer_id: Uuid) -> RepoResult<Vec<Booking>> {
        sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE customer_id = $1 ORDER BY created_at DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Booking::try_from)
        .collect()
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> RepoResult<Booking> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            UPDATE bookings
            SET status = $3
            WHERE id = $1 AND status = $2
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(expected.as_str())
        .bind(next.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            let current = Self::status_of(&mut tx, id).await?;
            return Err(RepositoryError::StaleState(current));
        };

        tx.commit().await?;
        Booking::try_from(row)
    }

    async fn cancel_with_refund(
        &self,
        id: Uuid,
        expected: BookingStatus,
        refund: NewRefund,
    ) -> RepoResult<(Booking, RefundRecord)> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            UPDATE bookings
            SET status = $3, admitted = FALSE
            WHERE id = $1 AND status = $2
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(expected.as_str())
        .bind(BookingStatus::Cancelled.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            let current = Self::status_of(&mut tx, id).await?;
            return Err(RepositoryError::StaleState(current));
        };

        sqlx::query("UPDATE booking_slots SET admitted = FALSE WHERE booking_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let record = sqlx::query_as::<_, RefundRecord>(
            r#"
            INSERT INTO refunds (booking_id, account_name, bank_name, account_number, reason, evidence_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, booking_id, account_name, bank_name, account_number, reason, evidence_url, created_at
            "#,
        )
        .bind(id)
        .bind(&refund.account_name)
        .bind(&refund.bank_name)
        .bind(&refund.account_number)
        .bind(&refund.reason)
        .bind(&refund.evidence_url)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((Booking::try_from(row)?, record))
    }

    async fn confirmed_between(&self, from: NaiveDate, to: NaiveDate) -> RepoResult<Vec<Booking>> {
        sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE status = $1 AND play_date BETWEEN $2 AND $3
            ORDER BY play_date
            "#
        ))
        .bind(BookingStatus::Confirmed.as_str())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Booking::try_from)
        .collect()
    }
}
