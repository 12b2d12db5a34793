use super::{CourtStore, HealthCheck, RepoResult};
use crate::database::Database;
use crate::models::{Court, CourtHours, CourtSchedule, Venue};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct CourtVenueRow {
    court_id: Uuid,
    venue_id: Uuid,
    category: String,
    price_per_slot: Decimal,
    court_number: i32,
    owner_id: Uuid,
    venue_name: String,
    payee_name: Option<String>,
}

/// Repository for venue and court configuration
pub struct CourtRepository {
    pool: PgPool,
}

impl CourtRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CourtStore for CourtRepository {
    async fn find_schedule(&self, court_id: Uuid) -> RepoResult<Option<CourtSchedule>> {
        let row = sqlx::query_as::<_, CourtVenueRow>(
            r#"
            SELECT c.id AS court_id, c.venue_id, c.category, c.price_per_slot, c.court_number,
                   v.owner_id, v.name AS venue_name, v.payee_name
            FROM courts c
            JOIN venues v ON v.id = c.venue_id
            WHERE c.id = $1
            "#,
        )
        .bind(court_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let hours = sqlx::query_as::<_, CourtHours>(
            r#"
            SELECT time_start, time_end
            FROM court_hours
            WHERE court_id = $1
            ORDER BY time_start
            "#,
        )
        .bind(court_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(CourtSchedule {
            venue: Venue {
                id: row.venue_id,
                owner_id: row.owner_id,
                name: row.venue_name,
                payee_name: row.payee_name,
            },
            court: Court {
                id: row.court_id,
                venue_id: row.venue_id,
                category: row.category,
                price_per_slot: row.price_per_slot,
                court_number: row.court_number,
            },
            hours,
        }))
    }

    async fn venue_owners(&self) -> RepoResult<HashMap<Uuid, Uuid>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid)>("SELECT id, owner_id FROM venues")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().collect())
    }
}

#[async_trait]
impl HealthCheck for Database {
    async fn ping(&self) -> RepoResult<()> {
        sqlx::query("SELECT 1").execute(self.pool()).await?;
        Ok(())
    }
}
