use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, types::Json, Executor, Pool, Postgres, Row};

use super::{lease_length, FinalizationStore, LocationStore};
use crate::entities::{Claim, DriverLocation, FinalizationRecord, MarkerStatus};
use crate::error::Error;

// the driver location table holds a single row
const DRIVER_ROW: i32 = 1;

pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    #[tracing::instrument(name = "PgStore::new", skip_all)]
    pub async fn new(db_uri: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_uri)
            .await?;

        pool.execute("CREATE TABLE IF NOT EXISTS driver_location (id INT4 PRIMARY KEY, data JSONB NOT NULL)")
            .await?;
        pool.execute("CREATE TABLE IF NOT EXISTS finalizations (session_id VARCHAR PRIMARY KEY, status VARCHAR NOT NULL, lease_until TIMESTAMPTZ NOT NULL, data JSONB NOT NULL)")
            .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl LocationStore for PgStore {
    #[tracing::instrument(skip(self))]
    async fn load(&self) -> Result<DriverLocation, Error> {
        let mut conn = self.pool.acquire().await?;

        let maybe_row = conn
            .fetch_optional(
                sqlx::query("SELECT data FROM driver_location WHERE id = $1").bind(DRIVER_ROW),
            )
            .await?;

        match maybe_row {
            Some(row) => {
                let Json(location) = row.try_get("data")?;
                Ok(location)
            }
            None => Ok(DriverLocation::empty()),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn save(&self, location: &DriverLocation) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query(
                "INSERT INTO driver_location (id, data) VALUES ($1, $2) ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data",
            )
            .bind(DRIVER_ROW)
            .bind(Json(location)),
        )
        .await?;

        Ok(())
    }
}

#[async_trait]
impl FinalizationStore for PgStore {
    #[tracing::instrument(skip(self, record), fields(session_id = %record.session_id))]
    async fn claim(&self, record: FinalizationRecord, lease: Duration) -> Result<Claim, Error> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // the conditional upsert is the lock: only one caller gets a row back
        let claimed = tx
            .fetch_optional(
                sqlx::query(
                    "INSERT INTO finalizations (session_id, status, lease_until, data) VALUES ($1, $2, $3, $4) \
                     ON CONFLICT (session_id) DO UPDATE SET status = EXCLUDED.status, lease_until = EXCLUDED.lease_until \
                     WHERE finalizations.status = $5 OR (finalizations.status = $2 AND finalizations.lease_until <= $6) \
                     RETURNING data",
                )
                .bind(&record.session_id)
                .bind(MarkerStatus::InProgress.name())
                .bind(now + lease_length(lease))
                .bind(Json(&record))
                .bind(MarkerStatus::Pending.name())
                .bind(now),
            )
            .await?;

        let claim = match claimed {
            Some(row) => {
                let Json(stored): Json<FinalizationRecord> = row.try_get("data")?;
                Claim::Acquired(stored)
            }
            None => {
                let row = tx
                    .fetch_one(
                        sqlx::query("SELECT status FROM finalizations WHERE session_id = $1")
                            .bind(&record.session_id),
                    )
                    .await?;
                let status: String = row.try_get("status")?;

                match MarkerStatus::from_name(&status) {
                    Some(MarkerStatus::Finalized) => Claim::AlreadyFinalized,
                    _ => Claim::InProgress,
                }
            }
        };

        tx.commit().await?;

        Ok(claim)
    }

    #[tracing::instrument(skip(self, record), fields(session_id = %record.session_id))]
    async fn save_progress(&self, record: &FinalizationRecord) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query("UPDATE finalizations SET data = $2 WHERE session_id = $1")
                .bind(&record.session_id)
                .bind(Json(record)),
        )
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn release(&self, session_id: &str) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query("UPDATE finalizations SET status = $2 WHERE session_id = $1 AND status = $3")
                .bind(session_id)
                .bind(MarkerStatus::Pending.name())
                .bind(MarkerStatus::InProgress.name()),
        )
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, record), fields(session_id = %record.session_id))]
    async fn complete(&self, record: &FinalizationRecord) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query("UPDATE finalizations SET status = $2, data = $3 WHERE session_id = $1")
                .bind(&record.session_id)
                .bind(MarkerStatus::Finalized.name())
                .bind(Json(record)),
        )
        .await?;

        Ok(())
    }
}
