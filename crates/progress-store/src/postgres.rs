use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Checkpoint, CheckpointQuery, ProgressStoreError, Result, TicketId, Version,
    store::{CheckpointOptions, ProgressStore, validate_checkpoint},
};

/// PostgreSQL-backed progress store implementation.
#[derive(Clone)]
pub struct PostgresProgressStore {
    pool: PgPool,
}

impl PostgresProgressStore {
    /// Creates a new PostgreSQL progress store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_checkpoint(row: PgRow) -> Result<Checkpoint> {
        Ok(Checkpoint {
            ticket_id: TicketId::new(row.try_get::<String, _>("ticket_id")?),
            run_id: row.try_get::<Uuid, _>("run_id")?,
            version: Version::new(row.try_get("version")?),
            status: row.try_get("status")?,
            terminal: row.try_get("terminal")?,
            timestamp: row.try_get::<DateTime<Utc>, _>("timestamp")?,
            state: row.try_get("state")?,
        })
    }
}

#[async_trait]
impl ProgressStore for PostgresProgressStore {
    async fn checkpoint(
        &self,
        checkpoint: Checkpoint,
        options: CheckpointOptions,
    ) -> Result<Version> {
        validate_checkpoint(&checkpoint, &options)?;

        let ticket_id = checkpoint.ticket_id.clone();
        let mut tx = self.pool.begin().await?;

        // Lock the current row (if any) for the duration of the write
        let current: Option<(i64, bool)> = sqlx::query_as(
            "SELECT version, terminal FROM saga_checkpoints WHERE ticket_id = $1 FOR UPDATE",
        )
        .bind(ticket_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        if let Some((_, true)) = current {
            return Err(ProgressStoreError::Archived(ticket_id));
        }

        let actual = Version::new(current.map(|(v, _)| v).unwrap_or(0));
        if let Some(expected) = options.expected_version
            && actual != expected
        {
            return Err(ProgressStoreError::ConcurrencyConflict {
                ticket_id,
                expected,
                actual,
            });
        }

        if current.is_none() {
            sqlx::query(
                r#"
                INSERT INTO saga_checkpoints (ticket_id, run_id, version, status, terminal, timestamp, state)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(ticket_id.as_str())
            .bind(checkpoint.run_id)
            .bind(checkpoint.version.as_i64())
            .bind(&checkpoint.status)
            .bind(checkpoint.terminal)
            .bind(checkpoint.timestamp)
            .bind(&checkpoint.state)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                // Two writers racing to create the same ticket
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return ProgressStoreError::ConcurrencyConflict {
                        ticket_id: ticket_id.clone(),
                        expected: options.expected_version.unwrap_or(Version::initial()),
                        actual: checkpoint.version,
                    };
                }
                ProgressStoreError::Database(e)
            })?;
        } else {
            sqlx::query(
                r#"
                UPDATE saga_checkpoints
                SET run_id = $2, version = $3, status = $4, terminal = $5, timestamp = $6, state = $7
                WHERE ticket_id = $1
                "#,
            )
            .bind(ticket_id.as_str())
            .bind(checkpoint.run_id)
            .bind(checkpoint.version.as_i64())
            .bind(&checkpoint.status)
            .bind(checkpoint.terminal)
            .bind(checkpoint.timestamp)
            .bind(&checkpoint.state)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            ticket_id = %ticket_id,
            version = %checkpoint.version,
            status = %checkpoint.status,
            "checkpoint persisted"
        );
        Ok(checkpoint.version)
    }

    async fn load(&self, ticket_id: &TicketId) -> Result<Option<Checkpoint>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT ticket_id, run_id, version, status, terminal, timestamp, state
            FROM saga_checkpoints
            WHERE ticket_id = $1
            "#,
        )
        .bind(ticket_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_checkpoint).transpose()
    }

    async fn list(&self, query: CheckpointQuery) -> Result<Vec<Checkpoint>> {
        let mut sql = String::from(
            "SELECT ticket_id, run_id, version, status, terminal, timestamp, state FROM saga_checkpoints WHERE 1=1",
        );
        let mut param_count = 0;

        // Build dynamic query
        if query.terminal.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND terminal = ${param_count}"));
        }
        if query.statuses.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ANY(${param_count})"));
        }

        sql.push_str(" ORDER BY timestamp ASC, ticket_id ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(terminal) = query.terminal {
            sqlx_query = sqlx_query.bind(terminal);
        }
        if let Some(statuses) = query.statuses {
            sqlx_query = sqlx_query.bind(statuses);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_checkpoint).collect()
    }
}
