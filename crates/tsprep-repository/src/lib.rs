//! Postgres-backed persistence for raw and preprocessed time series.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use thiserror::Error;

use tsprep_core::types::{DataPoint, TimeSeries};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] MigrateError),

    #[error("no data found for series '{0}'")]
    NotFound(String),
}

/// One feature-engineered row: the (possibly resampled) value plus the
/// derived fields as a JSON object.
#[derive(Debug, Clone)]
pub struct FeatureRow {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
    pub features: Value,
}

#[async_trait]
pub trait SeriesRepository: Send + Sync {
    async fn fetch_raw(&self, series_id: &str) -> Result<TimeSeries, RepositoryError>;
    async fn fetch_preprocessed(&self, series_id: &str) -> Result<TimeSeries, RepositoryError>;
    async fn save_preprocessed(&self, series: &TimeSeries) -> Result<(), RepositoryError>;
    async fn save_features(
        &self,
        series_id: &str,
        rows: &[FeatureRow],
    ) -> Result<(), RepositoryError>;
}

#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn fetch_series(
        &self,
        query: &'static str,
        series_id: &str,
    ) -> Result<TimeSeries, RepositoryError> {
        let rows = sqlx::query(query)
            .bind(series_id)
            .fetch_all(&self.pool)
            .await?;

        if rows.is_empty() {
            return Err(RepositoryError::NotFound(series_id.to_string()));
        }

        let mut points = Vec::with_capacity(rows.len());
        for row in &rows {
            points.push(DataPoint {
                timestamp: row.try_get("timestamp")?,
                value: row.try_get("value")?,
            });
        }

        Ok(TimeSeries::new(series_id, points))
    }
}

#[async_trait]
impl SeriesRepository for PostgresRepository {
    async fn fetch_raw(&self, series_id: &str) -> Result<TimeSeries, RepositoryError> {
        self.fetch_series(
            r#"
            SELECT timestamp, value
            FROM time_series_raw
            WHERE series_id = $1
            ORDER BY timestamp
            "#,
            series_id,
        )
        .await
    }

    async fn fetch_preprocessed(&self, series_id: &str) -> Result<TimeSeries, RepositoryError> {
        self.fetch_series(
            r#"
            SELECT timestamp, value
            FROM time_series_preprocessed
            WHERE series_id = $1
            ORDER BY timestamp
            "#,
            series_id,
        )
        .await
    }

    async fn save_preprocessed(&self, series: &TimeSeries) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for point in &series.points {
            sqlx::query(
                r#"
                INSERT INTO time_series_preprocessed (series_id, timestamp, value)
                VALUES ($1, $2, $3)
                ON CONFLICT (series_id, timestamp) DO UPDATE SET
                    value = EXCLUDED.value
                "#,
            )
            .bind(&series.series_id)
            .bind(point.timestamp)
            .bind(point.value)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn save_features(
        &self,
        series_id: &str,
        rows: &[FeatureRow],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO time_series_preprocessed (series_id, timestamp, value, features)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (series_id, timestamp) DO UPDATE SET
                    value = EXCLUDED.value,
                    features = EXCLUDED.features
                "#,
            )
            .bind(series_id)
            .bind(row.timestamp)
            .bind(row.value)
            .bind(row.features.clone())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
