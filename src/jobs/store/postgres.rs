use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::ConnectOptions;
use uuid::Uuid;

use crate::backtest::BacktestResult;
use crate::config::DatabaseConfig;
use crate::jobs::store::{JobStore, StoreError, HISTORY_LIMIT};
use crate::jobs::types::{HistoryEntry, Job, JobOutcome, JobStatus};
use crate::portfolio::Portfolio;

/// PostgreSQL 唯一鍵衝突錯誤碼
const UNIQUE_VIOLATION: &str = "23505";

/// 任務紀錄的資料列模型
#[derive(sqlx::FromRow)]
struct JobRow {
    job_id: Uuid,
    status: String,
    portfolio: Json<Portfolio>,
    created_at: DateTime<Utc>,
    result: Option<Json<BacktestResult>>,
    error: Option<String>,
}

impl JobRow {
    fn into_job(self) -> Result<Job, StoreError> {
        let status: JobStatus = self.status.parse().map_err(|detail| StoreError::Corrupt {
            job_id: self.job_id,
            detail,
        })?;

        Ok(Job {
            job_id: self.job_id,
            status,
            portfolio: self.portfolio.0,
            created_at: self.created_at,
            result: self.result.map(|r| r.0),
            error: self.error,
        })
    }
}

/// 歷史投影的資料列模型
#[derive(sqlx::FromRow)]
struct HistoryRow {
    job_id: Uuid,
    portfolio_name: String,
    final_value: f64,
    created_at: DateTime<Utc>,
}

/// PostgreSQL 任務儲存
///
/// 紀錄佈局為 `{job_id, status, portfolio, created_at, result | error}`；
/// 終端轉移是帶 `status = 'PENDING'` 條件的單一 UPDATE，資料庫保證
/// 其對並發讀取的原子性。
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    /// 以既有連接池建立儲存
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 依配置建立連接池並測試連線
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .password(&config.password)
            .database(&config.database);

        options = options.disable_statement_logging();

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .max_lifetime(config.max_lifetime())
            .acquire_timeout(config.acquire_timeout())
            .idle_timeout(config.idle_timeout())
            .connect_with(options)
            .await?;

        // 測試連接
        sqlx::query("SELECT 1").execute(&pool).await?;

        Ok(Self::new(pool))
    }

    /// 執行內嵌的資料庫遷移
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// 獲取連接池
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, job: &Job) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO jobs (job_id, status, portfolio, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(job.job_id)
        .bind(job.status.as_str())
        .bind(Json(&job.portfolio))
        .bind(job.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::DuplicateJob(job.job_id)
            }
            _ => StoreError::Database(e),
        })?;

        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT job_id, status, portfolio, created_at, result, error
            FROM jobs
            WHERE job_id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobRow::into_job).transpose()
    }

    async fn complete(&self, job_id: Uuid, outcome: JobOutcome) -> Result<bool, StoreError> {
        let (status, result, error) = match outcome {
            JobOutcome::Success(result) => (JobStatus::Success, Some(Json(result)), None),
            JobOutcome::Failure(reason) => (JobStatus::Failure, None, Some(reason)),
        };

        let updated = sqlx::query(
            r#"
            UPDATE jobs
            SET status = $2, result = $3, error = $4
            WHERE job_id = $1 AND status = 'PENDING'
            "#,
        )
        .bind(job_id)
        .bind(status.as_str())
        .bind(result)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(updated.rows_affected() == 1)
    }

    async fn list_history(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT
                job_id,
                portfolio->>'name' AS portfolio_name,
                (result->>'final_value')::float8 AS final_value,
                created_at
            FROM jobs
            WHERE status = 'SUCCESS'
            ORDER BY created_at DESC, job_id ASC
            LIMIT $1
            "#,
        )
        .bind(HISTORY_LIMIT as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| HistoryEntry {
                job_id: row.job_id,
                portfolio_name: row.portfolio_name,
                final_value: row.final_value,
                created_at: row.created_at,
            })
            .collect())
    }

    async fn check_health(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
