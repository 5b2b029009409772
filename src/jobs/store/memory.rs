use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::jobs::store::{JobStore, StoreError, HISTORY_LIMIT};
use crate::jobs::types::{HistoryEntry, Job, JobOutcome, JobStatus};

/// 記憶體任務儲存
///
/// 以 DashMap 為後端；條件轉移靠分片鎖取得的獨占引用保證原子性。
/// 用於開發環境與測試，不跨進程、不跨重啟。
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: DashMap<Uuid, Job>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, job: &Job) -> Result<(), StoreError> {
        use dashmap::mapref::entry::Entry;

        match self.jobs.entry(job.job_id) {
            Entry::Occupied(_) => Err(StoreError::DuplicateJob(job.job_id)),
            Entry::Vacant(entry) => {
                entry.insert(job.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.get(&job_id).map(|job| job.clone()))
    }

    async fn complete(&self, job_id: Uuid, outcome: JobOutcome) -> Result<bool, StoreError> {
        let Some(mut job) = self.jobs.get_mut(&job_id) else {
            return Ok(false);
        };

        if job.status != JobStatus::Pending {
            return Ok(false);
        }

        job.apply_outcome(outcome);
        Ok(true)
    }

    async fn list_history(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        let mut entries: Vec<HistoryEntry> = self
            .jobs
            .iter()
            .filter_map(|job| HistoryEntry::from_job(&job))
            .collect();

        // 由新到舊，以 job_id 做決定性的同刻排序
        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        entries.truncate(HISTORY_LIMIT);

        Ok(entries)
    }

    async fn check_health(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::BacktestResult;
    use crate::portfolio::{AssetWeight, Portfolio};
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};

    fn portfolio(name: &str) -> Portfolio {
        Portfolio {
            name: name.to_string(),
            initial_value: 10000.0,
            start_date: "2024-01-01".parse().unwrap(),
            end_date: "2024-12-31".parse().unwrap(),
            assets: vec![AssetWeight {
                ticker: "AAPL".to_string(),
                weight: 1.0,
            }],
        }
    }

    fn result(final_value: f64) -> BacktestResult {
        BacktestResult {
            portfolio: "Test".to_string(),
            final_value,
            cumulative_return: 0.05,
            volatility: 0.12,
            sharpe_ratio: Some(1.1),
            timeseries: vec![],
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryJobStore::new();
        let job = Job::new(portfolio("Test"));

        store.create(&job).await.unwrap();
        let loaded = store.get(job.job_id).await.unwrap().unwrap();

        assert_eq!(loaded.job_id, job.job_id);
        assert_eq!(loaded.status, JobStatus::Pending);
        assert!(loaded.result.is_none());
        assert!(loaded.error.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_create_rejected() {
        let store = InMemoryJobStore::new();
        let job = Job::new(portfolio("Test"));

        store.create(&job).await.unwrap();
        let err = store.create(&job).await.unwrap_err();
        assert_matches!(err, StoreError::DuplicateJob(id) if id == job.job_id);
    }

    #[tokio::test]
    async fn test_get_unknown_job_is_none() {
        let store = InMemoryJobStore::new();
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_complete_transitions_once() {
        let store = InMemoryJobStore::new();
        let job = Job::new(portfolio("Test"));
        store.create(&job).await.unwrap();

        let transitioned = store
            .complete(job.job_id, JobOutcome::Success(result(10500.0)))
            .await
            .unwrap();
        assert!(transitioned);

        let loaded = store.get(job.job_id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Success);
        assert_eq!(loaded.result.unwrap().final_value, 10500.0);
        assert!(loaded.error.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_completion_is_dropped() {
        let store = InMemoryJobStore::new();
        let job = Job::new(portfolio("Test"));
        store.create(&job).await.unwrap();

        assert!(store
            .complete(job.job_id, JobOutcome::Success(result(10500.0)))
            .await
            .unwrap());

        // 重複投遞後的第二次終端寫入必須被丟棄
        let second = store
            .complete(job.job_id, JobOutcome::Failure("late failure".to_string()))
            .await
            .unwrap();
        assert!(!second);

        let loaded = store.get(job.job_id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Success);
        assert!(loaded.error.is_none());
    }

    #[tokio::test]
    async fn test_complete_unknown_job_is_noop() {
        let store = InMemoryJobStore::new();
        let transitioned = store
            .complete(Uuid::new_v4(), JobOutcome::Failure("nope".to_string()))
            .await
            .unwrap();
        assert!(!transitioned);
    }

    #[tokio::test]
    async fn test_failure_sets_error_only() {
        let store = InMemoryJobStore::new();
        let job = Job::new(portfolio("Test"));
        store.create(&job).await.unwrap();

        store
            .complete(
                job.job_id,
                JobOutcome::Failure("no usable price data for ticker GONE".to_string()),
            )
            .await
            .unwrap();

        let loaded = store.get(job.job_id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Failure);
        assert!(loaded.result.is_none());
        assert!(loaded.error.unwrap().contains("GONE"));
    }

    #[tokio::test]
    async fn test_history_lists_only_success_most_recent_first() {
        let store = InMemoryJobStore::new();

        let mut success_old = Job::new(portfolio("Old"));
        success_old.created_at = Utc::now() - Duration::hours(2);
        let mut success_new = Job::new(portfolio("New"));
        success_new.created_at = Utc::now() - Duration::hours(1);
        let pending = Job::new(portfolio("Pending"));
        let failed = Job::new(portfolio("Failed"));

        for job in [&success_old, &success_new, &pending, &failed] {
            store.create(job).await.unwrap();
        }
        store
            .complete(success_old.job_id, JobOutcome::Success(result(11000.0)))
            .await
            .unwrap();
        store
            .complete(success_new.job_id, JobOutcome::Success(result(12000.0)))
            .await
            .unwrap();
        store
            .complete(failed.job_id, JobOutcome::Failure("boom".to_string()))
            .await
            .unwrap();

        let history = store.list_history().await.unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].portfolio_name, "New");
        assert_eq!(history[1].portfolio_name, "Old");
        assert_eq!(history[0].final_value, 12000.0);
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let store = InMemoryJobStore::new();

        for i in 0..(HISTORY_LIMIT + 5) {
            let mut job = Job::new(portfolio(&format!("P{i}")));
            job.created_at = Utc::now() - Duration::minutes(i as i64);
            store.create(&job).await.unwrap();
            store
                .complete(job.job_id, JobOutcome::Success(result(10000.0 + i as f64)))
                .await
                .unwrap();
        }

        let history = store.list_history().await.unwrap();
        assert_eq!(history.len(), HISTORY_LIMIT);
        // 最新者在前
        assert_eq!(history[0].portfolio_name, "P0");
    }
}
