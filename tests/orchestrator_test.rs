mod common;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use common::{daily_closes, portfolio_request, spawn_stack, two_asset_provider};
use fininsight_server::jobs::{
    JobOrchestrator, JobStatus, JobStatusSnapshot, LookupError, SubmitError,
};
use fininsight_server::market_data::{
    ClosePrice, InMemoryDataProvider, MarketDataError, MarketDataProvider,
};
use fininsight_server::portfolio::PortfolioRejection;

/// 輪詢任務直到進入終端狀態
async fn wait_for_terminal(orchestrator: &JobOrchestrator, job_id: Uuid) -> JobStatusSnapshot {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = orchestrator
                .get_status(job_id)
                .await
                .expect("job must exist while polling");
            if snapshot.status.is_terminal() {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("job did not reach a terminal state in time")
}

#[tokio::test]
async fn test_submitted_job_runs_to_success() {
    let stack = spawn_stack(Arc::new(two_asset_provider()));

    let request = portfolio_request("Test", vec![("AAPL", 0.5), ("MSFT", 0.5)]);
    let job_id = stack.orchestrator.submit(&request).await.unwrap();

    let terminal = wait_for_terminal(&stack.orchestrator, job_id).await;
    assert_eq!(terminal.status, JobStatus::Success);
    assert!(terminal.error.is_none());

    let snapshot = stack.orchestrator.get_result(job_id).await.unwrap();
    assert_eq!(snapshot.status, JobStatus::Success);
    assert!(snapshot.error.is_none());

    let result = snapshot.result.expect("SUCCESS job carries a result");
    assert_eq!(result.portfolio, "Test");
    // 首筆估值等於初始資金，長度等於共同交易日數
    assert_eq!(result.timeseries[0].value, 10000.0);
    assert_eq!(result.timeseries.len(), 4);
    assert!(result.final_value > 0.0);
}

#[tokio::test]
async fn test_weight_sum_violation_is_rejected_synchronously() {
    let stack = spawn_stack(Arc::new(two_asset_provider()));

    let request = portfolio_request("Bad Weights", vec![("AAPL", 0.5), ("MSFT", 0.3)]);
    let err = stack.orchestrator.submit(&request).await.unwrap_err();

    assert_matches!(
        err,
        SubmitError::Rejected(PortfolioRejection::WeightSum(sum)) if (sum - 0.8).abs() < 1e-9
    );

    // 不建立任何任務
    let history = stack.orchestrator.list_history().await.unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_missing_ticker_reaches_failure_with_reason() {
    // 只有 AAPL 有數據
    let provider = InMemoryDataProvider::new()
        .with_series("AAPL", daily_closes("2024-01-01", &[100.0, 102.0, 104.0]));
    let stack = spawn_stack(Arc::new(provider));

    let request = portfolio_request("Missing Data", vec![("AAPL", 0.5), ("GONE", 0.5)]);
    let job_id = stack.orchestrator.submit(&request).await.unwrap();

    let terminal = wait_for_terminal(&stack.orchestrator, job_id).await;
    assert_eq!(terminal.status, JobStatus::Failure);
    assert!(terminal.error.unwrap().contains("GONE"));

    let snapshot = stack.orchestrator.get_result(job_id).await.unwrap();
    assert!(snapshot.result.is_none());
    assert!(snapshot.error.is_some());

    // FAILURE 任務不進入歷史
    let history = stack.orchestrator.list_history().await.unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_terminal_status_is_stable_under_repeated_polling() {
    let stack = spawn_stack(Arc::new(two_asset_provider()));

    let request = portfolio_request("Stable", vec![("AAPL", 1.0)]);
    let job_id = stack.orchestrator.submit(&request).await.unwrap();
    let terminal = wait_for_terminal(&stack.orchestrator, job_id).await;

    for _ in 0..5 {
        let again = stack.orchestrator.get_status(job_id).await.unwrap();
        assert_eq!(again.status, terminal.status);
        assert_eq!(again.error, terminal.error);
    }
}

/// 永遠不回傳的提供者，讓任務停留在 PENDING
struct StalledProvider;

#[async_trait]
impl MarketDataProvider for StalledProvider {
    async fn daily_closes(
        &self,
        _ticker: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<ClosePrice>, MarketDataError> {
        futures::future::pending().await
    }
}

#[tokio::test]
async fn test_get_result_before_completion_reports_pending() {
    let stack = spawn_stack(Arc::new(StalledProvider));

    let request = portfolio_request("Slow", vec![("AAPL", 1.0)]);
    let job_id = stack.orchestrator.submit(&request).await.unwrap();

    // 讓工作者取走任務
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshot = stack.orchestrator.get_result(job_id).await.unwrap();
    assert_eq!(snapshot.status, JobStatus::Pending);
    assert!(snapshot.result.is_none());
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn test_unknown_job_id_is_not_found() {
    let stack = spawn_stack(Arc::new(two_asset_provider()));
    let unknown = Uuid::new_v4();

    let err = stack.orchestrator.get_status(unknown).await.unwrap_err();
    assert_matches!(err, LookupError::NotFound(id) if id == unknown);

    let err = stack.orchestrator.get_result(unknown).await.unwrap_err();
    assert_matches!(err, LookupError::NotFound(_));
}

#[tokio::test]
async fn test_history_orders_most_recent_first() {
    let stack = spawn_stack(Arc::new(two_asset_provider()));

    let first = stack
        .orchestrator
        .submit(&portfolio_request("First", vec![("AAPL", 1.0)]))
        .await
        .unwrap();
    wait_for_terminal(&stack.orchestrator, first).await;

    let second = stack
        .orchestrator
        .submit(&portfolio_request("Second", vec![("MSFT", 1.0)]))
        .await
        .unwrap();
    wait_for_terminal(&stack.orchestrator, second).await;

    let history = stack.orchestrator.list_history().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].portfolio_name, "Second");
    assert_eq!(history[1].portfolio_name, "First");
    assert!(history[0].created_at >= history[1].created_at);
}

#[tokio::test]
async fn test_workers_drain_queue_on_close() {
    let stack = spawn_stack(Arc::new(two_asset_provider()));

    let job_id = stack
        .orchestrator
        .submit(&portfolio_request("Drain", vec![("AAPL", 1.0)]))
        .await
        .unwrap();

    // 關閉佇列：已入列的任務仍要被處理完
    stack.queue.close().await;
    for handle in stack.workers {
        handle.await.unwrap();
    }

    let snapshot = stack.orchestrator.get_status(job_id).await.unwrap();
    assert_eq!(snapshot.status, JobStatus::Success);
}

#[tokio::test]
async fn test_concurrent_submissions_all_complete() {
    let stack = spawn_stack(Arc::new(two_asset_provider()));

    let mut job_ids = Vec::new();
    for i in 0..8 {
        let request = portfolio_request(&format!("P{i}"), vec![("AAPL", 0.5), ("MSFT", 0.5)]);
        job_ids.push(stack.orchestrator.submit(&request).await.unwrap());
    }

    for job_id in job_ids {
        let terminal = wait_for_terminal(&stack.orchestrator, job_id).await;
        assert_eq!(terminal.status, JobStatus::Success);
    }

    let history = stack.orchestrator.list_history().await.unwrap();
    assert_eq!(history.len(), 8);
}
