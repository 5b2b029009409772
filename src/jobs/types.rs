use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::backtest::BacktestResult;
use crate::portfolio::Portfolio;

/// 任務狀態
///
/// 封閉的狀態機：PENDING 只能轉移到 SUCCESS 或 FAILURE，兩者皆為
/// 終端且不可再轉移。線上格式固定為大寫字串。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Success,
    Failure,
}

impl JobStatus {
    /// 是否為終端狀態
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failure)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(JobStatus::Pending),
            "SUCCESS" => Ok(JobStatus::Success),
            "FAILURE" => Ok(JobStatus::Failure),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// 一筆非同步回測任務
///
/// `result` 與 `error` 互斥，各自最多寫入一次，且只在到達對應的
/// 終端狀態時寫入。`job_id` 在任務對任何讀取者可見之前就已指派。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub portfolio: Portfolio,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<BacktestResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    /// 以已驗證的投資組合建立 PENDING 任務
    pub fn new(portfolio: Portfolio) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            status: JobStatus::Pending,
            portfolio,
            created_at: Utc::now(),
            result: None,
            error: None,
        }
    }

    /// 套用終端結果（呼叫端負責狀態轉移的條件檢查）
    pub fn apply_outcome(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Success(result) => {
                self.status = JobStatus::Success;
                self.result = Some(result);
                self.error = None;
            }
            JobOutcome::Failure(reason) => {
                self.status = JobStatus::Failure;
                self.error = Some(reason);
                self.result = None;
            }
        }
    }
}

/// 工作者執行的終端結果
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Success(BacktestResult),
    Failure(String),
}

/// 歷史清單的投影，只由 SUCCESS 任務惰性推導，不另外持久化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub job_id: Uuid,
    pub portfolio_name: String,
    pub final_value: f64,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// 從 SUCCESS 任務推導；其他狀態回傳 None
    pub fn from_job(job: &Job) -> Option<Self> {
        let result = job.result.as_ref()?;
        if job.status != JobStatus::Success {
            return None;
        }

        Some(Self {
            job_id: job.job_id,
            portfolio_name: job.portfolio.name.clone(),
            final_value: result.final_value,
            created_at: job.created_at,
        })
    }
}
