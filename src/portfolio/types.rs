use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 客戶端提交的投資組合（未驗證）
///
/// 日期以 `YYYY-MM-DD` 字串傳入，由驗證器解析。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioRequest {
    pub name: String,
    pub initial_value: f64,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub assets: Vec<AssetWeightRequest>,
}

/// 客戶端提交的資產權重項（未驗證）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetWeightRequest {
    pub ticker: String,
    pub weight: f64,
}

/// 通過驗證的投資組合，一經接受即不可變
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub name: String,
    pub initial_value: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub assets: Vec<AssetWeight>,
}

/// 通過驗證的資產權重項，代碼已正規化為大寫
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetWeight {
    pub ticker: String,
    pub weight: f64,
}

impl Portfolio {
    /// 回測日期範圍長度（日）
    pub fn range_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}
