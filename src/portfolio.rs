//! 投資組合領域模組
//!
//! 定義客戶端提交的投資組合結構與提交時的同步驗證規則。
//! 驗證為純函數：不合法的投資組合不會產生任何任務。

pub mod types;
pub mod validator;

pub use types::{AssetWeight, AssetWeightRequest, Portfolio, PortfolioRequest};
pub use validator::{PortfolioRejection, PortfolioValidator};
